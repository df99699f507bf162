//! Vertex/index arena shared by all meshes of one renderer type
//!
//! Meshes are appended on the CPU while the scene is being built. `commit`
//! uploads the arena and freezes it. Dynamic arenas keep a CPU copy of the
//! vertex bytes that is re-uploaded into the current frame slot every frame.

use std::collections::HashMap;
use bytemuck::Pod;
use crate::render::gpu::{AccessPattern, BufferUsage, GpuAllocator};
use crate::render::{RenderError, RenderResult};
use crate::foundation::collections::GpuBufferHandle;

/// Upload policy of an element buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementBufferMode {
    /// Uploaded once at commit time
    Static,
    /// Vertex bytes re-uploaded every frame into a per-frame slot
    Dynamic,
}

/// Location of one mesh inside an element buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MeshEntry {
    /// Vertex index added to every index of the mesh
    pub base_vertex: i32,
    /// First index of the mesh in the index buffer
    pub first_index: u32,
    /// Number of indices
    pub element_count: u32,
}

/// GPU buffers backing a committed element buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GpuElementBuffers {
    /// Vertex buffer
    pub vertices: GpuBufferHandle,
    /// Index buffer
    pub indices: GpuBufferHandle,
    /// Bytes per frame slot in the vertex buffer
    pub vertex_slot_size: u64,
}

/// Append-only vertex/index arena
#[derive(Debug)]
pub struct ElementBuffer {
    mode: ElementBufferMode,
    vertex_stride: u32,
    vertices: Vec<u8>,
    indices: Vec<u32>,
    meshes: HashMap<String, MeshEntry>,
    gpu: Option<GpuElementBuffers>,
    committed: bool,
}

impl ElementBuffer {
    /// Create an empty arena for vertices of `vertex_stride` bytes
    pub fn new(vertex_stride: u32, mode: ElementBufferMode) -> Self {
        Self {
            mode,
            vertex_stride,
            vertices: Vec::new(),
            indices: Vec::new(),
            meshes: HashMap::new(),
            gpu: None,
            committed: false,
        }
    }

    /// Upload policy
    pub fn mode(&self) -> ElementBufferMode {
        self.mode
    }

    /// Bytes per vertex
    pub fn vertex_stride(&self) -> u32 {
        self.vertex_stride
    }

    /// Number of vertices across all meshes
    pub fn vertex_count(&self) -> usize {
        self.vertices.len() / self.vertex_stride.max(1) as usize
    }

    /// Number of indices across all meshes
    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    /// Whether no mesh has been appended
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Whether the arena is frozen
    pub fn is_committed(&self) -> bool {
        self.committed
    }

    /// Look up a resident mesh
    pub fn mesh(&self, name: &str) -> Option<MeshEntry> {
        self.meshes.get(name).copied()
    }

    /// Append a mesh given as raw vertex bytes
    ///
    /// Appending a name that is already resident returns the existing entry.
    pub fn append_mesh(&mut self, name: &str, vertex_bytes: &[u8], indices: &[u32]) -> RenderResult<MeshEntry> {
        if let Some(entry) = self.meshes.get(name) {
            return Ok(*entry);
        }
        if self.committed {
            return Err(RenderError::ElementBufferCommitted(name.to_string()));
        }
        let stride = self.vertex_stride as usize;
        if stride == 0 || vertex_bytes.len() % stride != 0 {
            return Err(RenderError::VertexStrideMismatch {
                len: vertex_bytes.len(),
                stride: self.vertex_stride,
            });
        }

        let base_vertex = i32::try_from(self.vertices.len() / stride)
            .map_err(|_| RenderError::LayoutOverflow { context: "base vertex" })?;
        let first_index = u32::try_from(self.indices.len())
            .map_err(|_| RenderError::LayoutOverflow { context: "first index" })?;
        let element_count = u32::try_from(indices.len())
            .map_err(|_| RenderError::LayoutOverflow { context: "element count" })?;

        self.vertices.extend_from_slice(vertex_bytes);
        self.indices.extend_from_slice(indices);

        let entry = MeshEntry { base_vertex, first_index, element_count };
        self.meshes.insert(name.to_string(), entry);
        log::debug!(
            "Appended mesh '{}': {} vertices, {} indices",
            name,
            vertex_bytes.len() / stride,
            indices.len()
        );
        Ok(entry)
    }

    /// Append a mesh given as typed vertices
    pub fn append_mesh_vertices<V: Pod>(&mut self, name: &str, vertices: &[V], indices: &[u32]) -> RenderResult<MeshEntry> {
        self.append_mesh(name, bytemuck::cast_slice(vertices), indices)
    }

    /// Upload the arena and freeze it
    ///
    /// Dynamic arenas reserve one vertex slot per frame replica. An empty
    /// arena is frozen without allocating. A released arena can be
    /// committed again, for example with a new replica count.
    pub fn commit(&mut self, allocator: &mut dyn GpuAllocator, frame_replicas: u32) -> RenderResult<()> {
        if self.gpu.is_some() {
            return Ok(());
        }
        self.committed = true;
        if self.is_empty() {
            return Ok(());
        }

        let vertex_slot_size = self.vertices.len() as u64;
        let index_bytes: &[u8] = bytemuck::cast_slice(&self.indices);

        let (vertex_size, access) = match self.mode {
            ElementBufferMode::Static => (vertex_slot_size, AccessPattern::DeviceLocal),
            ElementBufferMode::Dynamic => (
                vertex_slot_size
                    .checked_mul(u64::from(frame_replicas.max(1)))
                    .ok_or(RenderError::LayoutOverflow { context: "dynamic vertex buffer size" })?,
                AccessPattern::HostVisible,
            ),
        };

        let vertices = allocator.allocate(vertex_size, BufferUsage::VERTEX, access)?;
        let indices = match allocator.allocate(index_bytes.len() as u64, BufferUsage::INDEX, AccessPattern::DeviceLocal) {
            Ok(indices) => indices,
            Err(error) => {
                allocator.free(vertices);
                return Err(error);
            }
        };

        if let Err(error) = self.upload_contents(allocator, vertices, indices, vertex_size) {
            allocator.free(vertices);
            allocator.free(indices);
            return Err(error);
        }

        log::info!(
            "Committed element buffer: {} meshes, {} vertex bytes, {} index bytes ({:?})",
            self.meshes.len(),
            vertex_size,
            index_bytes.len(),
            self.mode
        );
        self.gpu = Some(GpuElementBuffers { vertices, indices, vertex_slot_size });
        Ok(())
    }

    /// Fill freshly allocated buffers; every vertex slot gets the same bytes
    fn upload_contents(
        &self,
        allocator: &mut dyn GpuAllocator,
        vertices: GpuBufferHandle,
        indices: GpuBufferHandle,
        vertex_size: u64,
    ) -> RenderResult<()> {
        let vertex_slot_size = self.vertices.len() as u64;
        let mut offset = 0;
        while vertex_slot_size > 0 && offset < vertex_size {
            allocator.write(vertices, offset, &self.vertices)?;
            offset += vertex_slot_size;
        }
        allocator.write(indices, 0, bytemuck::cast_slice(&self.indices))
    }

    /// CPU copy of the vertex bytes of a dynamic arena
    pub fn dynamic_vertices_mut(&mut self) -> RenderResult<&mut [u8]> {
        match self.mode {
            ElementBufferMode::Dynamic => Ok(&mut self.vertices),
            ElementBufferMode::Static => Err(RenderError::NotDynamic),
        }
    }

    /// Re-upload the vertex bytes of a dynamic arena into a frame slot
    pub fn upload_dynamic(&self, allocator: &mut dyn GpuAllocator, slot: u32) -> RenderResult<()> {
        if self.mode != ElementBufferMode::Dynamic {
            return Err(RenderError::NotDynamic);
        }
        let Some(gpu) = self.gpu else {
            return Ok(());
        };
        allocator.write(gpu.vertices, u64::from(slot) * gpu.vertex_slot_size, &self.vertices)
    }

    /// GPU buffers, once committed
    pub fn gpu_buffers(&self) -> Option<&GpuElementBuffers> {
        self.gpu.as_ref()
    }

    /// Byte offset of a frame slot's vertices in the vertex buffer
    pub fn vertex_offset(&self, slot: u32) -> u64 {
        match (self.mode, self.gpu) {
            (ElementBufferMode::Dynamic, Some(gpu)) => u64::from(slot) * gpu.vertex_slot_size,
            _ => 0,
        }
    }

    /// Free the GPU buffers
    pub fn release(&mut self, allocator: &mut dyn GpuAllocator) {
        if let Some(gpu) = self.gpu.take() {
            allocator.free(gpu.vertices);
            allocator.free(gpu.indices);
        }
    }
}
