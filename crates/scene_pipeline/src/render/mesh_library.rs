//! Named mesh sources
//!
//! Render storages resolve mesh names through a [`MeshLoader`]. The
//! in-memory [`MeshLibrary`] ships a quad and a cube and accepts any mesh
//! registered at runtime; file formats are left to other loaders.

use std::collections::HashMap;
use bytemuck::{Pod, Zeroable};
use crate::render::element_buffer::{ElementBuffer, MeshEntry};
use crate::render::{RenderError, RenderResult};

/// Resolves a mesh name into a resident range of an element buffer
pub trait MeshLoader {
    /// Make `name` resident in `buffer` and return its entry
    ///
    /// Loading a mesh that is already resident returns the existing entry.
    fn load_mesh(&mut self, name: &str, buffer: &mut ElementBuffer) -> RenderResult<MeshEntry>;
}

/// Standard vertex: position, normal and texture coordinate
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    /// Position in object space
    pub position: [f32; 3],
    /// Normal vector
    pub normal: [f32; 3],
    /// Texture coordinates
    pub tex_coord: [f32; 2],
}

impl Vertex {
    /// Size of one vertex in bytes
    pub const STRIDE: u32 = std::mem::size_of::<Self>() as u32;

    /// Create a new vertex
    pub const fn new(position: [f32; 3], normal: [f32; 3], tex_coord: [f32; 2]) -> Self {
        Self { position, normal, tex_coord }
    }
}

/// Vertex and index data of one mesh
#[derive(Debug, Clone, PartialEq)]
pub struct MeshData {
    /// Vertex data
    pub vertices: Vec<Vertex>,
    /// Triangle indices
    pub indices: Vec<u32>,
}

impl MeshData {
    /// Create mesh data
    pub fn new(vertices: Vec<Vertex>, indices: Vec<u32>) -> Self {
        Self { vertices, indices }
    }

    /// Unit quad in the XY plane facing +Z
    pub fn quad() -> Self {
        let normal = [0.0, 0.0, 1.0];
        let vertices = vec![
            Vertex::new([-0.5, -0.5, 0.0], normal, [0.0, 0.0]),
            Vertex::new([0.5, -0.5, 0.0], normal, [1.0, 0.0]),
            Vertex::new([0.5, 0.5, 0.0], normal, [1.0, 1.0]),
            Vertex::new([-0.5, 0.5, 0.0], normal, [0.0, 1.0]),
        ];
        Self::new(vertices, vec![0, 1, 2, 2, 3, 0])
    }

    /// Cube spanning ±1 on every axis
    pub fn cube() -> Self {
        let vertices = vec![
            // front
            Vertex::new([-1.0, -1.0, 1.0], [0.0, 0.0, 1.0], [0.0, 0.0]),
            Vertex::new([1.0, -1.0, 1.0], [0.0, 0.0, 1.0], [1.0, 0.0]),
            Vertex::new([1.0, 1.0, 1.0], [0.0, 0.0, 1.0], [1.0, 1.0]),
            Vertex::new([-1.0, 1.0, 1.0], [0.0, 0.0, 1.0], [0.0, 1.0]),
            // back
            Vertex::new([-1.0, -1.0, -1.0], [0.0, 0.0, -1.0], [1.0, 0.0]),
            Vertex::new([-1.0, 1.0, -1.0], [0.0, 0.0, -1.0], [1.0, 1.0]),
            Vertex::new([1.0, 1.0, -1.0], [0.0, 0.0, -1.0], [0.0, 1.0]),
            Vertex::new([1.0, -1.0, -1.0], [0.0, 0.0, -1.0], [0.0, 0.0]),
        ];
        let indices = vec![
            0, 1, 2, 2, 3, 0,
            4, 5, 6, 6, 7, 4,
            4, 0, 3, 3, 5, 4,
            1, 7, 6, 6, 2, 1,
            3, 2, 6, 6, 5, 3,
            4, 7, 1, 1, 0, 4,
        ];
        Self::new(vertices, indices)
    }
}

/// In-memory mesh source
#[derive(Debug, Default, Clone)]
pub struct MeshLibrary {
    meshes: HashMap<String, MeshData>,
}

impl MeshLibrary {
    /// Create an empty library
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a library holding the built-in "quad" and "cube" meshes
    pub fn with_builtin_meshes() -> Self {
        let mut library = Self::new();
        library.register("quad", MeshData::quad());
        library.register("cube", MeshData::cube());
        library
    }

    /// Register or replace a mesh
    pub fn register(&mut self, name: impl Into<String>, mesh: MeshData) {
        self.meshes.insert(name.into(), mesh);
    }

    /// Whether a mesh is known
    pub fn contains(&self, name: &str) -> bool {
        self.meshes.contains_key(name)
    }
}

impl MeshLoader for MeshLibrary {
    fn load_mesh(&mut self, name: &str, buffer: &mut ElementBuffer) -> RenderResult<MeshEntry> {
        if let Some(entry) = buffer.mesh(name) {
            return Ok(entry);
        }
        let mesh = self
            .meshes
            .get(name)
            .ok_or_else(|| RenderError::MeshNotFound(name.to_string()))?;
        buffer.append_mesh_vertices(name, &mesh.vertices, &mesh.indices)
    }
}
