//! # Render Storage
//!
//! Instance batching for one renderer type. A [`RenderStorage`] turns
//! graphics components into batches: one [`DrawElementsCommand`] per
//! distinct mesh + shared parameter set, or one per component in
//! single-instance mode.
//!
//! ## Instance Slots
//!
//! Adding and removing instances is O(1) and only marks the storage dirty.
//! [`RenderStorage::refresh`] recomputes first instances as prefix sums of
//! the batch counts and lays the flat instance array out batch by batch, so
//! an instance's slot is its batch's first instance plus its position in the
//! batch.

use std::collections::HashMap;
use bytemuck::{Pod, Zeroable};
use crate::foundation::collections::{InstanceHandle, SlotMap};
use crate::render::element_buffer::{ElementBuffer, ElementBufferMode, MeshEntry};
use crate::render::graphics_component::{BatchKey, GraphicsComponent};
use crate::render::mesh_library::{MeshLoader, Vertex};
use crate::render::{RenderResult, RendererType, StorageMode};
use crate::scene::EntityId;

/// Arguments of one indexed, instanced draw
///
/// Matches the layout of `VkDrawIndexedIndirectCommand`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Pod, Zeroable)]
pub struct DrawElementsCommand {
    /// Number of indices
    pub count: u32,
    /// Number of instances
    pub instance_count: u32,
    /// First index
    pub first_index: u32,
    /// Added to each index before fetching vertices
    pub base_vertex: i32,
    /// First instance slot
    pub first_instance: u32,
}

#[derive(Debug, Clone, Copy)]
struct InstanceRecord {
    owner: EntityId,
    batch: usize,
    position: usize,
}

/// Batches, instances and render objects of one renderer type
#[derive(Debug)]
pub struct RenderStorage {
    renderer: RendererType,
    mode: StorageMode,
    element_buffer: ElementBuffer,
    batches: Vec<DrawElementsCommand>,
    render_objects: Vec<MeshEntry>,
    members: Vec<Vec<InstanceHandle>>,
    key_to_batch: HashMap<BatchKey, usize>,
    records: SlotMap<InstanceHandle, InstanceRecord>,
    instances: Vec<EntityId>,
    dirty: bool,
}

impl RenderStorage {
    /// Create the storage for a renderer type using its table entry
    pub fn for_renderer(renderer: RendererType) -> Self {
        let info = renderer.info();
        let buffer_mode = if info.dynamic_vertices {
            ElementBufferMode::Dynamic
        } else {
            ElementBufferMode::Static
        };
        Self::new(renderer, info.storage_mode, ElementBuffer::new(Vertex::STRIDE, buffer_mode))
    }

    /// Create a storage with an explicit mode and element buffer
    pub fn new(renderer: RendererType, mode: StorageMode, element_buffer: ElementBuffer) -> Self {
        Self {
            renderer,
            mode,
            element_buffer,
            batches: Vec::new(),
            render_objects: Vec::new(),
            members: Vec::new(),
            key_to_batch: HashMap::new(),
            records: SlotMap::with_key(),
            instances: Vec::new(),
            dirty: false,
        }
    }

    /// Add an instance of `component` owned by `owner`
    ///
    /// In unlimited mode the component joins the batch of its key, creating
    /// the batch (and loading the mesh) on first use. In single-instance mode
    /// every call creates a batch.
    pub fn add_mesh(
        &mut self,
        component: &GraphicsComponent,
        owner: EntityId,
        loader: &mut dyn MeshLoader,
    ) -> RenderResult<InstanceHandle> {
        let existing = match self.mode {
            StorageMode::UnlimitedInstances => self.key_to_batch.get(&component.batch_key()).copied(),
            StorageMode::SingleInstance => None,
        };

        let batch = match existing {
            Some(batch) => batch,
            None => {
                let entry = loader.load_mesh(&component.mesh, &mut self.element_buffer)?;
                let batch = self.batches.len();
                self.batches.push(DrawElementsCommand {
                    count: entry.element_count,
                    instance_count: 0,
                    first_index: entry.first_index,
                    base_vertex: entry.base_vertex,
                    first_instance: self.records.len() as u32,
                });
                self.render_objects.push(entry);
                self.members.push(Vec::new());
                if self.mode == StorageMode::UnlimitedInstances {
                    self.key_to_batch.insert(component.batch_key(), batch);
                }
                log::debug!(
                    "{}: new batch {} for mesh '{}'",
                    self.renderer.info().name,
                    batch,
                    component.mesh
                );
                batch
            }
        };

        let position = self.members[batch].len();
        let handle = self.records.insert(InstanceRecord { owner, batch, position });
        self.members[batch].push(handle);
        self.batches[batch].instance_count += 1;
        self.dirty = true;
        Ok(handle)
    }

    /// Swap-remove an instance from its batch
    ///
    /// Returns the owner, or `None` for a stale handle. Emptied batches stay
    /// and draw nothing.
    pub fn remove_instance(&mut self, handle: InstanceHandle) -> Option<EntityId> {
        let record = self.records.remove(handle)?;
        let members = &mut self.members[record.batch];
        members.swap_remove(record.position);
        if let Some(moved) = members.get(record.position) {
            if let Some(moved_record) = self.records.get_mut(*moved) {
                moved_record.position = record.position;
            }
        }
        self.batches[record.batch].instance_count -= 1;
        self.dirty = true;
        Some(record.owner)
    }

    /// Recompute first instances and the flat instance array
    pub fn refresh(&mut self) {
        if !self.dirty {
            return;
        }
        let mut running = 0u32;
        self.instances.clear();
        for (batch, members) in self.batches.iter_mut().zip(&self.members) {
            batch.first_instance = running;
            running += batch.instance_count;
            self.instances
                .extend(members.iter().filter_map(|handle| self.records.get(*handle)).map(|record| record.owner));
        }
        self.dirty = false;
    }

    /// GPU slot of an instance: its batch's first instance plus its position
    ///
    /// Valid once the storage has been refreshed.
    pub fn instance_slot(&self, handle: InstanceHandle) -> Option<u32> {
        debug_assert!(!self.dirty, "instance slot queried on a dirty render storage");
        let record = self.records.get(handle)?;
        Some(self.batches[record.batch].first_instance + record.position as u32)
    }

    /// Batch index of an instance
    pub fn batch_of(&self, handle: InstanceHandle) -> Option<usize> {
        self.records.get(handle).map(|record| record.batch)
    }

    /// Owner of an instance
    pub fn owner_of(&self, handle: InstanceHandle) -> Option<EntityId> {
        self.records.get(handle).map(|record| record.owner)
    }

    /// Instances of one batch in slot order
    pub fn batch_members(&self, batch: usize) -> &[InstanceHandle] {
        self.members.get(batch).map_or(&[], Vec::as_slice)
    }

    /// Renderer type
    pub fn renderer(&self) -> RendererType {
        self.renderer
    }

    /// Batching mode
    pub fn mode(&self) -> StorageMode {
        self.mode
    }

    /// Whether a refresh is pending
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// One draw command per batch
    pub fn batches(&self) -> &[DrawElementsCommand] {
        &self.batches
    }

    /// Number of batches
    pub fn batch_count(&self) -> usize {
        self.batches.len()
    }

    /// Flat, batch-contiguous instance owners
    pub fn instances(&self) -> &[EntityId] {
        &self.instances
    }

    /// Number of live instances
    pub fn instance_count(&self) -> usize {
        self.records.len()
    }

    /// Mesh entry of each batch
    pub fn render_objects(&self) -> &[MeshEntry] {
        &self.render_objects
    }

    /// Number of render objects
    pub fn render_object_count(&self) -> usize {
        self.render_objects.len()
    }

    /// Element buffer holding the meshes
    pub fn element_buffer(&self) -> &ElementBuffer {
        &self.element_buffer
    }

    /// Mutable element buffer (commit, dynamic vertex writes)
    pub fn element_buffer_mut(&mut self) -> &mut ElementBuffer {
        &mut self.element_buffer
    }
}
