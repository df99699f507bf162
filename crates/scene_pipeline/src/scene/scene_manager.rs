//! # Scene
//!
//! Entity hierarchy plus the per-frame write/sort/flush cycle.
//!
//! ## Frame
//!
//! A frame runs strictly in order: clear the staging regions and draw lists,
//! traverse the hierarchy top-down (behaviors, world matrices) while writing
//! every renderable into staging, sort the draw lists, and finally flush the
//! staging regions into the current frame slot of the GPU buffers. Only a
//! successfully prepared frame is flushed; a failure leaves the GPU buffers
//! untouched.
//!
//! ## Closed World
//!
//! The set of renderables is closed once [`Scene::build_graphics`] has laid
//! out the buffers: entities without graphics can still come and go, and
//! renderables can be removed, but new renderables can't be added.

use crate::core::PipelineConfig;
use crate::foundation::collections::{BindingSetHandle, GpuBufferHandle, NodeId};
use crate::foundation::math::Mat4;
use crate::render::{
    AccessPattern, BindingBackend, BindingLayout, BufferKind, BufferRange, BufferUsage, ElementBufferMode,
    FrameStaging, GpuAllocator, MaterialRegistry, MeshLoader, ParameterRegistry, RenderError, RenderStorage,
    RendererType, SceneGraphicsInfo,
};
use crate::scene::camera::Camera;
use crate::scene::draw_list::DrawList;
use crate::scene::entity::{Entity, EntityId, UpdateContext};
use crate::scene::error::{SceneError, SceneResult};
use crate::scene::frame_writer::FrameWriter;
use crate::scene::graph::SceneGraph;

/// Handles of the three per-frame GPU buffers of a scene
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SceneGpuBuffers {
    /// Transform buffer (binding 0)
    pub transform: GpuBufferHandle,
    /// Parameter buffer (binding 1)
    pub parameter: GpuBufferHandle,
    /// Material buffer (binding 2)
    pub material: GpuBufferHandle,
}

impl SceneGpuBuffers {
    /// Buffer backing one kind
    pub fn buffer(&self, kind: BufferKind) -> GpuBufferHandle {
        match kind {
            BufferKind::Transform => self.transform,
            BufferKind::Parameter => self.parameter,
            BufferKind::Material => self.material,
        }
    }
}

/// Counters of one prepared frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameStats {
    /// Renderables written into staging
    pub instances_written: u32,
    /// Draw commands across all renderer types
    pub draw_commands: usize,
}

/// Scene graph with its render storages and frame staging
pub struct Scene {
    config: PipelineConfig,
    graph: SceneGraph,
    next_entity_id: u32,
    storages: Vec<RenderStorage>,
    materials: MaterialRegistry,
    parameters: ParameterRegistry,
    cameras: Vec<Camera>,
    graphics: Option<SceneGraphicsInfo>,
    staging: FrameStaging,
    draw_lists: Vec<DrawList>,
    write_counts: [u32; RendererType::COUNT],
    gpu: Option<SceneGpuBuffers>,
    prepared: bool,
}

impl Scene {
    /// Create an empty scene holding only the root entity
    pub fn new(config: PipelineConfig) -> SceneResult<Self> {
        config.validate()?;
        let cameras = vec![Camera::default(); config.camera_count as usize];
        log::info!(
            "Creating scene: {} frames in flight, {} cameras, shadow replica {}",
            config.frames_in_flight,
            config.camera_count,
            config.shadow_replica
        );

        Ok(Self {
            graph: SceneGraph::new(Entity::new(EntityId(0), "root")),
            next_entity_id: 1,
            storages: RendererType::RENDERABLE.map(RenderStorage::for_renderer).into(),
            materials: MaterialRegistry::new(),
            parameters: ParameterRegistry::new(),
            cameras,
            graphics: None,
            staging: FrameStaging::default(),
            draw_lists: RendererType::RENDERABLE
                .iter()
                .map(|renderer| DrawList::new(renderer.info().sort_order))
                .collect(),
            write_counts: [0; RendererType::COUNT],
            gpu: None,
            prepared: false,
            config,
        })
    }

    /// Pipeline configuration
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Entity hierarchy
    pub fn graph(&self) -> &SceneGraph {
        &self.graph
    }

    /// Create an entity with a fresh id; it joins the scene through
    /// [`Scene::add_entity`]
    pub fn create_entity(&mut self, name: impl Into<String>) -> Entity {
        let id = EntityId(self.next_entity_id);
        self.next_entity_id += 1;
        Entity::new(id, name)
    }

    /// Insert an entity under `parent` (the root when `None`)
    ///
    /// `hint` is the parent's node and skips the hierarchy search; with
    /// debug checks enabled it is verified against `parent`.
    ///
    /// # Panics
    /// If the parent is not in the scene, if the entity id is already in the
    /// scene (checked when debug checks are enabled), or if a renderable is
    /// added after the graphics layout was built.
    pub fn add_entity(&mut self, entity: Entity, parent: Option<EntityId>, hint: Option<NodeId>) -> NodeId {
        let checks = self.config.debug_checks.enabled();
        assert!(
            self.graphics.is_none() || !entity.is_renderable(),
            "renderable entity {} added after the graphics layout was built",
            entity.id()
        );
        if checks {
            assert!(
                self.graph.find_entity(entity.id()).is_none(),
                "entity {} is already in the scene",
                entity.id()
            );
        }

        let parent_node = match (hint, parent) {
            (Some(node), parent) => {
                if checks {
                    let found = self.graph.entity(node).map(Entity::id);
                    assert!(
                        found.is_some() && (parent.is_none() || found == parent),
                        "parent hint {node:?} does not refer to entity {parent:?}"
                    );
                }
                node
            }
            (None, Some(parent)) => match self.graph.find_entity(parent) {
                Some(node) => node,
                None => panic!("parent entity {parent} is not in the scene"),
            },
            (None, None) => self.graph.root(),
        };

        self.next_entity_id = self.next_entity_id.max(entity.id().0.saturating_add(1));
        log::debug!("Adding entity {} '{}'", entity.id(), entity.name);
        self.graph.insert(parent_node, entity)
    }

    /// Remove an entity
    ///
    /// With `reparent` its children move to its parent, appended in order;
    /// otherwise the whole subtree goes. Renderables leaving the scene are
    /// removed from their render storages. Returns the removed entities, the
    /// named one first.
    ///
    /// # Panics
    /// If the entity is the root or not in the scene, or if `hint` is stale.
    pub fn remove_entity(&mut self, id: EntityId, reparent: bool, hint: Option<NodeId>) -> Vec<Entity> {
        let node = match hint {
            Some(node) => {
                if self.config.debug_checks.enabled() {
                    assert_eq!(
                        self.graph.entity(node).map(Entity::id),
                        Some(id),
                        "node hint {node:?} does not refer to entity {id}"
                    );
                }
                node
            }
            None => match self.graph.find_entity(id) {
                Some(node) => node,
                None => panic!("entity {id} is not in the scene"),
            },
        };

        let mut removed = if reparent {
            vec![self.graph.remove_reparent(node)]
        } else {
            self.graph.remove_subtree(node)
        };
        for entity in &mut removed {
            self.unregister(entity);
        }
        log::debug!("Removed {} entities starting at {}", removed.len(), id);
        removed
    }

    fn unregister(&mut self, entity: &mut Entity) {
        let Some(graphics) = entity.graphics.as_mut() else {
            return;
        };
        let (Some(index), Some(handle)) = (graphics.renderer.index(), graphics.instance.take()) else {
            return;
        };
        self.storages[index].remove_instance(handle);
    }

    /// Node of an entity, by hierarchy search
    pub fn find_entity_node(&self, id: EntityId) -> Option<NodeId> {
        self.graph.find_entity(id)
    }

    /// Entity by id
    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.graph.find_entity(id).and_then(|node| self.graph.entity(node))
    }

    /// Mutable entity by id
    pub fn entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        let node = self.graph.find_entity(id)?;
        self.graph.entity_mut(node)
    }

    /// Camera by index; camera 0 is the primary camera
    pub fn camera(&self, index: usize) -> Option<&Camera> {
        self.cameras.get(index)
    }

    /// Mutable camera by index
    pub fn camera_mut(&mut self, index: usize) -> Option<&mut Camera> {
        self.cameras.get_mut(index)
    }

    /// Replace a camera
    ///
    /// # Panics
    /// If `index` is not below the configured camera count.
    pub fn set_camera(&mut self, index: usize, camera: Camera) {
        self.cameras[index] = camera;
    }

    /// All cameras
    pub fn cameras(&self) -> &[Camera] {
        &self.cameras
    }

    /// Material registry
    pub fn materials(&self) -> &MaterialRegistry {
        &self.materials
    }

    /// Mutable material registry
    pub fn materials_mut(&mut self) -> &mut MaterialRegistry {
        &mut self.materials
    }

    /// Shared parameter registry
    pub fn parameters(&self) -> &ParameterRegistry {
        &self.parameters
    }

    /// Mutable shared parameter registry
    pub fn parameters_mut(&mut self) -> &mut ParameterRegistry {
        &mut self.parameters
    }

    /// Register every renderable and lay out the per-frame buffers
    ///
    /// Capacities are the per-type instance counts at this point. Calling it
    /// again returns the existing layout.
    pub fn build_graphics(&mut self, loader: &mut dyn MeshLoader) -> SceneResult<&SceneGraphicsInfo> {
        if self.graphics.is_none() {
            self.register_renderables(loader)?;

            let mut capacities = [0u32; RendererType::COUNT];
            for (capacity, storage) in capacities.iter_mut().zip(&mut self.storages) {
                storage.refresh();
                *capacity = u32::try_from(storage.instance_count())
                    .map_err(|_| RenderError::LayoutOverflow { context: "instance count" })?;
            }

            let info = SceneGraphicsInfo::build(capacities, &self.config)?;
            self.staging = FrameStaging::for_layout(&info);
            log::info!(
                "Scene graphics built: {} instances in {} batches",
                capacities.iter().sum::<u32>(),
                self.storages.iter().map(RenderStorage::batch_count).sum::<usize>()
            );
            self.graphics = Some(info);
        }
        self.graphics.as_ref().ok_or(SceneError::LayoutNotBuilt)
    }

    fn register_renderables(&mut self, loader: &mut dyn MeshLoader) -> SceneResult<()> {
        for node in self.graph.depth_first() {
            let Some(entity) = self.graph.entity_mut(node) else {
                continue;
            };
            let owner = entity.id();
            let Some(graphics) = entity.graphics.as_mut() else {
                continue;
            };
            let Some(index) = graphics.renderer.index() else {
                continue;
            };
            if graphics.instance.is_some() {
                continue;
            }

            if let Some(shared) = &graphics.shared_parameters {
                if !self.parameters.contains(shared) {
                    return Err(SceneError::UnknownParameterSet(shared.clone()));
                }
            }
            if let Some(material) = graphics.material {
                if self.materials.element(material).is_none() {
                    return Err(SceneError::UnknownMaterial(format!("handle {}", material.0)));
                }
            }

            let handle = self.storages[index].add_mesh(graphics, owner, loader)?;
            graphics.instance = Some(handle);
        }
        Ok(())
    }

    /// Allocate the three per-frame buffers and commit the element buffers
    pub fn allocate_gpu_buffers(&mut self, allocator: &mut dyn GpuAllocator) -> SceneResult<SceneGpuBuffers> {
        let info = self.graphics.as_ref().ok_or(SceneError::LayoutNotBuilt)?;
        if let Some(gpu) = self.gpu {
            return Ok(gpu);
        }

        let mut handles = Vec::with_capacity(BufferKind::ALL.len());
        for kind in BufferKind::ALL {
            match allocator.allocate(info.buffer_size(kind), BufferUsage::STORAGE, AccessPattern::HostVisible) {
                Ok(handle) => handles.push(handle),
                Err(error) => {
                    for handle in handles {
                        allocator.free(handle);
                    }
                    return Err(error.into());
                }
            }
        }
        let gpu = SceneGpuBuffers {
            transform: handles[0],
            parameter: handles[1],
            material: handles[2],
        };
        log::info!(
            "Allocated scene buffers: transform {} B, parameter {} B, material {} B",
            info.buffer_size(BufferKind::Transform),
            info.buffer_size(BufferKind::Parameter),
            info.buffer_size(BufferKind::Material)
        );

        let frame_replicas = info.num_frame_indices();
        self.gpu = Some(gpu);
        for storage in &mut self.storages {
            storage.element_buffer_mut().commit(allocator, frame_replicas)?;
        }
        Ok(gpu)
    }

    /// Free the per-frame buffers and element buffers
    pub fn release_gpu_buffers(&mut self, allocator: &mut dyn GpuAllocator) {
        if let Some(gpu) = self.gpu.take() {
            for kind in BufferKind::ALL {
                allocator.free(gpu.buffer(kind));
            }
        }
        for storage in &mut self.storages {
            storage.element_buffer_mut().release(allocator);
        }
    }

    /// Change the number of frame slots
    ///
    /// Allocated buffers are reallocated for the new count; binding sets
    /// created for the old buffers must be recreated.
    ///
    /// # Panics
    /// If `frame_indices` is below two.
    pub fn set_num_frame_indices(&mut self, frame_indices: u32, allocator: &mut dyn GpuAllocator) -> SceneResult<()> {
        let info = self.graphics.as_mut().ok_or(SceneError::LayoutNotBuilt)?;
        info.set_num_frame_indices(frame_indices)?;
        if self.gpu.is_some() {
            self.release_gpu_buffers(allocator);
            self.allocate_gpu_buffers(allocator)?;
        }
        Ok(())
    }

    /// Create a binding set with the three buffers at bindings 0, 1 and 2
    ///
    /// Each binding covers one frame slice; draws select the slice with
    /// dynamic offsets.
    pub fn create_bindings(&self, bindings: &mut dyn BindingBackend) -> SceneResult<BindingSetHandle> {
        let info = self.graphics.as_ref().ok_or(SceneError::LayoutNotBuilt)?;
        let gpu = self.gpu.ok_or(SceneError::GpuBuffersNotAllocated)?;

        let layout = BufferKind::ALL
            .iter()
            .fold(BindingLayout::new(), |layout, kind| layout.with_dynamic_storage_buffer(kind.binding()));
        let set = bindings.create_binding_set(&layout)?;
        for kind in BufferKind::ALL {
            let size = info.layout(kind).total_size();
            if size == 0 {
                continue;
            }
            bindings.bind_buffer(set, kind.binding(), BufferRange { buffer: gpu.buffer(kind), offset: 0, size })?;
        }
        Ok(set)
    }

    /// Clear, traverse, write and sort one frame into the staging regions
    pub fn prepare_frame(&mut self, elapsed: f32) -> SceneResult<FrameStats> {
        let Self {
            graph,
            storages,
            materials,
            parameters,
            cameras,
            graphics,
            staging,
            draw_lists,
            write_counts,
            prepared,
            ..
        } = self;
        *prepared = false;
        let layout = graphics.as_ref().ok_or(SceneError::LayoutNotBuilt)?;

        for storage in storages.iter_mut() {
            storage.refresh();
        }
        staging.clear();
        for (list, storage) in draw_lists.iter_mut().zip(storages.iter()) {
            list.clear(storage.batch_count());
        }
        *write_counts = [0; RendererType::COUNT];

        let view_projections: Vec<Mat4> = cameras
            .iter()
            .take(layout.camera_count() as usize)
            .map(Camera::view_projection)
            .collect();
        let primary_camera = &cameras[0];
        let primary_view_projection = view_projections[0];

        let mut writer = FrameWriter {
            storages: storages.as_slice(),
            layout,
            staging,
            draw_lists: draw_lists.as_mut_slice(),
            write_counts: &mut *write_counts,
            view_projections: &view_projections,
            primary_camera,
            materials,
            parameters,
        };
        graph.walk_mut(Mat4::identity(), |entity, parent_world| {
            let context = UpdateContext {
                elapsed,
                view_projection: &primary_view_projection,
                parent_world,
            };
            let world = *entity.update(&context);
            writer.write(entity)?;
            Ok::<_, SceneError>(world)
        })?;

        for list in draw_lists.iter_mut() {
            list.sort();
        }
        *prepared = true;

        Ok(FrameStats {
            instances_written: write_counts.iter().sum(),
            draw_commands: draw_lists.iter().map(DrawList::len).sum(),
        })
    }

    /// Copy the staging regions into the frame slot of `frame_number`
    ///
    /// Returns the slot written. Only a frame whose [`Scene::prepare_frame`]
    /// succeeded can be flushed; after a failed or missing prepare the GPU
    /// buffers are left untouched.
    pub fn flush(&self, frame_number: u64, allocator: &mut dyn GpuAllocator) -> SceneResult<u32> {
        let info = self.graphics.as_ref().ok_or(SceneError::LayoutNotBuilt)?;
        let gpu = self.gpu.ok_or(SceneError::GpuBuffersNotAllocated)?;
        if !self.prepared {
            return Err(SceneError::FrameNotPrepared);
        }
        let slot = info.frame_slot(frame_number);

        for (camera, region) in (0u32..).zip(&self.staging.transforms) {
            if !region.is_empty() {
                let offset = info.slice_offset(BufferKind::Transform, slot, camera);
                allocator.write(gpu.transform, offset, region.as_bytes())?;
            }
        }
        for (kind, region) in [
            (BufferKind::Parameter, &self.staging.parameters),
            (BufferKind::Material, &self.staging.materials),
        ] {
            if !region.is_empty() {
                allocator.write(gpu.buffer(kind), info.slice_offset(kind, slot, 0), region.as_bytes())?;
            }
        }

        for storage in &self.storages {
            let buffer = storage.element_buffer();
            if buffer.mode() == ElementBufferMode::Dynamic && buffer.gpu_buffers().is_some() {
                buffer.upload_dynamic(allocator, slot)?;
            }
        }
        Ok(slot)
    }

    /// Prepare a frame and flush it into its frame slot
    pub fn render_frame(
        &mut self,
        frame_number: u64,
        elapsed: f32,
        allocator: &mut dyn GpuAllocator,
    ) -> SceneResult<FrameStats> {
        let stats = self.prepare_frame(elapsed)?;
        let slot = self.flush(frame_number, allocator)?;
        log::debug!(
            "Frame {} (slot {}): {} instances, {} draw commands",
            frame_number,
            slot,
            stats.instances_written,
            stats.draw_commands
        );
        Ok(stats)
    }

    /// Layout of the per-frame buffers, once built
    pub fn graphics_info(&self) -> Option<&SceneGraphicsInfo> {
        self.graphics.as_ref()
    }

    /// Per-frame buffers, once allocated
    pub fn gpu_buffers(&self) -> Option<SceneGpuBuffers> {
        self.gpu
    }

    /// Staging regions of the last prepared frame
    pub fn staging(&self) -> &FrameStaging {
        &self.staging
    }

    /// Render storage of a renderer type
    pub fn storage(&self, renderer: RendererType) -> Option<&RenderStorage> {
        renderer.index().map(|index| &self.storages[index])
    }

    /// Mutable render storage, e.g. for dynamic vertex writes
    pub fn storage_mut(&mut self, renderer: RendererType) -> Option<&mut RenderStorage> {
        renderer.index().map(|index| &mut self.storages[index])
    }

    /// Sorted draw list of the last prepared frame
    pub fn draw_list(&self, renderer: RendererType) -> Option<&DrawList> {
        renderer.index().map(|index| &self.draw_lists[index])
    }

    /// Instances of a renderer type written in the last prepared frame
    pub fn write_count(&self, renderer: RendererType) -> u32 {
        renderer.index().map_or(0, |index| self.write_counts[index])
    }
}
