//! Write step of the frame pipeline: one renderable into the staging regions

use crate::foundation::math::{matrix_bytes, translation_of, Mat4, MAT4_SIZE};
use crate::render::{
    FrameStaging, GraphicsComponent, MaterialElement, MaterialRegistry, ParameterRegistry,
    RenderError, RenderStorage, RendererType, SceneGraphicsInfo,
};
use crate::scene::camera::Camera;
use crate::scene::draw_list::DrawList;
use crate::scene::entity::Entity;
use crate::scene::error::{SceneError, SceneResult};

/// Borrowed view of everything the write step touches
pub(crate) struct FrameWriter<'a> {
    pub storages: &'a [RenderStorage],
    pub layout: &'a SceneGraphicsInfo,
    pub staging: &'a mut FrameStaging,
    pub draw_lists: &'a mut [DrawList],
    pub write_counts: &'a mut [u32; RendererType::COUNT],
    pub view_projections: &'a [Mat4],
    pub primary_camera: &'a Camera,
    pub materials: &'a MaterialRegistry,
    pub parameters: &'a ParameterRegistry,
}

impl FrameWriter<'_> {
    /// Write an entity whose world matrix is current; non-renderables are skipped
    pub fn write(&mut self, entity: &Entity) -> SceneResult<()> {
        let Some(graphics) = entity.graphics.as_ref() else {
            return Ok(());
        };
        let Some(index) = graphics.renderer.index() else {
            return Ok(());
        };
        let unregistered = || SceneError::UnregisteredRenderable(entity.id());
        let handle = graphics.instance().ok_or_else(unregistered)?;
        let storages = self.storages;
        let storage = &storages[index];
        let slot = storage.instance_slot(handle).ok_or_else(unregistered)?;
        let batch = storage.batch_of(handle).ok_or_else(unregistered)?;

        let renderer = graphics.renderer;
        let capacity = self.layout.capacity(renderer);
        if slot >= capacity {
            return Err(SceneError::CapacityExceeded { renderer, slot, capacity });
        }

        let type_info = renderer.info();
        let offsets = self.layout.offsets(renderer);
        let world = entity.world_matrix();

        if let Some(base) = offsets.transform {
            let element = u64::from(base) + u64::from(slot);
            for (region, view_projection) in self.staging.transforms.iter_mut().zip(self.view_projections) {
                let mvp = view_projection * world;
                region.write_element_bytes(element, type_info.transform_size, matrix_bytes(&mvp))?;
            }
        }

        if let Some(base) = offsets.parameter {
            self.write_parameters(graphics, world, u64::from(base) + u64::from(slot))?;
        }

        if let Some(base) = offsets.material {
            let element = match graphics.material {
                Some(material) => self
                    .materials
                    .element(material)
                    .ok_or_else(|| SceneError::UnknownMaterial(format!("handle {}", material.0)))?,
                None => MaterialElement::default(),
            };
            self.staging
                .materials
                .write_element(u64::from(base) + u64::from(slot), type_info.material_size, &element)?;
        }

        let distance = self.primary_camera.distance_to(translation_of(world));
        self.draw_lists[index].push_instance(batch, &storage.batches()[batch], distance);
        self.write_counts[index] += 1;
        Ok(())
    }

    /// World matrix first for types that embed it, then the instance block
    /// (or the shared block); the rest of the element stays zero
    fn write_parameters(&mut self, graphics: &GraphicsComponent, world: &Mat4, element: u64) -> SceneResult<()> {
        let type_info = graphics.renderer.info();
        let stride = type_info.parameter_size;
        let start = element
            .checked_mul(u64::from(stride))
            .ok_or(RenderError::LayoutOverflow { context: "parameter element offset" })?;

        let mut cursor = 0;
        if type_info.embeds_world_matrix {
            self.staging.parameters.write_bytes(start, matrix_bytes(world))?;
            cursor = MAT4_SIZE;
        }

        let block = match (&graphics.instance_parameters, &graphics.shared_parameters) {
            (Some(block), _) => Some(block),
            (None, Some(id)) => Some(
                self.parameters
                    .get(id)
                    .ok_or_else(|| SceneError::UnknownParameterSet(id.clone()))?,
            ),
            (None, None) => None,
        };

        if let Some(block) = block {
            let available = stride as usize - cursor;
            if block.len() > available {
                return Err(RenderError::ParameterBlockTooLarge {
                    renderer: graphics.renderer,
                    len: block.len(),
                    available,
                }
                .into());
            }
            self.staging.parameters.write_bytes(start + cursor as u64, block.as_bytes())?;
        }
        Ok(())
    }
}
