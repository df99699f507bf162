//! Recording a renderer type's draw list into a command stream

use crate::foundation::collections::BindingSetHandle;
use crate::render::{BufferKind, DrawRecorder, RendererType};
use crate::scene::error::{SceneError, SceneResult};
use crate::scene::scene_manager::Scene;

/// Record the draws of one renderer type for a frame and camera
///
/// Binds `set` with the dynamic offsets of the frame slot (and camera
/// slice), pushes the type's element offsets, then records every command of
/// the last prepared draw list that has instances. Returns the number of
/// draws recorded.
pub fn record_draws(
    scene: &Scene,
    renderer: RendererType,
    frame_number: u64,
    camera: u32,
    set: BindingSetHandle,
    recorder: &mut dyn DrawRecorder,
) -> SceneResult<usize> {
    let info = scene.graphics_info().ok_or(SceneError::LayoutNotBuilt)?;
    let Some(list) = scene.draw_list(renderer) else {
        return Ok(0);
    };

    let slot = info.frame_slot(frame_number);
    let offsets = BufferKind::ALL.map(|kind| info.dynamic_offset(renderer, kind, slot, camera).unwrap_or(0));
    recorder.bind_dynamic_offsets(set, &offsets)?;
    recorder.push_element_offsets(info.offsets(renderer).as_push_constants());

    let mut recorded = 0;
    for command in list.commands().iter().filter(|command| command.instance_count > 0) {
        recorder.draw_indexed(command);
        recorded += 1;
    }
    Ok(recorded)
}
