//! Draw recording into a Vulkan command buffer

use ash::{vk, Device};
use crate::foundation::collections::BindingSetHandle;
use crate::render::backends::vulkan::allocator::VulkanResources;
use crate::render::gpu::DrawRecorder;
use crate::render::{DrawElementsCommand, RenderError, RenderResult};

/// Records scene draws into a command buffer inside an active render pass
///
/// The pipeline layout must expose the scene's binding set at `set_index`
/// and 12 bytes of push constants at offset 0 for the element offsets.
pub struct VulkanDrawRecorder<'a> {
    device: &'a Device,
    resources: &'a VulkanResources,
    command_buffer: vk::CommandBuffer,
    pipeline_layout: vk::PipelineLayout,
    set_index: u32,
    push_stages: vk::ShaderStageFlags,
}

impl<'a> VulkanDrawRecorder<'a> {
    /// Create a recorder for a command buffer in the recording state
    pub fn new(
        device: &'a Device,
        resources: &'a VulkanResources,
        command_buffer: vk::CommandBuffer,
        pipeline_layout: vk::PipelineLayout,
    ) -> Self {
        Self {
            device,
            resources,
            command_buffer,
            pipeline_layout,
            set_index: 0,
            push_stages: vk::ShaderStageFlags::VERTEX | vk::ShaderStageFlags::FRAGMENT,
        }
    }

    /// Bind the scene set at a different set index
    pub fn with_set_index(mut self, set_index: u32) -> Self {
        self.set_index = set_index;
        self
    }
}

impl DrawRecorder for VulkanDrawRecorder<'_> {
    fn bind_dynamic_offsets(&mut self, set: BindingSetHandle, offsets: &[u32]) -> RenderResult<()> {
        let descriptor_set = self
            .resources
            .descriptor_set(set)
            .ok_or(RenderError::UnknownBindingSet)?;
        unsafe {
            self.device.cmd_bind_descriptor_sets(
                self.command_buffer,
                vk::PipelineBindPoint::GRAPHICS,
                self.pipeline_layout,
                self.set_index,
                &[descriptor_set],
                offsets,
            );
        }
        Ok(())
    }

    fn push_element_offsets(&mut self, offsets: [u32; 3]) {
        unsafe {
            self.device.cmd_push_constants(
                self.command_buffer,
                self.pipeline_layout,
                self.push_stages,
                0,
                bytemuck::cast_slice(&offsets),
            );
        }
    }

    fn draw_indexed(&mut self, command: &DrawElementsCommand) {
        unsafe {
            self.device.cmd_draw_indexed(
                self.command_buffer,
                command.count,
                command.instance_count,
                command.first_index,
                command.base_vertex,
                command.first_instance,
            );
        }
    }
}
