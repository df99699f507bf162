//! GPU allocator and binding backend on top of a Vulkan device

use ash::{vk, Device, Instance};
use crate::foundation::collections::{BindingSetHandle, GpuBufferHandle, SlotMap};
use crate::render::backends::vulkan::buffer::{usage_flags, VulkanBuffer};
use crate::render::backends::vulkan::descriptor_set::{write_buffer, DescriptorPool, DescriptorSetLayoutBuilder};
use crate::render::gpu::{
    AccessPattern, BindingBackend, BindingLayout, BufferRange, BufferUsage, GpuAllocator,
};
use crate::render::{RenderError, RenderResult};

#[derive(Debug)]
struct VulkanBindingSet {
    set: vk::DescriptorSet,
    layout: BindingLayout,
}

/// Buffers, descriptor set layouts and sets owned on behalf of scenes
///
/// Implements both [`GpuAllocator`] and [`BindingBackend`]; everything it
/// created is destroyed on drop. The device must outlive this value.
pub struct VulkanResources {
    device: Device,
    memory_properties: vk::PhysicalDeviceMemoryProperties,
    stage_flags: vk::ShaderStageFlags,
    pool: Option<DescriptorPool>,
    set_layouts: Vec<vk::DescriptorSetLayout>,
    buffers: SlotMap<GpuBufferHandle, VulkanBuffer>,
    sets: SlotMap<BindingSetHandle, VulkanBindingSet>,
}

impl VulkanResources {
    /// Create resources for a logical device
    ///
    /// `max_sets` bounds the number of binding sets that can be created.
    pub fn new(
        instance: &Instance,
        physical_device: vk::PhysicalDevice,
        device: Device,
        max_sets: u32,
    ) -> RenderResult<Self> {
        let memory_properties = unsafe { instance.get_physical_device_memory_properties(physical_device) };
        let pool = DescriptorPool::new(&device, max_sets)?;
        log::debug!("Created Vulkan scene resources with room for {} binding sets", max_sets);

        Ok(Self {
            device,
            memory_properties,
            stage_flags: vk::ShaderStageFlags::VERTEX | vk::ShaderStageFlags::FRAGMENT,
            pool: Some(pool),
            set_layouts: Vec::new(),
            buffers: SlotMap::with_key(),
            sets: SlotMap::with_key(),
        })
    }

    /// Vulkan buffer behind a handle
    pub fn buffer(&self, handle: GpuBufferHandle) -> Option<vk::Buffer> {
        self.buffers.get(handle).map(VulkanBuffer::handle)
    }

    /// Descriptor set behind a handle
    pub fn descriptor_set(&self, handle: BindingSetHandle) -> Option<vk::DescriptorSet> {
        self.sets.get(handle).map(|set| set.set)
    }

    /// Descriptor set layouts created so far, in creation order
    pub fn set_layouts(&self) -> &[vk::DescriptorSetLayout] {
        &self.set_layouts
    }
}

impl GpuAllocator for VulkanResources {
    fn allocate(
        &mut self,
        size: u64,
        usage: BufferUsage,
        access: AccessPattern,
    ) -> RenderResult<GpuBufferHandle> {
        let buffer = VulkanBuffer::new(&self.device, &self.memory_properties, size, usage_flags(usage), access)?;
        log::debug!("Allocated Vulkan buffer of {} bytes ({:?}, {:?})", size, usage, access);
        Ok(self.buffers.insert(buffer))
    }

    fn map_for_write(
        &mut self,
        handle: GpuBufferHandle,
        offset: u64,
        len: u64,
    ) -> RenderResult<&mut [u8]> {
        let buffer = self.buffers.get_mut(handle).ok_or(RenderError::UnknownBuffer)?;
        if buffer.mapped {
            return Err(RenderError::AlreadyMapped);
        }
        let size = buffer.size();
        if offset.checked_add(len).map_or(true, |end| end > size) {
            return Err(RenderError::MapOutOfRange { offset, len, size });
        }
        if len == 0 {
            return Ok(&mut []);
        }
        let ptr = unsafe {
            self.device
                .map_memory(buffer.memory(), offset, len, vk::MemoryMapFlags::empty())?
        };
        buffer.mapped = true;
        // The mapping stays valid until `unmap`, which needs `&mut self`.
        Ok(unsafe { std::slice::from_raw_parts_mut(ptr.cast::<u8>(), len as usize) })
    }

    fn unmap(&mut self, handle: GpuBufferHandle) {
        if let Some(buffer) = self.buffers.get_mut(handle) {
            if buffer.mapped {
                unsafe { self.device.unmap_memory(buffer.memory()) };
                buffer.mapped = false;
            }
        }
    }

    fn free(&mut self, handle: GpuBufferHandle) {
        match self.buffers.remove(handle) {
            Some(buffer) => buffer.destroy(&self.device),
            None => log::warn!("Freeing unknown Vulkan buffer {:?}", handle),
        }
    }

    fn buffer_size(&self, handle: GpuBufferHandle) -> Option<u64> {
        self.buffers.get(handle).map(VulkanBuffer::size)
    }
}

impl BindingBackend for VulkanResources {
    fn create_binding_set(&mut self, layout: &BindingLayout) -> RenderResult<BindingSetHandle> {
        let pool = self.pool.as_ref().ok_or(RenderError::UnknownBindingSet)?;
        let set_layout = DescriptorSetLayoutBuilder::from_layout(layout, self.stage_flags).build(&self.device)?;
        self.set_layouts.push(set_layout);

        let set = pool
            .allocate(&self.device, &[set_layout])?
            .into_iter()
            .next()
            .ok_or(RenderError::Vulkan(vk::Result::ERROR_OUT_OF_POOL_MEMORY))?;
        Ok(self.sets.insert(VulkanBindingSet { set, layout: layout.clone() }))
    }

    fn bind_buffer(
        &mut self,
        set: BindingSetHandle,
        binding: u32,
        range: BufferRange,
    ) -> RenderResult<()> {
        let target = self.sets.get(set).ok_or(RenderError::UnknownBindingSet)?;
        let entry = target
            .layout
            .entries
            .iter()
            .find(|entry| entry.binding == binding)
            .ok_or(RenderError::UnknownBindingSet)?;
        let buffer = self.buffer(range.buffer).ok_or(RenderError::UnknownBuffer)?;

        write_buffer(&self.device, target.set, binding, entry.kind, buffer, range.offset, range.size);
        Ok(())
    }
}

impl Drop for VulkanResources {
    fn drop(&mut self) {
        for (_, buffer) in self.buffers.drain() {
            buffer.destroy(&self.device);
        }
        if let Some(pool) = self.pool.take() {
            pool.destroy(&self.device);
        }
        for layout in self.set_layouts.drain(..) {
            unsafe { self.device.destroy_descriptor_set_layout(layout, None) };
        }
    }
}
