//! Vulkan buffers backed by their own device memory allocation

use ash::{vk, Device};
use crate::render::gpu::{AccessPattern, BufferUsage};
use crate::render::{RenderError, RenderResult};

/// Buffer and the memory bound to it
///
/// Destruction is explicit through [`VulkanBuffer::destroy`]; the owning
/// allocator holds the device.
#[derive(Debug)]
pub struct VulkanBuffer {
    buffer: vk::Buffer,
    memory: vk::DeviceMemory,
    size: vk::DeviceSize,
    pub(super) mapped: bool,
}

impl VulkanBuffer {
    /// Create a buffer and bind freshly allocated memory to it
    pub fn new(
        device: &Device,
        memory_properties: &vk::PhysicalDeviceMemoryProperties,
        size: vk::DeviceSize,
        usage: vk::BufferUsageFlags,
        access: AccessPattern,
    ) -> RenderResult<Self> {
        let buffer_info = vk::BufferCreateInfo::builder()
            .size(size.max(1))
            .usage(usage)
            .sharing_mode(vk::SharingMode::EXCLUSIVE);

        let buffer = unsafe { device.create_buffer(&buffer_info, None)? };
        let requirements = unsafe { device.get_buffer_memory_requirements(buffer) };

        let memory_type_index = match memory_type_for_access(memory_properties, requirements.memory_type_bits, access) {
            Ok(index) => index,
            Err(error) => {
                unsafe { device.destroy_buffer(buffer, None) };
                return Err(error);
            }
        };

        let alloc_info = vk::MemoryAllocateInfo::builder()
            .allocation_size(requirements.size)
            .memory_type_index(memory_type_index);

        let memory = match unsafe { device.allocate_memory(&alloc_info, None) } {
            Ok(memory) => memory,
            Err(result) => {
                unsafe { device.destroy_buffer(buffer, None) };
                return Err(RenderError::AllocationFailed {
                    size,
                    reason: format!("{result:?}"),
                });
            }
        };

        if let Err(result) = unsafe { device.bind_buffer_memory(buffer, memory, 0) } {
            unsafe {
                device.destroy_buffer(buffer, None);
                device.free_memory(memory, None);
            }
            return Err(result.into());
        }

        Ok(Self { buffer, memory, size, mapped: false })
    }

    /// Buffer handle
    pub fn handle(&self) -> vk::Buffer {
        self.buffer
    }

    /// Memory handle
    pub fn memory(&self) -> vk::DeviceMemory {
        self.memory
    }

    /// Size requested at creation
    pub fn size(&self) -> vk::DeviceSize {
        self.size
    }

    /// Destroy the buffer and free its memory
    pub fn destroy(self, device: &Device) {
        unsafe {
            if self.mapped {
                device.unmap_memory(self.memory);
            }
            device.destroy_buffer(self.buffer, None);
            device.free_memory(self.memory, None);
        }
    }
}

/// Vulkan usage flags for a buffer usage
pub fn usage_flags(usage: BufferUsage) -> vk::BufferUsageFlags {
    let mut flags = vk::BufferUsageFlags::empty();
    if usage.contains(BufferUsage::VERTEX) {
        flags |= vk::BufferUsageFlags::VERTEX_BUFFER;
    }
    if usage.contains(BufferUsage::INDEX) {
        flags |= vk::BufferUsageFlags::INDEX_BUFFER;
    }
    if usage.contains(BufferUsage::UNIFORM) {
        flags |= vk::BufferUsageFlags::UNIFORM_BUFFER;
    }
    if usage.contains(BufferUsage::STORAGE) {
        flags |= vk::BufferUsageFlags::STORAGE_BUFFER;
    }
    if usage.contains(BufferUsage::INDIRECT) {
        flags |= vk::BufferUsageFlags::INDIRECT_BUFFER;
    }
    flags
}

/// Pick a memory type for an access pattern
///
/// Every buffer is written through a host mapping. Device-local buffers
/// prefer memory that is both device local and host visible and fall back to
/// plain host-visible memory.
pub fn memory_type_for_access(
    memory_properties: &vk::PhysicalDeviceMemoryProperties,
    type_filter: u32,
    access: AccessPattern,
) -> RenderResult<u32> {
    let host = vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT;
    match access {
        AccessPattern::DeviceLocal => {
            find_memory_type(memory_properties, type_filter, host | vk::MemoryPropertyFlags::DEVICE_LOCAL)
                .or_else(|_| find_memory_type(memory_properties, type_filter, host))
        }
        AccessPattern::HostVisible => find_memory_type(memory_properties, type_filter, host),
    }
}

/// First memory type allowed by `type_filter` that has all `properties`
pub fn find_memory_type(
    memory_properties: &vk::PhysicalDeviceMemoryProperties,
    type_filter: u32,
    properties: vk::MemoryPropertyFlags,
) -> RenderResult<u32> {
    (0..memory_properties.memory_type_count)
        .find(|index| {
            type_filter & (1 << index) != 0
                && memory_properties.memory_types[*index as usize]
                    .property_flags
                    .contains(properties)
        })
        .ok_or(RenderError::NoSuitableMemoryType)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn properties(types: &[vk::MemoryPropertyFlags]) -> vk::PhysicalDeviceMemoryProperties {
        let mut memory_properties = vk::PhysicalDeviceMemoryProperties::default();
        memory_properties.memory_type_count = types.len() as u32;
        for (slot, flags) in types.iter().enumerate() {
            memory_properties.memory_types[slot] = vk::MemoryType {
                property_flags: *flags,
                heap_index: 0,
            };
        }
        memory_properties
    }

    #[test]
    fn test_find_memory_type_respects_filter() {
        let host = vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT;
        let memory = properties(&[vk::MemoryPropertyFlags::DEVICE_LOCAL, host, host]);

        assert_eq!(find_memory_type(&memory, 0b111, host).unwrap(), 1);
        assert_eq!(find_memory_type(&memory, 0b100, host).unwrap(), 2);
        assert!(matches!(
            find_memory_type(&memory, 0b001, host),
            Err(RenderError::NoSuitableMemoryType)
        ));
    }

    #[test]
    fn test_device_local_prefers_shared_memory() {
        let host = vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT;
        let shared = host | vk::MemoryPropertyFlags::DEVICE_LOCAL;

        let with_shared = properties(&[host, shared]);
        assert_eq!(memory_type_for_access(&with_shared, 0b11, AccessPattern::DeviceLocal).unwrap(), 1);
        assert_eq!(memory_type_for_access(&with_shared, 0b11, AccessPattern::HostVisible).unwrap(), 0);

        let host_only = properties(&[vk::MemoryPropertyFlags::DEVICE_LOCAL, host]);
        assert_eq!(memory_type_for_access(&host_only, 0b11, AccessPattern::DeviceLocal).unwrap(), 1);
    }

    #[test]
    fn test_usage_flags() {
        let flags = usage_flags(BufferUsage::STORAGE | BufferUsage::INDIRECT);
        assert_eq!(flags, vk::BufferUsageFlags::STORAGE_BUFFER | vk::BufferUsageFlags::INDIRECT_BUFFER);
    }
}
