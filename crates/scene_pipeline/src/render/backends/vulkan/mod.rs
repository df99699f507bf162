//! Vulkan implementations of the GPU collaborator interfaces
//!
//! Instance, device and pipeline creation stay with the application; these
//! types only need a logical device to allocate buffers, build dynamic-offset
//! descriptor sets and record draws.

/// Buffer creation and memory type selection
pub mod buffer;

/// Descriptor set layouts and pools
pub mod descriptor_set;

/// `GpuAllocator` and `BindingBackend` over a device
pub mod allocator;

/// `DrawRecorder` over a command buffer
pub mod commands;

pub use allocator::VulkanResources;
pub use buffer::{find_memory_type, VulkanBuffer};
pub use commands::VulkanDrawRecorder;
pub use descriptor_set::{DescriptorPool, DescriptorSetLayoutBuilder};
