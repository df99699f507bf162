//! Descriptor set layouts and pools for dynamic-offset buffer bindings

use ash::{vk, Device};
use crate::render::gpu::{BindingKind, BindingLayout};
use crate::render::RenderResult;

/// Builder for descriptor set layouts
#[derive(Debug, Default)]
pub struct DescriptorSetLayoutBuilder {
    bindings: Vec<vk::DescriptorSetLayoutBinding>,
}

impl DescriptorSetLayoutBuilder {
    /// Create an empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder holding every slot of a binding layout
    pub fn from_layout(layout: &BindingLayout, stage_flags: vk::ShaderStageFlags) -> Self {
        layout.entries.iter().fold(Self::new(), |builder, entry| match entry.kind {
            BindingKind::DynamicStorageBuffer => builder.add_dynamic_storage_buffer(entry.binding, stage_flags),
            BindingKind::DynamicUniformBuffer => builder.add_dynamic_uniform_buffer(entry.binding, stage_flags),
        })
    }

    /// Add a storage buffer binding selected with a dynamic offset
    pub fn add_dynamic_storage_buffer(self, binding: u32, stage_flags: vk::ShaderStageFlags) -> Self {
        self.add(binding, vk::DescriptorType::STORAGE_BUFFER_DYNAMIC, stage_flags)
    }

    /// Add a uniform buffer binding selected with a dynamic offset
    pub fn add_dynamic_uniform_buffer(self, binding: u32, stage_flags: vk::ShaderStageFlags) -> Self {
        self.add(binding, vk::DescriptorType::UNIFORM_BUFFER_DYNAMIC, stage_flags)
    }

    fn add(mut self, binding: u32, descriptor_type: vk::DescriptorType, stage_flags: vk::ShaderStageFlags) -> Self {
        self.bindings.push(
            vk::DescriptorSetLayoutBinding::builder()
                .binding(binding)
                .descriptor_type(descriptor_type)
                .descriptor_count(1)
                .stage_flags(stage_flags)
                .build(),
        );
        self
    }

    /// Create the layout
    pub fn build(&self, device: &Device) -> RenderResult<vk::DescriptorSetLayout> {
        let layout_info = vk::DescriptorSetLayoutCreateInfo::builder().bindings(&self.bindings);
        Ok(unsafe { device.create_descriptor_set_layout(&layout_info, None)? })
    }
}

/// Descriptor type of a binding kind
pub fn descriptor_type(kind: BindingKind) -> vk::DescriptorType {
    match kind {
        BindingKind::DynamicStorageBuffer => vk::DescriptorType::STORAGE_BUFFER_DYNAMIC,
        BindingKind::DynamicUniformBuffer => vk::DescriptorType::UNIFORM_BUFFER_DYNAMIC,
    }
}

/// Descriptor pool sized for dynamic buffer bindings
#[derive(Debug)]
pub struct DescriptorPool {
    pool: vk::DescriptorPool,
}

impl DescriptorPool {
    /// Create a pool for `max_sets` sets of up to four dynamic buffers each
    pub fn new(device: &Device, max_sets: u32) -> RenderResult<Self> {
        let pool_sizes = [
            vk::DescriptorPoolSize::builder()
                .ty(vk::DescriptorType::STORAGE_BUFFER_DYNAMIC)
                .descriptor_count(max_sets * 4)
                .build(),
            vk::DescriptorPoolSize::builder()
                .ty(vk::DescriptorType::UNIFORM_BUFFER_DYNAMIC)
                .descriptor_count(max_sets * 4)
                .build(),
        ];

        let pool_info = vk::DescriptorPoolCreateInfo::builder()
            .max_sets(max_sets)
            .pool_sizes(&pool_sizes);

        let pool = unsafe { device.create_descriptor_pool(&pool_info, None)? };
        Ok(Self { pool })
    }

    /// Allocate one set per layout
    pub fn allocate(&self, device: &Device, layouts: &[vk::DescriptorSetLayout]) -> RenderResult<Vec<vk::DescriptorSet>> {
        let alloc_info = vk::DescriptorSetAllocateInfo::builder()
            .descriptor_pool(self.pool)
            .set_layouts(layouts);
        Ok(unsafe { device.allocate_descriptor_sets(&alloc_info)? })
    }

    /// Pool handle
    pub fn handle(&self) -> vk::DescriptorPool {
        self.pool
    }

    /// Destroy the pool and every set allocated from it
    pub fn destroy(self, device: &Device) {
        unsafe { device.destroy_descriptor_pool(self.pool, None) };
    }
}

/// Point one binding of a set at a buffer range
pub fn write_buffer(
    device: &Device,
    set: vk::DescriptorSet,
    binding: u32,
    kind: BindingKind,
    buffer: vk::Buffer,
    offset: vk::DeviceSize,
    range: vk::DeviceSize,
) {
    let buffer_info = [vk::DescriptorBufferInfo::builder()
        .buffer(buffer)
        .offset(offset)
        .range(range)
        .build()];

    let write = vk::WriteDescriptorSet::builder()
        .dst_set(set)
        .dst_binding(binding)
        .dst_array_element(0)
        .descriptor_type(descriptor_type(kind))
        .buffer_info(&buffer_info)
        .build();

    unsafe { device.update_descriptor_sets(&[write], &[]) };
}
