//! GPU collaborator interfaces
//!
//! The pipeline never talks to a graphics API directly. It allocates and
//! fills buffers through [`GpuAllocator`], binds them through
//! [`BindingBackend`] and records draws through [`DrawRecorder`]. The host
//! implementations in this module keep everything in CPU memory; they back
//! the tests and headless runs. The Vulkan implementations live in
//! `backends::vulkan`.

use bitflags::bitflags;
use crate::foundation::collections::{BindingSetHandle, GpuBufferHandle, SlotMap};
use crate::render::{DrawElementsCommand, RenderError, RenderResult};

bitflags! {
    /// How a buffer will be bound
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BufferUsage: u32 {
        /// Vertex input
        const VERTEX = 1 << 0;
        /// Index input
        const INDEX = 1 << 1;
        /// Uniform buffer
        const UNIFORM = 1 << 2;
        /// Storage buffer
        const STORAGE = 1 << 3;
        /// Indirect draw arguments
        const INDIRECT = 1 << 4;
    }
}

/// CPU access pattern requested for a buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessPattern {
    /// Written once at upload time, read by the GPU thereafter
    DeviceLocal,
    /// Rewritten by the CPU every frame
    HostVisible,
}

/// Allocator for GPU-resident buffers
pub trait GpuAllocator {
    /// Allocate a buffer of `size` bytes
    fn allocate(
        &mut self,
        size: u64,
        usage: BufferUsage,
        access: AccessPattern,
    ) -> RenderResult<GpuBufferHandle>;

    /// Map `len` bytes starting at `offset` for CPU writes
    fn map_for_write(
        &mut self,
        handle: GpuBufferHandle,
        offset: u64,
        len: u64,
    ) -> RenderResult<&mut [u8]>;

    /// Finish a write started with [`GpuAllocator::map_for_write`]
    fn unmap(&mut self, handle: GpuBufferHandle);

    /// Release a buffer
    fn free(&mut self, handle: GpuBufferHandle);

    /// Size of a live buffer
    fn buffer_size(&self, handle: GpuBufferHandle) -> Option<u64>;

    /// Copy `bytes` into the buffer at `offset`
    fn write(&mut self, handle: GpuBufferHandle, offset: u64, bytes: &[u8]) -> RenderResult<()> {
        let destination = self.map_for_write(handle, offset, bytes.len() as u64)?;
        destination.copy_from_slice(bytes);
        self.unmap(handle);
        Ok(())
    }
}

/// Kind of a binding slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingKind {
    /// Storage buffer selected with a dynamic offset at bind time
    DynamicStorageBuffer,
    /// Uniform buffer selected with a dynamic offset at bind time
    DynamicUniformBuffer,
}

/// One slot of a binding layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BindingEntry {
    /// Binding index in the shader
    pub binding: u32,
    /// Slot kind
    pub kind: BindingKind,
}

/// Layout of a binding set
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BindingLayout {
    /// Slots, in binding order
    pub entries: Vec<BindingEntry>,
}

impl BindingLayout {
    /// Create an empty layout
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a dynamic storage buffer slot
    pub fn with_dynamic_storage_buffer(mut self, binding: u32) -> Self {
        self.entries.push(BindingEntry { binding, kind: BindingKind::DynamicStorageBuffer });
        self
    }
}

/// Sub-range of a buffer bound to a slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferRange {
    /// Buffer
    pub buffer: GpuBufferHandle,
    /// Start of the range in bytes
    pub offset: u64,
    /// Size of the range in bytes (one frame slice for dynamic slots)
    pub size: u64,
}

/// Creates binding sets and points their slots at buffers
pub trait BindingBackend {
    /// Create a binding set for a layout
    fn create_binding_set(&mut self, layout: &BindingLayout) -> RenderResult<BindingSetHandle>;

    /// Bind a buffer range to a slot of a set
    fn bind_buffer(
        &mut self,
        set: BindingSetHandle,
        binding: u32,
        range: BufferRange,
    ) -> RenderResult<()>;
}

/// Records bind and draw calls into a command stream
pub trait DrawRecorder {
    /// Bind a set selecting one frame slice per dynamic slot
    fn bind_dynamic_offsets(&mut self, set: BindingSetHandle, offsets: &[u32]) -> RenderResult<()>;

    /// Push the renderer type's element offsets (transform, parameter, material)
    fn push_element_offsets(&mut self, offsets: [u32; 3]);

    /// Record an indexed, instanced draw
    fn draw_indexed(&mut self, command: &DrawElementsCommand);
}

#[derive(Debug)]
struct HostBuffer {
    bytes: Vec<u8>,
    usage: BufferUsage,
    access: AccessPattern,
    mapped: bool,
}

/// GPU allocator backed by plain CPU memory
#[derive(Debug, Default)]
pub struct HostAllocator {
    buffers: SlotMap<GpuBufferHandle, HostBuffer>,
}

impl HostAllocator {
    /// Create an empty allocator
    pub fn new() -> Self {
        Self::default()
    }

    /// Current contents of a buffer
    pub fn contents(&self, handle: GpuBufferHandle) -> Option<&[u8]> {
        self.buffers.get(handle).map(|buffer| buffer.bytes.as_slice())
    }

    /// Usage and access pattern a buffer was allocated with
    pub fn allocation_info(&self, handle: GpuBufferHandle) -> Option<(BufferUsage, AccessPattern)> {
        self.buffers.get(handle).map(|buffer| (buffer.usage, buffer.access))
    }

    /// Number of live buffers
    pub fn live_buffers(&self) -> usize {
        self.buffers.len()
    }
}

impl GpuAllocator for HostAllocator {
    fn allocate(
        &mut self,
        size: u64,
        usage: BufferUsage,
        access: AccessPattern,
    ) -> RenderResult<GpuBufferHandle> {
        let len = usize::try_from(size).map_err(|_| RenderError::AllocationFailed {
            size,
            reason: "size exceeds host address space".to_string(),
        })?;
        log::trace!("Host allocation of {} bytes ({:?}, {:?})", size, usage, access);
        Ok(self.buffers.insert(HostBuffer {
            bytes: vec![0; len],
            usage,
            access,
            mapped: false,
        }))
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
        let size = buffer.bytes.len() as u64;
        let end = offset.checked_add(len).filter(|end| *end <= size);
        let Some(end) = end else {
            return Err(RenderError::MapOutOfRange { offset, len, size });
        };
        buffer.mapped = true;
        Ok(&mut buffer.bytes[offset as usize..end as usize])
    }

    fn unmap(&mut self, handle: GpuBufferHandle) {
        if let Some(buffer) = self.buffers.get_mut(handle) {
            buffer.mapped = false;
        }
    }

    fn free(&mut self, handle: GpuBufferHandle) {
        if self.buffers.remove(handle).is_none() {
            log::warn!("Freeing unknown host buffer {:?}", handle);
        }
    }

    fn buffer_size(&self, handle: GpuBufferHandle) -> Option<u64> {
        self.buffers.get(handle).map(|buffer| buffer.bytes.len() as u64)
    }
}

#[derive(Debug)]
struct HostBindingSet {
    layout: BindingLayout,
    bound: Vec<Option<BufferRange>>,
}

/// Binding backend that only records what was bound
#[derive(Debug, Default)]
pub struct HostBindings {
    sets: SlotMap<BindingSetHandle, HostBindingSet>,
}

impl HostBindings {
    /// Create an empty backend
    pub fn new() -> Self {
        Self::default()
    }

    /// Range bound to a slot, if any
    pub fn bound_range(&self, set: BindingSetHandle, binding: u32) -> Option<BufferRange> {
        let set = self.sets.get(set)?;
        let slot = set.layout.entries.iter().position(|entry| entry.binding == binding)?;
        set.bound[slot]
    }
}

impl BindingBackend for HostBindings {
    fn create_binding_set(&mut self, layout: &BindingLayout) -> RenderResult<BindingSetHandle> {
        Ok(self.sets.insert(HostBindingSet {
            layout: layout.clone(),
            bound: vec![None; layout.entries.len()],
        }))
    }

    fn bind_buffer(
        &mut self,
        set: BindingSetHandle,
        binding: u32,
        range: BufferRange,
    ) -> RenderResult<()> {
        let set = self.sets.get_mut(set).ok_or(RenderError::UnknownBindingSet)?;
        let slot = set
            .layout
            .entries
            .iter()
            .position(|entry| entry.binding == binding)
            .ok_or(RenderError::UnknownBindingSet)?;
        set.bound[slot] = Some(range);
        Ok(())
    }
}

/// A call captured by [`RecordingDrawRecorder`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedCall {
    /// Set bound with dynamic offsets
    Bind {
        /// Bound set
        set: BindingSetHandle,
        /// Dynamic offsets in bytes
        offsets: Vec<u32>,
    },
    /// Element offsets pushed
    ElementOffsets([u32; 3]),
    /// Indexed draw
    Draw(DrawElementsCommand),
}

/// Draw recorder that keeps the recorded calls in memory
#[derive(Debug, Default)]
pub struct RecordingDrawRecorder {
    /// Calls in recording order
    pub calls: Vec<RecordedCall>,
}

impl RecordingDrawRecorder {
    /// Create an empty recorder
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorded draws only
    pub fn draws(&self) -> impl Iterator<Item = &DrawElementsCommand> {
        self.calls.iter().filter_map(|call| match call {
            RecordedCall::Draw(command) => Some(command),
            _ => None,
        })
    }
}

impl DrawRecorder for RecordingDrawRecorder {
    fn bind_dynamic_offsets(&mut self, set: BindingSetHandle, offsets: &[u32]) -> RenderResult<()> {
        self.calls.push(RecordedCall::Bind { set, offsets: offsets.to_vec() });
        Ok(())
    }

    fn push_element_offsets(&mut self, offsets: [u32; 3]) {
        self.calls.push(RecordedCall::ElementOffsets(offsets));
    }

    fn draw_indexed(&mut self, command: &DrawElementsCommand) {
        self.calls.push(RecordedCall::Draw(*command));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_write_lands_at_offset() {
        let mut allocator = HostAllocator::new();
        let handle = allocator
            .allocate(16, BufferUsage::STORAGE, AccessPattern::HostVisible)
            .unwrap();

        allocator.write(handle, 4, &[1, 2, 3]).unwrap();

        assert_eq!(&allocator.contents(handle).unwrap()[..8], &[0, 0, 0, 0, 1, 2, 3, 0]);
        assert_eq!(allocator.buffer_size(handle), Some(16));
    }

    #[test]
    fn test_host_map_out_of_range() {
        let mut allocator = HostAllocator::new();
        let handle = allocator
            .allocate(8, BufferUsage::VERTEX, AccessPattern::DeviceLocal)
            .unwrap();

        assert!(matches!(
            allocator.map_for_write(handle, 4, 8),
            Err(RenderError::MapOutOfRange { offset: 4, len: 8, size: 8 })
        ));
        assert!(matches!(
            allocator.map_for_write(handle, u64::MAX, 2),
            Err(RenderError::MapOutOfRange { .. })
        ));
    }

    #[test]
    fn test_host_double_map_is_rejected() {
        let mut allocator = HostAllocator::new();
        let handle = allocator
            .allocate(8, BufferUsage::UNIFORM, AccessPattern::HostVisible)
            .unwrap();

        allocator.map_for_write(handle, 0, 4).unwrap();
        assert!(matches!(allocator.map_for_write(handle, 0, 4), Err(RenderError::AlreadyMapped)));
        allocator.unmap(handle);
        assert!(allocator.map_for_write(handle, 0, 4).is_ok());
    }

    #[test]
    fn test_free_releases_buffer() {
        let mut allocator = HostAllocator::new();
        let handle = allocator
            .allocate(8, BufferUsage::INDEX, AccessPattern::DeviceLocal)
            .unwrap();
        allocator.free(handle);

        assert_eq!(allocator.live_buffers(), 0);
        assert!(matches!(allocator.write(handle, 0, &[1]), Err(RenderError::UnknownBuffer)));
    }

    #[test]
    fn test_host_bindings_track_ranges() {
        let mut allocator = HostAllocator::new();
        let buffer = allocator
            .allocate(512, BufferUsage::STORAGE, AccessPattern::HostVisible)
            .unwrap();
        let mut bindings = HostBindings::new();
        let layout = BindingLayout::new().with_dynamic_storage_buffer(0).with_dynamic_storage_buffer(2);
        let set = bindings.create_binding_set(&layout).unwrap();

        let range = BufferRange { buffer, offset: 0, size: 256 };
        bindings.bind_buffer(set, 2, range).unwrap();

        assert_eq!(bindings.bound_range(set, 2), Some(range));
        assert_eq!(bindings.bound_range(set, 0), None);
        assert!(bindings.bind_buffer(set, 1, range).is_err());
    }
}
