//! # Buffer Layout
//!
//! Packed layout of the per-frame transform, parameter and material buffers.
//!
//! ## Placement
//!
//! Every renderer type owns a contiguous run of elements inside each shared
//! buffer. Runs are placed largest stride first so each run starts on a
//! multiple of its own stride. Types with a zero stride are left out.
//!
//! ## Frame Slices
//!
//! The whole frame slice is padded to the device's minimum offset alignment
//! and replicated per frame slot (and per camera for transforms), so a slice
//! is selected with a dynamic offset at bind time.

use crate::core::{PipelineConfig, MIN_FRAMES_IN_FLIGHT};
use crate::render::{RenderError, RenderResult, RendererType};

/// One renderer type's request for space in a buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutRequest {
    /// Renderer type
    pub renderer: RendererType,
    /// Bytes per element
    pub element_size: u32,
    /// Number of elements
    pub count: u32,
}

/// Placement of every renderer type within one frame slice of a buffer
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BufferLayout {
    element_offsets: [Option<u32>; RendererType::COUNT],
    element_sizes: [u32; RendererType::COUNT],
    payload_size: u64,
    total_size: u64,
}

const fn align_up(value: u64, alignment: u64) -> Option<u64> {
    match value.checked_add(alignment - 1) {
        Some(padded) => Some(padded / alignment * alignment),
        None => None,
    }
}

impl BufferLayout {
    /// Compute the layout of one frame slice
    ///
    /// Requests are placed in descending element size; equal sizes keep
    /// their order in `requests`. Requests with a zero element size are not
    /// part of the buffer; zero counts still receive an offset.
    pub fn compute(requests: &[LayoutRequest], min_alignment: u64) -> RenderResult<Self> {
        if min_alignment == 0 || !min_alignment.is_power_of_two() {
            return Err(RenderError::InvalidAlignment(min_alignment));
        }

        let mut placed: Vec<&LayoutRequest> = requests
            .iter()
            .filter(|request| request.element_size > 0 && request.renderer.is_renderable())
            .collect();
        placed.sort_by_key(|request| std::cmp::Reverse(request.element_size));

        let mut layout = Self::default();
        let mut running = 0u64;
        for request in placed {
            let size = u64::from(request.element_size);
            running = align_up(running, size).ok_or(RenderError::LayoutOverflow { context: "element padding" })?;
            let offset = u32::try_from(running / size)
                .map_err(|_| RenderError::LayoutOverflow { context: "element offset" })?;
            let bytes = size
                .checked_mul(u64::from(request.count))
                .ok_or(RenderError::LayoutOverflow { context: "type size" })?;
            running = running
                .checked_add(bytes)
                .ok_or(RenderError::LayoutOverflow { context: "buffer size" })?;

            if let Some(index) = request.renderer.index() {
                layout.element_offsets[index] = Some(offset);
                layout.element_sizes[index] = request.element_size;
            }
        }

        layout.payload_size = running;
        layout.total_size =
            align_up(running, min_alignment).ok_or(RenderError::LayoutOverflow { context: "aligned buffer size" })?;
        Ok(layout)
    }

    /// Offset of a type's first element, in elements of that type
    pub fn element_offset(&self, renderer: RendererType) -> Option<u32> {
        renderer.index().and_then(|index| self.element_offsets[index])
    }

    /// Offset of a type's first element in bytes
    pub fn byte_offset(&self, renderer: RendererType) -> Option<u64> {
        let index = renderer.index()?;
        self.element_offsets[index].map(|offset| u64::from(offset) * u64::from(self.element_sizes[index]))
    }

    /// Element size a type was placed with
    pub fn element_size(&self, renderer: RendererType) -> Option<u32> {
        let index = renderer.index()?;
        self.element_offsets[index].map(|_| self.element_sizes[index])
    }

    /// Bytes used by elements before alignment padding
    pub fn payload_size(&self) -> u64 {
        self.payload_size
    }

    /// Bytes of one frame slice, padded to the minimum offset alignment
    pub fn total_size(&self) -> u64 {
        self.total_size
    }
}

/// Which of the three per-frame buffers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferKind {
    /// View-projection × world per camera
    Transform,
    /// Per-instance parameters
    Parameter,
    /// Material index and flags
    Material,
}

impl BufferKind {
    /// All buffers, in binding order
    pub const ALL: [Self; 3] = [Self::Transform, Self::Parameter, Self::Material];

    /// Element size of a renderer type in this buffer
    pub fn element_size(self, renderer: RendererType) -> u32 {
        let info = renderer.info();
        match self {
            Self::Transform => info.transform_size,
            Self::Parameter => info.parameter_size,
            Self::Material => info.material_size,
        }
    }

    /// Shader binding index
    pub const fn binding(self) -> u32 {
        match self {
            Self::Transform => 0,
            Self::Parameter => 1,
            Self::Material => 2,
        }
    }
}

/// Element offsets of one renderer type in the three buffers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TypeOffsets {
    /// Transform buffer offset in elements
    pub transform: Option<u32>,
    /// Parameter buffer offset in elements
    pub parameter: Option<u32>,
    /// Material buffer offset in elements
    pub material: Option<u32>,
}

impl TypeOffsets {
    /// Offsets as pushed to shaders; absent buffers push zero
    pub fn as_push_constants(&self) -> [u32; 3] {
        [
            self.transform.unwrap_or(0),
            self.parameter.unwrap_or(0),
            self.material.unwrap_or(0),
        ]
    }
}

/// Layout of a scene's per-frame GPU data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SceneGraphicsInfo {
    transform: BufferLayout,
    parameter: BufferLayout,
    material: BufferLayout,
    capacities: [u32; RendererType::COUNT],
    camera_count: u32,
    num_frame_indices: u32,
}

impl SceneGraphicsInfo {
    /// Lay out the three buffers for the given per-type instance capacities
    pub fn build(capacities: [u32; RendererType::COUNT], config: &PipelineConfig) -> RenderResult<Self> {
        let layout_for = |kind: BufferKind| {
            let requests: Vec<LayoutRequest> = RendererType::RENDERABLE
                .iter()
                .zip(capacities)
                .map(|(renderer, count)| LayoutRequest {
                    renderer: *renderer,
                    element_size: kind.element_size(*renderer),
                    count,
                })
                .collect();
            BufferLayout::compute(&requests, config.min_offset_alignment)
        };

        let info = Self {
            transform: layout_for(BufferKind::Transform)?,
            parameter: layout_for(BufferKind::Parameter)?,
            material: layout_for(BufferKind::Material)?,
            capacities,
            camera_count: config.camera_count.max(1),
            num_frame_indices: config.frame_replicas(),
        };
        info.check_offsets_fit(info.num_frame_indices)?;

        if BufferKind::ALL.iter().all(|kind| info.layout(*kind).total_size() == 0) {
            log::warn!("Scene graphics layout is empty; no renderables were registered");
        }
        log::info!(
            "Scene layout: transform {} B x {} cameras, parameter {} B, material {} B per frame, {} frame slots",
            info.transform.total_size(),
            info.camera_count,
            info.parameter.total_size(),
            info.material.total_size(),
            info.num_frame_indices
        );
        Ok(info)
    }

    fn check_offsets_fit(&self, frame_indices: u32) -> RenderResult<()> {
        for kind in BufferKind::ALL {
            let size = self
                .frame_size(kind)
                .checked_mul(u64::from(frame_indices))
                .ok_or(RenderError::LayoutOverflow { context: "replicated buffer size" })?;
            if u32::try_from(size).is_err() {
                return Err(RenderError::LayoutOverflow { context: "dynamic offset range" });
            }
        }
        Ok(())
    }

    /// Element offsets of a renderer type
    pub fn offsets(&self, renderer: RendererType) -> TypeOffsets {
        TypeOffsets {
            transform: self.transform.element_offset(renderer),
            parameter: self.parameter.element_offset(renderer),
            material: self.material.element_offset(renderer),
        }
    }

    /// Reserved instance capacity of a renderer type
    pub fn capacity(&self, renderer: RendererType) -> u32 {
        renderer.index().map_or(0, |index| self.capacities[index])
    }

    /// Layout of one buffer
    pub fn layout(&self, kind: BufferKind) -> &BufferLayout {
        match kind {
            BufferKind::Transform => &self.transform,
            BufferKind::Parameter => &self.parameter,
            BufferKind::Material => &self.material,
        }
    }

    /// Bytes one frame slot occupies in a buffer (all cameras for transforms)
    pub fn frame_size(&self, kind: BufferKind) -> u64 {
        match kind {
            BufferKind::Transform => self.transform.total_size() * u64::from(self.camera_count),
            _ => self.layout(kind).total_size(),
        }
    }

    /// Total bytes of a buffer across all frame slots
    pub fn buffer_size(&self, kind: BufferKind) -> u64 {
        self.frame_size(kind) * u64::from(self.num_frame_indices)
    }

    /// Number of cameras the transform buffer is replicated for
    pub fn camera_count(&self) -> u32 {
        self.camera_count
    }

    /// Number of frame slots
    pub fn num_frame_indices(&self) -> u32 {
        self.num_frame_indices
    }

    /// Change the number of frame slots
    ///
    /// Buffers allocated for the previous count must be reallocated.
    ///
    /// # Panics
    /// If `frame_indices` is below [`MIN_FRAMES_IN_FLIGHT`].
    pub fn set_num_frame_indices(&mut self, frame_indices: u32) -> RenderResult<()> {
        assert!(
            frame_indices >= MIN_FRAMES_IN_FLIGHT,
            "a scene needs at least {MIN_FRAMES_IN_FLIGHT} frame slots, got {frame_indices}"
        );
        self.check_offsets_fit(frame_indices)?;
        self.num_frame_indices = frame_indices;
        Ok(())
    }

    /// Frame slot written for a frame number
    pub fn frame_slot(&self, frame_number: u64) -> u32 {
        (frame_number % u64::from(self.num_frame_indices)) as u32
    }

    /// Byte offset of one frame (and camera) slice of a buffer
    pub fn slice_offset(&self, kind: BufferKind, slot: u32, camera: u32) -> u64 {
        let total = self.layout(kind).total_size();
        match kind {
            BufferKind::Transform => {
                (u64::from(slot) * u64::from(self.camera_count) + u64::from(camera)) * total
            }
            _ => u64::from(slot) * total,
        }
    }

    /// Dynamic offset selecting a frame/camera slice for a renderer type
    ///
    /// `None` when the type has no elements in that buffer.
    pub fn dynamic_offset(&self, renderer: RendererType, kind: BufferKind, slot: u32, camera: u32) -> Option<u32> {
        self.layout(kind).element_offset(renderer)?;
        u32::try_from(self.slice_offset(kind, slot, camera)).ok()
    }
}
