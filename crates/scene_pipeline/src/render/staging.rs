//! CPU staging regions for one frame of transform, parameter and material data

use bytemuck::Pod;
use crate::render::layout::{BufferKind, SceneGraphicsInfo};
use crate::render::{RenderError, RenderResult};

/// Bounds-checked byte region mirroring one GPU buffer slice
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StagingRegion {
    bytes: Vec<u8>,
}

impl StagingRegion {
    /// Create a zeroed region
    pub fn with_size(size: usize) -> Self {
        Self { bytes: vec![0; size] }
    }

    /// Zero the region
    pub fn clear(&mut self) {
        self.bytes.fill(0);
    }

    /// Contents
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Size in bytes
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the region has no bytes
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Copy bytes to a byte offset
    pub fn write_bytes(&mut self, offset: u64, bytes: &[u8]) -> RenderResult<()> {
        let out_of_bounds = || RenderError::StagingOutOfBounds {
            offset,
            len: bytes.len(),
            size: self.bytes.len(),
        };
        let start = usize::try_from(offset).map_err(|_| out_of_bounds())?;
        let end = start.checked_add(bytes.len()).filter(|end| *end <= self.bytes.len());
        let Some(end) = end else {
            return Err(out_of_bounds());
        };
        self.bytes[start..end].copy_from_slice(bytes);
        Ok(())
    }

    /// Copy bytes to the start of element `index` of `stride` bytes
    ///
    /// The bytes must not exceed the stride; the rest of the element is left
    /// as is.
    pub fn write_element_bytes(&mut self, index: u64, stride: u32, bytes: &[u8]) -> RenderResult<()> {
        let offset = index
            .checked_mul(u64::from(stride))
            .ok_or(RenderError::LayoutOverflow { context: "staging element offset" })?;
        if bytes.len() > stride as usize {
            return Err(RenderError::StagingOutOfBounds {
                offset,
                len: bytes.len(),
                size: stride as usize,
            });
        }
        self.write_bytes(offset, bytes)
    }

    /// Write a `Pod` value as element `index` of `stride` bytes
    pub fn write_element<T: Pod>(&mut self, index: u64, stride: u32, value: &T) -> RenderResult<()> {
        self.write_element_bytes(index, stride, bytemuck::bytes_of(value))
    }
}

/// Per-scene staging for the frame being prepared
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameStaging {
    /// Transform region per camera
    pub transforms: Vec<StagingRegion>,
    /// Parameter region
    pub parameters: StagingRegion,
    /// Material region
    pub materials: StagingRegion,
}

impl FrameStaging {
    /// Size regions for one frame slice of each buffer
    pub fn for_layout(info: &SceneGraphicsInfo) -> Self {
        let size_of = |kind: BufferKind| info.layout(kind).total_size() as usize;
        Self {
            transforms: (0..info.camera_count())
                .map(|_| StagingRegion::with_size(size_of(BufferKind::Transform)))
                .collect(),
            parameters: StagingRegion::with_size(size_of(BufferKind::Parameter)),
            materials: StagingRegion::with_size(size_of(BufferKind::Material)),
        }
    }

    /// Zero every region
    pub fn clear(&mut self) {
        for region in &mut self.transforms {
            region.clear();
        }
        self.parameters.clear();
        self.materials.clear();
    }

    /// Region backing a buffer; transforms need a camera
    pub fn region(&self, kind: BufferKind, camera: u32) -> Option<&StagingRegion> {
        match kind {
            BufferKind::Transform => self.transforms.get(camera as usize),
            BufferKind::Parameter => Some(&self.parameters),
            BufferKind::Material => Some(&self.materials),
        }
    }
}
