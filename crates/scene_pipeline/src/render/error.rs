//! Render-side error types

use ash::vk;
use thiserror::Error;
use crate::render::RendererType;

/// Errors raised by layout, staging, element buffers and GPU collaborators
#[derive(Error, Debug)]
pub enum RenderError {
    /// Layout arithmetic overflowed; the content exceeds the configured limits
    #[error("Buffer layout overflow while computing {context}")]
    LayoutOverflow {
        /// Which quantity overflowed
        context: &'static str,
    },

    /// Minimum offset alignment must be a non-zero power of two
    #[error("Invalid offset alignment: {0}")]
    InvalidAlignment(u64),

    /// GPU buffer allocation failed
    #[error("GPU allocation of {size} bytes failed: {reason}")]
    AllocationFailed {
        /// Requested size in bytes
        size: u64,
        /// Collaborator-provided reason
        reason: String,
    },

    /// Buffer handle does not refer to a live buffer
    #[error("Unknown GPU buffer handle")]
    UnknownBuffer,

    /// Binding set handle does not refer to a live binding set
    #[error("Unknown binding set handle")]
    UnknownBindingSet,

    /// Mapping a buffer range failed
    #[error("Cannot map {len} bytes at offset {offset} of a {size}-byte buffer")]
    MapOutOfRange {
        /// Requested offset
        offset: u64,
        /// Requested length
        len: u64,
        /// Buffer size
        size: u64,
    },

    /// The buffer is already mapped
    #[error("GPU buffer is already mapped")]
    AlreadyMapped,

    /// Mesh is not known to the mesh source
    #[error("Mesh not found: {0}")]
    MeshNotFound(String),

    /// Element buffer was committed and can no longer grow
    #[error("Element buffer is committed; cannot append mesh '{0}'")]
    ElementBufferCommitted(String),

    /// Operation requires a dynamic element buffer
    #[error("Element buffer is not dynamic")]
    NotDynamic,

    /// Vertex data does not match the buffer's stride
    #[error("Vertex data of {len} bytes is not a multiple of the {stride}-byte stride")]
    VertexStrideMismatch {
        /// Byte length supplied
        len: usize,
        /// Expected stride
        stride: u32,
    },

    /// Parameter block is larger than the renderer type's element
    #[error("Parameter block of {len} bytes does not fit the {available} bytes available for {renderer:?}")]
    ParameterBlockTooLarge {
        /// Renderer type of the element
        renderer: RendererType,
        /// Block length
        len: usize,
        /// Space left in the element
        available: usize,
    },

    /// Write outside a staging region
    #[error("Staging write of {len} bytes at offset {offset} exceeds region of {size} bytes")]
    StagingOutOfBounds {
        /// Byte offset of the write
        offset: u64,
        /// Length of the write
        len: usize,
        /// Region size
        size: usize,
    },

    /// Vulkan API error
    #[error("Vulkan API error: {0:?}")]
    Vulkan(vk::Result),

    /// No memory type satisfies the requested properties
    #[error("No suitable memory type found")]
    NoSuitableMemoryType,
}

/// Result type for render operations
pub type RenderResult<T> = Result<T, RenderError>;

impl From<vk::Result> for RenderError {
    fn from(result: vk::Result) -> Self {
        Self::Vulkan(result)
    }
}
