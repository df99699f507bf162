//! Scene-level error types

use thiserror::Error;
use crate::config::ConfigError;
use crate::render::{RenderError, RendererType};
use crate::scene::entity::EntityId;

/// Errors raised while building or preparing a scene
#[derive(Error, Debug)]
pub enum SceneError {
    /// Operation needs the graphics layout
    #[error("Graphics layout has not been built")]
    LayoutNotBuilt,

    /// Operation needs the GPU buffers
    #[error("GPU buffers have not been allocated")]
    GpuBuffersNotAllocated,

    /// Flush without a successfully prepared frame
    #[error("No successfully prepared frame to flush")]
    FrameNotPrepared,

    /// Instance slot beyond the reserved capacity of its type
    #[error("{renderer:?} instance slot {slot} exceeds reserved capacity {capacity}")]
    CapacityExceeded {
        /// Renderer type
        renderer: RendererType,
        /// Slot being written
        slot: u32,
        /// Reserved capacity
        capacity: u32,
    },

    /// Material name or handle not registered
    #[error("Unknown material: {0}")]
    UnknownMaterial(String),

    /// Shared parameter set not registered
    #[error("Unknown shared parameter set: {0}")]
    UnknownParameterSet(String),

    /// Parent named in a scene description does not precede the child
    #[error("Unknown parent entity: {0}")]
    UnknownParent(String),

    /// Graphics component attached after the layout was built
    #[error("Entity {0} has a graphics component that was never registered")]
    UnregisteredRenderable(EntityId),

    /// Invalid pipeline configuration
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Render-side failure
    #[error(transparent)]
    Render(#[from] RenderError),
}

/// Result type for scene operations
pub type SceneResult<T> = Result<T, SceneError>;
