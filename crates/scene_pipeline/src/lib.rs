//! # Scene Pipeline
//!
//! Scene graph, instance batching and packed per-frame GPU buffers for a
//! Vulkan renderer.
//!
//! ## Features
//!
//! - **Scene hierarchy**: arena-backed entity tree with behaviors and
//!   top-down world transforms
//! - **Instance batching**: one indexed, instanced draw per mesh and shared
//!   parameter set, per renderer type
//! - **Packed buffer layout**: transform, parameter and material buffers
//!   shared by every renderer type, replicated per frame in flight and per
//!   camera, selected with dynamic offsets
//! - **Sorted draw lists**: front-to-back and back-to-front ordering for the
//!   types that need it
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use scene_pipeline::prelude::*;
//!
//! fn main() -> Result<(), SceneError> {
//!     let mut scene = Scene::new(PipelineConfig::default())?;
//!     let rock = scene
//!         .create_entity("rock")
//!         .with_graphics(GraphicsComponent::new(RendererType::StaticMesh, "cube"));
//!     scene.add_entity(rock, None, None);
//!
//!     let mut meshes = MeshLibrary::with_builtin_meshes();
//!     let mut allocator = HostAllocator::new();
//!     scene.build_graphics(&mut meshes)?;
//!     scene.allocate_gpu_buffers(&mut allocator)?;
//!
//!     for frame in 0..3 {
//!         scene.render_frame(frame, frame as f32 / 60.0, &mut allocator)?;
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod config;
pub mod core;
pub mod foundation;
pub mod render;
pub mod scene;

/// Common imports for pipeline users
pub mod prelude {
    pub use crate::{
        config::{Config, ConfigError, ConfigFormat},
        core::{DebugChecks, PipelineConfig},
        foundation::{
            collections::{BindingSetHandle, GpuBufferHandle, NodeId},
            math::{Mat4, Vec3},
        },
        render::{
            BindingBackend, BufferKind, DrawRecorder, GpuAllocator, GraphicsComponent, HostAllocator,
            HostBindings, MaterialHandle, MeshLibrary, MeshLoader, ParameterBlock, RecordingDrawRecorder,
            RenderError, RendererType, SceneGraphicsInfo,
        },
        scene::{
            record_draws, Behavior, Camera, Entity, EntityId, FrameStats, Scene, SceneDescription, SceneError,
            SceneResult, Transform, UpdateContext,
        },
    };
}
