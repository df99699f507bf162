//! Scene management
//!
//! Owns the entity hierarchy and drives the per-frame pipeline that turns it
//! into GPU data.
//!
//! ## Frame
//!
//! ```text
//! Clear     staging regions, draw lists, write counters
//!   ↓
//! Traverse  behaviors, world = parent world × local   ┐ one top-down walk
//! Write     MVP per camera, parameters, material      ┘
//!   ↓
//! Sort      FrontToBack / BackToFront draw lists
//!   ↓
//! Flush     staging → frame slot (frame_number mod F)
//! ```

mod camera;
mod description;
mod draw_list;
mod entity;
mod error;
mod frame_writer;
mod graph;
mod scene_manager;
mod submit;
mod transform;

#[cfg(test)]
mod tests;

pub use camera::Camera;
pub use description::{
    CameraDescription, CollisionDescription, EntityDescription, GraphicsDescription, MaterialDescription,
    ParameterSetDescription, SceneDescription, TransformDescription,
};
pub use draw_list::DrawList;
pub use entity::{Aabb, Behavior, Entity, EntityId, PhysicsBodyHandle, UpdateContext};
pub use error::{SceneError, SceneResult};
pub use graph::{SceneGraph, SceneNode};
pub use scene_manager::{FrameStats, Scene, SceneGpuBuffers};
pub use submit::record_draws;
pub use transform::Transform;
