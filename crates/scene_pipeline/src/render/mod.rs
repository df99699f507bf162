//! # Rendering
//!
//! Render-side half of the scene pipeline: the renderer type table, mesh
//! arenas, instance batching, the packed per-frame buffer layout and the
//! staging regions the scene writes into. GPU work goes through the traits in
//! [`gpu`]; [`backends::vulkan`] implements them with ash.

pub mod error;
pub mod renderer_type;
pub mod gpu;
pub mod element_buffer;
pub mod mesh_library;
pub mod graphics_component;
pub mod render_storage;
pub mod layout;
pub mod staging;

/// Graphics backend implementations
pub mod backends;

pub use error::{RenderError, RenderResult};
pub use renderer_type::{RendererType, RendererTypeInfo, SortOrder, StorageMode};
pub use gpu::{
    AccessPattern, BindingBackend, BindingLayout, BufferRange, BufferUsage, DrawRecorder, GpuAllocator,
    HostAllocator, HostBindings, RecordingDrawRecorder,
};
pub use element_buffer::{ElementBuffer, ElementBufferMode, MeshEntry};
pub use mesh_library::{MeshData, MeshLibrary, MeshLoader, Vertex};
pub use graphics_component::{
    GraphicsComponent, MaterialElement, MaterialHandle, MaterialRegistry, ParameterBlock, ParameterRegistry,
};
pub use render_storage::{DrawElementsCommand, RenderStorage};
pub use layout::{BufferKind, BufferLayout, LayoutRequest, SceneGraphicsInfo, TypeOffsets};
pub use staging::{FrameStaging, StagingRegion};
