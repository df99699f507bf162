//! Renderer type tags and their dispatch table
//!
//! The set of renderers is closed, so per-type data (element strides, sort
//! order, batching mode) lives in one const table indexed by the tag instead
//! of behind trait objects.

use serde::{Serialize, Deserialize};

/// Category of renderable; selects the pipeline and data layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RendererType {
    /// Opaque instanced meshes
    StaticMesh,
    /// Height-field terrain patches
    Terrain,
    /// Sky / atmosphere scattering volume
    Atmosphere,
    /// Particle systems with per-frame vertex data
    Particle,
    /// Translucent water surfaces
    Water,
    /// Light volumes
    Light,
    /// Full-screen post-process passes
    PostProcess,
    /// Shadow casters
    Shadow,
    /// Not rendered
    None,
}

/// How a render storage groups instances into batches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageMode {
    /// Every component gets its own batch
    SingleInstance,
    /// Components sharing mesh and shared parameters share a batch
    UnlimitedInstances,
}

/// Per-frame ordering applied to a renderer type's draw list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    /// Submission order
    Unsorted,
    /// Nearest first
    FrontToBack,
    /// Farthest first (translucency)
    BackToFront,
}

/// Static description of one renderer type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RendererTypeInfo {
    /// Display name
    pub name: &'static str,
    /// Bytes per instance in the transform buffer (one MVP per camera)
    pub transform_size: u32,
    /// Bytes per instance in the parameter buffer
    pub parameter_size: u32,
    /// Bytes per instance in the material buffer
    pub material_size: u32,
    /// Draw-list ordering
    pub sort_order: SortOrder,
    /// Whether the world matrix occupies the first 64 parameter bytes
    pub embeds_world_matrix: bool,
    /// Batching mode of the type's render storage
    pub storage_mode: StorageMode,
    /// Whether vertex data is rewritten every frame
    pub dynamic_vertices: bool,
}

const fn info(
    name: &'static str,
    sizes: (u32, u32, u32),
    sort_order: SortOrder,
    embeds_world_matrix: bool,
    storage_mode: StorageMode,
    dynamic_vertices: bool,
) -> RendererTypeInfo {
    RendererTypeInfo {
        name,
        transform_size: sizes.0,
        parameter_size: sizes.1,
        material_size: sizes.2,
        sort_order,
        embeds_world_matrix,
        storage_mode,
        dynamic_vertices,
    }
}

// Indexed by `RendererType as usize`.
const TYPE_TABLE: [RendererTypeInfo; 9] = [
    info("static_mesh", (64, 80, 16), SortOrder::Unsorted, true, StorageMode::UnlimitedInstances, false),
    info("terrain", (64, 96, 16), SortOrder::Unsorted, true, StorageMode::UnlimitedInstances, false),
    info("atmosphere", (64, 64, 16), SortOrder::Unsorted, false, StorageMode::SingleInstance, false),
    info("particle", (64, 96, 16), SortOrder::BackToFront, true, StorageMode::SingleInstance, true),
    info("water", (64, 96, 16), SortOrder::BackToFront, true, StorageMode::SingleInstance, false),
    info("light", (64, 48, 16), SortOrder::Unsorted, false, StorageMode::UnlimitedInstances, false),
    info("post_process", (0, 32, 16), SortOrder::Unsorted, false, StorageMode::SingleInstance, false),
    info("shadow", (64, 64, 0), SortOrder::FrontToBack, true, StorageMode::UnlimitedInstances, false),
    info("none", (0, 0, 0), SortOrder::Unsorted, false, StorageMode::SingleInstance, false),
];

impl RendererType {
    /// Number of types that produce draw calls
    pub const COUNT: usize = 8;

    /// Every type that produces draw calls, in table order
    pub const RENDERABLE: [Self; Self::COUNT] = [
        Self::StaticMesh,
        Self::Terrain,
        Self::Atmosphere,
        Self::Particle,
        Self::Water,
        Self::Light,
        Self::PostProcess,
        Self::Shadow,
    ];

    /// Dense index for per-type arrays, `None` for [`RendererType::None`]
    pub const fn index(self) -> Option<usize> {
        match self {
            Self::None => None,
            other => Some(other as usize),
        }
    }

    /// Dispatch-table entry for this type
    pub const fn info(self) -> &'static RendererTypeInfo {
        &TYPE_TABLE[self as usize]
    }

    /// Whether this type produces draw calls
    pub const fn is_renderable(self) -> bool {
        !matches!(self, Self::None)
    }
}
