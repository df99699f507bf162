//! Renderable facet of an entity and the registries it refers to

use std::collections::HashMap;
use bytemuck::{Pod, Zeroable};
use serde::{Serialize, Deserialize};
use crate::foundation::collections::InstanceHandle;
use crate::render::RendererType;

/// Handle to a registered material
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MaterialHandle(pub u32);

/// Opaque parameter bytes copied into a parameter element
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParameterBlock {
    bytes: Vec<u8>,
}

impl ParameterBlock {
    /// Wrap raw bytes
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    /// Copy the bytes of a `Pod` value
    pub fn from_pod<T: Pod>(value: &T) -> Self {
        Self { bytes: bytemuck::bytes_of(value).to_vec() }
    }

    /// Pack a list of floats
    pub fn from_floats(values: &[f32]) -> Self {
        Self { bytes: bytemuck::cast_slice(values).to_vec() }
    }

    /// The bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Length in bytes
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the block is empty
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Key under which unlimited-instance storages merge components into one batch
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BatchKey {
    /// Mesh name
    pub mesh: String,
    /// Shared parameter set id
    pub shared: Option<String>,
}

/// Graphics state of an entity
#[derive(Debug, Clone, PartialEq)]
pub struct GraphicsComponent {
    /// Renderer type tag
    pub renderer: RendererType,
    /// Mesh name
    pub mesh: String,
    /// Id of a shared parameter set in the scene's registry
    pub shared_parameters: Option<String>,
    /// Parameters owned by this instance
    pub instance_parameters: Option<ParameterBlock>,
    /// Material
    pub material: Option<MaterialHandle>,
    pub(crate) instance: Option<InstanceHandle>,
}

impl GraphicsComponent {
    /// Create a component drawing `mesh` with `renderer`
    pub fn new(renderer: RendererType, mesh: impl Into<String>) -> Self {
        Self {
            renderer,
            mesh: mesh.into(),
            shared_parameters: None,
            instance_parameters: None,
            material: None,
            instance: None,
        }
    }

    /// Use a shared parameter set
    pub fn with_shared_parameters(mut self, id: impl Into<String>) -> Self {
        self.shared_parameters = Some(id.into());
        self
    }

    /// Attach per-instance parameters
    pub fn with_instance_parameters(mut self, block: ParameterBlock) -> Self {
        self.instance_parameters = Some(block);
        self
    }

    /// Attach a material
    pub fn with_material(mut self, material: MaterialHandle) -> Self {
        self.material = Some(material);
        self
    }

    /// Batch key of this component
    pub fn batch_key(&self) -> BatchKey {
        BatchKey {
            mesh: self.mesh.clone(),
            shared: self.shared_parameters.clone(),
        }
    }

    /// Instance handle assigned by the render storage
    pub fn instance(&self) -> Option<InstanceHandle> {
        self.instance
    }
}

/// Material element as laid out in the material buffer
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Pod, Zeroable)]
pub struct MaterialElement {
    /// Index into the renderer's material table
    pub index: u32,
    /// Material flags
    pub flags: u32,
    _pad: [u32; 2],
}

impl MaterialElement {
    /// Create an element
    pub const fn new(index: u32, flags: u32) -> Self {
        Self { index, flags, _pad: [0; 2] }
    }
}

/// Name → material lookup
#[derive(Debug, Default)]
pub struct MaterialRegistry {
    by_name: HashMap<String, MaterialHandle>,
    flags: Vec<u32>,
}

impl MaterialRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a material; registering a known name returns its handle
    pub fn register(&mut self, name: impl Into<String>, flags: u32) -> MaterialHandle {
        let name = name.into();
        if let Some(handle) = self.by_name.get(&name) {
            return *handle;
        }
        let handle = MaterialHandle(self.flags.len() as u32);
        self.flags.push(flags);
        log::debug!("Registered material '{}' as {:?}", name, handle);
        self.by_name.insert(name, handle);
        handle
    }

    /// Look up a material by name
    pub fn get(&self, name: &str) -> Option<MaterialHandle> {
        self.by_name.get(name).copied()
    }

    /// Material element for a handle
    pub fn element(&self, handle: MaterialHandle) -> Option<MaterialElement> {
        self.flags
            .get(handle.0 as usize)
            .map(|flags| MaterialElement::new(handle.0, *flags))
    }

    /// Number of materials
    pub fn len(&self) -> usize {
        self.flags.len()
    }

    /// Whether no material is registered
    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }
}

/// Shared parameter sets keyed by id
#[derive(Debug, Default)]
pub struct ParameterRegistry {
    sets: HashMap<String, ParameterBlock>,
}

impl ParameterRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a parameter set
    pub fn insert(&mut self, id: impl Into<String>, block: ParameterBlock) {
        self.sets.insert(id.into(), block);
    }

    /// Look up a parameter set
    pub fn get(&self, id: &str) -> Option<&ParameterBlock> {
        self.sets.get(id)
    }

    /// Whether a set is known
    pub fn contains(&self, id: &str) -> bool {
        self.sets.contains_key(id)
    }
}
