//! Scene descriptions loaded from RON or TOML
//!
//! A description lists materials, shared parameter sets, cameras and
//! entities. Entities name their parent; a parent must appear earlier in the
//! list. Loading only populates the scene, it doesn't build graphics.

use std::collections::HashMap;
use serde::{Serialize, Deserialize};
use crate::config::Config;
use crate::foundation::collections::NodeId;
use crate::foundation::math::Vec3;
use crate::render::{GraphicsComponent, ParameterBlock, RendererType};
use crate::scene::camera::Camera;
use crate::scene::entity::{Aabb, EntityId};
use crate::scene::error::{SceneError, SceneResult};
use crate::scene::scene_manager::Scene;
use crate::scene::transform::Transform;

/// Named material with its flags
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialDescription {
    /// Material name
    pub name: String,
    /// Material flags
    #[serde(default)]
    pub flags: u32,
}

/// Shared parameter set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSetDescription {
    /// Id graphics components refer to
    pub id: String,
    /// Packed as 32-bit floats
    pub values: Vec<f32>,
}

/// Camera placement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraDescription {
    /// Position
    pub position: [f32; 3],
    /// Look-at target
    pub target: [f32; 3],
    /// Vertical field of view in degrees
    pub fov_degrees: f32,
    /// Width / height
    pub aspect: f32,
    /// Near plane
    pub near: f32,
    /// Far plane
    pub far: f32,
}

impl Default for CameraDescription {
    fn default() -> Self {
        Self {
            position: [0.0, 0.0, 10.0],
            target: [0.0; 3],
            fov_degrees: 60.0,
            aspect: 16.0 / 9.0,
            near: 0.1,
            far: 1000.0,
        }
    }
}

impl CameraDescription {
    fn to_camera(&self) -> Camera {
        let mut camera = Camera::perspective(
            Vec3::from(self.position),
            self.fov_degrees,
            self.aspect,
            self.near,
            self.far,
        );
        camera.look_at(Vec3::from(self.target), Vec3::y());
        camera
    }
}

/// Local transform of an entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformDescription {
    /// Translation
    pub position: [f32; 3],
    /// Rotation axis
    pub axis: [f32; 3],
    /// Rotation angle in degrees
    pub angle_degrees: f32,
    /// Per-axis scale
    pub scale: [f32; 3],
}

impl Default for TransformDescription {
    fn default() -> Self {
        Self {
            position: [0.0; 3],
            axis: [0.0, 1.0, 0.0],
            angle_degrees: 0.0,
            scale: [1.0; 3],
        }
    }
}

impl From<&TransformDescription> for Transform {
    fn from(description: &TransformDescription) -> Self {
        Transform::from_position(Vec3::from(description.position))
            .with_rotation(Vec3::from(description.axis), description.angle_degrees.to_radians())
            .with_scale(Vec3::from(description.scale))
    }
}

/// Graphics facet of an entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphicsDescription {
    /// Renderer type
    pub renderer: RendererType,
    /// Mesh name
    pub mesh: String,
    /// Shared parameter set id
    #[serde(default)]
    pub shared_parameters: Option<String>,
    /// Per-instance parameters, packed as 32-bit floats
    #[serde(default)]
    pub parameters: Option<Vec<f32>>,
    /// Material name
    #[serde(default)]
    pub material: Option<String>,
}

/// Axis-aligned collision box in local space
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollisionDescription {
    /// Minimum corner
    pub min: [f32; 3],
    /// Maximum corner
    pub max: [f32; 3],
}

/// One entity record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityDescription {
    /// Entity name, also used to refer to it as a parent
    pub name: String,
    /// Parent name; the root when absent
    #[serde(default)]
    pub parent: Option<String>,
    /// Local transform
    #[serde(default)]
    pub transform: TransformDescription,
    /// Graphics facet
    #[serde(default)]
    pub graphics: Option<GraphicsDescription>,
    /// Collision box
    #[serde(default)]
    pub collision: Option<CollisionDescription>,
}

/// Complete scene description
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneDescription {
    /// Materials to register
    pub materials: Vec<MaterialDescription>,
    /// Shared parameter sets to register
    pub parameter_sets: Vec<ParameterSetDescription>,
    /// Cameras, primary first
    pub cameras: Vec<CameraDescription>,
    /// Entities, parents before children
    pub entities: Vec<EntityDescription>,
}

impl Config for SceneDescription {}

impl Scene {
    /// Populate the scene from a description
    ///
    /// Returns the nodes of the created entities in description order.
    pub fn load_description(&mut self, description: &SceneDescription) -> SceneResult<Vec<NodeId>> {
        for material in &description.materials {
            self.materials_mut().register(material.name.clone(), material.flags);
        }
        for set in &description.parameter_sets {
            self.parameters_mut().insert(set.id.clone(), ParameterBlock::from_floats(&set.values));
        }
        for (index, camera) in description.cameras.iter().enumerate() {
            match self.camera_mut(index) {
                Some(slot) => *slot = camera.to_camera(),
                None => log::warn!("Ignoring camera {} beyond the configured camera count", index),
            }
        }

        let mut by_name: HashMap<&str, (EntityId, NodeId)> = HashMap::new();
        let mut nodes = Vec::with_capacity(description.entities.len());
        for record in &description.entities {
            let parent = match &record.parent {
                Some(name) => {
                    let found = by_name.get(name.as_str()).copied();
                    Some(found.ok_or_else(|| SceneError::UnknownParent(name.clone()))?)
                }
                None => None,
            };

            let mut entity = self
                .create_entity(record.name.clone())
                .with_transform(Transform::from(&record.transform));
            if let Some(graphics) = &record.graphics {
                entity = entity.with_graphics(self.graphics_component(graphics)?);
            }
            if let Some(collision) = &record.collision {
                entity = entity.with_collision(Aabb::new(Vec3::from(collision.min), Vec3::from(collision.max)));
            }

            let id = entity.id();
            let node = self.add_entity(entity, parent.map(|(id, _)| id), parent.map(|(_, node)| node));
            if by_name.insert(record.name.as_str(), (id, node)).is_some() {
                log::warn!("Entity name '{}' is used more than once; children bind to the latest", record.name);
            }
            nodes.push(node);
        }

        log::info!(
            "Loaded scene description: {} entities, {} materials, {} parameter sets",
            description.entities.len(),
            description.materials.len(),
            description.parameter_sets.len()
        );
        Ok(nodes)
    }

    fn graphics_component(&self, description: &GraphicsDescription) -> SceneResult<GraphicsComponent> {
        let mut component = GraphicsComponent::new(description.renderer, description.mesh.clone());
        if let Some(id) = &description.shared_parameters {
            component = component.with_shared_parameters(id.clone());
        }
        if let Some(values) = &description.parameters {
            component = component.with_instance_parameters(ParameterBlock::from_floats(values));
        }
        if let Some(name) = &description.material {
            let handle = self
                .materials()
                .get(name)
                .ok_or_else(|| SceneError::UnknownMaterial(name.clone()))?;
            component = component.with_material(handle);
        }
        Ok(component)
    }
}
