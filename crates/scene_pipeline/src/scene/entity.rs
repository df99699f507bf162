//! Scene entities: a transform plus optional graphics, behavior and physics facets

use std::fmt;
use nalgebra::Point3;
use crate::foundation::math::{Mat4, Vec3};
use crate::render::GraphicsComponent;
use crate::scene::transform::Transform;

/// Unique id of an entity within a scene
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub u32);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Opaque handle to a body owned by a physics engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PhysicsBodyHandle(pub u64);

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    /// Minimum corner
    pub min: Vec3,
    /// Maximum corner
    pub max: Vec3,
}

impl Aabb {
    /// Create a box from its corners
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Create a box from a center and half extents
    pub fn from_center_extents(center: Vec3, extents: Vec3) -> Self {
        Self {
            min: center - extents,
            max: center + extents,
        }
    }

    /// Center point
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Half extents
    pub fn extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    /// Whether a point lies inside or on the box
    pub fn contains_point(&self, point: Vec3) -> bool {
        point.x >= self.min.x && point.x <= self.max.x &&
        point.y >= self.min.y && point.y <= self.max.y &&
        point.z >= self.min.z && point.z <= self.max.z
    }

    /// Whether two boxes overlap
    pub fn intersects(&self, other: &Self) -> bool {
        self.min.x <= other.max.x && self.max.x >= other.min.x &&
        self.min.y <= other.max.y && self.max.y >= other.min.y &&
        self.min.z <= other.max.z && self.max.z >= other.min.z
    }

    /// Box enclosing this box after an affine transform
    pub fn transformed(&self, matrix: &Mat4) -> Self {
        let mut min = Vec3::repeat(f32::INFINITY);
        let mut max = Vec3::repeat(f32::NEG_INFINITY);
        for corner in 0..8 {
            let local = Vec3::new(
                if corner & 1 == 0 { self.min.x } else { self.max.x },
                if corner & 2 == 0 { self.min.y } else { self.max.y },
                if corner & 4 == 0 { self.min.z } else { self.max.z },
            );
            let world = matrix.transform_point(&Point3::from(local)).coords;
            min = min.inf(&world);
            max = max.sup(&world);
        }
        Self { min, max }
    }
}

/// Inputs handed to a behavior during traversal
#[derive(Debug, Clone, Copy)]
pub struct UpdateContext<'a> {
    /// Seconds since the scene started
    pub elapsed: f32,
    /// Primary camera view-projection
    pub view_projection: &'a Mat4,
    /// World matrix of the parent node
    pub parent_world: &'a Mat4,
}

/// Script hook run on an entity every frame before its world matrix is computed
pub trait Behavior {
    /// Update the entity's local transform
    fn update(&mut self, transform: &mut Transform, context: &UpdateContext<'_>);
}

impl<F> Behavior for F
where
    F: FnMut(&mut Transform, &UpdateContext<'_>),
{
    fn update(&mut self, transform: &mut Transform, context: &UpdateContext<'_>) {
        self(transform, context);
    }
}

/// Named object in the scene hierarchy
pub struct Entity {
    id: EntityId,
    /// Display name
    pub name: String,
    /// Local transform
    pub transform: Transform,
    /// Graphics facet
    pub graphics: Option<GraphicsComponent>,
    /// Physics body
    pub physics_body: Option<PhysicsBodyHandle>,
    /// Collision volume in local space
    pub collision: Option<Aabb>,
    behavior: Option<Box<dyn Behavior>>,
    world_matrix: Mat4,
}

impl Entity {
    /// Create an entity with an identity transform
    pub fn new(id: EntityId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            transform: Transform::identity(),
            graphics: None,
            physics_body: None,
            collision: None,
            behavior: None,
            world_matrix: Mat4::identity(),
        }
    }

    /// Set the local transform
    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    /// Attach a graphics component
    pub fn with_graphics(mut self, graphics: GraphicsComponent) -> Self {
        self.graphics = Some(graphics);
        self
    }

    /// Attach a behavior
    pub fn with_behavior(mut self, behavior: impl Behavior + 'static) -> Self {
        self.behavior = Some(Box::new(behavior));
        self
    }

    /// Attach a closure as the behavior
    pub fn with_behavior_fn<F>(self, behavior: F) -> Self
    where
        F: FnMut(&mut Transform, &UpdateContext<'_>) + 'static,
    {
        self.with_behavior(behavior)
    }

    /// Replace the behavior of an entity already in a scene
    pub fn set_behavior(&mut self, behavior: impl Behavior + 'static) {
        self.behavior = Some(Box::new(behavior));
    }

    /// Attach a collision volume
    pub fn with_collision(mut self, bounds: Aabb) -> Self {
        self.collision = Some(bounds);
        self
    }

    /// Attach a physics body
    pub fn with_physics_body(mut self, body: PhysicsBodyHandle) -> Self {
        self.physics_body = Some(body);
        self
    }

    /// Entity id
    pub fn id(&self) -> EntityId {
        self.id
    }

    /// World matrix from the last traversal
    pub fn world_matrix(&self) -> &Mat4 {
        &self.world_matrix
    }

    /// Collision volume in world space
    pub fn world_bounds(&self) -> Option<Aabb> {
        self.collision.map(|bounds| bounds.transformed(&self.world_matrix))
    }

    /// Whether the entity is drawn
    pub fn is_renderable(&self) -> bool {
        self.graphics
            .as_ref()
            .is_some_and(|graphics| graphics.renderer.is_renderable())
    }

    /// Run the behavior and recompute the world matrix
    pub(crate) fn update(&mut self, context: &UpdateContext<'_>) -> &Mat4 {
        if let Some(behavior) = self.behavior.as_mut() {
            behavior.update(&mut self.transform, context);
        }
        self.world_matrix = context.parent_world * self.transform.model_matrix();
        &self.world_matrix
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entity")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("transform", &self.transform)
            .field("graphics", &self.graphics)
            .field("physics_body", &self.physics_body)
            .field("collision", &self.collision)
            .field("behavior", &self.behavior.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use crate::render::RendererType;

    #[test]
    fn test_update_composes_parent_world() {
        let parent_world = Mat4::new_translation(&Vec3::new(0.0, 5.0, 0.0));
        let view_projection = Mat4::identity();
        let mut entity = Entity::new(EntityId(1), "child")
            .with_transform(Transform::from_position(Vec3::new(1.0, 0.0, 0.0)));

        let context = UpdateContext { elapsed: 0.0, view_projection: &view_projection, parent_world: &parent_world };
        let world = *entity.update(&context);

        assert_relative_eq!(world, Mat4::new_translation(&Vec3::new(1.0, 5.0, 0.0)));
    }

    #[test]
    fn test_behavior_runs_before_world_matrix() {
        let identity = Mat4::identity();
        let mut entity = Entity::new(EntityId(1), "mover").with_behavior_fn(|transform, context| {
            transform.position.x = context.elapsed * 2.0;
        });

        let context = UpdateContext { elapsed: 1.5, view_projection: &identity, parent_world: &identity };
        entity.update(&context);

        assert_relative_eq!(entity.transform.position.x, 3.0);
        assert_relative_eq!(entity.world_matrix().m14, 3.0);
    }

    #[test]
    fn test_world_bounds_follow_transform() {
        let identity = Mat4::identity();
        let mut entity = Entity::new(EntityId(1), "box")
            .with_transform(Transform::from_position(Vec3::new(10.0, 0.0, 0.0)).with_scale(Vec3::repeat(2.0)))
            .with_collision(Aabb::from_center_extents(Vec3::zeros(), Vec3::repeat(1.0)));
        entity.update(&UpdateContext { elapsed: 0.0, view_projection: &identity, parent_world: &identity });

        let bounds = entity.world_bounds().unwrap();
        assert_relative_eq!(bounds.min, Vec3::new(8.0, -2.0, -2.0), epsilon = 1e-6);
        assert_relative_eq!(bounds.max, Vec3::new(12.0, 2.0, 2.0), epsilon = 1e-6);
        assert!(bounds.contains_point(Vec3::new(11.0, 0.0, 0.0)));
    }

    #[test]
    fn test_none_renderer_is_not_renderable() {
        let hidden = Entity::new(EntityId(1), "hidden").with_graphics(GraphicsComponent::new(RendererType::None, "cube"));
        let shown = Entity::new(EntityId(2), "shown").with_graphics(GraphicsComponent::new(RendererType::Light, "cube"));
        assert!(!hidden.is_renderable());
        assert!(shown.is_renderable());
        assert!(!Entity::new(EntityId(3), "empty").is_renderable());
    }
}
