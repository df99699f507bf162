//! Entity hierarchy stored as an arena of nodes
//!
//! Nodes own their entity and an ordered list of children; the parent link is
//! a plain handle. The root node is created with the graph and can't be
//! removed.

use crate::foundation::collections::{NodeId, SlotMap};
use crate::foundation::math::Mat4;
use crate::scene::entity::{Entity, EntityId};

/// One node of the hierarchy
#[derive(Debug)]
pub struct SceneNode {
    entity: Entity,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl SceneNode {
    /// Entity owned by the node
    pub fn entity(&self) -> &Entity {
        &self.entity
    }

    /// Parent node; `None` for the root
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Children in insertion order
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

/// Arena-backed entity tree
#[derive(Debug)]
pub struct SceneGraph {
    nodes: SlotMap<NodeId, SceneNode>,
    root: NodeId,
}

impl SceneGraph {
    /// Create a graph whose root owns `root_entity`
    pub fn new(root_entity: Entity) -> Self {
        let mut nodes = SlotMap::with_key();
        let root = nodes.insert(SceneNode {
            entity: root_entity,
            parent: None,
            children: Vec::new(),
        });
        Self { nodes, root }
    }

    /// Root node
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Number of nodes including the root
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether only the root exists
    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }

    /// Whether a node handle is live
    pub fn contains(&self, node: NodeId) -> bool {
        self.nodes.contains_key(node)
    }

    /// Node by handle
    pub fn node(&self, node: NodeId) -> Option<&SceneNode> {
        self.nodes.get(node)
    }

    /// Entity of a node
    pub fn entity(&self, node: NodeId) -> Option<&Entity> {
        self.nodes.get(node).map(|node| &node.entity)
    }

    /// Mutable entity of a node
    pub fn entity_mut(&mut self, node: NodeId) -> Option<&mut Entity> {
        self.nodes.get_mut(node).map(|node| &mut node.entity)
    }

    /// Attach `entity` as the last child of `parent`
    ///
    /// # Panics
    /// If `parent` is not a live node.
    pub fn insert(&mut self, parent: NodeId, entity: Entity) -> NodeId {
        assert!(self.nodes.contains_key(parent), "parent node {parent:?} does not exist");
        let node = self.nodes.insert(SceneNode {
            entity,
            parent: Some(parent),
            children: Vec::new(),
        });
        self.nodes[parent].children.push(node);
        node
    }

    /// Depth-first search for the node owning an entity
    pub fn find_entity(&self, id: EntityId) -> Option<NodeId> {
        let mut stack = vec![self.root];
        while let Some(node) = stack.pop() {
            let current = &self.nodes[node];
            if current.entity.id() == id {
                return Some(node);
            }
            stack.extend(current.children.iter().rev());
        }
        None
    }

    /// Node handles in depth-first pre-order, children in order
    pub fn depth_first(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![self.root];
        while let Some(node) = stack.pop() {
            order.push(node);
            stack.extend(self.nodes[node].children.iter().rev());
        }
        order
    }

    /// Visit every node top-down with its parent's world matrix
    ///
    /// `visit` returns the node's world matrix, which its children receive.
    /// The root sees `root_world` as its parent world. The first error stops
    /// the walk.
    pub fn walk_mut<E>(
        &mut self,
        root_world: Mat4,
        mut visit: impl FnMut(&mut Entity, &Mat4) -> Result<Mat4, E>,
    ) -> Result<(), E> {
        let mut stack = vec![(self.root, root_world)];
        while let Some((node, parent_world)) = stack.pop() {
            let current = &mut self.nodes[node];
            let world = visit(&mut current.entity, &parent_world)?;
            stack.extend(current.children.iter().rev().map(|child| (*child, world)));
        }
        Ok(())
    }

    fn detach(&mut self, node: NodeId) -> Option<NodeId> {
        let parent = self.nodes[node].parent?;
        let siblings = &mut self.nodes[parent].children;
        if let Some(index) = siblings.iter().position(|child| *child == node) {
            siblings.remove(index);
        }
        Some(parent)
    }

    /// Remove a node and all of its descendants
    ///
    /// Returns the removed entities, the node's own entity first.
    ///
    /// # Panics
    /// If `node` is the root or not a live node.
    pub fn remove_subtree(&mut self, node: NodeId) -> Vec<Entity> {
        assert!(node != self.root, "the root node can't be removed");
        assert!(self.nodes.contains_key(node), "node {node:?} does not exist");
        self.detach(node);

        let mut removed = Vec::new();
        let mut stack = vec![node];
        while let Some(current) = stack.pop() {
            if let Some(scene_node) = self.nodes.remove(current) {
                stack.extend(scene_node.children.iter().rev());
                removed.push(scene_node.entity);
            }
        }
        removed
    }

    /// Remove a node and hand its children to its parent
    ///
    /// The children are appended, in order, after the parent's existing
    /// children.
    ///
    /// # Panics
    /// If `node` is the root or not a live node.
    pub fn remove_reparent(&mut self, node: NodeId) -> Entity {
        assert!(node != self.root, "the root node can't be removed");
        assert!(self.nodes.contains_key(node), "node {node:?} does not exist");
        let parent = self.detach(node).unwrap_or(self.root);

        let Some(removed) = self.nodes.remove(node) else {
            panic!("node {node:?} does not exist");
        };
        for child in &removed.children {
            self.nodes[*child].parent = Some(parent);
        }
        self.nodes[parent].children.extend_from_slice(&removed.children);
        removed.entity
    }

    /// Check the tree invariant: every non-root node has exactly one live
    /// parent listing it once, and every node is reachable from the root
    pub fn validate(&self) -> bool {
        for (id, node) in &self.nodes {
            match node.parent {
                None if id != self.root => return false,
                Some(_) if id == self.root => return false,
                Some(parent) => {
                    let Some(parent_node) = self.nodes.get(parent) else {
                        return false;
                    };
                    if parent_node.children.iter().filter(|child| **child == id).count() != 1 {
                        return false;
                    }
                }
                None => {}
            }
            if node.children.iter().any(|child| self.nodes.get(*child).map(|c| c.parent) != Some(Some(id))) {
                return false;
            }
        }
        self.depth_first().len() == self.nodes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use crate::foundation::math::Vec3;
    use crate::scene::transform::Transform;

    fn entity(id: u32) -> Entity {
        Entity::new(EntityId(id), format!("e{id}"))
    }

    fn graph() -> SceneGraph {
        SceneGraph::new(entity(0))
    }

    #[test]
    fn test_insert_and_find() {
        let mut graph = graph();
        let a = graph.insert(graph.root(), entity(1));
        let b = graph.insert(a, entity(2));

        assert_eq!(graph.find_entity(EntityId(2)), Some(b));
        assert_eq!(graph.find_entity(EntityId(9)), None);
        assert_eq!(graph.node(b).unwrap().parent(), Some(a));
        assert!(graph.validate());
    }

    #[test]
    #[should_panic(expected = "does not exist")]
    fn test_insert_under_missing_parent_panics() {
        let mut graph = graph();
        let a = graph.insert(graph.root(), entity(1));
        graph.remove_subtree(a);
        graph.insert(a, entity(2));
    }

    #[test]
    fn test_remove_subtree_drops_descendants() {
        let mut graph = graph();
        let a = graph.insert(graph.root(), entity(1));
        let b = graph.insert(a, entity(2));
        graph.insert(b, entity(3));
        let keep = graph.insert(graph.root(), entity(4));

        let removed: Vec<EntityId> = graph.remove_subtree(a).iter().map(Entity::id).collect();

        assert_eq!(removed, vec![EntityId(1), EntityId(2), EntityId(3)]);
        assert_eq!(graph.len(), 2);
        assert_eq!(graph.node(graph.root()).unwrap().children(), &[keep]);
        assert!(graph.validate());
    }

    #[test]
    fn test_remove_reparent_appends_children_in_order() {
        let mut graph = graph();
        let sibling = graph.insert(graph.root(), entity(1));
        let middle = graph.insert(graph.root(), entity(2));
        let c1 = graph.insert(middle, entity(3));
        let c2 = graph.insert(middle, entity(4));

        let removed = graph.remove_reparent(middle);

        assert_eq!(removed.id(), EntityId(2));
        assert_eq!(graph.node(graph.root()).unwrap().children(), &[sibling, c1, c2]);
        assert_eq!(graph.node(c2).unwrap().parent(), Some(graph.root()));
        assert!(graph.validate());
    }

    #[test]
    fn test_depth_first_order() {
        let mut graph = graph();
        let a = graph.insert(graph.root(), entity(1));
        let b = graph.insert(graph.root(), entity(2));
        let a1 = graph.insert(a, entity(3));

        assert_eq!(graph.depth_first(), vec![graph.root(), a, a1, b]);
    }

    #[test]
    fn test_walk_accumulates_parent_transforms() {
        let mut graph = graph();
        let a = graph.insert(
            graph.root(),
            entity(1).with_transform(Transform::from_position(Vec3::new(1.0, 0.0, 0.0))),
        );
        let b = graph.insert(a, entity(2).with_transform(Transform::from_position(Vec3::new(0.0, 2.0, 0.0))));

        let mut worlds = Vec::new();
        graph
            .walk_mut(Mat4::identity(), |entity, parent_world| {
                let world = parent_world * entity.transform.model_matrix();
                worlds.push((entity.id(), world));
                Ok::<_, ()>(world)
            })
            .unwrap();

        assert!(graph.contains(b));
        assert_eq!(worlds.len(), 3);
        assert_eq!(worlds[2].0, EntityId(2));
        assert_relative_eq!(worlds[2].1, Mat4::new_translation(&Vec3::new(1.0, 2.0, 0.0)));
    }

    #[test]
    fn test_walk_stops_on_error() {
        let mut graph = graph();
        let a = graph.insert(graph.root(), entity(1));
        graph.insert(a, entity(2));

        let mut visited = Vec::new();
        let result = graph.walk_mut(Mat4::identity(), |entity, _| {
            visited.push(entity.id());
            if entity.id() == EntityId(1) { Err("stop") } else { Ok(Mat4::identity()) }
        });

        assert_eq!(result, Err("stop"));
        assert_eq!(visited, vec![EntityId(0), EntityId(1)]);
    }
}
