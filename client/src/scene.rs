//! Scene collaborator used by the garden sync logic
//!
//! The sync code only needs named lookups, subtree duplication and
//! position/rotation access, captured by the [`Scene`] trait. [`SceneGraph`] is
//! the flat node list the client draws from.

use macroquad::color::{Color, BEIGE, BROWN, DARKGREEN, GOLD, ORANGE, PURPLE, RED, YELLOW};
use macroquad::math::{vec3, Quat, Vec3};
use std::collections::HashMap;
use std::fmt;

/// Scene operations the garden sync needs.
pub trait Scene {
    type Handle: Copy + Eq + fmt::Debug;

    fn find(&self, name: &str) -> Option<Self::Handle>;

    /// Copies `root` and everything under it, appending `suffix` to each name.
    /// The copy has no parent. Returns `None` if `root` no longer exists.
    fn duplicate(&mut self, root: Self::Handle, suffix: &str) -> Option<Self::Handle>;

    fn position(&self, handle: Self::Handle) -> Option<Vec3>;

    fn set_position(&mut self, handle: Self::Handle, position: Vec3);

    fn set_rotation(&mut self, handle: Self::Handle, rotation: Quat);

    /// Removes `root` and its whole subtree.
    fn remove(&mut self, root: Self::Handle);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug, Clone)]
pub struct Node {
    pub name: String,
    pub parent: Option<NodeId>,
    pub position: Vec3,
    pub rotation: Quat,
    pub size: Vec3,
    pub color: Color,
    pub alive: bool,
}

impl Node {
    fn new(name: &str, parent: Option<NodeId>, position: Vec3, size: Vec3, color: Color) -> Self {
        Self {
            name: name.to_string(),
            parent,
            position,
            rotation: Quat::IDENTITY,
            size,
            color,
            alive: true,
        }
    }
}

/// Flat scene graph. Node ids index into `nodes` and are never reused.
#[derive(Debug, Clone, Default)]
pub struct SceneGraph {
    nodes: Vec<Node>,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// The stock garden scene: ground, basket and one prototype per
    /// crop and seed packet, all at the origin.
    pub fn garden() -> Self {
        let mut scene = Self::new();
        scene.add("ground_root", None, vec3(0.0, 0.0, -0.1), vec3(44.0, 44.0, 0.2), DARKGREEN);

        let basket = scene.add("basket_root", None, Vec3::ZERO, vec3(1.6, 1.6, 0.8), BROWN);
        scene.add("basket_handle", Some(basket), vec3(0.0, 0.0, 0.8), vec3(1.6, 0.1, 0.1), BEIGE);

        let prototypes = [
            ("carrot", ORANGE),
            ("tomato", RED),
            ("beet", PURPLE),
        ];
        for (crop, color) in prototypes {
            let root = scene.add(
                &format!("{}_root", crop),
                None,
                Vec3::ZERO,
                vec3(0.5, 0.5, 0.9),
                color,
            );
            scene.add(
                &format!("{}_leaves", crop),
                Some(root),
                vec3(0.0, 0.0, 0.7),
                vec3(0.3, 0.3, 0.4),
                DARKGREEN,
            );

            let seeds = scene.add(
                &format!("{}_seeds_root", crop),
                None,
                Vec3::ZERO,
                vec3(0.6, 0.1, 0.8),
                color,
            );
            scene.add(
                &format!("{}_seeds_label", crop),
                Some(seeds),
                vec3(0.0, 0.06, 0.1),
                vec3(0.4, 0.02, 0.3),
                if crop == "beet" { GOLD } else { YELLOW },
            );
        }
        scene
    }

    pub fn add(
        &mut self,
        name: &str,
        parent: Option<NodeId>,
        position: Vec3,
        size: Vec3,
        color: Color,
    ) -> NodeId {
        self.nodes.push(Node::new(name, parent, position, size, color));
        NodeId(self.nodes.len() - 1)
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0).filter(|n| n.alive)
    }

    pub fn live_nodes(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.alive)
            .map(|(i, n)| (NodeId(i), n))
    }

    pub fn live_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.alive).count()
    }

    /// Position with all parent offsets applied.
    pub fn world_position(&self, id: NodeId) -> Option<Vec3> {
        let mut node = self.node(id)?;
        let mut position = node.position;
        while let Some(parent) = node.parent {
            node = self.node(parent)?;
            position = node.position + node.rotation * position;
        }
        Some(position)
    }

    fn is_under(&self, id: NodeId, root: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(node_id) = current {
            if node_id == root {
                return true;
            }
            current = self.nodes[node_id.0].parent;
        }
        false
    }

    fn subtree(&self, root: NodeId) -> Vec<NodeId> {
        self.live_nodes()
            .map(|(id, _)| id)
            .filter(|id| self.is_under(*id, root))
            .collect()
    }
}

impl Scene for SceneGraph {
    type Handle = NodeId;

    fn find(&self, name: &str) -> Option<NodeId> {
        self.live_nodes()
            .find(|(_, node)| node.name == name)
            .map(|(id, _)| id)
    }

    fn duplicate(&mut self, root: NodeId, suffix: &str) -> Option<NodeId> {
        self.node(root)?;

        let originals = self.subtree(root);
        let mut remap = HashMap::with_capacity(originals.len());
        for old in &originals {
            let mut copy = self.nodes[old.0].clone();
            copy.name.push_str(suffix);
            self.nodes.push(copy);
            remap.insert(*old, NodeId(self.nodes.len() - 1));
        }
        for new in remap.values() {
            let parent = self.nodes[new.0].parent.and_then(|p| remap.get(&p).copied());
            self.nodes[new.0].parent = parent;
        }
        remap.get(&root).copied()
    }

    fn position(&self, handle: NodeId) -> Option<Vec3> {
        self.node(handle).map(|n| n.position)
    }

    fn set_position(&mut self, handle: NodeId, position: Vec3) {
        if let Some(node) = self.nodes.get_mut(handle.0) {
            node.position = position;
        }
    }

    fn set_rotation(&mut self, handle: NodeId, rotation: Quat) {
        if let Some(node) = self.nodes.get_mut(handle.0) {
            node.rotation = rotation;
        }
    }

    fn remove(&mut self, root: NodeId) {
        for id in self.subtree(root) {
            self.nodes[id.0].alive = false;
        }
    }
}
