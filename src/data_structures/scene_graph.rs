//! Scene graph and hierarchical scene organization.
//!
//! A [`Scene`] is a tree of [`Node`]s. Each node has a local [`Transform`];
//! world transforms are derived top-down (`parent * local`) by
//! [`Scene::update_world_transforms`]. Nodes are groups, meshes or lights and
//! are addressed by a [`NodeId`] that stays valid while the node is attached.

use std::{
    collections::HashMap,
    rc::Rc,
    sync::atomic::{AtomicU64, Ordering},
};

use crate::{
    data_structures::{
        geometry::{Geometry, GeometryId},
        material::{MaterialId, StandardMaterial},
        transform::Transform,
    },
    lighting::Light,
    resources::ResourceTracker,
};

/// Copies made so far, so resources shared in the source stay shared.
#[derive(Default)]
struct DuplicateMap {
    geometries: HashMap<GeometryId, Rc<Geometry>>,
    materials: HashMap<MaterialId, Rc<StandardMaterial>>,
}

static NEXT_NODE_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(u64);

impl NodeId {
    fn next() -> Self {
        Self(NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// A drawable: one geometry shaded with one material.
#[derive(Clone, Debug)]
pub struct Mesh {
    pub geometry: Rc<Geometry>,
    pub material: Rc<StandardMaterial>,
    pub cast_shadow: bool,
    pub receive_shadow: bool,
}

impl Mesh {
    pub fn new(geometry: Rc<Geometry>, material: Rc<StandardMaterial>) -> Self {
        Self {
            geometry,
            material,
            cast_shadow: false,
            receive_shadow: false,
        }
    }

    pub fn with_shadows(mut self) -> Self {
        self.cast_shadow = true;
        self.receive_shadow = true;
        self
    }
}

#[derive(Debug)]
pub enum NodeKind {
    Group,
    Mesh(Mesh),
    Light(Light),
}

#[derive(Debug)]
pub struct Node {
    id: NodeId,
    pub name: String,
    pub local: Transform,
    world: Transform,
    pub kind: NodeKind,
    children: Vec<Node>,
}

impl Node {
    fn new(name: &str, kind: NodeKind) -> Self {
        Self {
            id: NodeId::next(),
            name: name.to_string(),
            local: Transform::default(),
            world: Transform::default(),
            kind,
            children: Vec::new(),
        }
    }

    pub fn group(name: &str) -> Self {
        Self::new(name, NodeKind::Group)
    }

    pub fn mesh(name: &str, mesh: Mesh) -> Self {
        Self::new(name, NodeKind::Mesh(mesh))
    }

    pub fn light(name: &str, light: Light) -> Self {
        Self::new(name, NodeKind::Light(light))
    }

    pub fn with_transform(mut self, local: Transform) -> Self {
        self.local = local;
        self
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    /// World transform as of the last [`Scene::update_world_transforms`].
    pub fn world(&self) -> &Transform {
        &self.world
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    pub fn as_mesh(&self) -> Option<&Mesh> {
        match &self.kind {
            NodeKind::Mesh(mesh) => Some(mesh),
            _ => None,
        }
    }

    pub fn as_light(&self) -> Option<&Light> {
        match &self.kind {
            NodeKind::Light(light) => Some(light),
            _ => None,
        }
    }

    pub fn add_child(&mut self, child: Node) -> NodeId {
        let id = child.id;
        self.children.push(child);
        id
    }

    pub fn find(&self, id: NodeId) -> Option<&Node> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(id))
    }

    pub fn find_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter_mut().find_map(|child| child.find_mut(id))
    }

    /// Detaches the descendant `id` together with its subtree.
    pub fn remove_descendant(&mut self, id: NodeId) -> Option<Node> {
        if let Some(idx) = self.children.iter().position(|child| child.id == id) {
            return Some(self.children.remove(idx));
        }
        self.children
            .iter_mut()
            .find_map(|child| child.remove_descendant(id))
    }

    /// Visits this node and every descendant, depth first.
    pub fn traverse<'a>(&'a self, visit: &mut dyn FnMut(&'a Node)) {
        visit(self);
        for child in &self.children {
            child.traverse(visit);
        }
    }

    /// Deep copy of the subtree with new node ids and its own geometries
    /// and materials, allocated through `tracker`.
    pub fn duplicate(&self, tracker: &ResourceTracker) -> Node {
        self.duplicate_with(tracker, &mut DuplicateMap::default())
    }

    fn duplicate_with(&self, tracker: &ResourceTracker, copies: &mut DuplicateMap) -> Node {
        let kind = match &self.kind {
            NodeKind::Group => NodeKind::Group,
            NodeKind::Light(light) => NodeKind::Light(light.clone()),
            NodeKind::Mesh(mesh) => {
                let geometry = copies
                    .geometries
                    .entry(mesh.geometry.id())
                    .or_insert_with(|| mesh.geometry.duplicate(tracker))
                    .clone();
                let material = copies
                    .materials
                    .entry(mesh.material.id())
                    .or_insert_with(|| mesh.material.duplicate(tracker))
                    .clone();
                NodeKind::Mesh(Mesh {
                    geometry,
                    material,
                    cast_shadow: mesh.cast_shadow,
                    receive_shadow: mesh.receive_shadow,
                })
            }
        };
        let mut node = Node::new(&self.name, kind).with_transform(self.local);
        for child in &self.children {
            node.add_child(child.duplicate_with(tracker, copies));
        }
        node
    }

    fn update_world_transforms(&mut self, parent: &Transform) {
        self.world = parent * &self.local;
        let world = self.world;
        for child in self.children.iter_mut() {
            child.update_world_transforms(&world);
        }
    }
}

#[derive(Debug)]
pub struct Scene {
    root: Node,
    pub clear_colour: wgpu::Color,
}

impl Scene {
    pub fn new() -> Self {
        Self {
            root: Node::group("scene"),
            // The canvas is composited over the page.
            clear_colour: wgpu::Color::TRANSPARENT,
        }
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    pub fn add(&mut self, node: Node) -> NodeId {
        self.root.add_child(node)
    }

    pub fn remove(&mut self, id: NodeId) -> Option<Node> {
        self.root.remove_descendant(id)
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.root.find(id)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.root.find_mut(id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.node(id).is_some()
    }

    pub fn traverse<'a>(&'a self, visit: &mut dyn FnMut(&'a Node)) {
        self.root.traverse(visit);
    }

    pub fn update_world_transforms(&mut self) {
        self.root.update_world_transforms(&Transform::default());
    }

    /// Every mesh with its world transform, in traversal order.
    pub fn meshes(&self) -> Vec<(&Mesh, Transform)> {
        let mut meshes = Vec::new();
        self.traverse(&mut |node| {
            if let Some(mesh) = node.as_mesh() {
                meshes.push((mesh, *node.world()));
            }
        });
        meshes
    }

    /// Every light with its world transform, in traversal order.
    pub fn lights(&self) -> Vec<(&Light, Transform)> {
        let mut lights = Vec::new();
        self.traverse(&mut |node| {
            if let Some(light) = node.as_light() {
                lights.push((light, *node.world()));
            }
        });
        lights
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}
