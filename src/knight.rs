//! The chess knight, assembled from primitive solids.
//!
//! All parts hang under one root group. The root carries the resting
//! placement of the piece; the driver animates it from there.

use std::f32::consts::{FRAC_PI_3, FRAC_PI_4, FRAC_PI_6, PI};

use cgmath::Vector3;

use crate::{
    data_structures::{
        geometry::Geometry,
        material::MaterialFactory,
        scene_graph::{Mesh, Node, NodeId, Scene},
        transform::Transform,
    },
    device::RenderDevice,
};

pub const BASE_HEIGHT: f32 = -1.0;
pub const BASE_SCALE: f32 = 0.8;
pub const INITIAL_YAW: f32 = FRAC_PI_4;

const MANE_STRANDS: usize = 5;

/// Handle to a model placed in a scene. Consumed by [`KnightModel::dispose`].
#[derive(Debug)]
pub struct KnightModel {
    root: NodeId,
    rest_position: Vector3<f32>,
    rest_scale: f32,
}

/// What [`KnightModel::dispose`] released.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct DisposeReport {
    /// Whether the root was still in the scene.
    pub detached: bool,
    pub meshes: usize,
    pub geometries_disposed: usize,
    pub materials_disposed: usize,
}

impl KnightModel {
    /// Puts `content` on the stage under a root group at the resting
    /// placement.
    pub fn place(scene: &mut Scene, content: Node) -> Self {
        let rest_position = Vector3::new(0.0, BASE_HEIGHT, 0.0);
        let mut root = Node::group("knight").with_transform(Transform {
            position: rest_position,
            ..Transform::new()
                .with_euler(0.0, INITIAL_YAW, 0.0)
                .with_uniform_scale(BASE_SCALE)
        });
        root.add_child(content);
        let root = scene.add(root);
        scene.update_world_transforms();
        Self {
            root,
            rest_position,
            rest_scale: BASE_SCALE,
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn rest_position(&self) -> Vector3<f32> {
        self.rest_position
    }

    pub fn rest_scale(&self) -> f32 {
        self.rest_scale
    }

    /// Removes the model from `scene` and releases every geometry and
    /// material below it, on the CPU and on `device`. Parts sharing a
    /// geometry or material release it once.
    pub fn dispose(self, scene: &mut Scene, device: &mut dyn RenderDevice) -> DisposeReport {
        let Some(root) = scene.remove(self.root) else {
            log::warn!("model root already removed from the scene");
            return DisposeReport::default();
        };

        let report = DisposeReport {
            detached: true,
            ..release_subtree(&root, Some(device))
        };
        log::debug!("model disposed: {:?}", report);
        report
    }
}

/// Disposes every geometry and material below `node` and drops their GPU
/// copies from `device`. Shared resources are released once.
pub fn release_subtree(node: &Node, mut device: Option<&mut dyn RenderDevice>) -> DisposeReport {
    let mut report = DisposeReport::default();
    node.traverse(&mut |node| {
        let Some(mesh) = node.as_mesh() else {
            return;
        };
        report.meshes += 1;
        if mesh.geometry.dispose() {
            if let Some(device) = device.as_deref_mut() {
                device.release_geometry(mesh.geometry.id());
            }
            report.geometries_disposed += 1;
        }
        if mesh.material.dispose() {
            if let Some(device) = device.as_deref_mut() {
                device.release_material(mesh.material.id());
            }
            report.materials_disposed += 1;
        }
    });
    report
}

fn part(name: &str, geometry: std::rc::Rc<Geometry>, materials: &MaterialFactory, local: Transform) -> Node {
    Node::mesh(name, Mesh::new(geometry, materials.create()).with_shadows()).with_transform(local)
}

/// Builds the knight, adds it to `scene` and returns its handle.
pub fn build_knight(scene: &mut Scene, materials: &MaterialFactory) -> KnightModel {
    let tracker = materials.tracker();
    let mut body = Node::group("knight parts");

    body.add_child(part(
        "base",
        Geometry::cylinder("base", 1.0, 1.2, 0.3, 32, tracker),
        materials,
        Transform::new(),
    ));
    body.add_child(part(
        "column",
        Geometry::cylinder("column", 0.8, 1.0, 0.7, 32, tracker),
        materials,
        Transform::from_position(0.0, 0.5, 0.0),
    ));
    body.add_child(part(
        "body",
        Geometry::cylinder("body", 0.6, 0.8, 0.6, 32, tracker),
        materials,
        Transform::from_position(0.0, 1.1, 0.0),
    ));
    body.add_child(part(
        "head",
        Geometry::sphere("head", 0.45, 32, 32, tracker),
        materials,
        Transform::from_position(0.0, 1.65, 0.1).with_scale(1.0, 1.2, 1.3),
    ));
    body.add_child(part(
        "neck",
        Geometry::cylinder("neck", 0.3, 0.5, 0.4, 24, tracker),
        materials,
        Transform::from_position(0.0, 1.55, -0.2).with_euler(FRAC_PI_4, 0.0, 0.0),
    ));

    // Both ears share one geometry and one material.
    let ear_geometry = Geometry::cone("ear", 0.15, 0.3, 24, tracker);
    let ear_material = materials.create();
    for (name, side) in [("left ear", -1.0f32), ("right ear", 1.0)] {
        body.add_child(
            Node::mesh(
                name,
                Mesh::new(ear_geometry.clone(), ear_material.clone()).with_shadows(),
            )
            .with_transform(
                Transform::from_position(0.25 * side, 1.9, 0.0).with_euler(0.0, 0.0, side * PI / 12.0),
            ),
        );
    }

    body.add_child(part(
        "nose",
        Geometry::cylinder("nose", 0.18, 0.25, 0.5, 24, tracker),
        materials,
        Transform::from_position(0.0, 1.6, 0.5).with_euler(FRAC_PI_3, 0.0, 0.0),
    ));

    // Mane: thin strands down the back of the head, shortening toward the crown.
    for i in 0..MANE_STRANDS {
        let t = i as f32 / (MANE_STRANDS - 1) as f32;
        let length = 0.42 - 0.12 * t;
        let name = format!("mane strand {}", i);
        body.add_child(part(
            &name,
            Geometry::cylinder(&name, 0.035, 0.06, length, 12, tracker),
            materials,
            Transform::from_position(0.0, 1.35 + 0.6 * t, -0.5 + 0.12 * t)
                .with_euler(-FRAC_PI_6 * (1.0 - 0.5 * t), 0.0, 0.0),
        ));
    }

    let model = KnightModel::place(scene, body);
    log::info!("knight built");
    model
}
