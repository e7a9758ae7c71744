use std::f32::consts::FRAC_PI_2;

use cgmath::InnerSpace;
use knight_scene::{
    data_structures::{
        geometry::Geometry,
        material::{MaterialFactory, srgb_hex},
        scene_graph::{Mesh, Node, Scene},
        transform::Transform,
    },
    lighting::{LightKind, ShadowConfig, setup_lighting},
    pipelines::light::LightsUniform,
    resources::ResourceTracker,
};

use crate::common::test_utils::assert_close;

mod common;

#[test]
fn world_transforms_compose_parent_first() {
    let mut scene = Scene::new();
    let mut parent = Node::group("parent").with_transform(
        Transform::from_position(1.0, 0.0, 0.0)
            .with_euler(0.0, FRAC_PI_2, 0.0)
            .with_uniform_scale(2.0),
    );
    let child = parent.add_child(Node::group("child").with_transform(Transform::from_position(1.0, 0.0, 0.0)));
    scene.add(parent);

    scene.update_world_transforms();

    // A quarter turn about Y maps +X onto -Z.
    let world = scene.node(child).unwrap().world().position;
    assert_close(world.x, 1.0, 1e-5);
    assert_close(world.y, 0.0, 1e-5);
    assert_close(world.z, -2.0, 1e-5);
    assert_close(scene.node(child).unwrap().world().scale.x, 2.0, 1e-6);
}

#[test]
fn removing_a_node_detaches_its_subtree() {
    let mut scene = Scene::new();
    let mut parent = Node::group("parent");
    let child = parent.add_child(Node::group("child"));
    let parent = scene.add(parent);

    let removed = scene.remove(parent).unwrap();

    assert_eq!(removed.children().len(), 1);
    assert!(!scene.contains(parent));
    assert!(!scene.contains(child));
    assert!(scene.remove(parent).is_none());
}

#[test]
fn light_rig_matches_the_landing_page() {
    let mut scene = Scene::new();
    let rig = setup_lighting(&mut scene);
    scene.update_world_transforms();

    let ambient = scene.node(rig.ambient).unwrap().as_light().unwrap();
    assert_eq!(ambient.kind, LightKind::Ambient);
    assert_eq!(ambient.color, srgb_hex(0x404040));
    assert_eq!(ambient.intensity, 3.0);

    let key = scene.node(rig.key).unwrap();
    let key_light = key.as_light().unwrap();
    assert_eq!(key_light.kind, LightKind::Directional);
    assert_eq!(key_light.color, [1.0, 1.0, 1.0]);
    assert_eq!(key_light.intensity, 3.0);
    assert_eq!(
        key_light.shadow,
        Some(ShadowConfig {
            map_size: 1024,
            near: 0.5,
            far: 50.0,
            extent: 5.0,
        })
    );
    assert_eq!(key.world().position, cgmath::Vector3::new(1.0, 1.0, 1.0));

    let rim = scene.node(rig.rim).unwrap();
    let rim_light = rim.as_light().unwrap();
    assert_eq!(rim_light.color, srgb_hex(0x6e59a5));
    assert_eq!(rim_light.intensity, 2.0);
    assert!(!rim_light.casts_shadow());
    assert_eq!(rim.world().position, cgmath::Vector3::new(-1.0, 1.0, -1.0));
}

#[test]
fn lights_are_packed_for_the_shader() {
    let mut scene = Scene::new();
    setup_lighting(&mut scene);
    scene.update_world_transforms();

    let (uniform, shadow) = LightsUniform::from_scene(&scene);

    let ambient = srgb_hex(0x404040);
    for (packed, c) in uniform.ambient().iter().zip(ambient) {
        assert_close(*packed, c * 3.0, 1e-6);
    }
    assert_eq!(uniform.directional().len(), 2);
    assert_eq!(uniform.shadow_caster(), Some(0));
    assert_eq!(shadow, Some(ShadowConfig::default()));

    let key = uniform.directional()[0];
    let d = 1.0 / 3.0f32.sqrt();
    for c in key.direction() {
        assert_close(c, d, 1e-6);
    }
    assert_eq!(key.color(), [3.0, 3.0, 3.0]);

    let rim = uniform.directional()[1];
    assert_close(rim.direction()[0], -d, 1e-6);
    assert_close(rim.direction()[2], -d, 1e-6);
}

#[test]
fn scene_without_a_shadow_caster_has_no_shadow_pass() {
    let scene = Scene::new();
    let (uniform, shadow) = LightsUniform::from_scene(&scene);

    assert!(uniform.directional().is_empty());
    assert_eq!(uniform.shadow_caster(), None);
    assert!(shadow.is_none());
}

#[test]
fn primitive_solids_are_well_formed() {
    let tracker = ResourceTracker::new();
    let solids = [
        Geometry::cylinder("cylinder", 0.8, 1.0, 0.7, 32, &tracker),
        Geometry::cone("cone", 0.15, 0.3, 24, &tracker),
        Geometry::sphere("sphere", 0.45, 32, 32, &tracker),
        Geometry::cylinder("thin", 0.035, 0.06, 0.3, 2, &tracker),
    ];

    for solid in &solids {
        assert!(!solid.indices.is_empty());
        assert_eq!(solid.indices.len() % 3, 0, "{}", solid.name);
        assert!(solid.indices.iter().all(|&i| (i as usize) < solid.vertices.len()));
        for vertex in &solid.vertices {
            let n: cgmath::Vector3<f32> = vertex.normal.into();
            assert_close(n.magnitude(), 1.0, 1e-4);
        }
    }
    assert_eq!(tracker.counts().geometries_created, 4);
}

#[test]
fn sphere_vertices_lie_on_the_surface() {
    let tracker = ResourceTracker::new();
    let sphere = Geometry::sphere("sphere", 0.45, 16, 12, &tracker);

    for vertex in &sphere.vertices {
        let p: cgmath::Vector3<f32> = vertex.position.into();
        assert_close(p.magnitude(), 0.45, 1e-5);
    }
}

#[test]
fn cylinder_spans_its_height() {
    let tracker = ResourceTracker::new();
    let cylinder = Geometry::cylinder("base", 1.0, 1.2, 0.3, 32, &tracker);

    let ys = cylinder.vertices.iter().map(|v| v.position[1]);
    let (min, max) = ys.fold((f32::MAX, f32::MIN), |(lo, hi), y| (lo.min(y), hi.max(y)));
    assert_close(min, -0.15, 1e-6);
    assert_close(max, 0.15, 1e-6);
}

#[test]
fn disposal_is_idempotent_and_counted() {
    let tracker = ResourceTracker::new();
    let geometry = Geometry::cone("ear", 0.15, 0.3, 24, &tracker);
    let material = MaterialFactory::new(&tracker).create();
    let mesh = Mesh::new(geometry, material);

    assert!(mesh.geometry.dispose());
    assert!(!mesh.geometry.dispose());
    assert!(mesh.material.dispose());
    assert!(!mesh.material.dispose());
    assert!(mesh.geometry.is_disposed());

    let counts = tracker.counts();
    assert_eq!(counts.geometries_disposed, 1);
    assert_eq!(counts.materials_disposed, 1);
    assert!(counts.is_balanced());
}

#[test]
fn srgb_colours_convert_to_linear() {
    assert_eq!(srgb_hex(0xffffff), [1.0, 1.0, 1.0]);
    assert_eq!(srgb_hex(0x000000), [0.0, 0.0, 0.0]);
    let [r, g, b] = srgb_hex(0x404040);
    assert_eq!(r, g);
    assert_eq!(g, b);
    assert!(r > 0.04 && r < 0.06);
}
