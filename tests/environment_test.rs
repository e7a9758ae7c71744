use futures::executor::block_on;
use knight_scene::{
    data_structures::texture::{CubeFace, EnvironmentSource},
    resources::environment::{EnvironmentConfig, create_environment_map, procedural_environment_map},
};

use crate::common::test_utils::{FailingLoader, MemoryLoader, png_bytes};

mod common;

fn loader_with_faces(config: &EnvironmentConfig, size_of: impl Fn(usize) -> u32) -> MemoryLoader {
    let mut loader = MemoryLoader::new();
    for (i, path) in config.face_paths().iter().enumerate() {
        loader.insert(path, png_bytes(size_of(i), [10 * i as u8, 20, 30, 255]));
    }
    loader
}

#[test]
fn unreachable_assets_fall_back_to_six_procedural_faces() {
    let config = EnvironmentConfig::default();

    let cube = block_on(create_environment_map(&FailingLoader, &config));

    assert!(cube.is_procedural());
    assert_eq!(cube.faces().len(), 6);
    assert_eq!(cube.size(), config.fallback_size);
    for face in cube.faces() {
        assert_eq!(face.dimensions(), (config.fallback_size, config.fallback_size));
    }
}

#[test]
fn procedural_faces_are_opaque_gradients() {
    let cube = procedural_environment_map(16);

    let top = cube.face(CubeFace::PositiveY);
    let bottom = cube.face(CubeFace::NegativeY);
    let side = cube.face(CubeFace::PositiveX);
    assert!(cube.faces().iter().all(|f| f.pixels().all(|p| p.0[3] == 255)));
    assert!(top.get_pixel(0, 0).0[2] > bottom.get_pixel(0, 0).0[2]);
    assert_eq!(side.get_pixel(3, 0), top.get_pixel(3, 0));
    assert_eq!(side.get_pixel(3, 15), bottom.get_pixel(3, 15));
}

#[test]
fn zero_fallback_size_still_yields_a_valid_cube() {
    let cube = procedural_environment_map(0);
    assert_eq!(cube.size(), 1);
    assert_eq!(cube.faces().len(), 6);
}

#[test]
fn face_paths_follow_the_configured_layout() {
    let config = EnvironmentConfig {
        directory: "sky".to_string(),
        extension: "jpg".to_string(),
        ..Default::default()
    };

    assert_eq!(
        config.face_paths(),
        ["sky/px.jpg", "sky/nx.jpg", "sky/py.jpg", "sky/ny.jpg", "sky/pz.jpg", "sky/nz.jpg"]
            .map(String::from)
    );
}

#[test]
fn six_matching_faces_are_loaded() {
    let config = EnvironmentConfig::default();
    let loader = loader_with_faces(&config, |_| 8);

    let cube = block_on(create_environment_map(&loader, &config));

    assert_eq!(cube.source(), EnvironmentSource::Loaded);
    assert_eq!(cube.size(), 8);
    assert_eq!(cube.face(CubeFace::PositiveY).get_pixel(0, 0).0, [20, 20, 30, 255]);
    assert_eq!(cube.face(CubeFace::NegativeZ).get_pixel(7, 7).0, [50, 20, 30, 255]);
}

#[test]
fn a_missing_face_falls_back() {
    let config = EnvironmentConfig::default();
    let mut loader = MemoryLoader::new();
    for path in config.face_paths().iter().take(5) {
        loader.insert(path, png_bytes(8, [255, 255, 255, 255]));
    }

    let cube = block_on(create_environment_map(&loader, &config));

    assert!(cube.is_procedural());
    assert_eq!(cube.size(), config.fallback_size);
}

#[test]
fn mismatched_face_sizes_fall_back() {
    let config = EnvironmentConfig::default();
    let loader = loader_with_faces(&config, |i| if i == 3 { 16 } else { 8 });

    let cube = block_on(create_environment_map(&loader, &config));

    assert!(cube.is_procedural());
}

#[test]
fn undecodable_faces_fall_back() {
    let config = EnvironmentConfig {
        fallback_size: 4,
        ..Default::default()
    };
    let mut loader = loader_with_faces(&config, |_| 8);
    loader.insert(&config.face_paths()[0], b"not an image".to_vec());

    let cube = block_on(create_environment_map(&loader, &config));

    assert!(cube.is_procedural());
    assert_eq!(cube.size(), 4);
}

#[test]
fn every_cube_map_has_its_own_id() {
    let first = procedural_environment_map(4);
    let copy = first.clone();
    drop(first);
    let second = procedural_environment_map(4);

    assert_ne!(copy.id(), second.id());
    assert_eq!(copy.id(), copy.clone().id());

    let loader = loader_with_faces(&EnvironmentConfig::default(), |_| 8);
    let loaded = block_on(create_environment_map(&loader, &EnvironmentConfig::default()));
    assert_ne!(loaded.id(), second.id());
}
