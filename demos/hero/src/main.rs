//! Opens the landing-page hero scene in a window.
//!
//! `hero [model.glb]` places the given glTF model (relative to `assets/`)
//! instead of the knight.

use knight_scene::{ModelSource, SceneConfig};

fn main() -> anyhow::Result<()> {
    let model = match std::env::args().nth(1) {
        Some(path) => ModelSource::Gltf(path),
        None => ModelSource::Procedural,
    };
    knight_scene::run(SceneConfig {
        model,
        ..Default::default()
    })
}
