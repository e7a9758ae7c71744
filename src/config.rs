//! Tunable configuration of the scene.
//!
//! Every value has a default taken from the landing-page hero scene; tune
//! with struct update syntax:
//!
//! ```
//! use knight_scene::config::SceneConfig;
//! use knight_scene::animation::AnimationConfig;
//!
//! let config = SceneConfig {
//!     animation: AnimationConfig {
//!         angular_velocity: 0.3,
//!         ..Default::default()
//!     },
//!     ..Default::default()
//! };
//! assert_eq!(config.max_pixel_ratio, 2.0);
//! ```

use crate::{animation::AnimationConfig, resources::environment::EnvironmentConfig};

#[derive(Clone, Debug, PartialEq)]
pub struct CameraConfig {
    pub fovy_degrees: f32,
    pub znear: f32,
    pub zfar: f32,
    pub position: [f32; 3],
    pub target: [f32; 3],
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fovy_degrees: 75.0,
            znear: 0.1,
            zfar: 1000.0,
            position: [0.0, 0.0, 5.0],
            target: [0.0, 0.0, 0.0],
        }
    }
}

/// What is placed on the stage.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum ModelSource {
    /// The knight assembled from primitive solids.
    #[default]
    Procedural,
    /// A glTF/GLB file relative to the asset root. Falls back to
    /// [`ModelSource::Procedural`] when it cannot be imported.
    Gltf(String),
}

#[derive(Clone, Debug, PartialEq)]
pub struct SceneConfig {
    pub camera: CameraConfig,
    pub animation: AnimationConfig,
    pub environment: EnvironmentConfig,
    /// Weight of environment reflections on every material.
    pub reflectivity: f32,
    /// Upper bound of the device pixel ratio used for the drawing buffer.
    pub max_pixel_ratio: f64,
    /// Id of the DOM element the canvas is appended to (web only).
    pub host_element_id: String,
    pub model: ModelSource,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            camera: CameraConfig::default(),
            animation: AnimationConfig::default(),
            environment: EnvironmentConfig::default(),
            reflectivity: 0.5,
            max_pixel_ratio: 2.0,
            host_element_id: "knight-scene".to_string(),
            model: ModelSource::default(),
        }
    }
}
