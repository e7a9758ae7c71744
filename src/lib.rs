//! knight-scene
//!
//! A decorative 3D scene for a chess landing page: a stylized knight built
//! from primitive solids, lit by a fixed light rig, reflecting an
//! environment map, spinning slowly on its own, tilting toward the pointer
//! and gently floating. Runs natively in a winit window and on the web
//! inside a host DOM element.
//!
//! High-level modules
//! - `host`: mount, resize, pointer routing and teardown of one scene
//! - `context`: scene, camera and render device bound to a container
//! - `driver` / `animation`: frame state machine and per-frame motion
//! - `knight`: the model builder and its disposal
//! - `lighting`: the light rig
//! - `camera`: perspective camera and uniform
//! - `container`: the host-container port
//! - `device`: render devices (wgpu and headless)
//! - `data_structures`: transforms, scene graph, geometry, materials, textures
//! - `pipelines`: the lit and shadow render pipelines
//! - `resources`: asset loading, environment map, glTF import, accounting
//! - `config`: tunable configuration
//! - `flow`: the winit event loop
//!

pub mod animation;
pub mod camera;
pub mod config;
pub mod container;
pub mod context;
pub mod data_structures;
pub mod device;
pub mod driver;
pub mod flow;
pub mod host;
pub mod knight;
pub mod lighting;
pub mod pipelines;
pub mod resources;

// Re-exports commonly used types for convenience in downstream code.
pub use config::{ModelSource, SceneConfig};
pub use flow::run;
pub use host::{MountStatus, SceneHost, TeardownReport};
