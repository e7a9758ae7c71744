//! Render pipelines of the scene.
//!
//! - `basic` holds the lit standard pipeline and the shared pipeline builder
//! - `light` packs the light rig into a uniform and binds the shadow map
//! - `shadow` renders the depth map of the shadow-casting light

pub mod basic;
pub mod light;
pub mod shadow;
