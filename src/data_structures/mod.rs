//! Scene data structures.
//!
//! - `transform` holds local/world transforms and their GPU packing
//! - `geometry` contains vertex data and the primitive solids
//! - `material` contains the PBR material and the shared material factory
//! - `texture` contains the environment cube map and GPU texture wrappers
//! - `scene_graph` enables hierarchical scene organization

pub mod geometry;
pub mod material;
pub mod scene_graph;
pub mod texture;
pub mod transform;
