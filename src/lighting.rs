//! The fixed light rig of the knight scene.
//!
//! Lights are ordinary scene nodes; a directional light shines from its
//! node position toward the origin.

use crate::data_structures::{
    material::srgb_hex,
    scene_graph::{Node, NodeId, Scene},
    transform::Transform,
};

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum LightKind {
    Ambient,
    Directional,
}

/// Depth-map settings of a shadow-casting directional light.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ShadowConfig {
    pub map_size: u32,
    pub near: f32,
    pub far: f32,
    /// Half size of the orthographic shadow frustum.
    pub extent: f32,
}

impl Default for ShadowConfig {
    fn default() -> Self {
        Self {
            map_size: 1024,
            near: 0.5,
            far: 50.0,
            extent: 5.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Light {
    pub kind: LightKind,
    /// Linear RGB.
    pub color: [f32; 3],
    pub intensity: f32,
    pub shadow: Option<ShadowConfig>,
}

impl Light {
    pub fn ambient(hex: u32, intensity: f32) -> Self {
        Self {
            kind: LightKind::Ambient,
            color: srgb_hex(hex),
            intensity,
            shadow: None,
        }
    }

    pub fn directional(hex: u32, intensity: f32) -> Self {
        Self {
            kind: LightKind::Directional,
            color: srgb_hex(hex),
            intensity,
            shadow: None,
        }
    }

    pub fn with_shadow(mut self, shadow: ShadowConfig) -> Self {
        self.shadow = Some(shadow);
        self
    }

    pub fn casts_shadow(&self) -> bool {
        self.shadow.is_some()
    }
}

/// Ids of the lights added by [`setup_lighting`].
#[derive(Copy, Clone, Debug)]
pub struct LightRig {
    pub ambient: NodeId,
    pub key: NodeId,
    pub rim: NodeId,
}

/// Adds the ambient fill, the shadow-casting key light and the violet rim
/// light to `scene`.
pub fn setup_lighting(scene: &mut Scene) -> LightRig {
    let ambient = scene.add(Node::light("ambient light", Light::ambient(0x404040, 3.0)));

    let key = scene.add(
        Node::light(
            "key light",
            Light::directional(0xffffff, 3.0).with_shadow(ShadowConfig::default()),
        )
        .with_transform(Transform::from_position(1.0, 1.0, 1.0)),
    );

    // Rim light for depth.
    let rim = scene.add(
        Node::light("rim light", Light::directional(0x6e59a5, 2.0))
            .with_transform(Transform::from_position(-1.0, 1.0, -1.0)),
    );

    log::debug!("light rig ready");
    LightRig { ambient, key, rim }
}
