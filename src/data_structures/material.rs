//! Physically based surface materials and the shared material factory.

use std::{
    cell::Cell,
    rc::Rc,
    sync::atomic::{AtomicU64, Ordering},
};

use crate::{data_structures::texture::CubeTexture, resources::ResourceTracker};

static NEXT_MATERIAL_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MaterialId(u64);

/// Metalness/roughness material, optionally reflecting an environment map.
#[derive(Debug)]
pub struct StandardMaterial {
    id: MaterialId,
    pub color: [f32; 3],
    pub metalness: f32,
    pub roughness: f32,
    pub env_map: Option<Rc<CubeTexture>>,
    /// Weight of the environment reflection, `0.0` disables it.
    pub env_map_intensity: f32,
    tracker: ResourceTracker,
    disposed: Cell<bool>,
}

impl StandardMaterial {
    pub fn new(
        color: [f32; 3],
        metalness: f32,
        roughness: f32,
        env_map: Option<Rc<CubeTexture>>,
        env_map_intensity: f32,
        tracker: &ResourceTracker,
    ) -> Rc<Self> {
        tracker.material_created();
        Rc::new(Self {
            id: MaterialId(NEXT_MATERIAL_ID.fetch_add(1, Ordering::Relaxed)),
            color,
            metalness: metalness.clamp(0.0, 1.0),
            roughness: roughness.clamp(0.0, 1.0),
            env_map,
            env_map_intensity: env_map_intensity.max(0.0),
            tracker: tracker.clone(),
            disposed: Cell::new(false),
        })
    }

    pub fn id(&self) -> MaterialId {
        self.id
    }

    pub fn duplicate(&self, tracker: &ResourceTracker) -> Rc<Self> {
        Self::new(
            self.color,
            self.metalness,
            self.roughness,
            self.env_map.clone(),
            self.env_map_intensity,
            tracker,
        )
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.get()
    }

    /// Releases the material. Returns `false` if it was already released.
    pub fn dispose(&self) -> bool {
        if self.disposed.replace(true) {
            return false;
        }
        self.tracker.material_disposed();
        true
    }

    pub fn to_uniform(&self) -> MaterialUniform {
        let reflects = self.env_map.is_some() && self.env_map_intensity > 0.0;
        MaterialUniform {
            color: [self.color[0], self.color[1], self.color[2], 1.0],
            metalness: self.metalness,
            roughness: self.roughness,
            env_map_intensity: if reflects { self.env_map_intensity } else { 0.0 },
            _padding: 0.0,
        }
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MaterialUniform {
    color: [f32; 4],
    metalness: f32,
    roughness: f32,
    env_map_intensity: f32,
    // Uniforms require 16 byte spacing
    _padding: f32,
}

/// Produces identically configured materials so every part of a model can
/// bind the same environment map with the same reflectivity.
#[derive(Clone, Debug)]
pub struct MaterialFactory {
    pub color: [f32; 3],
    pub metalness: f32,
    pub roughness: f32,
    pub env_map: Option<Rc<CubeTexture>>,
    pub reflectivity: f32,
    tracker: ResourceTracker,
}

impl MaterialFactory {
    pub fn new(tracker: &ResourceTracker) -> Self {
        Self {
            color: srgb_hex(0xf0f0f0),
            metalness: 0.7,
            roughness: 0.3,
            env_map: None,
            reflectivity: 0.5,
            tracker: tracker.clone(),
        }
    }

    pub fn with_env_map(mut self, env_map: Rc<CubeTexture>, reflectivity: f32) -> Self {
        self.env_map = Some(env_map);
        self.reflectivity = reflectivity;
        self
    }

    pub fn tracker(&self) -> &ResourceTracker {
        &self.tracker
    }

    pub fn create(&self) -> Rc<StandardMaterial> {
        StandardMaterial::new(
            self.color,
            self.metalness,
            self.roughness,
            self.env_map.clone(),
            self.reflectivity,
            &self.tracker,
        )
    }
}

/// Converts a `0xRRGGBB` sRGB colour to linear RGB.
pub fn srgb_hex(hex: u32) -> [f32; 3] {
    let channel = |shift: u32| {
        let c = ((hex >> shift) & 0xff) as f32 / 255.0;
        if c <= 0.04045 {
            c / 12.92
        } else {
            ((c + 0.055) / 1.055).powf(2.4)
        }
    };
    [channel(16), channel(8), channel(0)]
}
