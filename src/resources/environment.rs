//! Environment map provider.
//!
//! Loads the six faces of the reflection cube map. Whatever goes wrong
//! (missing files, undecodable images, mismatched sizes) the caller gets a
//! structurally valid [`CubeTexture`]: the procedural placeholder.

use image::{Rgba, RgbaImage};

use crate::{
    data_structures::texture::{CubeFace, CubeTexture, EnvironmentSource},
    resources::AssetLoader,
};

#[derive(Clone, Debug, PartialEq)]
pub struct EnvironmentConfig {
    /// Directory of the face images, relative to the asset root.
    pub directory: String,
    /// Image extension of the faces (`png`, `jpg`, ...).
    pub extension: String,
    /// Edge length of the procedural placeholder faces.
    pub fallback_size: u32,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            directory: "envmap".to_string(),
            extension: "png".to_string(),
            fallback_size: 64,
        }
    }
}

impl EnvironmentConfig {
    /// Asset paths of the faces in [`CubeFace::ALL`] order.
    pub fn face_paths(&self) -> [String; 6] {
        CubeFace::ALL.map(|face| format!("{}/{}.{}", self.directory, face.stem(), self.extension))
    }
}

/// Loads the configured cube map or, failing that, builds the placeholder.
pub async fn create_environment_map<L: AssetLoader>(
    loader: &L,
    config: &EnvironmentConfig,
) -> CubeTexture {
    match load_environment_map(loader, config).await {
        Ok(cube) => {
            log::info!("environment map loaded from {}", config.directory);
            cube
        }
        Err(e) => {
            log::warn!(
                "environment map unavailable ({:#}), using procedural placeholder",
                e
            );
            procedural_environment_map(config.fallback_size)
        }
    }
}

async fn load_environment_map<L: AssetLoader>(
    loader: &L,
    config: &EnvironmentConfig,
) -> anyhow::Result<CubeTexture> {
    let paths = config.face_paths();
    let loads = paths.iter().map(|path| async move {
        let bytes = loader.load_binary(path).await?;
        let img = image::load_from_memory(&bytes)
            .map_err(|e| anyhow::anyhow!("could not decode {}: {}", path, e))?;
        Ok::<_, anyhow::Error>(img.to_rgba8())
    });
    let faces = futures::future::try_join_all(loads).await?;
    let faces: [RgbaImage; 6] = faces
        .try_into()
        .map_err(|_| anyhow::anyhow!("expected six cube faces"))?;
    CubeTexture::new(faces, EnvironmentSource::Loaded)
}

const SKY: [f32; 3] = [0.74, 0.78, 0.92];
const HORIZON: [f32; 3] = [0.52, 0.46, 0.66];
const GROUND: [f32; 3] = [0.16, 0.14, 0.20];

/// A flat vertical gradient per face: sky above, ground below, the side
/// faces blending from one to the other through the horizon tone.
pub fn procedural_environment_map(size: u32) -> CubeTexture {
    let size = size.max(1);
    let faces = CubeFace::ALL.map(|face| {
        let (top, bottom) = match face {
            CubeFace::PositiveY => (SKY, SKY),
            CubeFace::NegativeY => (GROUND, GROUND),
            _ => (SKY, GROUND),
        };
        RgbaImage::from_fn(size, size, |_, y| {
            let t = if size > 1 {
                y as f32 / (size - 1) as f32
            } else {
                0.5
            };
            gradient_pixel(top, bottom, t)
        })
    });

    CubeTexture::from_uniform_faces(faces, EnvironmentSource::Procedural)
}

fn gradient_pixel(top: [f32; 3], bottom: [f32; 3], t: f32) -> Rgba<u8> {
    let lerp = |a: [f32; 3], b: [f32; 3], t: f32| -> [f32; 3] {
        [
            a[0] + (b[0] - a[0]) * t,
            a[1] + (b[1] - a[1]) * t,
            a[2] + (b[2] - a[2]) * t,
        ]
    };
    let rgb = if top == bottom {
        top
    } else if t < 0.5 {
        lerp(top, HORIZON, t * 2.0)
    } else {
        lerp(HORIZON, bottom, (t - 0.5) * 2.0)
    };
    let to_u8 = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
    Rgba([to_u8(rgb[0]), to_u8(rgb[1]), to_u8(rgb[2]), 255])
}
