//! Textures: the CPU-side environment cube map and GPU texture wrappers.
//!
//! [`CubeTexture`] holds six decoded faces and is shared by reference across
//! every material that reflects it. [`Texture`] wraps the WGPU resources
//! created from it, as well as depth and shadow attachments.

use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::*;

/// Faces of a cube map in upload order.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CubeFace {
    PositiveX,
    NegativeX,
    PositiveY,
    NegativeY,
    PositiveZ,
    NegativeZ,
}

impl CubeFace {
    pub const ALL: [CubeFace; 6] = [
        CubeFace::PositiveX,
        CubeFace::NegativeX,
        CubeFace::PositiveY,
        CubeFace::NegativeY,
        CubeFace::PositiveZ,
        CubeFace::NegativeZ,
    ];

    /// Conventional file stem of the face (`px`, `nx`, ...).
    pub fn stem(self) -> &'static str {
        match self {
            CubeFace::PositiveX => "px",
            CubeFace::NegativeX => "nx",
            CubeFace::PositiveY => "py",
            CubeFace::NegativeY => "ny",
            CubeFace::PositiveZ => "pz",
            CubeFace::NegativeZ => "nz",
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

/// Where the faces of an environment map came from.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum EnvironmentSource {
    Loaded,
    Procedural,
}

static NEXT_CUBE_TEXTURE_ID: AtomicU64 = AtomicU64::new(1);

/// Identifies the pixels of a [`CubeTexture`]. Clones share it.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CubeTextureId(u64);

impl CubeTextureId {
    fn next() -> Self {
        Self(NEXT_CUBE_TEXTURE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Six square RGBA faces of identical size.
#[derive(Clone, Debug)]
pub struct CubeTexture {
    id: CubeTextureId,
    faces: [image::RgbaImage; 6],
    source: EnvironmentSource,
}

impl CubeTexture {
    pub fn new(faces: [image::RgbaImage; 6], source: EnvironmentSource) -> Result<Self> {
        let (width, height) = faces[0].dimensions();
        ensure!(width > 0 && width == height, "cube faces must be square, got {width}x{height}");
        for (face, img) in CubeFace::ALL.iter().zip(faces.iter()) {
            ensure!(
                img.dimensions() == (width, height),
                "face {} is {:?}, expected {}x{}",
                face.stem(),
                img.dimensions(),
                width,
                height
            );
        }
        Ok(Self::from_uniform_faces(faces, source))
    }

    /// For faces generated at one square size.
    pub(crate) fn from_uniform_faces(faces: [image::RgbaImage; 6], source: EnvironmentSource) -> Self {
        Self {
            id: CubeTextureId::next(),
            faces,
            source,
        }
    }

    pub fn id(&self) -> CubeTextureId {
        self.id
    }

    pub fn faces(&self) -> &[image::RgbaImage; 6] {
        &self.faces
    }

    pub fn face(&self, face: CubeFace) -> &image::RgbaImage {
        &self.faces[face.index()]
    }

    /// Edge length of every face in pixels.
    pub fn size(&self) -> u32 {
        self.faces[0].width()
    }

    pub fn source(&self) -> EnvironmentSource {
        self.source
    }

    pub fn is_procedural(&self) -> bool {
        self.source == EnvironmentSource::Procedural
    }
}

/// A GPU texture with a view and optional sampler.
#[derive(Clone, Debug)]
pub struct Texture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: Option<wgpu::Sampler>,
}

impl Texture {
    /// Standard depth buffer texture format (32-bit float).
    pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

    /// Create a depth texture for depth-testing during rendering.
    ///
    /// * `size` is [width, height] of the texture in pixels
    /// * `label` is used as a debug label for the GPU resource
    pub fn create_depth_texture(device: &wgpu::Device, size: [u32; 2], label: &str) -> Self {
        let size = wgpu::Extent3d {
            width: size[0].max(1),
            height: size[1].max(1),
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        Self {
            texture,
            view,
            sampler: None,
        }
    }

    /// Square depth map rendered from a shadow-casting light and sampled
    /// with a comparison sampler in the lit pass.
    pub fn create_shadow_map(device: &wgpu::Device, size: u32) -> Self {
        let size = wgpu::Extent3d {
            width: size.max(1),
            height: size.max(1),
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("shadow map"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = Some(device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("shadow sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            compare: Some(wgpu::CompareFunction::LessEqual),
            ..Default::default()
        }));

        Self {
            texture,
            view,
            sampler,
        }
    }

    /// Upload the six faces of `cube` as a cube-dimension texture.
    pub fn from_cube(device: &wgpu::Device, queue: &wgpu::Queue, cube: &CubeTexture) -> Self {
        let edge = cube.size();
        let size = wgpu::Extent3d {
            width: edge,
            height: edge,
            depth_or_array_layers: 6,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("environment cube map"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        for (layer, face) in cube.faces().iter().enumerate() {
            queue.write_texture(
                wgpu::TexelCopyTextureInfo {
                    aspect: wgpu::TextureAspect::All,
                    texture: &texture,
                    mip_level: 0,
                    origin: wgpu::Origin3d {
                        x: 0,
                        y: 0,
                        z: layer as u32,
                    },
                },
                face.as_raw(),
                wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(4 * edge),
                    rows_per_image: Some(edge),
                },
                wgpu::Extent3d {
                    width: edge,
                    height: edge,
                    depth_or_array_layers: 1,
                },
            );
        }

        let view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some("environment cube view"),
            dimension: Some(wgpu::TextureViewDimension::Cube),
            ..Default::default()
        });
        let sampler = Some(create_default_sampler(device));

        Self {
            texture,
            view,
            sampler,
        }
    }
}

pub fn create_default_sampler(device: &wgpu::Device) -> wgpu::Sampler {
    device.create_sampler(&wgpu::SamplerDescriptor {
        address_mode_u: wgpu::AddressMode::ClampToEdge,
        address_mode_v: wgpu::AddressMode::ClampToEdge,
        address_mode_w: wgpu::AddressMode::ClampToEdge,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        ..Default::default()
    })
}
