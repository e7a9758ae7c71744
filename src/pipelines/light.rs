use cgmath::{EuclideanSpace, InnerSpace, Matrix4, Point3, Vector3};
use wgpu::util::DeviceExt;

use crate::{
    camera::OPENGL_TO_WGPU_MATRIX,
    data_structures::scene_graph::Scene,
    lighting::{LightKind, ShadowConfig},
};

/// Directional lights beyond this many are ignored by the shader.
pub const MAX_DIRECTIONAL_LIGHTS: usize = 4;

/// Distance of the shadow camera from the origin along the light direction.
const SHADOW_CAMERA_DISTANCE: f32 = 10.0;

#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct DirectionalLightRaw {
    /// Unit vector pointing toward the light.
    direction: [f32; 4],
    /// Colour premultiplied by intensity.
    color: [f32; 4],
}

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightsUniform {
    ambient: [f32; 4],
    directional: [DirectionalLightRaw; MAX_DIRECTIONAL_LIGHTS],
    shadow_view_proj: [[f32; 4]; 4],
    // x: directional count, y: index + 1 of the shadow caster or 0
    counts: [u32; 4],
}

impl LightsUniform {
    /// Packs the lights of `scene` (world transforms must be current).
    /// Returns the shadow settings of the first shadow-casting light.
    pub fn from_scene(scene: &Scene) -> (Self, Option<ShadowConfig>) {
        let mut uniform = Self::zeroed();
        let mut shadow = None;
        let mut count = 0usize;

        for (light, world) in scene.lights() {
            let color = light.color.map(|c| c * light.intensity);
            match light.kind {
                LightKind::Ambient => {
                    for (acc, c) in uniform.ambient.iter_mut().zip(color) {
                        *acc += c;
                    }
                }
                LightKind::Directional => {
                    if count == MAX_DIRECTIONAL_LIGHTS {
                        log::warn!("more than {} directional lights", MAX_DIRECTIONAL_LIGHTS);
                        continue;
                    }
                    let direction = if world.position.magnitude2() > 0.0 {
                        world.position.normalize()
                    } else {
                        Vector3::unit_y()
                    };
                    uniform.directional[count] = DirectionalLightRaw {
                        direction: direction.extend(0.0).into(),
                        color: [color[0], color[1], color[2], 1.0],
                    };
                    if let (Some(config), None) = (light.shadow, shadow) {
                        uniform.shadow_view_proj =
                            shadow_view_projection(direction, &config).into();
                        uniform.counts[1] = count as u32 + 1;
                        shadow = Some(config);
                    }
                    count += 1;
                }
            }
        }
        uniform.counts[0] = count as u32;
        (uniform, shadow)
    }

    fn zeroed() -> Self {
        bytemuck::Zeroable::zeroed()
    }

    pub fn ambient(&self) -> [f32; 3] {
        [self.ambient[0], self.ambient[1], self.ambient[2]]
    }

    pub fn directional(&self) -> &[DirectionalLightRaw] {
        &self.directional[..self.counts[0] as usize]
    }

    pub fn shadow_view_proj(&self) -> Matrix4<f32> {
        self.shadow_view_proj.into()
    }

    /// Index of the shadow-casting light in [`Self::directional`].
    pub fn shadow_caster(&self) -> Option<usize> {
        self.counts[1].checked_sub(1).map(|i| i as usize)
    }
}

impl DirectionalLightRaw {
    pub fn direction(&self) -> [f32; 3] {
        [self.direction[0], self.direction[1], self.direction[2]]
    }

    pub fn color(&self) -> [f32; 3] {
        [self.color[0], self.color[1], self.color[2]]
    }
}

/// Orthographic light-space projection looking at the origin from
/// `direction`, covering `±extent` around it.
pub fn shadow_view_projection(direction: Vector3<f32>, config: &ShadowConfig) -> Matrix4<f32> {
    let eye = Point3::from_vec(direction.normalize() * SHADOW_CAMERA_DISTANCE);
    let up = if direction.normalize().y.abs() > 0.99 {
        Vector3::unit_z()
    } else {
        Vector3::unit_y()
    };
    let view = Matrix4::look_at_rh(eye, Point3::new(0.0, 0.0, 0.0), up);
    let e = config.extent;
    OPENGL_TO_WGPU_MATRIX * cgmath::ortho(-e, e, -e, e, config.near, config.far) * view
}

pub fn mk_buffer(device: &wgpu::Device, light_uniform: LightsUniform) -> wgpu::Buffer {
    device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("Lights Buffer"),
        contents: bytemuck::cast_slice(&[light_uniform]),
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
    })
}

/// Light uniform, shadow depth map and its comparison sampler.
pub fn mk_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    multisampled: false,
                    view_dimension: wgpu::TextureViewDimension::D2,
                    sample_type: wgpu::TextureSampleType::Depth,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 2,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Comparison),
                count: None,
            },
        ],
        label: Some("light_bind_group_layout"),
    })
}

pub fn mk_bind_group(
    device: &wgpu::Device,
    bind_group_layout: &wgpu::BindGroupLayout,
    light_buffer: &wgpu::Buffer,
    shadow_view: &wgpu::TextureView,
    shadow_sampler: &wgpu::Sampler,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        layout: bind_group_layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: light_buffer.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::TextureView(shadow_view),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: wgpu::BindingResource::Sampler(shadow_sampler),
            },
        ],
        label: Some("light_bind_group"),
    })
}
