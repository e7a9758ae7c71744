//! The wgpu render device.
//!
//! [`GpuContext`] is acquired asynchronously (adapter and device requests
//! are futures); [`GpuDeviceFactory`] then hands it to exactly one
//! [`GpuDevice`], which owns the window surface from there on. Geometries and
//! materials are uploaded the first time they are drawn and cached by id
//! until the scene releases them.

use std::{collections::HashMap, sync::Arc};

use wgpu::util::DeviceExt;
use winit::window::Window;

use crate::{
    camera::{CameraUniform, PerspectiveCamera},
    container::SurfaceId,
    data_structures::{
        geometry::{Geometry, GeometryId},
        material::{MaterialId, StandardMaterial},
        scene_graph::{Mesh, Scene},
        texture::{CubeTexture, CubeTextureId, Texture},
        transform::TransformRaw,
    },
    device::{DeviceFactory, RenderDevice, SurfaceSize},
    lighting::ShadowConfig,
    pipelines::{basic, light, shadow},
    resources::environment::procedural_environment_map,
};

/// Adapter, device and the window surface they render to.
#[derive(Debug)]
pub struct GpuContext {
    #[allow(dead_code)]
    instance: wgpu::Instance,
    surface: wgpu::Surface<'static>,
    adapter: wgpu::Adapter,
    device: wgpu::Device,
    queue: wgpu::Queue,
}

impl GpuContext {
    pub async fn new(window: Arc<Window>) -> anyhow::Result<Self> {
        log::info!("WGPU setup");
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            #[cfg(not(target_arch = "wasm32"))]
            backends: wgpu::Backends::PRIMARY,
            #[cfg(target_arch = "wasm32")]
            backends: wgpu::Backends::GL,
            ..Default::default()
        });

        let surface = instance.create_surface(window)?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await?;
        log::info!("device and queue");
        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: None,
                required_features: wgpu::Features::empty(),
                // WebGL doesn't support all of wgpu's features, so if
                // we're building for the web we'll have to disable some.
                required_limits: if cfg!(target_arch = "wasm32") {
                    wgpu::Limits::downlevel_webgl2_defaults()
                } else {
                    wgpu::Limits::default()
                },
                ..Default::default()
            })
            .await?;

        Ok(Self {
            instance,
            surface,
            adapter,
            device,
            queue,
        })
    }
}

/// Hands the single [`GpuContext`] of a window to the first device created.
#[derive(Debug)]
pub struct GpuDeviceFactory {
    context: Option<GpuContext>,
}

impl GpuDeviceFactory {
    pub fn new(context: GpuContext) -> Self {
        Self {
            context: Some(context),
        }
    }
}

impl DeviceFactory for GpuDeviceFactory {
    fn create(&mut self, size: SurfaceSize) -> anyhow::Result<Box<dyn RenderDevice>> {
        let context = self
            .context
            .take()
            .ok_or_else(|| anyhow::anyhow!("the window surface is already bound to a device"))?;
        match GpuDevice::new(context, size) {
            Ok(device) => Ok(Box::new(device)),
            Err(Rejected { context, error }) => {
                self.context = Some(context);
                Err(error)
            }
        }
    }
}

/// A device that could not be built, handing back the context for a
/// later attempt.
#[derive(Debug)]
pub struct Rejected {
    pub context: GpuContext,
    pub error: anyhow::Error,
}

struct GpuGeometry {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    num_indices: u32,
}

struct GpuMaterial {
    #[allow(dead_code)]
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

struct GpuResources {
    context: GpuContext,
    config: wgpu::SurfaceConfiguration,
    depth_texture: Texture,
    shadow_map: Texture,
    shadow_map_size: u32,

    standard_pipeline: wgpu::RenderPipeline,
    shadow_pipeline: wgpu::RenderPipeline,

    camera_uniform: CameraUniform,
    camera_buffer: wgpu::Buffer,
    camera_bind_group: wgpu::BindGroup,
    light_buffer: wgpu::Buffer,
    light_bind_group_layout: wgpu::BindGroupLayout,
    light_bind_group: wgpu::BindGroup,
    shadow_buffer: wgpu::Buffer,
    shadow_bind_group: wgpu::BindGroup,
    material_layout: wgpu::BindGroupLayout,

    instance_buffer: wgpu::Buffer,
    instance_capacity: usize,

    geometries: HashMap<GeometryId, GpuGeometry>,
    materials: HashMap<MaterialId, GpuMaterial>,
    environments: HashMap<CubeTextureId, Texture>,
    placeholder_environment: Texture,
}

pub struct GpuDevice {
    surface_id: SurfaceId,
    size: SurfaceSize,
    resources: Option<GpuResources>,
}

impl std::fmt::Debug for GpuDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GpuDevice")
            .field("surface_id", &self.surface_id)
            .field("size", &self.size)
            .field("disposed", &self.resources.is_none())
            .finish()
    }
}

impl GpuDevice {
    pub fn new(context: GpuContext, size: SurfaceSize) -> Result<Self, Rejected> {
        let (width, height) = size.physical();
        let surface_caps = context.surface.get_capabilities(&context.adapter);
        if surface_caps.formats.is_empty() {
            return Err(Rejected {
                context,
                error: anyhow::anyhow!("the surface is incompatible with the adapter"),
            });
        }
        // The shader writes linear colour and relies on an sRGB target.
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .unwrap_or(surface_caps.formats[0]);
        // The canvas is composited over the page when the platform allows it.
        let alpha_mode = surface_caps
            .alpha_modes
            .iter()
            .copied()
            .find(|m| *m == wgpu::CompositeAlphaMode::PreMultiplied)
            .unwrap_or(surface_caps.alpha_modes[0]);
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width,
            height,
            present_mode: surface_caps.present_modes[0],
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        context.surface.configure(&context.device, &config);

        let device = &context.device;
        let depth_texture = Texture::create_depth_texture(device, [width, height], "depth_texture");
        let shadow_map_size = ShadowConfig::default().map_size;
        let shadow_map = Texture::create_shadow_map(device, shadow_map_size);

        let camera_layout = basic::mk_camera_layout(device);
        let light_bind_group_layout = light::mk_bind_group_layout(device);
        let material_layout = basic::mk_material_layout(device);
        let shadow_layout = shadow::mk_bind_group_layout(device);

        let standard_pipeline = basic::mk_standard_pipeline(
            device,
            config.format,
            &camera_layout,
            &light_bind_group_layout,
            &material_layout,
        );
        let shadow_pipeline = shadow::mk_shadow_pipeline(device, &shadow_layout);

        let camera_uniform = CameraUniform::new();
        let camera_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Camera Buffer"),
            contents: bytemuck::cast_slice(&[camera_uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let camera_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &camera_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: camera_buffer.as_entire_binding(),
            }],
            label: Some("camera_bind_group"),
        });

        let (lights, _) = light::LightsUniform::from_scene(&Scene::new());
        let light_buffer = light::mk_buffer(device, lights);
        let light_bind_group = match mk_light_bind_group(
            device,
            &light_bind_group_layout,
            &light_buffer,
            &shadow_map,
        ) {
            Ok(group) => group,
            Err(error) => return Err(Rejected { context, error }),
        };

        let shadow_buffer = shadow::mk_buffer(device);
        let shadow_bind_group = shadow::mk_bind_group(device, &shadow_layout, &shadow_buffer);

        let instance_capacity = 16;
        let instance_buffer = mk_instance_buffer(device, instance_capacity);

        let placeholder_environment =
            Texture::from_cube(device, &context.queue, &procedural_environment_map(1));

        log::info!(
            "render device ready: {}x{} {:?}",
            width,
            height,
            config.format
        );

        Ok(Self {
            surface_id: SurfaceId::next(),
            size,
            resources: Some(GpuResources {
                config,
                depth_texture,
                shadow_map,
                shadow_map_size,
                standard_pipeline,
                shadow_pipeline,
                camera_uniform,
                camera_buffer,
                camera_bind_group,
                light_buffer,
                light_bind_group_layout,
                light_bind_group,
                shadow_buffer,
                shadow_bind_group,
                material_layout,
                instance_buffer,
                instance_capacity,
                geometries: HashMap::new(),
                materials: HashMap::new(),
                environments: HashMap::new(),
                placeholder_environment,
                context,
            }),
        })
    }
}

fn mk_instance_buffer(device: &wgpu::Device, capacity: usize) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Instance Buffer"),
        size: (capacity * std::mem::size_of::<TransformRaw>()) as wgpu::BufferAddress,
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

fn mk_light_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    buffer: &wgpu::Buffer,
    shadow_map: &Texture,
) -> anyhow::Result<wgpu::BindGroup> {
    let sampler = shadow_map
        .sampler
        .as_ref()
        .ok_or_else(|| anyhow::anyhow!("shadow map without a comparison sampler"))?;
    Ok(light::mk_bind_group(
        device,
        layout,
        buffer,
        &shadow_map.view,
        sampler,
    ))
}

impl GpuResources {
    fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.config.width = width;
        self.config.height = height;
        self.context
            .surface
            .configure(&self.context.device, &self.config);
        self.depth_texture =
            Texture::create_depth_texture(&self.context.device, [width, height], "depth_texture");
    }

    fn ensure_shadow_map(&mut self, size: u32) -> anyhow::Result<()> {
        if size == self.shadow_map_size {
            return Ok(());
        }
        let shadow_map = Texture::create_shadow_map(&self.context.device, size);
        self.light_bind_group = mk_light_bind_group(
            &self.context.device,
            &self.light_bind_group_layout,
            &self.light_buffer,
            &shadow_map,
        )?;
        self.shadow_map = shadow_map;
        self.shadow_map_size = size;
        Ok(())
    }

    fn ensure_instance_capacity(&mut self, count: usize) {
        if count <= self.instance_capacity {
            return;
        }
        let capacity = count.next_power_of_two();
        self.instance_buffer = mk_instance_buffer(&self.context.device, capacity);
        self.instance_capacity = capacity;
    }

    fn upload_geometry(&mut self, geometry: &Geometry) {
        if self.geometries.contains_key(&geometry.id()) {
            return;
        }
        let device = &self.context.device;
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{:?} Vertex Buffer", geometry.name)),
            contents: bytemuck::cast_slice(&geometry.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{:?} Index Buffer", geometry.name)),
            contents: bytemuck::cast_slice(&geometry.indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        self.geometries.insert(
            geometry.id(),
            GpuGeometry {
                vertex_buffer,
                index_buffer,
                num_indices: geometry.indices.len() as u32,
            },
        );
    }

    fn upload_environment(&mut self, env_map: &CubeTexture) -> CubeTextureId {
        let key = env_map.id();
        if !self.environments.contains_key(&key) {
            let texture = Texture::from_cube(&self.context.device, &self.context.queue, env_map);
            self.environments.insert(key, texture);
        }
        key
    }

    fn upload_material(&mut self, material: &StandardMaterial) {
        if self.materials.contains_key(&material.id()) {
            return;
        }
        let env_key = material
            .env_map
            .as_ref()
            .map(|env_map| self.upload_environment(env_map));
        let environment = env_key
            .and_then(|key| self.environments.get(&key))
            .unwrap_or(&self.placeholder_environment);
        let Some(sampler) = environment.sampler.as_ref() else {
            log::warn!("environment texture without sampler");
            return;
        };

        let device = &self.context.device;
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Material Buffer"),
            contents: bytemuck::cast_slice(&[material.to_uniform()]),
            usage: wgpu::BufferUsages::UNIFORM,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &self.material_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&environment.view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
            label: Some("material_bind_group"),
        });
        self.materials
            .insert(material.id(), GpuMaterial { buffer, bind_group });
    }

    fn draw(&mut self, scene: &Scene, camera: &PerspectiveCamera) -> Result<(), wgpu::SurfaceError> {
        let output = self.context.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        // Released resources may still be referenced by a scene that is being
        // torn down; they are skipped rather than uploaded again.
        let meshes: Vec<(&Mesh, TransformRaw)> = scene
            .meshes()
            .into_iter()
            .filter(|(mesh, _)| !mesh.geometry.is_disposed() && !mesh.material.is_disposed())
            .map(|(mesh, world)| (mesh, world.to_raw()))
            .collect();

        for (mesh, _) in meshes.iter() {
            self.upload_geometry(&mesh.geometry);
            self.upload_material(&mesh.material);
        }

        self.camera_uniform.update_view_proj(camera);
        self.context.queue.write_buffer(
            &self.camera_buffer,
            0,
            bytemuck::cast_slice(&[self.camera_uniform]),
        );

        let (lights, shadow_config) = light::LightsUniform::from_scene(scene);
        if let Some(config) = shadow_config {
            if let Err(e) = self.ensure_shadow_map(config.map_size) {
                log::error!("Unable to resize the shadow map {}", e);
            }
            self.context.queue.write_buffer(
                &self.shadow_buffer,
                0,
                bytemuck::cast_slice(&[shadow::ShadowUniform {
                    view_proj: lights.shadow_view_proj().into(),
                }]),
            );
        }
        self.context
            .queue
            .write_buffer(&self.light_buffer, 0, bytemuck::cast_slice(&[lights]));

        let instances: Vec<TransformRaw> = meshes.iter().map(|(_, raw)| *raw).collect();
        self.ensure_instance_capacity(instances.len());
        if !instances.is_empty() {
            self.context.queue.write_buffer(
                &self.instance_buffer,
                0,
                bytemuck::cast_slice(&instances),
            );
        }

        let mut encoder =
            self.context
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("Render Encoder"),
                });

        {
            let mut shadow_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Shadow Pass"),
                color_attachments: &[],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.shadow_map.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            if shadow_config.is_some() {
                shadow_pass.set_pipeline(&self.shadow_pipeline);
                shadow_pass.set_bind_group(0, &self.shadow_bind_group, &[]);
                shadow_pass.set_vertex_buffer(1, self.instance_buffer.slice(..));
                for (idx, (mesh, _)) in meshes.iter().enumerate() {
                    if !mesh.cast_shadow {
                        continue;
                    }
                    if let Some(geometry) = self.geometries.get(&mesh.geometry.id()) {
                        shadow_pass.set_vertex_buffer(0, geometry.vertex_buffer.slice(..));
                        shadow_pass.set_index_buffer(
                            geometry.index_buffer.slice(..),
                            wgpu::IndexFormat::Uint32,
                        );
                        let instance = idx as u32;
                        shadow_pass.draw_indexed(0..geometry.num_indices, 0, instance..instance + 1);
                    }
                }
            }
        }

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(scene.clear_colour),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_texture.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            render_pass.set_pipeline(&self.standard_pipeline);
            render_pass.set_bind_group(0, &self.camera_bind_group, &[]);
            render_pass.set_bind_group(1, &self.light_bind_group, &[]);
            render_pass.set_vertex_buffer(1, self.instance_buffer.slice(..));
            for (idx, (mesh, _)) in meshes.iter().enumerate() {
                let (Some(geometry), Some(material)) = (
                    self.geometries.get(&mesh.geometry.id()),
                    self.materials.get(&mesh.material.id()),
                ) else {
                    continue;
                };
                render_pass.set_bind_group(2, &material.bind_group, &[]);
                render_pass.set_vertex_buffer(0, geometry.vertex_buffer.slice(..));
                render_pass
                    .set_index_buffer(geometry.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                let instance = idx as u32;
                render_pass.draw_indexed(0..geometry.num_indices, 0, instance..instance + 1);
            }
        }

        self.context.queue.submit(std::iter::once(encoder.finish()));
        output.present();
        Ok(())
    }
}

impl RenderDevice for GpuDevice {
    fn surface(&self) -> SurfaceId {
        self.surface_id
    }

    fn size(&self) -> SurfaceSize {
        self.size
    }

    fn set_size(&mut self, size: SurfaceSize) {
        self.size = size;
        if let Some(resources) = self.resources.as_mut() {
            let (width, height) = size.physical();
            resources.resize(width, height);
        }
    }

    fn render(&mut self, scene: &Scene, camera: &PerspectiveCamera) {
        let Some(resources) = self.resources.as_mut() else {
            return;
        };
        match resources.draw(scene, camera) {
            Ok(()) => {}
            // Reconfigure the surface if it's lost or outdated
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                let (width, height) = self.size.physical();
                resources.resize(width, height);
            }
            Err(e) => {
                log::error!("Unable to render {}", e);
            }
        }
    }

    fn release_geometry(&mut self, id: GeometryId) {
        if let Some(resources) = self.resources.as_mut() {
            if let Some(geometry) = resources.geometries.remove(&id) {
                geometry.vertex_buffer.destroy();
                geometry.index_buffer.destroy();
            }
        }
    }

    fn release_material(&mut self, id: MaterialId) {
        if let Some(resources) = self.resources.as_mut() {
            resources.materials.remove(&id);
        }
    }

    fn dispose(&mut self) -> bool {
        match self.resources.take() {
            Some(resources) => {
                for (_, geometry) in resources.geometries {
                    geometry.vertex_buffer.destroy();
                    geometry.index_buffer.destroy();
                }
                for (_, environment) in resources.environments {
                    environment.texture.destroy();
                }
                log::info!("render device disposed");
                true
            }
            None => false,
        }
    }

    fn is_disposed(&self) -> bool {
        self.resources.is_none()
    }
}
