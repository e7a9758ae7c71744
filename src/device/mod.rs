//! Render devices.
//!
//! A [`RenderDevice`] rasterizes a scene seen through a camera into the
//! drawing surface it owns. [`gpu::GpuDevice`] does this with wgpu;
//! [`headless::HeadlessDevice`] only records what it was asked to do and
//! backs tests and environments without a GPU.

use crate::{
    camera::PerspectiveCamera,
    container::SurfaceId,
    data_structures::{geometry::GeometryId, material::MaterialId, scene_graph::Scene},
};

pub mod gpu;
pub mod headless;

/// Size of a drawing buffer: `width × height` in container units, backed by
/// `width * pixel_ratio × height * pixel_ratio` pixels.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SurfaceSize {
    pub width: u32,
    pub height: u32,
    pub pixel_ratio: f64,
}

impl SurfaceSize {
    pub fn new(width: u32, height: u32, pixel_ratio: f64) -> Self {
        Self {
            width,
            height,
            pixel_ratio,
        }
    }

    /// Size in device pixels, never zero.
    pub fn physical(&self) -> (u32, u32) {
        let scale = |v: u32| ((v as f64 * self.pixel_ratio).round() as u32).max(1);
        (scale(self.width), scale(self.height))
    }
}

pub trait RenderDevice {
    fn surface(&self) -> SurfaceId;

    fn size(&self) -> SurfaceSize;

    fn set_size(&mut self, size: SurfaceSize);

    /// Draws one frame. Failures are logged and the frame is dropped.
    fn render(&mut self, scene: &Scene, camera: &PerspectiveCamera);

    /// Frees the GPU copy of a geometry, if one was uploaded.
    fn release_geometry(&mut self, id: GeometryId);

    /// Frees the GPU copy of a material, if one was uploaded.
    fn release_material(&mut self, id: MaterialId);

    /// Releases the surface and every GPU resource. Returns `false` if the
    /// device was already disposed.
    fn dispose(&mut self) -> bool;

    fn is_disposed(&self) -> bool;
}

/// Creates the render device of a newly mounted scene.
pub trait DeviceFactory {
    fn create(&mut self, size: SurfaceSize) -> anyhow::Result<Box<dyn RenderDevice>>;
}
