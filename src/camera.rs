//! Perspective camera and its GPU uniform.
//!
//! The camera is fixed in place looking at the origin; only its aspect
//! ratio changes, and only when the host container is resized.

use cgmath::{Deg, Matrix4, Point3, Rad, Vector3};

use crate::config::CameraConfig;

#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: cgmath::Matrix4<f32> = cgmath::Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

#[derive(Clone, Debug, PartialEq)]
pub struct PerspectiveCamera {
    pub position: Point3<f32>,
    pub target: Point3<f32>,
    pub up: Vector3<f32>,
    pub fovy: Rad<f32>,
    aspect: f32,
    pub znear: f32,
    pub zfar: f32,
}

impl PerspectiveCamera {
    pub fn new(config: &CameraConfig, width: f32, height: f32) -> Self {
        let mut camera = Self {
            position: config.position.into(),
            target: config.target.into(),
            up: Vector3::unit_y(),
            fovy: Deg(config.fovy_degrees).into(),
            aspect: 1.0,
            znear: config.znear,
            zfar: config.zfar,
        };
        camera.set_aspect(width, height);
        camera
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    /// Sets the aspect to `width / height`. A zero or negative height keeps
    /// the previous aspect and returns `false`.
    pub fn set_aspect(&mut self, width: f32, height: f32) -> bool {
        if !(height > 0.0 && width > 0.0) {
            return false;
        }
        self.aspect = width / height;
        true
    }

    pub fn view_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(self.position, self.target, self.up)
    }

    pub fn projection_matrix(&self) -> Matrix4<f32> {
        OPENGL_TO_WGPU_MATRIX * cgmath::perspective(self.fovy, self.aspect, self.znear, self.zfar)
    }

    pub fn view_projection(&self) -> Matrix4<f32> {
        self.projection_matrix() * self.view_matrix()
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    view_position: [f32; 4],
    view_proj: [[f32; 4]; 4],
}

impl CameraUniform {
    pub fn new() -> Self {
        use cgmath::SquareMatrix;
        Self {
            view_position: [0.0; 4],
            view_proj: cgmath::Matrix4::identity().into(),
        }
    }

    pub fn update_view_proj(&mut self, camera: &PerspectiveCamera) {
        self.view_position = camera.position.to_homogeneous().into();
        self.view_proj = camera.view_projection().into();
    }
}

impl Default for CameraUniform {
    fn default() -> Self {
        Self::new()
    }
}
