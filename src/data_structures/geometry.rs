//! CPU-side geometry and primitive solids.
//!
//! A [`Geometry`] owns vertex and index data for one mesh part. It is
//! uploaded lazily by a render device and must be released explicitly with
//! [`Geometry::dispose`]; the allocation is accounted in a
//! [`ResourceTracker`].

use std::{
    cell::Cell,
    f32::consts::PI,
    rc::Rc,
    sync::atomic::{AtomicU64, Ordering},
};

use cgmath::InnerSpace;

use crate::resources::ResourceTracker;

/// Describes how a vertex type is laid out in a vertex buffer.
pub trait Vertex {
    fn desc() -> wgpu::VertexBufferLayout<'static>;
}

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ModelVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

impl Vertex for ModelVertex {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<ModelVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x3,
                },
            ],
        }
    }
}

static NEXT_GEOMETRY_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GeometryId(u64);

#[derive(Debug)]
pub struct Geometry {
    id: GeometryId,
    pub name: String,
    pub vertices: Vec<ModelVertex>,
    pub indices: Vec<u32>,
    tracker: ResourceTracker,
    disposed: Cell<bool>,
}

impl Geometry {
    pub fn new(
        name: &str,
        vertices: Vec<ModelVertex>,
        indices: Vec<u32>,
        tracker: &ResourceTracker,
    ) -> Rc<Self> {
        tracker.geometry_created();
        Rc::new(Self {
            id: GeometryId(NEXT_GEOMETRY_ID.fetch_add(1, Ordering::Relaxed)),
            name: name.to_string(),
            vertices,
            indices,
            tracker: tracker.clone(),
            disposed: Cell::new(false),
        })
    }

    pub fn id(&self) -> GeometryId {
        self.id
    }

    /// A fresh geometry with the same vertex data, counted by `tracker`.
    pub fn duplicate(&self, tracker: &ResourceTracker) -> Rc<Self> {
        Self::new(&self.name, self.vertices.clone(), self.indices.clone(), tracker)
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.get()
    }

    /// Releases the geometry. Returns `false` if it was already released.
    pub fn dispose(&self) -> bool {
        if self.disposed.replace(true) {
            return false;
        }
        self.tracker.geometry_disposed();
        true
    }

    /// A cylinder along the Y axis centred on the origin, with caps.
    ///
    /// A `radius_top` of zero produces a cone with the tip at `+height / 2`.
    pub fn cylinder(
        name: &str,
        radius_top: f32,
        radius_bottom: f32,
        height: f32,
        radial_segments: u32,
        tracker: &ResourceTracker,
    ) -> Rc<Self> {
        let (vertices, indices) =
            cylinder_data(radius_top, radius_bottom, height, radial_segments);
        Self::new(name, vertices, indices, tracker)
    }

    pub fn cone(
        name: &str,
        radius: f32,
        height: f32,
        radial_segments: u32,
        tracker: &ResourceTracker,
    ) -> Rc<Self> {
        Self::cylinder(name, 0.0, radius, height, radial_segments, tracker)
    }

    pub fn sphere(
        name: &str,
        radius: f32,
        width_segments: u32,
        height_segments: u32,
        tracker: &ResourceTracker,
    ) -> Rc<Self> {
        let (vertices, indices) = sphere_data(radius, width_segments, height_segments);
        Self::new(name, vertices, indices, tracker)
    }
}

fn cylinder_data(
    radius_top: f32,
    radius_bottom: f32,
    height: f32,
    radial_segments: u32,
) -> (Vec<ModelVertex>, Vec<u32>) {
    let segments = radial_segments.max(3);
    let half_height = height / 2.0;
    let slope = if height > 0.0 {
        (radius_bottom - radius_top) / height
    } else {
        0.0
    };

    let mut vertices = Vec::new();
    let mut indices = Vec::new();

    // Side: a top ring followed by a bottom ring, seam vertex duplicated.
    for (row, radius) in [radius_top, radius_bottom].into_iter().enumerate() {
        let y = if row == 0 { half_height } else { -half_height };
        for x in 0..=segments {
            let theta = x as f32 / segments as f32 * 2.0 * PI;
            let (sin, cos) = theta.sin_cos();
            let normal = cgmath::Vector3::new(sin, slope, cos).normalize();
            vertices.push(ModelVertex {
                position: [radius * sin, y, radius * cos],
                normal: normal.into(),
            });
        }
    }
    let ring = segments + 1;
    for x in 0..segments {
        let a = x;
        let b = ring + x;
        let c = ring + x + 1;
        let d = x + 1;
        indices.extend_from_slice(&[a, b, d, b, c, d]);
    }

    if radius_top > 0.0 {
        push_cap(&mut vertices, &mut indices, radius_top, half_height, segments, true);
    }
    if radius_bottom > 0.0 {
        push_cap(&mut vertices, &mut indices, radius_bottom, -half_height, segments, false);
    }

    (vertices, indices)
}

fn push_cap(
    vertices: &mut Vec<ModelVertex>,
    indices: &mut Vec<u32>,
    radius: f32,
    y: f32,
    segments: u32,
    top: bool,
) {
    let normal = if top { [0.0, 1.0, 0.0] } else { [0.0, -1.0, 0.0] };
    let center = vertices.len() as u32;
    vertices.push(ModelVertex {
        position: [0.0, y, 0.0],
        normal,
    });
    let first = vertices.len() as u32;
    for x in 0..=segments {
        let theta = x as f32 / segments as f32 * 2.0 * PI;
        let (sin, cos) = theta.sin_cos();
        vertices.push(ModelVertex {
            position: [radius * sin, y, radius * cos],
            normal,
        });
    }
    for x in 0..segments {
        let i = first + x;
        if top {
            indices.extend_from_slice(&[center, i, i + 1]);
        } else {
            indices.extend_from_slice(&[center, i + 1, i]);
        }
    }
}

fn sphere_data(
    radius: f32,
    width_segments: u32,
    height_segments: u32,
) -> (Vec<ModelVertex>, Vec<u32>) {
    let width = width_segments.max(3);
    let height = height_segments.max(2);

    let mut vertices = Vec::with_capacity(((width + 1) * (height + 1)) as usize);
    for iy in 0..=height {
        let v = iy as f32 / height as f32;
        let theta = v * PI;
        for ix in 0..=width {
            let u = ix as f32 / width as f32;
            let phi = u * 2.0 * PI;
            let position = cgmath::Vector3::new(
                -radius * phi.cos() * theta.sin(),
                radius * theta.cos(),
                radius * phi.sin() * theta.sin(),
            );
            let normal = if position.magnitude2() > 0.0 {
                position.normalize()
            } else {
                cgmath::Vector3::unit_y()
            };
            vertices.push(ModelVertex {
                position: position.into(),
                normal: normal.into(),
            });
        }
    }

    let ring = width + 1;
    let mut indices = Vec::with_capacity((width * height * 6) as usize);
    for iy in 0..height {
        for ix in 0..width {
            let a = iy * ring + ix + 1;
            let b = iy * ring + ix;
            let c = (iy + 1) * ring + ix;
            let d = (iy + 1) * ring + ix + 1;
            // The pole rows collapse to a point, skip their degenerate halves.
            if iy != 0 {
                indices.extend_from_slice(&[a, b, d]);
            }
            if iy != height - 1 {
                indices.extend_from_slice(&[b, c, d]);
            }
        }
    }

    (vertices, indices)
}
