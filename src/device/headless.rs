//! A render device without a GPU.
//!
//! Frames are "drawn" by walking the scene and recording what would have
//! been submitted. The record is shared through [`HeadlessStats`] so it can
//! still be inspected after the device has been boxed into a host.

use std::{cell::RefCell, collections::HashSet, rc::Rc};

use crate::{
    camera::PerspectiveCamera,
    container::SurfaceId,
    data_structures::{geometry::GeometryId, material::MaterialId, scene_graph::Scene},
    device::{DeviceFactory, RenderDevice, SurfaceSize},
};

#[derive(Clone, Debug, PartialEq)]
pub struct HeadlessRecord {
    pub surface: SurfaceId,
    pub size: SurfaceSize,
    pub frames: usize,
    pub meshes_last_frame: usize,
    pub aspect_last_frame: Option<f32>,
    pub released_geometries: HashSet<GeometryId>,
    pub released_materials: HashSet<MaterialId>,
    pub disposed: bool,
    pub dispose_calls: usize,
}

/// Shared view of what a [`HeadlessDevice`] did.
#[derive(Clone, Debug)]
pub struct HeadlessStats(Rc<RefCell<HeadlessRecord>>);

impl HeadlessStats {
    pub fn snapshot(&self) -> HeadlessRecord {
        self.0.borrow().clone()
    }

    pub fn frames(&self) -> usize {
        self.0.borrow().frames
    }

    pub fn size(&self) -> SurfaceSize {
        self.0.borrow().size
    }

    pub fn is_disposed(&self) -> bool {
        self.0.borrow().disposed
    }
}

#[derive(Debug)]
pub struct HeadlessDevice {
    record: HeadlessStats,
}

impl HeadlessDevice {
    pub fn new(size: SurfaceSize) -> Self {
        Self {
            record: HeadlessStats(Rc::new(RefCell::new(HeadlessRecord {
                surface: SurfaceId::next(),
                size,
                frames: 0,
                meshes_last_frame: 0,
                aspect_last_frame: None,
                released_geometries: HashSet::new(),
                released_materials: HashSet::new(),
                disposed: false,
                dispose_calls: 0,
            }))),
        }
    }

    pub fn stats(&self) -> HeadlessStats {
        self.record.clone()
    }
}

impl RenderDevice for HeadlessDevice {
    fn surface(&self) -> SurfaceId {
        self.record.0.borrow().surface
    }

    fn size(&self) -> SurfaceSize {
        self.record.size()
    }

    fn set_size(&mut self, size: SurfaceSize) {
        self.record.0.borrow_mut().size = size;
    }

    fn render(&mut self, scene: &Scene, camera: &PerspectiveCamera) {
        let mut record = self.record.0.borrow_mut();
        if record.disposed {
            log::warn!("render on a disposed device ignored");
            return;
        }
        record.frames += 1;
        record.meshes_last_frame = scene.meshes().len();
        record.aspect_last_frame = Some(camera.aspect());
    }

    fn release_geometry(&mut self, id: GeometryId) {
        self.record.0.borrow_mut().released_geometries.insert(id);
    }

    fn release_material(&mut self, id: MaterialId) {
        self.record.0.borrow_mut().released_materials.insert(id);
    }

    fn dispose(&mut self) -> bool {
        let mut record = self.record.0.borrow_mut();
        record.dispose_calls += 1;
        !std::mem::replace(&mut record.disposed, true)
    }

    fn is_disposed(&self) -> bool {
        self.record.is_disposed()
    }
}

/// Builds [`HeadlessDevice`]s and keeps the stats of each one it built.
#[derive(Debug, Default)]
pub struct HeadlessFactory {
    created: Vec<HeadlessStats>,
    /// When set, every `create` fails with this message.
    pub fail_with: Option<String>,
}

impl HeadlessFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn created(&self) -> &[HeadlessStats] {
        &self.created
    }

    pub fn last(&self) -> Option<&HeadlessStats> {
        self.created.last()
    }
}

impl DeviceFactory for HeadlessFactory {
    fn create(&mut self, size: SurfaceSize) -> anyhow::Result<Box<dyn RenderDevice>> {
        if let Some(reason) = &self.fail_with {
            anyhow::bail!("{}", reason);
        }
        let device = HeadlessDevice::new(size);
        self.created.push(device.stats());
        Ok(Box::new(device))
    }
}
