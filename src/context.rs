use crate::{
    camera::PerspectiveCamera,
    config::SceneConfig,
    container::{Container, Rect, SurfaceId},
    data_structures::scene_graph::Scene,
    device::{DeviceFactory, RenderDevice, SurfaceSize},
};

/// Scene, camera and render device of one mounted scene.
///
/// The device's surface is attached to the host container for as long as
/// the context is mounted.
pub struct Context {
    pub scene: Scene,
    pub camera: PerspectiveCamera,
    pub device: Box<dyn RenderDevice>,
    max_pixel_ratio: f64,
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("camera", &self.camera)
            .field("surface", &self.device.surface())
            .field("size", &self.device.size())
            .finish()
    }
}

impl Context {
    /// Creates scene, camera and device for `container` and appends the
    /// device's surface to it.
    ///
    /// Returns `None` while the container has no measurable size or when no
    /// device can be created; mounting is then retried later.
    pub fn bootstrap(
        container: &mut dyn Container,
        config: &SceneConfig,
        factory: &mut dyn DeviceFactory,
    ) -> Option<Self> {
        let rect = match container.bounding_rect() {
            Some(rect) if rect.is_measurable() => rect,
            other => {
                log::debug!("container not measurable yet ({:?}), deferring", other);
                return None;
            }
        };
        let pixel_ratio = container.device_pixel_ratio().min(config.max_pixel_ratio);
        let camera = PerspectiveCamera::new(&config.camera, rect.width, rect.height);

        let device = match factory.create(surface_size(&rect, pixel_ratio)) {
            Ok(device) => device,
            Err(e) => {
                log::warn!("no render device ({:#}), deferring", e);
                return None;
            }
        };
        container.append_surface(device.surface());
        log::info!(
            "scene bootstrapped at {}x{} (pixel ratio {})",
            rect.width,
            rect.height,
            pixel_ratio
        );

        Some(Self {
            scene: Scene::new(),
            camera,
            device,
            max_pixel_ratio: config.max_pixel_ratio,
        })
    }

    /// Wraps externally built parts; nothing is created or attached.
    pub fn from_parts(scene: Scene, camera: PerspectiveCamera, device: Box<dyn RenderDevice>) -> Self {
        Self {
            scene,
            camera,
            device,
            max_pixel_ratio: SceneConfig::default().max_pixel_ratio,
        }
    }

    pub fn surface(&self) -> SurfaceId {
        self.device.surface()
    }

    /// Matches camera aspect and drawing buffer to the container's current
    /// size. Returns `false` if the container cannot be measured.
    pub fn resize(&mut self, container: &dyn Container) -> bool {
        let Some(rect) = container.bounding_rect().filter(Rect::is_measurable) else {
            return false;
        };
        let pixel_ratio = container.device_pixel_ratio().min(self.max_pixel_ratio);
        self.camera.set_aspect(rect.width, rect.height);
        self.device.set_size(surface_size(&rect, pixel_ratio));
        log::debug!("resized to {}x{}", rect.width, rect.height);
        true
    }

    pub fn render(&mut self) {
        self.device.render(&self.scene, &self.camera);
    }
}

fn surface_size(rect: &Rect, pixel_ratio: f64) -> SurfaceSize {
    SurfaceSize::new(
        rect.width.round().max(1.0) as u32,
        rect.height.round().max(1.0) as u32,
        pixel_ratio,
    )
}
