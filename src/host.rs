//! The host component: mount, input routing and teardown.
//!
//! [`SceneHost`] ties a container to a mounted scene. Everything acquired
//! by [`SceneHost::mount`] is released by [`SceneHost::unmount`] in one
//! routine, and the returned [`TeardownReport`] says which steps ran.

use std::rc::Rc;

use crate::{
    config::SceneConfig,
    container::{Container, ListenerId, ListenerKind},
    context::Context,
    data_structures::{material::MaterialFactory, scene_graph::Node, texture::CubeTexture},
    device::DeviceFactory,
    driver::{Driver, DriverState, FrameTicker},
    knight::{DisposeReport, KnightModel, build_knight, release_subtree},
    lighting::{LightRig, setup_lighting},
    resources::ResourceTracker,
};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MountStatus {
    Mounted,
    /// The container cannot host a scene yet; call `mount` again later.
    Deferred,
    AlreadyMounted,
}

/// Which teardown steps did something.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct TeardownReport {
    pub frame_cancelled: bool,
    pub listeners_removed: usize,
    pub model: DisposeReport,
    pub surface_detached: bool,
    pub device_disposed: bool,
}

struct Mounted {
    context: Context,
    model: KnightModel,
    lights: LightRig,
    driver: Driver,
    listeners: Vec<ListenerId>,
}

pub struct SceneHost<C: Container, T: FrameTicker + Clone + 'static> {
    container: C,
    config: SceneConfig,
    ticker: T,
    tracker: ResourceTracker,
    model_template: Option<ModelTemplate>,
    mounted: Option<Mounted>,
}

/// A custom model kept off stage. Every mount places a fresh copy, so the
/// template outlives any number of mount cycles.
struct ModelTemplate {
    root: Node,
}

impl ModelTemplate {
    fn new(model: &Node) -> Self {
        // Template allocations never reach a device and stay out of the
        // host's balance.
        Self {
            root: model.duplicate(&ResourceTracker::new()),
        }
    }

    fn instantiate(&self, tracker: &ResourceTracker) -> Node {
        self.root.duplicate(tracker)
    }
}

impl Drop for ModelTemplate {
    fn drop(&mut self) {
        release_subtree(&self.root, None);
    }
}

impl<C: Container, T: FrameTicker + Clone + 'static> SceneHost<C, T> {
    pub fn new(container: C, config: SceneConfig, ticker: T) -> Self {
        Self {
            container,
            config,
            ticker,
            tracker: ResourceTracker::new(),
            model_template: None,
            mounted: None,
        }
    }

    pub fn container(&self) -> &C {
        &self.container
    }

    pub fn container_mut(&mut self) -> &mut C {
        &mut self.container
    }

    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    /// Counts every geometry and material this host allocated.
    pub fn tracker(&self) -> &ResourceTracker {
        &self.tracker
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted.is_some()
    }

    pub fn context(&self) -> Option<&Context> {
        self.mounted.as_ref().map(|m| &m.context)
    }

    pub fn model(&self) -> Option<&KnightModel> {
        self.mounted.as_ref().map(|m| &m.model)
    }

    pub fn lights(&self) -> Option<&LightRig> {
        self.mounted.as_ref().map(|m| &m.lights)
    }

    pub fn driver(&self) -> Option<&Driver> {
        self.mounted.as_ref().map(|m| &m.driver)
    }

    pub fn driver_state(&self) -> Option<DriverState> {
        self.driver().map(Driver::state)
    }

    /// Materials configured like the ones the host builds, reflecting
    /// `env_map`. Use it for models handed to [`SceneHost::set_model`].
    pub fn material_factory(&self, env_map: Option<Rc<CubeTexture>>) -> MaterialFactory {
        let factory = MaterialFactory::new(&self.tracker);
        match env_map {
            Some(env_map) => factory.with_env_map(env_map, self.config.reflectivity),
            None => factory,
        }
    }

    /// Uses `model` instead of the knight for this and every later mount.
    ///
    /// The host keeps a copy and releases `model` itself right away; a
    /// scene that is already mounted keeps its current model until the
    /// next mount.
    pub fn set_model(&mut self, model: Node) {
        let template = ModelTemplate::new(&model);
        release_subtree(&model, None);
        if self.model_template.replace(template).is_some() {
            log::debug!("custom model replaced");
        }
    }

    /// Goes back to the procedural knight from the next mount on.
    pub fn clear_model(&mut self) {
        self.model_template = None;
    }

    pub fn has_custom_model(&self) -> bool {
        self.model_template.is_some()
    }

    /// Bootstraps a context in the container and mounts the scene into it.
    pub fn mount(&mut self, env_map: Rc<CubeTexture>, factory: &mut dyn DeviceFactory) -> MountStatus {
        if self.mounted.is_some() {
            return MountStatus::AlreadyMounted;
        }
        match Context::bootstrap(&mut self.container, &self.config, factory) {
            Some(context) => self.attach(context, env_map),
            None => MountStatus::Deferred,
        }
    }

    /// Mounts the scene into a pre-built context; the bootstrapper is
    /// skipped.
    pub fn mount_with(&mut self, context: Context, env_map: Rc<CubeTexture>) -> MountStatus {
        if self.mounted.is_some() {
            return MountStatus::AlreadyMounted;
        }
        if !self.container.contains_surface(context.surface()) {
            self.container.append_surface(context.surface());
        }
        self.attach(context, env_map)
    }

    fn attach(&mut self, mut context: Context, env_map: Rc<CubeTexture>) -> MountStatus {
        let lights = setup_lighting(&mut context.scene);
        let model = match &self.model_template {
            Some(template) => {
                KnightModel::place(&mut context.scene, template.instantiate(&self.tracker))
            }
            None => build_knight(&mut context.scene, &self.material_factory(Some(env_map))),
        };

        let listeners = vec![
            self.container.add_listener(ListenerKind::PointerMove),
            self.container.add_listener(ListenerKind::Resize),
        ];

        let mut driver = Driver::new(&self.config.animation, Box::new(self.ticker.clone()));
        driver.attach(&context, &model);

        self.mounted = Some(Mounted {
            context,
            model,
            lights,
            driver,
            listeners,
        });
        log::info!("scene mounted");
        MountStatus::Mounted
    }

    /// Recomputes aspect and drawing-buffer size from the container.
    pub fn resize(&mut self) -> bool {
        let Some(mounted) = self.mounted.as_mut() else {
            return false;
        };
        if !self.container.has_listener(ListenerKind::Resize) {
            return false;
        }
        mounted.context.resize(&self.container)
    }

    /// Reacts to the container changing size. A mounted scene is resized
    /// and `AlreadyMounted` comes back; otherwise a deferred mount is
    /// retried.
    pub fn host_resized(
        &mut self,
        env_map: Rc<CubeTexture>,
        factory: &mut dyn DeviceFactory,
    ) -> MountStatus {
        if self.is_mounted() {
            self.resize();
            return MountStatus::AlreadyMounted;
        }
        self.mount(env_map, factory)
    }

    /// Records a pointer position given in the container's client space.
    pub fn pointer_moved(&mut self, client_x: f32, client_y: f32) {
        let Some(mounted) = self.mounted.as_mut() else {
            return;
        };
        if !self.container.has_listener(ListenerKind::PointerMove) {
            return;
        }
        if let Some(rect) = self.container.bounding_rect() {
            mounted.driver.on_pointer_move(client_x, client_y, &rect);
        }
    }

    /// Runs one animation frame of `dt` seconds.
    pub fn frame(&mut self, dt: f32) -> bool {
        match self.mounted.as_mut() {
            Some(m) => m.driver.frame(dt, &mut m.context, &m.model),
            None => false,
        }
    }

    /// Tears the scene down. Returns `None` if nothing was mounted.
    pub fn unmount(&mut self) -> Option<TeardownReport> {
        let Mounted {
            mut context,
            model,
            lights: _,
            mut driver,
            listeners,
        } = self.mounted.take()?;

        let frame_cancelled = driver.stop();
        let listeners_removed = listeners
            .into_iter()
            .filter(|id| self.container.remove_listener(*id))
            .count();
        let model = model.dispose(&mut context.scene, context.device.as_mut());

        let surface = context.surface();
        let surface_detached =
            self.container.contains_surface(surface) && self.container.remove_surface(surface);
        let device_disposed = !context.device.is_disposed() && context.device.dispose();

        let report = TeardownReport {
            frame_cancelled,
            listeners_removed,
            model,
            surface_detached,
            device_disposed,
        };
        log::info!("scene unmounted: {:?}", report);
        Some(report)
    }
}

impl<C: Container, T: FrameTicker + Clone + 'static> Drop for SceneHost<C, T> {
    fn drop(&mut self) {
        self.unmount();
    }
}
