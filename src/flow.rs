//! Application event loop.
//!
//! [`run`] opens a window (natively) or a canvas inside the configured host
//! element (web), loads the environment map and optional model, mounts a
//! [`SceneHost`] and routes winit events to it:
//!
//! - `Resized` / `ScaleFactorChanged`, and on the web a `ResizeObserver` on
//!   the host element, resize the scene or retry a deferred mount
//! - `CursorMoved` updates the pointer
//! - `RedrawRequested` runs one frame when the driver asked for it
//! - `CloseRequested` tears the scene down and exits

use std::{cell::Cell, rc::Rc, sync::Arc};

use instant::Instant;

use winit::{
    application::ApplicationHandler,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, EventLoop, EventLoopProxy},
    window::Window,
};

use crate::{
    config::{ModelSource, SceneConfig},
    container::{Container, WindowContainer},
    data_structures::texture::CubeTexture,
    device::gpu::{GpuContext, GpuDeviceFactory},
    driver::FrameTicker,
    host::{MountStatus, SceneHost},
    resources::{DefaultLoader, environment::create_environment_map, model_import::load_gltf_model},
};

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

/// Frame ticker over winit redraw requests. Clones share their state.
#[derive(Clone, Debug)]
pub struct WindowTicker {
    window: Arc<Window>,
    running: Rc<Cell<bool>>,
    pending: Rc<Cell<bool>>,
}

impl WindowTicker {
    pub fn new(window: Arc<Window>) -> Self {
        Self {
            window,
            running: Rc::new(Cell::new(false)),
            pending: Rc::new(Cell::new(false)),
        }
    }

    /// Consumes the outstanding request. A redraw that arrives after
    /// [`FrameTicker::stop`] finds nothing to consume.
    pub fn take_pending(&self) -> bool {
        self.pending.replace(false)
    }
}

impl FrameTicker for WindowTicker {
    fn start(&mut self) {
        self.running.set(true);
    }

    fn request_frame(&mut self) {
        if self.running.get() {
            self.pending.set(true);
            self.window.request_redraw();
        }
    }

    fn stop(&mut self) {
        self.running.set(false);
        self.pending.set(false);
    }

    fn has_pending_frame(&self) -> bool {
        self.pending.get()
    }
}

type WindowHost = SceneHost<WindowContainer, WindowTicker>;

struct AppState {
    host: WindowHost,
    ticker: WindowTicker,
    env_map: Rc<CubeTexture>,
    factory: GpuDeviceFactory,
}

impl AppState {
    async fn new(window: Arc<Window>, config: SceneConfig) -> anyhow::Result<Self> {
        let gpu = GpuContext::new(window.clone()).await?;
        let env_map = Rc::new(create_environment_map(&DefaultLoader, &config.environment).await);

        let container = WindowContainer::new(window.clone(), &config.host_element_id)?;
        let ticker = WindowTicker::new(window);
        let mut host = SceneHost::new(container, config.clone(), ticker.clone());

        if let ModelSource::Gltf(path) = &config.model {
            let materials = host.material_factory(Some(env_map.clone()));
            match load_gltf_model(&DefaultLoader, path, &materials).await {
                Ok(model) => host.set_model(model),
                Err(e) => log::warn!("could not import {} ({:#}), using the knight", path, e),
            }
        }

        Ok(Self {
            host,
            ticker,
            env_map,
            factory: GpuDeviceFactory::new(gpu),
        })
    }

    fn mount(&mut self) -> MountStatus {
        let status = self.host.mount(self.env_map.clone(), &mut self.factory);
        log::debug!("mount: {:?}", status);
        status
    }

    fn resize(&mut self) {
        self.host.container().fit_surface();
        let status = self.host.host_resized(self.env_map.clone(), &mut self.factory);
        if status != MountStatus::AlreadyMounted {
            log::debug!("mount: {:?}", status);
        }
    }
}

enum SceneEvent {
    #[allow(dead_code)]
    Initialized(Box<AppState>),
    /// The host element changed size.
    #[allow(dead_code)]
    HostResized,
}

impl std::fmt::Debug for SceneEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Initialized(_) => f.write_str("Initialized"),
            Self::HostResized => f.write_str("HostResized"),
        }
    }
}

struct App {
    #[cfg(not(target_arch = "wasm32"))]
    async_runtime: tokio::runtime::Runtime,
    #[allow(dead_code)]
    proxy: EventLoopProxy<SceneEvent>,
    config: SceneConfig,
    state: Option<AppState>,
    last_time: Instant,
}

impl App {
    fn new(event_loop: &EventLoop<SceneEvent>, config: SceneConfig) -> anyhow::Result<Self> {
        Ok(Self {
            #[cfg(not(target_arch = "wasm32"))]
            async_runtime: tokio::runtime::Runtime::new()?,
            proxy: event_loop.create_proxy(),
            config,
            state: None,
            last_time: Instant::now(),
        })
    }

    fn initialized(&mut self, mut state: AppState) {
        state.mount();
        #[cfg(target_arch = "wasm32")]
        {
            let proxy = self.proxy.clone();
            let observed = state.host.container_mut().observe_host(move || {
                let _ = proxy.send_event(SceneEvent::HostResized);
            });
            if let Err(e) = observed {
                log::warn!("host resizes will not be tracked: {:#}", e);
            }
        }
        self.last_time = Instant::now();
        self.state = Some(state);
    }
}

impl ApplicationHandler<SceneEvent> for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() {
            return;
        }
        let window_attributes = Window::default_attributes().with_title("Knight");
        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                log::error!("could not create a window: {}", e);
                event_loop.exit();
                return;
            }
        };

        let init_future = AppState::new(window, self.config.clone());

        #[cfg(not(target_arch = "wasm32"))]
        {
            match self.async_runtime.block_on(init_future) {
                Ok(state) => self.initialized(state),
                Err(e) => {
                    log::error!("App initialization failed: {:#}", e);
                    event_loop.exit();
                }
            }
        }

        #[cfg(target_arch = "wasm32")]
        {
            let proxy = self.proxy.clone();
            wasm_bindgen_futures::spawn_local(async move {
                match init_future.await {
                    Ok(state) => {
                        if proxy
                            .send_event(SceneEvent::Initialized(Box::new(state)))
                            .is_err()
                        {
                            log::error!("event loop closed before the scene was ready");
                        }
                    }
                    Err(e) => log::error!("App initialization failed: {:#}", e),
                }
            });
        }
    }

    fn user_event(&mut self, _event_loop: &ActiveEventLoop, event: SceneEvent) {
        match event {
            // This is the message from our wasm `spawn_local`
            SceneEvent::Initialized(state) => self.initialized(*state),
            SceneEvent::HostResized => {
                if let Some(state) = self.state.as_mut() {
                    state.resize();
                }
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        let state = match &mut self.state {
            Some(state) => state,
            None => return,
        };

        match event {
            WindowEvent::CloseRequested => {
                state.host.unmount();
                event_loop.exit();
            }
            WindowEvent::Resized(_) | WindowEvent::ScaleFactorChanged { .. } => state.resize(),
            WindowEvent::CursorMoved { position, .. } => {
                let container = state.host.container();
                let scale_factor = container.window().scale_factor();
                let Some(rect) = container.bounding_rect() else {
                    return;
                };
                let logical: winit::dpi::LogicalPosition<f32> = position.to_logical(scale_factor);
                state
                    .host
                    .pointer_moved(rect.x + logical.x, rect.y + logical.y);
            }
            WindowEvent::RedrawRequested => {
                let dt = self.last_time.elapsed();
                self.last_time = Instant::now();
                if state.ticker.take_pending() {
                    state.host.frame(dt.as_secs_f32());
                }
            }
            _ => {}
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(state) = self.state.as_mut() {
            state.host.unmount();
        }
    }
}

pub fn run(config: SceneConfig) -> anyhow::Result<()> {
    #[cfg(not(target_arch = "wasm32"))]
    {
        if let Err(e) = env_logger::try_init() {
            println!("Warning: Could not initialize logger: {}", e);
        };
    }

    #[cfg(target_arch = "wasm32")]
    {
        if let Err(e) = console_log::init_with_level(log::Level::Info) {
            web_sys::console::warn_1(&format!("Could not initialize logger: {}", e).into());
        }
    }

    let event_loop: EventLoop<SceneEvent> = EventLoop::with_user_event().build()?;
    let mut app = App::new(&event_loop, config)?;
    event_loop.run_app(&mut app)?;

    Ok(())
}

/// Web entry point: mounts the scene into the element `host_element_id`.
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen]
pub fn run_web(host_element_id: String) -> Result<(), JsValue> {
    let config = SceneConfig {
        host_element_id,
        ..Default::default()
    };
    run(config).map_err(|e| JsValue::from_str(&format!("{:#}", e)))
}
