//! The host container a scene is mounted into.
//!
//! A [`Container`] is measured for its bounding box, receives exactly one
//! drawing surface per mounted scene and keeps the pointer and resize
//! listeners that feed the driver. [`WindowContainer`] implements it over a
//! winit window; on the web the canvas is appended into a host DOM element.

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use winit::window::Window;

/// Bounding box in the container's coordinate space (CSS pixels on the web,
/// logical pixels natively).
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn from_size(width: f32, height: f32) -> Self {
        Self::new(0.0, 0.0, width, height)
    }

    /// A rectangle with zero area cannot host a scene yet.
    pub fn is_measurable(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }
}

static NEXT_SURFACE_ID: AtomicU64 = AtomicU64::new(1);
static NEXT_LISTENER_ID: AtomicU64 = AtomicU64::new(1);

/// Identifies the drawing surface of one render device.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct SurfaceId(u64);

impl SurfaceId {
    pub fn next() -> Self {
        Self(NEXT_SURFACE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

impl ListenerId {
    pub fn next() -> Self {
        Self(NEXT_LISTENER_ID.fetch_add(1, Ordering::Relaxed))
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ListenerKind {
    PointerMove,
    Resize,
}

pub trait Container {
    /// `None` while the container is not attached to anything measurable.
    fn bounding_rect(&self) -> Option<Rect>;

    fn device_pixel_ratio(&self) -> f64 {
        1.0
    }

    fn append_surface(&mut self, surface: SurfaceId);

    /// Returns `false` if `surface` was not attached.
    fn remove_surface(&mut self, surface: SurfaceId) -> bool;

    fn contains_surface(&self, surface: SurfaceId) -> bool;

    fn surface_count(&self) -> usize;

    fn add_listener(&mut self, kind: ListenerKind) -> ListenerId;

    /// Returns `false` if `id` was not registered.
    fn remove_listener(&mut self, id: ListenerId) -> bool;

    fn has_listener(&self, kind: ListenerKind) -> bool;
}

/// Surfaces and listeners registered on a container, shared by the
/// implementations of [`Container`].
#[derive(Debug, Default)]
pub struct Attachments {
    surfaces: Vec<SurfaceId>,
    listeners: Vec<(ListenerId, ListenerKind)>,
}

impl Attachments {
    pub fn append_surface(&mut self, surface: SurfaceId) {
        if !self.surfaces.contains(&surface) {
            self.surfaces.push(surface);
        }
    }

    pub fn remove_surface(&mut self, surface: SurfaceId) -> bool {
        let before = self.surfaces.len();
        self.surfaces.retain(|s| *s != surface);
        self.surfaces.len() != before
    }

    pub fn contains_surface(&self, surface: SurfaceId) -> bool {
        self.surfaces.contains(&surface)
    }

    pub fn surface_count(&self) -> usize {
        self.surfaces.len()
    }

    pub fn add_listener(&mut self, kind: ListenerKind) -> ListenerId {
        let id = ListenerId::next();
        self.listeners.push((id, kind));
        id
    }

    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(l, _)| *l != id);
        self.listeners.len() != before
    }

    pub fn has_listener(&self, kind: ListenerKind) -> bool {
        self.listeners.iter().any(|(_, k)| *k == kind)
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

/// A winit window acting as the host container.
#[derive(Debug)]
pub struct WindowContainer {
    window: Arc<Window>,
    #[cfg(target_arch = "wasm32")]
    host: web_sys::Element,
    #[cfg(target_arch = "wasm32")]
    observer: Option<HostObserver>,
    attachments: Attachments,
}

/// A `ResizeObserver` on the host element, disconnected on drop.
#[cfg(target_arch = "wasm32")]
#[derive(Debug)]
struct HostObserver {
    observer: web_sys::ResizeObserver,
    _callback: wasm_bindgen::closure::Closure<dyn FnMut()>,
}

#[cfg(target_arch = "wasm32")]
impl Drop for HostObserver {
    fn drop(&mut self) {
        self.observer.disconnect();
    }
}

impl WindowContainer {
    /// On the web the canvas of `window` is hosted by the element with id
    /// `host_element_id`; natively the id is ignored.
    pub fn new(window: Arc<Window>, host_element_id: &str) -> anyhow::Result<Self> {
        #[cfg(target_arch = "wasm32")]
        let host = web_sys::window()
            .and_then(|w| w.document())
            .and_then(|d| d.get_element_by_id(host_element_id))
            .ok_or_else(|| anyhow::anyhow!("no element with id {}", host_element_id))?;
        #[cfg(not(target_arch = "wasm32"))]
        let _ = host_element_id;

        Ok(Self {
            window,
            #[cfg(target_arch = "wasm32")]
            host,
            #[cfg(target_arch = "wasm32")]
            observer: None,
            attachments: Attachments::default(),
        })
    }

    pub fn window(&self) -> &Arc<Window> {
        &self.window
    }

    /// Calls `on_resize` whenever the host element changes size, and once
    /// right after observation starts. Replaces any earlier callback.
    #[cfg(target_arch = "wasm32")]
    pub fn observe_host(&mut self, on_resize: impl FnMut() + 'static) -> anyhow::Result<()> {
        use wasm_bindgen::{JsCast, closure::Closure};

        let callback = Closure::<dyn FnMut()>::new(on_resize);
        let observer = web_sys::ResizeObserver::new(callback.as_ref().unchecked_ref())
            .map_err(|e| anyhow::anyhow!("could not observe the host element: {:?}", e))?;
        observer.observe(&self.host);
        self.observer = Some(HostObserver {
            observer,
            _callback: callback,
        });
        Ok(())
    }

    /// Sizes the canvas to the host element's box.
    pub fn fit_surface(&self) {
        #[cfg(target_arch = "wasm32")]
        {
            if let Some(rect) = self.bounding_rect().filter(Rect::is_measurable) {
                let size = winit::dpi::LogicalSize::new(rect.width, rect.height);
                // Applied asynchronously; winit reports it back as `Resized`.
                let _ = self.window.request_inner_size(size);
            }
        }
    }
}

impl Container for WindowContainer {
    #[cfg(not(target_arch = "wasm32"))]
    fn bounding_rect(&self) -> Option<Rect> {
        let size: winit::dpi::LogicalSize<f32> =
            self.window.inner_size().to_logical(self.window.scale_factor());
        Some(Rect::from_size(size.width, size.height))
    }

    #[cfg(target_arch = "wasm32")]
    fn bounding_rect(&self) -> Option<Rect> {
        if !self.host.is_connected() {
            return None;
        }
        let rect = self.host.get_bounding_client_rect();
        Some(Rect::new(
            rect.x() as f32,
            rect.y() as f32,
            rect.width() as f32,
            rect.height() as f32,
        ))
    }

    fn device_pixel_ratio(&self) -> f64 {
        self.window.scale_factor()
    }

    fn append_surface(&mut self, surface: SurfaceId) {
        #[cfg(target_arch = "wasm32")]
        {
            use winit::platform::web::WindowExtWebSys;
            if let Some(canvas) = self.window.canvas() {
                if let Err(e) = self.host.append_child(&canvas) {
                    log::warn!("could not append the canvas: {:?}", e);
                }
            }
        }
        self.fit_surface();
        self.attachments.append_surface(surface);
    }

    fn remove_surface(&mut self, surface: SurfaceId) -> bool {
        if !self.attachments.remove_surface(surface) {
            return false;
        }
        #[cfg(target_arch = "wasm32")]
        {
            use winit::platform::web::WindowExtWebSys;
            if let Some(canvas) = self.window.canvas() {
                canvas.remove();
            }
        }
        true
    }

    fn contains_surface(&self, surface: SurfaceId) -> bool {
        self.attachments.contains_surface(surface)
    }

    fn surface_count(&self) -> usize {
        self.attachments.surface_count()
    }

    fn add_listener(&mut self, kind: ListenerKind) -> ListenerId {
        self.attachments.add_listener(kind)
    }

    fn remove_listener(&mut self, id: ListenerId) -> bool {
        self.attachments.remove_listener(id)
    }

    fn has_listener(&self, kind: ListenerKind) -> bool {
        self.attachments.has_listener(kind)
    }
}
