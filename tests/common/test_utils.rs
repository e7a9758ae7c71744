#![allow(dead_code)]

use std::{cell::RefCell, collections::HashMap, io::Cursor, rc::Rc};

use knight_scene::{
    SceneConfig, SceneHost,
    container::{Attachments, Container, ListenerId, ListenerKind, Rect, SurfaceId},
    data_structures::texture::CubeTexture,
    device::headless::HeadlessFactory,
    driver::FrameTicker,
    resources::{AssetLoader, environment::procedural_environment_map},
};

/// A container whose size is set by the test. `None` models an element that
/// is not in the document yet.
pub(crate) struct TestContainer {
    rect: Option<Rect>,
    pixel_ratio: f64,
    attachments: Attachments,
}

impl TestContainer {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            rect: Some(Rect::from_size(width, height)),
            pixel_ratio: 1.0,
            attachments: Attachments::default(),
        }
    }

    pub fn detached() -> Self {
        Self {
            rect: None,
            pixel_ratio: 1.0,
            attachments: Attachments::default(),
        }
    }

    pub fn with_pixel_ratio(mut self, pixel_ratio: f64) -> Self {
        self.pixel_ratio = pixel_ratio;
        self
    }

    pub fn set_rect(&mut self, rect: Option<Rect>) {
        self.rect = rect;
    }

    pub fn set_size(&mut self, width: f32, height: f32) {
        let (x, y) = self.rect.map(|r| (r.x, r.y)).unwrap_or((0.0, 0.0));
        self.rect = Some(Rect::new(x, y, width, height));
    }

    pub fn listener_count(&self) -> usize {
        self.attachments.listener_count()
    }
}

impl Container for TestContainer {
    fn bounding_rect(&self) -> Option<Rect> {
        self.rect
    }

    fn device_pixel_ratio(&self) -> f64 {
        self.pixel_ratio
    }

    fn append_surface(&mut self, surface: SurfaceId) {
        self.attachments.append_surface(surface);
    }

    fn remove_surface(&mut self, surface: SurfaceId) -> bool {
        self.attachments.remove_surface(surface)
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

#[derive(Debug, Default)]
pub(crate) struct TickerLog {
    running: bool,
    pending: bool,
    starts: u32,
    requests: u32,
    stops: u32,
}

/// Frame ticker driven by hand. Clones share one log.
#[derive(Clone, Debug, Default)]
pub(crate) struct ManualTicker(Rc<RefCell<TickerLog>>);

impl ManualTicker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.0.borrow().running
    }

    pub fn starts(&self) -> u32 {
        self.0.borrow().starts
    }

    pub fn requests(&self) -> u32 {
        self.0.borrow().requests
    }

    pub fn stops(&self) -> u32 {
        self.0.borrow().stops
    }

    /// Consumes the outstanding request like a display refresh would.
    pub fn fire(&self) -> bool {
        std::mem::replace(&mut self.0.borrow_mut().pending, false)
    }
}

impl FrameTicker for ManualTicker {
    fn start(&mut self) {
        let mut log = self.0.borrow_mut();
        log.running = true;
        log.starts += 1;
    }

    fn request_frame(&mut self) {
        let mut log = self.0.borrow_mut();
        if log.running {
            log.pending = true;
            log.requests += 1;
        }
    }

    fn stop(&mut self) {
        let mut log = self.0.borrow_mut();
        log.running = false;
        log.pending = false;
        log.stops += 1;
    }

    fn has_pending_frame(&self) -> bool {
        self.0.borrow().pending
    }
}

/// Every load fails, as with an unreachable asset server.
pub(crate) struct FailingLoader;

impl AssetLoader for FailingLoader {
    async fn load_binary(&self, file_name: &str) -> anyhow::Result<Vec<u8>> {
        anyhow::bail!("{} is unreachable", file_name)
    }
}

/// Serves assets from memory.
#[derive(Default)]
pub(crate) struct MemoryLoader {
    files: HashMap<String, Vec<u8>>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, file_name: &str, bytes: Vec<u8>) {
        self.files.insert(file_name.to_string(), bytes);
    }
}

impl AssetLoader for MemoryLoader {
    async fn load_binary(&self, file_name: &str) -> anyhow::Result<Vec<u8>> {
        self.files
            .get(file_name)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("{} not found", file_name))
    }
}

pub(crate) fn png_bytes(size: u32, rgba: [u8; 4]) -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(size, size, image::Rgba(rgba));
    let mut bytes = Cursor::new(Vec::new());
    img.write_to(&mut bytes, image::ImageFormat::Png)
        .expect("png encoding");
    bytes.into_inner()
}

pub(crate) type TestHost = SceneHost<TestContainer, ManualTicker>;

pub(crate) fn env_map() -> Rc<CubeTexture> {
    Rc::new(procedural_environment_map(4))
}

pub(crate) fn host(width: f32, height: f32) -> (TestHost, ManualTicker) {
    let ticker = ManualTicker::new();
    let host = SceneHost::new(
        TestContainer::new(width, height),
        SceneConfig::default(),
        ticker.clone(),
    );
    (host, ticker)
}

/// A host mounted on a headless device.
pub(crate) fn mounted_host(width: f32, height: f32) -> (TestHost, ManualTicker, HeadlessFactory) {
    let (mut host, ticker) = host(width, height);
    let mut factory = HeadlessFactory::new();
    host.mount(env_map(), &mut factory);
    assert!(host.is_mounted());
    (host, ticker, factory)
}

pub(crate) fn assert_close(actual: f32, expected: f32, tolerance: f32) {
    assert!(
        (actual - expected).abs() <= tolerance,
        "expected {} ± {}, got {}",
        expected,
        tolerance,
        actual
    );
}
