//! Resource accounting and asset loading.
//!
//! - [`ResourceTracker`] counts every geometry and material allocated for a
//!   scene and every one released, so teardown can be checked for leaks.
//! - [`AssetLoader`] abstracts where bytes come from (file system natively,
//!   HTTP in the browser).
//! - `environment` provides the reflection cube map with its fallback.
//! - `model_import` imports a model hierarchy from a glTF/GLB file.

use std::{cell::Cell, rc::Rc};

pub mod environment;
pub mod model_import;

#[derive(Debug, Default)]
struct Counters {
    geometries_created: Cell<usize>,
    geometries_disposed: Cell<usize>,
    materials_created: Cell<usize>,
    materials_disposed: Cell<usize>,
}

/// Shared allocation counters. Cloning shares the same counters.
#[derive(Clone, Debug, Default)]
pub struct ResourceTracker(Rc<Counters>);

/// A snapshot of a [`ResourceTracker`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ResourceCounts {
    pub geometries_created: usize,
    pub geometries_disposed: usize,
    pub materials_created: usize,
    pub materials_disposed: usize,
}

impl ResourceCounts {
    pub fn live_geometries(&self) -> usize {
        self.geometries_created - self.geometries_disposed
    }

    pub fn live_materials(&self) -> usize {
        self.materials_created - self.materials_disposed
    }

    /// True when everything that was allocated has been released.
    pub fn is_balanced(&self) -> bool {
        self.live_geometries() == 0 && self.live_materials() == 0
    }
}

impl ResourceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn counts(&self) -> ResourceCounts {
        ResourceCounts {
            geometries_created: self.0.geometries_created.get(),
            geometries_disposed: self.0.geometries_disposed.get(),
            materials_created: self.0.materials_created.get(),
            materials_disposed: self.0.materials_disposed.get(),
        }
    }

    pub(crate) fn geometry_created(&self) {
        bump(&self.0.geometries_created);
    }

    pub(crate) fn geometry_disposed(&self) {
        bump(&self.0.geometries_disposed);
    }

    pub(crate) fn material_created(&self) {
        bump(&self.0.materials_created);
    }

    pub(crate) fn material_disposed(&self) {
        bump(&self.0.materials_disposed);
    }
}

fn bump(counter: &Cell<usize>) {
    counter.set(counter.get() + 1);
}

/// Source of raw asset bytes.
#[allow(async_fn_in_trait)]
pub trait AssetLoader {
    async fn load_binary(&self, file_name: &str) -> anyhow::Result<Vec<u8>>;
}

/// Loads assets from `./assets` natively and from `<origin>/assets` on the web.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultLoader;

impl AssetLoader for DefaultLoader {
    async fn load_binary(&self, file_name: &str) -> anyhow::Result<Vec<u8>> {
        load_binary(file_name).await
    }
}

#[cfg(target_arch = "wasm32")]
fn format_url(file_name: &str) -> anyhow::Result<reqwest::Url> {
    let window = web_sys::window().ok_or_else(|| anyhow::anyhow!("no browser window"))?;
    let origin = window
        .location()
        .origin()
        .map_err(|_| anyhow::anyhow!("page origin is unavailable"))?;
    let base = reqwest::Url::parse(&format!("{}/assets/", origin))?;
    Ok(base.join(file_name.trim_start_matches('/'))?)
}

pub async fn load_binary(file_name: &str) -> anyhow::Result<Vec<u8>> {
    #[cfg(target_arch = "wasm32")]
    let data = {
        let url = format_url(file_name)?;
        let response = reqwest::get(url).await?.error_for_status()?;
        response.bytes().await?.to_vec()
    };
    #[cfg(not(target_arch = "wasm32"))]
    let data = {
        let path = std::path::Path::new("./")
            .join("assets")
            .join(file_name.trim_start_matches('/'));
        std::fs::read(&path)
            .map_err(|e| anyhow::anyhow!("could not read {}: {}", path.display(), e))?
    };

    Ok(data)
}
