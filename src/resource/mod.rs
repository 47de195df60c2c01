//! Resource acquisition for the prepare stage.
//!
//! The only resources the pipeline currently prepares are image bytes
//! referenced by `src` attributes. Fetching is abstracted behind
//! [`ResourceFetcher`] so hosts and tests can supply their own source;
//! [`HttpFetcher`] is the production implementation.

use std::collections::HashMap;
use std::fmt::Debug;
use std::io::Read;
use std::sync::{Arc, RwLock};
use thiserror::Error;

/// Shared resource data type (reference-counted bytes).
pub type SharedResourceData = Arc<Vec<u8>>;

/// Error type for resource fetch operations.
#[derive(Error, Debug, Clone)]
pub enum FetchError {
    #[error("resource not found: {0}")]
    NotFound(String),

    #[error("failed to fetch '{url}': {message}")]
    Failed { url: String, message: String },
}

/// Per-node preparation error. Non-fatal: the orchestrator logs it and
/// leaves the node without an image.
#[derive(Error, Debug, Clone)]
pub enum PrepareError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("failed to decode image from '{url}': {message}")]
    Decode { url: String, message: String },
}

/// Decoded image bytes together with their intrinsic pixel dimensions,
/// attached to image nodes by the prepare stage.
#[derive(Debug, Clone)]
pub struct PreparedImage {
    pub width: u32,
    pub height: u32,
    pub data: SharedResourceData,
}

impl PreparedImage {
    /// width / height aspect ratio of the source pixels.
    pub fn aspect_ratio(&self) -> f32 {
        self.width as f32 / self.height as f32
    }
}

/// A source of resource bytes, keyed by URL.
pub trait ResourceFetcher: Send + Sync + Debug {
    fn fetch(&self, url: &str) -> Result<SharedResourceData, FetchError>;

    /// Human-readable name for logging.
    fn name(&self) -> &'static str;
}

/// Fetches resources over HTTP with a shared agent.
#[derive(Debug)]
pub struct HttpFetcher {
    agent: ureq::Agent,
}

impl HttpFetcher {
    pub fn new() -> Self {
        HttpFetcher { agent: ureq::agent() }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceFetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<SharedResourceData, FetchError> {
        log::info!("[PREPARE] Fetching image from {}", url);
        let response = self.agent.get(url).call().map_err(|e| FetchError::Failed {
            url: url.to_string(),
            message: e.to_string(),
        })?;
        let mut bytes = Vec::new();
        response.into_reader().read_to_end(&mut bytes).map_err(|e| FetchError::Failed {
            url: url.to_string(),
            message: e.to_string(),
        })?;
        Ok(Arc::new(bytes))
    }

    fn name(&self) -> &'static str {
        "HttpFetcher"
    }
}

/// An in-memory fetcher, pre-populated before use. Primarily for tests and
/// hosts that bundle their image assets.
#[derive(Debug, Default)]
pub struct InMemoryFetcher {
    resources: RwLock<HashMap<String, SharedResourceData>>,
}

impl InMemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, url: impl Into<String>, data: Vec<u8>) {
        if let Ok(mut resources) = self.resources.write() {
            resources.insert(url.into(), Arc::new(data));
        }
    }
}

impl ResourceFetcher for InMemoryFetcher {
    fn fetch(&self, url: &str) -> Result<SharedResourceData, FetchError> {
        self.resources
            .read()
            .ok()
            .and_then(|r| r.get(url).cloned())
            .ok_or_else(|| FetchError::NotFound(url.to_string()))
    }

    fn name(&self) -> &'static str {
        "InMemoryFetcher"
    }
}

/// Fetches and decodes one image resource, returning its bytes and
/// intrinsic dimensions. Runs inside a background worker during prepare.
pub fn prepare_image(
    fetcher: &dyn ResourceFetcher,
    url: &str,
) -> Result<PreparedImage, PrepareError> {
    let data = fetcher.fetch(url)?;
    let image = image::load_from_memory(&data).map_err(|e| PrepareError::Decode {
        url: url.to_string(),
        message: e.to_string(),
    })?;
    Ok(PreparedImage { width: image.width(), height: image.height(), data })
}
