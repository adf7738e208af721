//! Fluent construction of a [`TileService`].

use std::path::PathBuf;
use std::sync::Arc;

use super::{ServiceError, TileService};
use crate::cache::BitmapFactory;
use crate::fetch::{ImageDecoder, TileDecoder};
use crate::map::MapSpec;
use crate::provider::{HttpClient, ReqwestClient, DEFAULT_TIMEOUT_SECS};
use crate::scheduler::ChangeCallback;

/// Default number of download workers.
pub const DEFAULT_WORKERS: usize = 4;

/// Builder for [`TileService`].
///
/// Only the map, cache root and bitmap factory are required. Everything
/// else has a default: centre (0, 0) at zoom 1, a 1024×768 viewport, four
/// workers, a reqwest client and the `image` decoder.
pub struct TileServiceBuilder<F: BitmapFactory> {
    pub(super) map: MapSpec,
    pub(super) root: PathBuf,
    pub(super) factory: F,
    pub(super) centre: (f64, f64),
    pub(super) zoom: u8,
    pub(super) viewport: (u32, u32),
    pub(super) workers: usize,
    pub(super) api_key: String,
    pub(super) timeout_secs: u64,
    pub(super) on_change: Option<ChangeCallback>,
    pub(super) client: Option<Arc<dyn HttpClient>>,
    pub(super) decoder: Option<Arc<dyn TileDecoder>>,
}

impl<F: BitmapFactory> TileServiceBuilder<F> {
    pub fn new(map: MapSpec, root: impl Into<PathBuf>, factory: F) -> Self {
        Self {
            map,
            root: root.into(),
            factory,
            centre: (0.0, 0.0),
            zoom: 1,
            viewport: (1024, 768),
            workers: DEFAULT_WORKERS,
            api_key: String::new(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            on_change: None,
            client: None,
            decoder: None,
        }
    }

    /// Initial centre.
    pub fn centre(mut self, lat: f64, lon: f64) -> Self {
        self.centre = (lat, lon);
        self
    }

    /// Initial zoom, clamped once a layer is active.
    pub fn zoom(mut self, zoom: u8) -> Self {
        self.zoom = zoom;
        self
    }

    /// Viewport size in screen pixels.
    pub fn viewport(mut self, width: u32, height: u32) -> Self {
        self.viewport = (width, height);
        self
    }

    /// Number of download workers. Zero leaves queued tiles unresolved,
    /// which is only useful for inspecting the queue.
    pub fn workers(mut self, count: usize) -> Self {
        self.workers = count;
        self
    }

    /// Substituted for `{1}` in layer path templates.
    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = api_key.into();
        self
    }

    /// Request timeout of the default HTTP client.
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Called whenever visible content may have changed.
    pub fn on_change(mut self, callback: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_change = Some(Arc::new(callback));
        self
    }

    /// Replaces the default HTTP client.
    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.client = Some(client);
        self
    }

    /// Replaces the default image decoder.
    pub fn decoder(mut self, decoder: Arc<dyn TileDecoder>) -> Self {
        self.decoder = Some(decoder);
        self
    }

    /// Starts the workers and returns the running service.
    pub fn build(mut self) -> Result<TileService<F::Bitmap>, ServiceError> {
        let client: Arc<dyn HttpClient> = match self.client.take() {
            Some(client) => client,
            None => Arc::new(ReqwestClient::with_timeout(self.timeout_secs)?),
        };
        let decoder: Arc<dyn TileDecoder> = self
            .decoder
            .take()
            .unwrap_or_else(|| Arc::new(ImageDecoder));
        TileService::start(self, client, decoder)
    }
}
