//! Resolution of a single tile.

use std::io::ErrorKind;
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, error, warn};

use super::{DecodeError, TileDecoder};
use crate::cache::BitmapFactory;
use crate::coord::QuadKey;
use crate::layer::LayerConfig;
use crate::provider::{HttpClient, ProviderError};
use crate::telemetry::TileMetrics;

/// Where a loaded tile came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileSource {
    Disk,
    Network,
}

/// Why a tile could not be resolved.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error(transparent)]
    Network(#[from] ProviderError),

    #[error("{source} ({origin:?} bytes)")]
    Decode {
        origin: TileSource,
        #[source]
        source: DecodeError,
    },
}

/// Result of resolving one tile.
#[derive(Debug)]
pub enum FetchOutcome<B> {
    /// The tile was decoded.
    Loaded { bitmap: B, source: TileSource },
    /// The server returned a blank placeholder; cache the key as empty.
    Empty,
    /// The tile stays unresolved until a later view change requests it again.
    Failed(FetchError),
}

impl<B> FetchOutcome<B> {
    pub fn is_loaded(&self) -> bool {
        matches!(self, FetchOutcome::Loaded { .. })
    }
}

/// Turns a quadkey into a bitmap: disk cache first, then the network.
pub struct Fetcher<F: BitmapFactory> {
    client: Arc<dyn HttpClient>,
    decoder: Arc<dyn TileDecoder>,
    factory: Arc<F>,
    api_key: String,
    metrics: Arc<TileMetrics>,
}

impl<F: BitmapFactory> Fetcher<F> {
    pub fn new(
        client: Arc<dyn HttpClient>,
        decoder: Arc<dyn TileDecoder>,
        factory: Arc<F>,
        api_key: impl Into<String>,
        metrics: Arc<TileMetrics>,
    ) -> Self {
        Self {
            client,
            decoder,
            factory,
            api_key: api_key.into(),
            metrics,
        }
    }

    /// Resolves `key` for `layer`.
    ///
    /// 1. A cached file is decoded; a corrupt file fails the tile.
    /// 2. Otherwise the tile is downloaded. Bodies shorter than the layer's
    ///    `min_size` are reported as [`FetchOutcome::Empty`] without being
    ///    decoded or saved.
    /// 3. Decoded downloads are written to disk when the layer saves tiles.
    pub fn resolve(
        &self,
        layer: &LayerConfig<F::Bitmap>,
        key: &QuadKey,
        worker_index: usize,
    ) -> FetchOutcome<F::Bitmap> {
        let path = layer.tile_path(key.zoom(), key);

        if let Some(bytes) = read_cached(&path) {
            return match self.decode(&bytes) {
                Ok(bitmap) => {
                    self.metrics.disk_hit();
                    debug!(layer = layer.name(), key = %key, "Loaded tile from disk");
                    FetchOutcome::Loaded {
                        bitmap,
                        source: TileSource::Disk,
                    }
                }
                Err(e) => {
                    self.metrics.decode_failure();
                    error!(path = %path.display(), error = %e, "Corrupt cached tile");
                    FetchOutcome::Failed(FetchError::Decode {
                        origin: TileSource::Disk,
                        source: e,
                    })
                }
            };
        }

        let url = layer.url(worker_index, key, &self.api_key);
        let body = match self.client.get(&url) {
            Ok(body) => body,
            Err(e) => {
                self.metrics.failure();
                warn!(
                    layer = layer.name(),
                    key = %key,
                    status = ?e.status(),
                    error = %e,
                    "Tile download failed"
                );
                return FetchOutcome::Failed(e.into());
            }
        };

        if body.len() < layer.spec().min_size {
            self.metrics.empty_download();
            debug!(
                layer = layer.name(),
                key = %key,
                bytes = body.len(),
                "Undersized response, marking tile empty"
            );
            return FetchOutcome::Empty;
        }

        let bitmap = match self.decode(&body) {
            Ok(bitmap) => bitmap,
            Err(e) => {
                self.metrics.decode_failure();
                error!(url = %url, error = %e, "Downloaded tile failed to decode");
                return FetchOutcome::Failed(FetchError::Decode {
                    origin: TileSource::Network,
                    source: e,
                });
            }
        };

        if layer.spec().save {
            if let Err(e) = std::fs::write(&path, &body) {
                warn!(path = %path.display(), error = %e, "Failed to save tile");
            }
        }

        self.metrics.download_completed(body.len());
        debug!(layer = layer.name(), key = %key, bytes = body.len(), "Downloaded tile");
        FetchOutcome::Loaded {
            bitmap,
            source: TileSource::Network,
        }
    }

    fn decode(&self, bytes: &[u8]) -> Result<F::Bitmap, DecodeError> {
        let image = self.decoder.decode(bytes)?;
        Ok(self.factory.create(image.width, image.height, image.pixels))
    }
}

/// Reads a cached tile. A missing or unreadable file is a cache miss.
fn read_cached(path: &Path) -> Option<Vec<u8>> {
    match std::fs::read(path) {
        Ok(bytes) => Some(bytes),
        Err(e) if e.kind() == ErrorKind::NotFound => None,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Unreadable cached tile, refetching");
            None
        }
    }
}
