//! Service error types.

use thiserror::Error;

use crate::cache::CacheError;
use crate::layer::LayerError;
use crate::provider::ProviderError;

/// Errors returned by [`TileService`](super::TileService) commands.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Layer(#[from] LayerError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error("Failed to create HTTP client: {0}")]
    Provider(#[from] ProviderError),

    #[error("No layer registered at index {0}")]
    UnknownLayer(usize),

    #[error("Failed to spawn {name} thread: {source}")]
    Spawn {
        name: String,
        #[source]
        source: std::io::Error,
    },
}
