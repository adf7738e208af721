//! Provider error types.

use thiserror::Error;

/// Errors that can occur while downloading a tile.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    /// Connection, TLS or body transfer failure.
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// The server answered with something other than 200 OK.
    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },
}

impl ProviderError {
    /// HTTP status code, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            ProviderError::Status { status, .. } => Some(*status),
            ProviderError::HttpError(_) => None,
        }
    }
}
