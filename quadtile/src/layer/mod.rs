//! Layer registration.
//!
//! A layer is a named tile source, such as a road map or aerial imagery,
//! with its own URL scheme, file extension and zoom range. Each registered
//! [`LayerConfig`] owns the caches for its zoom levels.

mod config;
mod set;
mod spec;

pub use config::LayerConfig;
pub use set::LayerSet;
pub use spec::{fill_template, LayerSpec};

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised when registering a layer.
#[derive(Debug, Error)]
pub enum LayerError {
    #[error("Invalid layer name: '{0}'")]
    InvalidName(String),

    #[error("Layer '{name}' has invalid zoom range {min_zoom}..={max_zoom}")]
    InvalidZoomRange {
        name: String,
        min_zoom: u8,
        max_zoom: u8,
    },

    #[error("Layer '{name}' has an invalid URL template: {reason}")]
    InvalidTemplate { name: String, reason: String },

    #[error("Layer '{0}' is already registered")]
    Duplicate(String),

    #[error("Failed to create {path}: {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
