//! Configuration file support.
//!
//! Settings live in an INI file, by default `config.ini` under the
//! platform configuration directory (`~/.config/quadtile/` on Linux):
//!
//! ```ini
//! [cache]
//! directory = ~/.cache/quadtile
//!
//! [download]
//! workers = 4
//! timeout = 30
//! api_key =
//!
//! [map]
//! name = world
//! min_lat = -85.05112878
//! max_lat = 85.05112878
//! min_lon = -180
//! max_lon = 180
//!
//! [view]
//! lat = 51.5
//! lon = -0.12
//! zoom = 10
//! width = 1280
//! height = 720
//!
//! [layer.road]
//! host = http://ecn.t{0}.tiles.virtualearth.net
//! path = /tiles/r{0}.png?g=1
//! extension = .png
//! save = true
//! min_size = 0
//! min_zoom = 1
//! max_zoom = 17
//! ```
//!
//! Missing keys take their default. Every `[layer.<name>]` section
//! registers one layer, in file order.

mod file;

pub use file::{CacheSettings, ConfigFile, DownloadSettings, MapSettings, ViewSettings};

use std::path::PathBuf;

use thiserror::Error;

/// Name of the configuration file.
pub const CONFIG_FILE_NAME: &str = "config.ini";

/// Errors raised while loading or saving configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: ini::ParseError,
    },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid value for {section}.{key}: '{value}'")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
    },

    #[error("Missing required key {section}.{key}")]
    MissingKey { section: String, key: String },
}

/// Directory holding the configuration file.
pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("quadtile")
}

/// Default location of the configuration file.
pub fn config_file_path() -> PathBuf {
    config_dir().join(CONFIG_FILE_NAME)
}

/// Default tile cache directory.
pub fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("quadtile")
}

/// Expands a leading `~` to the home directory.
pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    } else if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    PathBuf::from(path)
}
