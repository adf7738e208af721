//! quadtile - Tiled map cache and background tile loader
//!
//! This library keeps the tiles a map view needs available as decoded
//! bitmaps. Tiles are addressed by quadkey, cached in memory per layer and
//! zoom level, mirrored on disk, and fetched by a pool of worker threads in
//! nearest-to-centre order whenever the view changes.
//!
//! Start with [`service::TileService`].

pub mod cache;
pub mod config;
pub mod coord;
pub mod fetch;
pub mod layer;
pub mod logging;
pub mod map;
pub mod provider;
pub mod scheduler;
pub mod service;
pub mod telemetry;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
