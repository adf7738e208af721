//! Tile service facade.
//!
//! [`TileService`] owns the map view, the registered layers, the work queue
//! and the worker threads. A UI drives it with view commands and reads tiles
//! back at draw time:
//!
//! ```text
//! UI thread                         workers
//! ─────────                         ───────
//! set_zoom / pan_by_pixels ──┐
//!                            ▼
//!                      tiles_changed ──► WorkQueue ──► Fetcher ──► LayerConfig caches
//!                                                                      │
//! visible_tiles / tile ◄───────────────────────────────────────────────┘
//!         ▲                                                           │
//!         └──────────────── on_change (redraw) ◄──────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use quadtile::cache::RgbaBitmapFactory;
//! use quadtile::layer::LayerSpec;
//! use quadtile::map::MapSpec;
//! use quadtile::service::TileService;
//!
//! let service = TileService::builder(MapSpec::world("world"), "/tmp/tiles", RgbaBitmapFactory)
//!     .centre(51.5, -0.12)
//!     .zoom(10)
//!     .on_change(|| println!("redraw"))
//!     .build()?;
//!
//! service.register_layer(LayerSpec::new(
//!     "road",
//!     "http://ecn.t{0}.tiles.virtualearth.net",
//!     "/tiles/r{0}.png?g=1",
//!     ".png",
//! ))?;
//! service.pan_by_pixels(128.0, 0.0);
//!
//! for tile in service.visible_tiles() {
//!     // draw tile.bitmap at (tile.x, tile.y)
//! }
//! # Ok::<(), quadtile::service::ServiceError>(())
//! ```

mod builder;
mod error;
mod tile_service;

pub use builder::{TileServiceBuilder, DEFAULT_WORKERS};
pub use error::ServiceError;
pub use tile_service::{TileService, VisibleTile};
