//! In-memory tile caching.
//!
//! Each layer owns one [`TileCache`] per zoom level. A cache maps quadkeys to
//! [`Tile`]s and keeps a separate set of keys known to be empty (blank ocean
//! tiles and the like). Entries are never evicted; [`TileCache::release_all`]
//! drops the bitmaps but keeps the entries so they can be refetched.
//!
//! # Concurrency
//!
//! Workers insert from many threads while the render thread reads. Both
//! containers are sharded `dashmap` structures, and a second insert for the
//! same key is a silent no-op (first writer wins).

mod bitmap;
mod error;
mod range;
mod tile_cache;

pub use bitmap::{Bitmap, BitmapFactory, RgbaBitmap, RgbaBitmapFactory};
pub use error::CacheError;
pub use range::{Extent, RangeBox};
pub use tile_cache::{InsertOutcome, Tile, TileCache};

/// Name of the per-zoom file listing known-empty quadkeys.
pub const EMPTY_SET_FILE: &str = "empty.txt";
