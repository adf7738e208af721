//! Tile fetching.
//!
//! A [`Fetcher`] resolves one quadkey of one layer to a bitmap, consulting
//! the disk cache before the network:
//!
//! ```text
//! {root}/{layer}/{zoom}/{key}{ext} ──exists──► decode ──► Loaded | Failed
//!            │
//!            └─missing──► HTTP GET ──error──► Failed
//!                            │
//!                            ├─ len < min_size ──► Empty
//!                            └─ decode ──► save (optional) ──► Loaded | Failed
//! ```

mod decoder;
mod fetcher;

pub use decoder::{DecodeError, DecodedImage, ImageDecoder, TileDecoder};
pub use fetcher::{FetchError, FetchOutcome, Fetcher, TileSource};
