//! Loader telemetry for diagnostics.
//!
//! Lock-free atomic counters updated by the scheduler and workers, plus a
//! point-in-time snapshot for display.
//!
//! # Architecture
//!
//! ```text
//! Scheduler / Workers ─────► TileMetrics ─────► TelemetrySnapshot ─────► Views
//!                          (atomic counters)   (point-in-time copy)     (CLI, overlay)
//! ```
//!
//! # Example
//!
//! ```
//! use quadtile::telemetry::TileMetrics;
//!
//! let metrics = TileMetrics::new();
//! metrics.download_completed(12_345);
//! metrics.empty_download();
//!
//! let snapshot = metrics.snapshot(0);
//! assert_eq!(snapshot.downloads, 1);
//! assert_eq!(snapshot.empty_downloads, 1);
//! ```

mod metrics;
mod snapshot;

pub use metrics::TileMetrics;
pub use snapshot::TelemetrySnapshot;
