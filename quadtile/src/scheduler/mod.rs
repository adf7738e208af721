//! Background tile loading.
//!
//! The scheduler turns "tiles needed by the view" into "tiles fetched":
//!
//! ```text
//! tiles_changed(flush)
//!     │
//!     ├─ ViewWindow::tiles()       ring order, nearest first
//!     ├─ skip resolved keys        TileCache::is_resolved
//!     └─ WorkQueue::schedule()     flush + push, skip already queued
//!                │
//!                ▼
//!     tile-worker-0 .. tile-worker-N
//!         Fetcher::resolve() → LayerConfig::insert / mark_empty → on_change
//! ```
//!
//! A separate scan pass walks the disk cache once per layer so that tiles
//! already on disk are known before the first window is requested.

mod queue;
mod ring;
mod scan;
mod worker;

pub use queue::{ScheduleReport, WorkItem, WorkQueue};
pub use ring::{half_window, ring_offsets, ViewWindow};
pub use scan::{scan_layer, ScanReport};
pub use worker::{spawn_workers, ChangeCallback, WorkerContext};

use std::sync::Arc;

use tracing::trace;

use crate::cache::Bitmap;
use crate::layer::LayerConfig;
use crate::telemetry::TileMetrics;

/// Queues the unresolved tiles of a view window.
pub struct Scheduler {
    queue: Arc<WorkQueue>,
    metrics: Arc<TileMetrics>,
}

impl Scheduler {
    pub fn new(queue: Arc<WorkQueue>, metrics: Arc<TileMetrics>) -> Self {
        Self { queue, metrics }
    }

    pub fn queue(&self) -> &Arc<WorkQueue> {
        &self.queue
    }

    /// Requests every unresolved tile of `window` from `layer`.
    ///
    /// With `flush`, items still pending from earlier calls are dropped
    /// first. Items already being resolved by a worker are unaffected.
    pub fn schedule<B: Bitmap>(
        &self,
        window: &ViewWindow,
        layer_index: usize,
        layer: &LayerConfig<B>,
        flush: bool,
    ) -> ScheduleReport {
        let zoom = window.centre.zoom;
        let items: Vec<WorkItem> = match layer.cache(zoom) {
            Some(cache) => window
                .tiles()
                .into_iter()
                .map(|tile| tile.quadkey())
                .filter(|key| !cache.is_resolved(key))
                .map(|key| WorkItem::new(layer_index, key))
                .collect(),
            // Outside the layer's range there is nothing to fetch, but a
            // flush still has to cancel the previous view.
            None => Vec::new(),
        };

        let report = self.queue.schedule(items, flush);
        self.metrics.already_queued(report.already_queued);
        self.metrics.queued(report.pushed);

        trace!(
            layer = layer.name(),
            zoom,
            flushed = report.flushed,
            pushed = report.pushed,
            already_queued = report.already_queued,
            "Scheduled view window"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::RgbaBitmap;
    use crate::coord::TileCoord;
    use crate::layer::LayerSpec;

    fn layer(root: &std::path::Path) -> LayerConfig<RgbaBitmap> {
        let spec = LayerSpec::new("osm", "http://h", "/{0}", ".png")
            .with_zoom_range(1, 10)
            .with_save(false);
        LayerConfig::new(spec, root).unwrap()
    }

    fn scheduler() -> Scheduler {
        Scheduler::new(Arc::new(WorkQueue::new()), Arc::new(TileMetrics::new()))
    }

    fn window(x: u32, y: u32) -> ViewWindow {
        ViewWindow {
            centre: TileCoord::new(6, x, y),
            x_window: 2,
            y_window: 1,
        }
    }

    #[test]
    fn test_schedule_skips_resolved_tiles() {
        let root = tempfile::tempdir().unwrap();
        let layer = layer(root.path());
        let scheduler = scheduler();

        layer.mark_empty(TileCoord::new(6, 20, 20).quadkey());
        layer.insert(
            TileCoord::new(6, 21, 20).quadkey(),
            RgbaBitmap {
                width: 1,
                height: 1,
                pixels: vec![0; 4],
            },
        );

        let report = scheduler.schedule(&window(20, 20), 0, &layer, false);
        assert_eq!(report.pushed, 13);
        assert!(!scheduler
            .queue()
            .contains(&WorkItem::new(0, TileCoord::new(6, 20, 20).quadkey())));
    }

    #[test]
    fn test_schedule_counts_already_queued() {
        let root = tempfile::tempdir().unwrap();
        let layer = layer(root.path());
        let scheduler = scheduler();

        scheduler.schedule(&window(20, 20), 0, &layer, false);
        let report = scheduler.schedule(&window(21, 20), 0, &layer, false);

        assert_eq!(report.already_queued, 12);
        assert_eq!(report.pushed, 3);
        let snapshot = scheduler.metrics.snapshot(scheduler.queue().len());
        assert_eq!(snapshot.already_queued, 12);
        assert_eq!(snapshot.queued, 18);
        assert_eq!(snapshot.queue_depth, 18);
    }

    #[test]
    fn test_flush_leaves_only_new_window() {
        let root = tempfile::tempdir().unwrap();
        let layer = layer(root.path());
        let scheduler = scheduler();

        scheduler.schedule(&window(20, 20), 0, &layer, false);
        let next = window(30, 30);
        let report = scheduler.schedule(&next, 0, &layer, true);

        assert_eq!(report.flushed, 15);
        let pending = scheduler.queue().pending();
        assert_eq!(pending.len(), 15);
        assert!(pending
            .iter()
            .all(|item| next.contains(&item.key.to_tile())));
        assert_eq!(pending[0].key, TileCoord::new(6, 30, 30).quadkey());
    }

    #[test]
    fn test_zoom_outside_layer_only_flushes() {
        let root = tempfile::tempdir().unwrap();
        let layer = layer(root.path());
        let scheduler = scheduler();

        scheduler.schedule(&window(20, 20), 0, &layer, false);
        let outside = ViewWindow {
            centre: TileCoord::new(12, 0, 0),
            x_window: 1,
            y_window: 1,
        };
        let report = scheduler.schedule(&outside, 0, &layer, true);
        assert_eq!(report.flushed, 15);
        assert_eq!(report.pushed, 0);
        assert!(scheduler.queue().is_empty());
    }
}
