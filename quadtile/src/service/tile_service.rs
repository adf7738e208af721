//! The running tile service.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use super::{ServiceError, TileServiceBuilder};
use crate::cache::{Bitmap, BitmapFactory, Extent};
use crate::coord::TileCoord;
use crate::fetch::{Fetcher, TileDecoder};
use crate::layer::{LayerConfig, LayerSet, LayerSpec};
use crate::map::{MapSpec, MapState, ViewState};
use crate::provider::HttpClient;
use crate::scheduler::{
    scan_layer, spawn_workers, ChangeCallback, ScheduleReport, Scheduler, WorkItem, WorkQueue,
    WorkerContext,
};
use crate::telemetry::{TelemetrySnapshot, TileMetrics};

/// A tile of the current view, positioned for drawing.
#[derive(Debug)]
pub struct VisibleTile<B> {
    pub coord: TileCoord,
    /// Screen position of the north-west corner.
    pub x: f64,
    pub y: f64,
    /// Edge length on screen.
    pub size: f64,
    /// Decoded bitmap, if loaded.
    pub bitmap: Option<Arc<B>>,
    /// True if the tile is known to be blank.
    pub empty: bool,
}

/// State shared with the scan threads.
struct Shared<B: Bitmap> {
    map: MapState,
    layers: Arc<LayerSet<B>>,
    scheduler: Scheduler,
    on_change: ChangeCallback,
}

impl<B: Bitmap> Shared<B> {
    fn tiles_changed(&self, flush: bool) -> ScheduleReport {
        let view = self.map.snapshot();
        let report = match self.layers.get(view.layer) {
            Some(layer) => self
                .scheduler
                .schedule(&view.window(), view.layer, &layer, flush),
            None if flush => ScheduleReport {
                flushed: self.scheduler.queue().flush(),
                ..ScheduleReport::default()
            },
            None => ScheduleReport::default(),
        };
        (self.on_change)();
        report
    }
}

/// Tile cache and background loader for one map view.
///
/// Commands are meant to be issued from a single UI thread. They never wait
/// on network or disk: each one updates the view and re-queues whatever the
/// new view is missing. Workers publish into the layer caches and call the
/// change callback; the renderer reads the caches at draw time.
pub struct TileService<B: Bitmap> {
    shared: Arc<Shared<B>>,
    root: PathBuf,
    queue: Arc<WorkQueue>,
    metrics: Arc<TileMetrics>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    scans: Mutex<Vec<JoinHandle<()>>>,
}

impl<B: Bitmap> TileService<B> {
    /// Starts building a service for `map`, caching under `root`.
    pub fn builder<F>(map: MapSpec, root: impl Into<PathBuf>, factory: F) -> TileServiceBuilder<F>
    where
        F: BitmapFactory<Bitmap = B>,
    {
        TileServiceBuilder::new(map, root, factory)
    }

    pub(super) fn start<F>(
        builder: TileServiceBuilder<F>,
        client: Arc<dyn HttpClient>,
        decoder: Arc<dyn TileDecoder>,
    ) -> Result<Self, ServiceError>
    where
        F: BitmapFactory<Bitmap = B>,
    {
        let metrics = Arc::new(TileMetrics::new());
        let queue = Arc::new(WorkQueue::new());
        let layers = Arc::new(LayerSet::new());
        let on_change = match builder.on_change {
            Some(callback) => callback,
            None => Arc::new(|| {}) as ChangeCallback,
        };

        let (lat, lon) = builder.centre;
        let (width, height) = builder.viewport;
        let map = MapState::new(builder.map, lat, lon, builder.zoom, width, height);

        let fetcher = Fetcher::new(
            client,
            decoder,
            Arc::new(builder.factory),
            builder.api_key,
            Arc::clone(&metrics),
        );
        let context = Arc::new(WorkerContext {
            queue: Arc::clone(&queue),
            layers: Arc::clone(&layers),
            fetcher,
            metrics: Arc::clone(&metrics),
            on_change: Arc::clone(&on_change),
        });
        let workers = match spawn_workers(builder.workers, context) {
            Ok(workers) => workers,
            Err(e) => {
                // Release any worker that did start
                queue.shutdown();
                return Err(ServiceError::Spawn {
                    name: "tile-worker".to_string(),
                    source: e,
                });
            }
        };

        info!(
            map = %map.spec().name,
            root = %builder.root.display(),
            workers = builder.workers,
            "Tile service started"
        );

        Ok(Self {
            shared: Arc::new(Shared {
                map,
                layers,
                scheduler: Scheduler::new(Arc::clone(&queue), Arc::clone(&metrics)),
                on_change,
            }),
            root: builder.root,
            queue,
            metrics,
            workers: Mutex::new(workers),
            scans: Mutex::new(Vec::new()),
        })
    }

    // =========================================================================
    // Layers
    // =========================================================================

    /// Registers a layer and starts scanning its disk cache.
    ///
    /// The first layer registered becomes the active one. Returns the
    /// layer's index.
    pub fn register_layer(&self, spec: LayerSpec) -> Result<usize, ServiceError> {
        let layer = Arc::new(LayerConfig::new(spec, &self.root)?);
        let index = self.shared.layers.push(Arc::clone(&layer))?;
        if index == 0 {
            self.shared
                .map
                .set_active_layer(0, layer.min_zoom(), layer.max_zoom());
        }
        info!(layer = layer.name(), index, "Layer registered");

        let shared = Arc::clone(&self.shared);
        let handle = std::thread::Builder::new()
            .name(format!("tile-scan-{}", index))
            .spawn(move || {
                scan_layer(&layer);
                // Tiles found on disk are now cheap; requeue so they go first
                shared.tiles_changed(false);
            })
            .map_err(|e| ServiceError::Spawn {
                name: format!("tile-scan-{}", index),
                source: e,
            })?;
        self.scans.lock().push(handle);
        Ok(index)
    }

    /// Switches the active layer and requests its tiles.
    pub fn set_active_layer(&self, index: usize) -> Result<(), ServiceError> {
        let layer = self
            .shared
            .layers
            .get(index)
            .ok_or(ServiceError::UnknownLayer(index))?;
        self.shared
            .map
            .set_active_layer(index, layer.min_zoom(), layer.max_zoom());
        debug!(layer = layer.name(), "Active layer changed");
        self.shared.tiles_changed(true);
        Ok(())
    }

    /// Index of the layer called `name`.
    pub fn layer_index(&self, name: &str) -> Option<usize> {
        self.shared.layers.position(name)
    }

    pub fn layer(&self, index: usize) -> Option<Arc<LayerConfig<B>>> {
        self.shared.layers.get(index)
    }

    pub fn active_layer(&self) -> Option<Arc<LayerConfig<B>>> {
        self.shared.layers.get(self.shared.map.snapshot().layer)
    }

    pub fn layers(&self) -> Vec<Arc<LayerConfig<B>>> {
        self.shared.layers.all()
    }

    // =========================================================================
    // View commands
    // =========================================================================

    /// Sets the zoom. A change flushes the queue and requests the new view.
    ///
    /// Returns true if the zoom changed.
    pub fn set_zoom(&self, zoom: u8) -> bool {
        let changed = self.shared.map.set_zoom(zoom);
        if changed {
            self.shared.tiles_changed(true);
        }
        changed
    }

    /// Zooms in (positive) or out (negative) by `delta` levels.
    pub fn zoom_by(&self, delta: i32) -> bool {
        let changed = self.shared.map.zoom_by(delta);
        if changed {
            self.shared.tiles_changed(true);
        }
        changed
    }

    pub fn pan_by_pixels(&self, dx: f64, dy: f64) {
        self.shared.map.pan_by_pixels(dx, dy);
        self.shared.tiles_changed(false);
    }

    pub fn set_centre(&self, lat: f64, lon: f64) {
        self.shared.map.set_centre(lat, lon);
        self.shared.tiles_changed(false);
    }

    /// Centres on a fraction of the whole map, as picked on an overview.
    pub fn set_centre_fraction(&self, fx: f64, fy: f64) {
        self.shared.map.set_centre_fraction(fx, fy);
        self.shared.tiles_changed(false);
    }

    pub fn set_viewport(&self, width: u32, height: u32) {
        self.shared.map.set_viewport(width, height);
        self.shared.tiles_changed(false);
    }

    /// Flips the debug grid overlay and asks for a redraw.
    pub fn toggle_grid(&self) -> bool {
        let show = self.shared.map.toggle_grid();
        (self.shared.on_change)();
        show
    }

    /// Requests the tiles of the current view.
    ///
    /// With `flush`, tiles still queued for an earlier view are dropped
    /// first. Tiles already being fetched finish regardless.
    pub fn tiles_changed(&self, flush: bool) -> ScheduleReport {
        self.shared.tiles_changed(flush)
    }

    // =========================================================================
    // Cache commands
    // =========================================================================

    /// Drops every decoded bitmap of every layer, then requests the current
    /// view again. Returns the number of bitmaps released.
    pub fn release_all(&self) -> usize {
        let released: usize = self
            .shared
            .layers
            .all()
            .iter()
            .map(|layer| layer.release_all())
            .sum();
        info!(released, "Released all tile bitmaps");
        self.shared.tiles_changed(false);
        released
    }

    /// Writes every layer's known-empty tiles to disk. Returns the number of
    /// keys written.
    pub fn dump_empty_sets(&self) -> Result<usize, ServiceError> {
        let mut written = 0;
        for layer in self.shared.layers.all() {
            written += layer.dump_empty_sets()?;
        }
        info!(written, "Empty tile sets written");
        Ok(written)
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub fn map(&self) -> &MapSpec {
        self.shared.map.spec()
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Copy of the current view.
    pub fn view(&self) -> ViewState {
        self.shared.map.snapshot()
    }

    pub fn centre(&self) -> (f64, f64) {
        let view = self.view();
        (view.lat, view.lon)
    }

    pub fn zoom(&self) -> u8 {
        self.view().zoom
    }

    /// Loaded bitmap of a tile of the active layer.
    pub fn tile(&self, zoom: u8, x: u32, y: u32) -> Option<Arc<B>> {
        let coord = TileCoord::new(zoom, x, y);
        if !coord.is_valid() {
            return None;
        }
        self.active_layer()?.bitmap(coord)
    }

    /// Tiles of the active layer covering the viewport, nearest the centre
    /// first, with their screen positions.
    pub fn visible_tiles(&self) -> Vec<VisibleTile<B>> {
        let view = self.view();
        let Some(layer) = self.shared.layers.get(view.layer) else {
            return Vec::new();
        };
        let cache = layer.cache(view.effective_zoom());
        let size = view.tile_px();

        view.window()
            .tiles()
            .into_iter()
            .map(|coord| {
                let key = coord.quadkey();
                let (x, y) = view.screen_position(&coord);
                VisibleTile {
                    coord,
                    x,
                    y,
                    size,
                    bitmap: cache.and_then(|c| c.get(&key)),
                    empty: cache.is_some_and(|c| c.is_empty_tile(&key)),
                }
            })
            .collect()
    }

    /// Extent, in map unit-square coordinates, of every tile recorded for
    /// the active layer.
    pub fn range_box(&self) -> Option<Extent> {
        self.active_layer()?.range().extent()
    }

    pub fn telemetry(&self) -> TelemetrySnapshot {
        self.metrics.snapshot(self.queue.len())
    }

    /// Number of tiles waiting for a worker.
    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// Tiles waiting for a worker, in the order they will be fetched.
    pub fn pending(&self) -> Vec<WorkItem> {
        self.queue.pending()
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Waits for the disk scans to finish and the queue to drain.
    ///
    /// Returns false if work was still pending after `timeout`.
    pub fn wait_until_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let scans: Vec<_> = self.scans.lock().drain(..).collect();
        for handle in scans {
            if handle.join().is_err() {
                warn!("Disk scan thread panicked");
            }
        }
        self.queue
            .wait_idle(deadline.saturating_duration_since(Instant::now()))
    }

    /// Stops the workers and waits for them. Fetches in progress complete
    /// first; queued tiles are dropped.
    pub fn shutdown(&self) {
        self.queue.shutdown();
        let handles: Vec<_> = self
            .workers
            .lock()
            .drain(..)
            .chain(self.scans.lock().drain(..))
            .collect();
        for handle in handles {
            if handle.join().is_err() {
                warn!("Tile thread panicked during shutdown");
            }
        }
        debug!("Tile service stopped");
    }
}

impl<B: Bitmap> Drop for TileService<B> {
    fn drop(&mut self) {
        // Workers notice on their next pop; nothing is joined here
        self.queue.shutdown();
    }
}
