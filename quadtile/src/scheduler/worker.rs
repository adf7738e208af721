//! Background workers.
//!
//! Each worker owns one OS thread and loops: pop an item (blocking while the
//! queue is empty), resolve it, publish the result, notify the view. A failed
//! or panicking iteration is logged and the loop carries on.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::JoinHandle;

use tracing::{debug, error, trace};

use super::queue::{WorkItem, WorkQueue};
use crate::cache::{BitmapFactory, InsertOutcome};
use crate::fetch::{FetchOutcome, Fetcher};
use crate::layer::LayerSet;
use crate::telemetry::TileMetrics;

/// Callback invoked when visible content may have changed.
pub type ChangeCallback = Arc<dyn Fn() + Send + Sync>;

/// Everything a worker needs, shared by all workers.
pub struct WorkerContext<F: BitmapFactory> {
    pub queue: Arc<WorkQueue>,
    pub layers: Arc<LayerSet<F::Bitmap>>,
    pub fetcher: Fetcher<F>,
    pub metrics: Arc<TileMetrics>,
    pub on_change: ChangeCallback,
}

/// Spawns `count` workers named `tile-worker-{index}`.
pub fn spawn_workers<F: BitmapFactory>(
    count: usize,
    context: Arc<WorkerContext<F>>,
) -> std::io::Result<Vec<JoinHandle<()>>> {
    (0..count)
        .map(|index| {
            let context = Arc::clone(&context);
            std::thread::Builder::new()
                .name(format!("tile-worker-{}", index))
                .spawn(move || run_worker(index, &context))
        })
        .collect()
}

fn run_worker<F: BitmapFactory>(index: usize, context: &WorkerContext<F>) {
    debug!(worker = index, "Tile worker started");

    while let Some(item) = context.queue.pop_blocking() {
        let result = catch_unwind(AssertUnwindSafe(|| process(index, context, &item)));
        if result.is_err() {
            context.metrics.failure();
            error!(worker = index, key = %item.key, "Tile worker panicked while resolving tile");
        }
        context.queue.task_done();
    }

    debug!(worker = index, "Tile worker stopped");
}

/// Resolves one item and publishes the result.
fn process<F: BitmapFactory>(index: usize, context: &WorkerContext<F>, item: &WorkItem) {
    let Some(layer) = context.layers.get(item.layer) else {
        return;
    };
    let zoom = item.key.zoom();
    if layer.is_resolved(zoom, &item.key) {
        trace!(key = %item.key, "Tile resolved while queued");
        return;
    }

    match context.fetcher.resolve(&layer, &item.key, index) {
        FetchOutcome::Loaded { bitmap, .. } => {
            if layer.insert(item.key.clone(), bitmap) == Some(InsertOutcome::Duplicate) {
                context.metrics.duplicate();
            }
            (context.on_change)();
        }
        FetchOutcome::Empty => {
            layer.mark_empty(item.key.clone());
            (context.on_change)();
        }
        // Already logged; the tile is retried when a view change asks for it.
        FetchOutcome::Failed(_) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{RgbaBitmap, RgbaBitmapFactory};
    use crate::fetch::{DecodeError, DecodedImage, TileDecoder};
    use crate::layer::{LayerConfig, LayerSpec};
    use crate::provider::MockHttpClient;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Decoder that returns a 1×1 image, or panics on a magic payload.
    struct StubDecoder;

    impl TileDecoder for StubDecoder {
        fn decode(&self, bytes: &[u8]) -> Result<DecodedImage, DecodeError> {
            if bytes == b"panic" {
                panic!("decoder bug");
            }
            Ok(DecodedImage {
                width: 1,
                height: 1,
                pixels: vec![0; 4],
            })
        }
    }

    fn context(
        root: &std::path::Path,
        body: &[u8],
        changes: Arc<AtomicUsize>,
    ) -> Arc<WorkerContext<RgbaBitmapFactory>> {
        let layers = Arc::new(LayerSet::<RgbaBitmap>::new());
        let spec = LayerSpec::new("osm", "http://h", "/{0}", ".png")
            .with_zoom_range(1, 5)
            .with_save(false)
            .with_min_size(3);
        layers
            .push(Arc::new(LayerConfig::new(spec, root).unwrap()))
            .unwrap();

        let metrics = Arc::new(TileMetrics::new());
        let fetcher = Fetcher::new(
            Arc::new(MockHttpClient::ok(body.to_vec())),
            Arc::new(StubDecoder),
            Arc::new(RgbaBitmapFactory),
            "",
            Arc::clone(&metrics),
        );
        Arc::new(WorkerContext {
            queue: Arc::new(WorkQueue::new()),
            layers,
            fetcher,
            metrics,
            on_change: Arc::new(move || {
                changes.fetch_add(1, Ordering::SeqCst);
            }),
        })
    }

    fn item(key: &str) -> WorkItem {
        WorkItem::new(0, key.parse().unwrap())
    }

    #[test]
    fn test_workers_publish_loaded_tiles() {
        let root = tempfile::tempdir().unwrap();
        let changes = Arc::new(AtomicUsize::new(0));
        let ctx = context(root.path(), b"tile", Arc::clone(&changes));
        let handles = spawn_workers(2, Arc::clone(&ctx)).unwrap();

        ctx.queue
            .schedule(vec![item("0"), item("1"), item("23")], false);
        assert!(ctx.queue.wait_idle(Duration::from_secs(5)));

        let layer = ctx.layers.get(0).unwrap();
        assert!(layer.is_resolved(1, &"0".parse().unwrap()));
        assert!(layer.is_resolved(2, &"23".parse().unwrap()));
        assert_eq!(changes.load(Ordering::SeqCst), 3);

        ctx.queue.shutdown();
        for handle in handles {
            handle.join().unwrap();
        }
    }

    #[test]
    fn test_undersized_download_marks_empty() {
        let root = tempfile::tempdir().unwrap();
        let ctx = context(root.path(), b"ab", Arc::new(AtomicUsize::new(0)));
        let handles = spawn_workers(1, Arc::clone(&ctx)).unwrap();

        ctx.queue.schedule(vec![item("12")], false);
        assert!(ctx.queue.wait_idle(Duration::from_secs(5)));

        let layer = ctx.layers.get(0).unwrap();
        let cache = layer.cache(2).unwrap();
        assert!(cache.is_empty_tile(&"12".parse().unwrap()));
        assert!(cache.get(&"12".parse().unwrap()).is_none());

        ctx.queue.shutdown();
        for handle in handles {
            handle.join().unwrap();
        }
    }

    #[test]
    fn test_worker_survives_panic() {
        let root = tempfile::tempdir().unwrap();
        let ctx = context(root.path(), b"panic", Arc::new(AtomicUsize::new(0)));
        let handles = spawn_workers(1, Arc::clone(&ctx)).unwrap();

        ctx.queue.schedule(vec![item("0"), item("1")], false);
        assert!(ctx.queue.wait_idle(Duration::from_secs(5)));
        assert_eq!(ctx.metrics.snapshot(0).failures, 2);

        ctx.queue.shutdown();
        for handle in handles {
            handle.join().unwrap();
        }
    }
}
