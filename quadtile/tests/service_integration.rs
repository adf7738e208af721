//! Integration tests for the tile service.
//!
//! These tests drive a complete `TileService` against an in-process tile
//! server and a temporary disk cache:
//! - disk cache hits, blank tiles and failures
//! - flush and requeue on pan
//! - zoom clamping and layer switching
//!
//! Run with: `cargo test --test service_integration`

use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use parking_lot::Mutex;

use quadtile::cache::{Bitmap, RgbaBitmap, RgbaBitmapFactory};
use quadtile::coord::TileCoord;
use quadtile::layer::LayerSpec;
use quadtile::map::{MapSpec, MapState};
use quadtile::provider::{HttpClient, ProviderError};
use quadtile::service::TileService;

// ============================================================================
// Helper Functions
// ============================================================================

const IDLE_TIMEOUT: Duration = Duration::from_secs(10);

/// Central London.
const LONDON: (f64, f64) = (51.5, -0.12);

/// In-process tile server returning the same response for every URL.
struct TileServer {
    response: Result<Vec<u8>, ProviderError>,
    requests: Mutex<Vec<String>>,
}

impl TileServer {
    fn serving(body: Vec<u8>) -> Arc<Self> {
        Arc::new(Self {
            response: Ok(body),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn failing(status: u16) -> Arc<Self> {
        Arc::new(Self {
            response: Err(ProviderError::Status {
                status,
                url: "http://tiles.test".to_string(),
            }),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    fn requests(&self) -> Vec<String> {
        self.requests.lock().clone()
    }
}

impl HttpClient for TileServer {
    fn get(&self, url: &str) -> Result<Bytes, ProviderError> {
        self.requests.lock().push(url.to_string());
        self.response.clone().map(Bytes::from)
    }
}

/// A 4×4 PNG, comfortably above any small size threshold.
fn png_tile() -> Vec<u8> {
    let image = image::RgbaImage::from_pixel(4, 4, image::Rgba([30, 60, 90, 255]));
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .unwrap();
    bytes
}

fn road_layer() -> LayerSpec {
    LayerSpec::new("road", "http://t{0}.tiles.test", "/tiles/{0}.png?key={1}", ".png")
        .with_zoom_range(1, 17)
}

fn start(root: &Path, server: &Arc<TileServer>, workers: usize) -> TileService<RgbaBitmap> {
    TileService::builder(MapSpec::world("world"), root, RgbaBitmapFactory)
        .centre(LONDON.0, LONDON.1)
        .zoom(10)
        .viewport(256, 256)
        .workers(workers)
        .api_key("k")
        .http_client(Arc::clone(server) as Arc<dyn HttpClient>)
        .build()
        .unwrap()
}

/// Tiles a 256×256 view of London needs at `zoom`, computed independently
/// of the service.
fn london_window(zoom: u8) -> Vec<TileCoord> {
    let state = MapState::new(MapSpec::world("world"), LONDON.0, LONDON.1, zoom, 256, 256);
    state.set_active_layer(0, 1, 17);
    state.snapshot().window().tiles()
}

fn png_files(dir: &Path) -> usize {
    std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .filter(|e| e.path().extension().is_some_and(|ext| ext == "png"))
                .count()
        })
        .unwrap_or(0)
}

// ============================================================================
// Integration Tests
// ============================================================================

#[test]
fn test_tiles_load_from_network_and_are_saved() {
    let root = tempfile::tempdir().unwrap();
    let server = TileServer::serving(png_tile());
    let service = start(root.path(), &server, 2);

    service.register_layer(road_layer()).unwrap();
    assert!(service.wait_until_idle(IDLE_TIMEOUT));

    let visible = service.visible_tiles();
    assert_eq!(visible.len(), 25);
    for tile in &visible {
        let bitmap = tile.bitmap.as_ref().expect("tile should be loaded");
        assert_eq!(bitmap.dimensions(), (4, 4));
    }

    assert_eq!(server.request_count(), 25);
    for url in server.requests() {
        assert!(
            url.starts_with("http://t0.tiles.test/tiles/")
                || url.starts_with("http://t1.tiles.test/tiles/"),
            "unexpected host in {}",
            url
        );
        assert!(url.ends_with(".png?key=k"), "unexpected path in {}", url);
    }

    assert_eq!(png_files(&root.path().join("road/10")), 25);
    let telemetry = service.telemetry();
    assert_eq!(telemetry.downloads, 25);
    assert_eq!(telemetry.failures, 0);

    service.shutdown();
}

#[test]
fn test_disk_cache_hit_makes_no_request() {
    let root = tempfile::tempdir().unwrap();
    let dir = root.path().join("road/10");
    std::fs::create_dir_all(&dir).unwrap();
    let png = png_tile();
    for tile in london_window(10) {
        std::fs::write(dir.join(format!("{}.png", tile.quadkey())), &png).unwrap();
    }

    let server = TileServer::serving(png_tile());
    let service = start(root.path(), &server, 2);
    service.register_layer(road_layer()).unwrap();
    assert!(service.wait_until_idle(IDLE_TIMEOUT));

    assert_eq!(server.request_count(), 0);
    assert_eq!(service.telemetry().disk_hits, 25);
    assert!(service.visible_tiles().iter().all(|t| t.bitmap.is_some()));

    service.shutdown();
}

#[test]
fn test_undersized_response_is_empty_and_not_saved() {
    let root = tempfile::tempdir().unwrap();
    let server = TileServer::serving(vec![0; 50]);
    let layer = road_layer().with_min_size(4000);

    let service = start(root.path(), &server, 2);
    service.register_layer(layer.clone()).unwrap();
    assert!(service.wait_until_idle(IDLE_TIMEOUT));

    assert!(service.visible_tiles().iter().all(|t| t.empty && t.bitmap.is_none()));
    assert_eq!(service.telemetry().empty_downloads, 25);
    assert_eq!(png_files(&root.path().join("road/10")), 0);

    assert_eq!(service.dump_empty_sets().unwrap(), 25);
    service.shutdown();

    // A second run restores the empty set from disk and fetches nothing
    let server = TileServer::serving(vec![0; 50]);
    let service = start(root.path(), &server, 2);
    service.register_layer(layer).unwrap();
    assert!(service.wait_until_idle(IDLE_TIMEOUT));

    assert_eq!(server.request_count(), 0);
    assert!(service.visible_tiles().iter().all(|t| t.empty));
    service.shutdown();
}

#[test]
fn test_pan_with_flush_leaves_only_new_window_queued() {
    let root = tempfile::tempdir().unwrap();
    let server = TileServer::serving(png_tile());
    // No workers: the queue keeps whatever is scheduled
    let service = start(root.path(), &server, 0);

    service.register_layer(road_layer()).unwrap();
    service.wait_until_idle(Duration::from_millis(10));
    assert_eq!(service.queue_len(), 25);

    service.pan_by_pixels(10.0 * 256.0, 0.0);
    let report = service.tiles_changed(true);
    assert_eq!(report.flushed, 50);
    assert_eq!(report.pushed, 25);

    let window = service.view().window();
    let pending = service.pending();
    assert_eq!(pending.len(), 25);
    assert!(pending.iter().all(|item| window.contains(&item.key.to_tile())));
    assert_eq!(pending[0].key, window.centre.quadkey());
    assert_eq!(server.request_count(), 0);
}

#[test]
fn test_zoom_clamped_to_layer_range() {
    let root = tempfile::tempdir().unwrap();
    let server = TileServer::serving(png_tile());
    let service = start(root.path(), &server, 0);
    service.register_layer(road_layer()).unwrap();

    assert!(service.set_zoom(99));
    assert_eq!(service.zoom(), 17);

    // Zoom changes flush the previous view
    service.wait_until_idle(Duration::from_millis(10));
    service.set_zoom(12);
    assert!(service.pending().iter().all(|item| item.key.zoom() == 12));
}

#[test]
fn test_zoom_below_layer_minimum_fetches_oversized_tiles() {
    let root = tempfile::tempdir().unwrap();
    let server = TileServer::serving(png_tile());
    let service = start(root.path(), &server, 0);
    service.register_layer(road_layer().with_zoom_range(5, 17)).unwrap();
    service.wait_until_idle(Duration::from_millis(10));

    // Two levels of oversize are allowed below the layer minimum
    assert!(service.set_zoom(1));
    let view = service.view();
    assert_eq!(view.zoom, 3);
    assert_eq!(view.effective_zoom(), 5);
    assert_eq!(view.oversize_scale(), 4);
    assert_eq!(view.tile_px(), 64.0);

    // 64px tiles in a 256px viewport: three tiles each way from the centre
    let window = view.window();
    assert_eq!((window.x_window, window.y_window), (3, 3));
    assert_eq!(window.centre.zoom, 5);

    let pending = service.pending();
    assert_eq!(pending.len(), 49);
    assert!(pending.iter().all(|item| item.key.zoom() == 5));
    assert!(pending.iter().all(|item| window.contains(&item.key.to_tile())));
    assert_eq!(pending[0].key, window.centre.quadkey());
    assert_eq!(service.visible_tiles().len(), 49);
}

#[test]
fn test_failed_tiles_are_retried_on_next_view_change() {
    let root = tempfile::tempdir().unwrap();
    let server = TileServer::failing(404);
    let service = start(root.path(), &server, 2);

    service.register_layer(road_layer()).unwrap();
    assert!(service.wait_until_idle(IDLE_TIMEOUT));
    assert_eq!(server.request_count(), 25);
    assert_eq!(service.telemetry().failures, 25);
    assert!(service.visible_tiles().iter().all(|t| t.bitmap.is_none() && !t.empty));

    service.tiles_changed(false);
    assert!(service.wait_until_idle(IDLE_TIMEOUT));
    assert_eq!(server.request_count(), 50);

    service.shutdown();
}

#[test]
fn test_switching_layer_fetches_from_new_source() {
    let root = tempfile::tempdir().unwrap();
    let server = TileServer::serving(png_tile());
    let service = start(root.path(), &server, 2);

    service.register_layer(road_layer()).unwrap();
    let aerial = service
        .register_layer(
            LayerSpec::new("aerial", "http://a.tiles.test", "/{0}.jpeg", ".jpeg").with_save(false),
        )
        .unwrap();
    assert!(service.wait_until_idle(IDLE_TIMEOUT));
    let before = server.request_count();

    service.set_active_layer(aerial).unwrap();
    assert!(service.wait_until_idle(IDLE_TIMEOUT));

    assert_eq!(service.active_layer().unwrap().name(), "aerial");
    let aerial_requests = server
        .requests()
        .iter()
        .filter(|url| url.starts_with("http://a.tiles.test/"))
        .count();
    assert_eq!(aerial_requests, 25);
    assert_eq!(server.request_count(), before + 25);
    assert!(service.visible_tiles().iter().all(|t| t.bitmap.is_some()));

    service.shutdown();
}
