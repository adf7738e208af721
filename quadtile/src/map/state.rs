//! Shared view state.

use parking_lot::RwLock;

use crate::coord::{
    lat_lon_to_pixel, map_size, pixel_to_lat_lon, pixel_to_tile, MapBounds, TileCoord, MAX_ZOOM,
    TILE_SIZE,
};
use crate::scheduler::ViewWindow;

/// How many levels below a layer's minimum zoom the view may go. Tiles are
/// then fetched at the layer minimum and drawn scaled down.
pub const MAX_OVERSIZE_LEVELS: u8 = 2;

/// A map: its name and the region the centre is confined to.
#[derive(Debug, Clone, PartialEq)]
pub struct MapSpec {
    pub name: String,
    pub bounds: MapBounds,
}

impl MapSpec {
    pub fn new(name: impl Into<String>, bounds: MapBounds) -> Self {
        Self {
            name: name.into(),
            bounds,
        }
    }

    /// The whole Web Mercator world.
    pub fn world(name: impl Into<String>) -> Self {
        Self::new(name, MapBounds::world())
    }
}

/// Point-in-time copy of the view.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewState {
    pub lat: f64,
    pub lon: f64,
    /// Display zoom. May sit below `min_zoom` by up to
    /// [`MAX_OVERSIZE_LEVELS`].
    pub zoom: u8,
    /// Registration index of the active layer.
    pub layer: usize,
    pub width: u32,
    pub height: u32,
    pub show_grid: bool,
    /// Zoom range of the active layer.
    pub min_zoom: u8,
    pub max_zoom: u8,
}

impl ViewState {
    /// Zoom level tiles are fetched at.
    pub fn effective_zoom(&self) -> u8 {
        self.zoom.max(self.min_zoom)
    }

    /// Factor by which fetched tiles are shrunk on screen:
    /// `2^(min_zoom - zoom)` below the layer minimum, else 1.
    pub fn oversize_scale(&self) -> u32 {
        1 << self.effective_zoom().saturating_sub(self.zoom)
    }

    /// Edge length of one fetched tile in screen pixels.
    pub fn tile_px(&self) -> f64 {
        TILE_SIZE as f64 / self.oversize_scale() as f64
    }

    /// Global pixel position of the centre at the effective zoom.
    pub fn centre_pixel(&self) -> (f64, f64) {
        lat_lon_to_pixel(self.lat, self.lon, self.effective_zoom())
    }

    /// Tile under the centre at the effective zoom.
    pub fn centre_tile(&self) -> TileCoord {
        let (x, y) = self.centre_pixel();
        pixel_to_tile(x, y, self.effective_zoom())
    }

    /// Tiles the viewport needs, with one margin tile on each side.
    pub fn window(&self) -> ViewWindow {
        ViewWindow::new(self.centre_tile(), self.width, self.height, self.tile_px())
    }

    /// Screen position of the north-west corner of `tile`, with `(0, 0)`
    /// at the top-left of the viewport.
    pub fn screen_position(&self, tile: &TileCoord) -> (f64, f64) {
        let (cx, cy) = self.centre_pixel();
        let scale = self.oversize_scale() as f64;
        let tile_size = TILE_SIZE as f64;
        (
            self.width as f64 / 2.0 + (tile.x as f64 * tile_size - cx) / scale,
            self.height as f64 / 2.0 + (tile.y as f64 * tile_size - cy) / scale,
        )
    }

    fn lowest_zoom(&self) -> u8 {
        self.min_zoom.saturating_sub(MAX_OVERSIZE_LEVELS)
    }
}

/// Centre, zoom, active layer and viewport of a map view.
///
/// Only the owning UI thread writes; the scheduler and workers read. Each
/// reader takes a [`ViewState`] copy under a short read lock and works from
/// that copy, so a reader may act on a view that has already moved on. A
/// fetch can complete for a tile that is no longer centred; the result is
/// cached and simply goes unused until the view returns. Writers never wait
/// on a fetch.
#[derive(Debug)]
pub struct MapState {
    spec: MapSpec,
    view: RwLock<ViewState>,
}

impl MapState {
    /// Creates the view state. The zoom range starts as the full quadkey
    /// range until a layer is activated.
    pub fn new(spec: MapSpec, lat: f64, lon: f64, zoom: u8, width: u32, height: u32) -> Self {
        let (lat, lon) = spec.bounds.clamp(lat, lon);
        let view = ViewState {
            lat,
            lon,
            zoom: zoom.min(MAX_ZOOM),
            layer: 0,
            width,
            height,
            show_grid: false,
            min_zoom: 0,
            max_zoom: MAX_ZOOM,
        };
        Self {
            spec,
            view: RwLock::new(view),
        }
    }

    pub fn spec(&self) -> &MapSpec {
        &self.spec
    }

    pub fn snapshot(&self) -> ViewState {
        *self.view.read()
    }

    /// Moves the centre, clamped to the map bounds.
    pub fn set_centre(&self, lat: f64, lon: f64) {
        let (lat, lon) = self.spec.bounds.clamp(lat, lon);
        let mut view = self.view.write();
        view.lat = lat;
        view.lon = lon;
    }

    /// Moves the centre by a screen-pixel delta at the display zoom.
    pub fn pan_by_pixels(&self, dx: f64, dy: f64) {
        let mut view = self.view.write();
        let (x, y) = lat_lon_to_pixel(view.lat, view.lon, view.zoom);
        let (lat, lon) = pixel_to_lat_lon(x + dx, y + dy, view.zoom, &self.spec.bounds);
        view.lat = lat;
        view.lon = lon;
    }

    /// Centres on a fraction of the whole map: `(0, 0)` is the north-west
    /// corner of the Mercator square and `(1, 1)` the south-east corner.
    pub fn set_centre_fraction(&self, fx: f64, fy: f64) {
        let mut view = self.view.write();
        let size = map_size(view.zoom);
        let (lat, lon) = pixel_to_lat_lon(
            fx.clamp(0.0, 1.0) * size,
            fy.clamp(0.0, 1.0) * size,
            view.zoom,
            &self.spec.bounds,
        );
        view.lat = lat;
        view.lon = lon;
    }

    /// Sets the display zoom, clamped to what the active layer can serve.
    ///
    /// Returns true if the zoom changed.
    pub fn set_zoom(&self, zoom: u8) -> bool {
        let mut view = self.view.write();
        let zoom = zoom.clamp(view.lowest_zoom(), view.max_zoom);
        let changed = zoom != view.zoom;
        view.zoom = zoom;
        changed
    }

    /// Changes the zoom by `delta` levels. Returns true if it changed.
    pub fn zoom_by(&self, delta: i32) -> bool {
        let current = self.view.read().zoom as i32;
        let target = (current + delta).clamp(0, MAX_ZOOM as i32) as u8;
        self.set_zoom(target)
    }

    /// Activates a layer and re-clamps the zoom into its range.
    pub fn set_active_layer(&self, index: usize, min_zoom: u8, max_zoom: u8) {
        let mut view = self.view.write();
        view.layer = index;
        view.min_zoom = min_zoom;
        view.max_zoom = max_zoom;
        view.zoom = view.zoom.clamp(view.lowest_zoom(), max_zoom);
    }

    pub fn set_viewport(&self, width: u32, height: u32) {
        let mut view = self.view.write();
        view.width = width;
        view.height = height;
    }

    /// Flips the debug grid overlay. Returns the new setting.
    pub fn toggle_grid(&self) -> bool {
        let mut view = self.view.write();
        view.show_grid = !view.show_grid;
        view.show_grid
    }
}
