//! Coordinate conversion module
//!
//! Provides the quadkey codec and conversions between geographic coordinates
//! (latitude/longitude), global pixel coordinates and tile coordinates in the
//! spherical Mercator projection used by slippy-map tile servers.

mod quadkey;
mod types;

pub use quadkey::{decode_quadkey, encode_quadkey, QuadKey};
pub use types::{
    CoordError, MapBounds, TileCoord, MAX_LAT, MAX_LON, MAX_ZOOM, MIN_LAT, MIN_LON, TILE_SIZE,
};

use std::f64::consts::PI;

/// Size in pixels of the whole map along one axis at `zoom`.
#[inline]
pub fn map_size(zoom: u8) -> f64 {
    (TILE_SIZE as u64 * (1u64 << zoom)) as f64
}

/// Projects a geographic position to global pixel coordinates.
///
/// Results are clipped to `[0, map_size - 1]` on both axes so that the poles
/// and the antimeridian map to the outermost pixel rather than outside the map.
#[inline]
pub fn lat_lon_to_pixel(lat: f64, lon: f64, zoom: u8) -> (f64, f64) {
    let size = map_size(zoom);
    let x = (lon + 180.0) / 360.0 * size;

    let sin_lat = (lat * PI / 180.0).sin();
    let y = (0.5 - ((1.0 + sin_lat) / (1.0 - sin_lat)).ln() / (4.0 * PI)) * size;

    (x.clamp(0.0, size - 1.0), y.clamp(0.0, size - 1.0))
}

/// Inverse of [`lat_lon_to_pixel`], restricted to `bounds`.
#[inline]
pub fn pixel_to_lat_lon(x: f64, y: f64, zoom: u8, bounds: &MapBounds) -> (f64, f64) {
    let size = map_size(zoom);
    let x = x.clamp(0.0, size - 1.0) / size - 0.5;
    let y = 0.5 - y.clamp(0.0, size - 1.0) / size;

    let lat = 90.0 - 360.0 * (-y * 2.0 * PI).exp().atan() / PI;
    let lon = 360.0 * x;

    bounds.clamp(lat, lon)
}

/// Tile containing the given global pixel.
#[inline]
pub fn pixel_to_tile(x: f64, y: f64, zoom: u8) -> TileCoord {
    let last = TileCoord::tiles_per_axis(zoom) - 1;
    let tx = ((x / TILE_SIZE as f64).floor().max(0.0) as u32).min(last);
    let ty = ((y / TILE_SIZE as f64).floor().max(0.0) as u32).min(last);
    TileCoord::new(zoom, tx, ty)
}

/// Tile containing the given geographic position.
#[inline]
pub fn lat_lon_to_tile(lat: f64, lon: f64, zoom: u8) -> TileCoord {
    let (x, y) = lat_lon_to_pixel(lat, lon, zoom);
    pixel_to_tile(x, y, zoom)
}
