//! Coordinate type definitions

use std::fmt;

/// Web Mercator valid latitude range
pub const MIN_LAT: f64 = -85.05112878;
pub const MAX_LAT: f64 = 85.05112878;

/// Valid longitude range
pub const MIN_LON: f64 = -180.0;
pub const MAX_LON: f64 = 180.0;

/// Deepest zoom level a quadkey may address.
pub const MAX_ZOOM: u8 = 23;

/// Edge length of a tile in pixels.
pub const TILE_SIZE: u32 = 256;

/// Tile coordinates in the Web Mercator / Slippy Map system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileCoord {
    /// Zoom level
    pub zoom: u8,
    /// X coordinate (east-west), 0 at west
    pub x: u32,
    /// Y coordinate (north-south), 0 at north
    pub y: u32,
}

impl TileCoord {
    /// Creates a tile coordinate.
    pub fn new(zoom: u8, x: u32, y: u32) -> Self {
        Self { zoom, x, y }
    }

    /// Number of tiles along one axis at this zoom level.
    ///
    /// Saturates at `u32::MAX` for zoom levels of 32 and above.
    #[inline]
    pub fn tiles_per_axis(zoom: u8) -> u32 {
        1u32.checked_shl(zoom as u32).unwrap_or(u32::MAX)
    }

    /// Returns true if `x` and `y` address a tile that exists at this zoom.
    #[inline]
    pub fn is_valid(&self) -> bool {
        if self.zoom > MAX_ZOOM {
            return false;
        }
        let n = Self::tiles_per_axis(self.zoom);
        self.x < n && self.y < n
    }

    /// Position of the tile's north-west corner in the unit square of the
    /// whole map, i.e. `(x / 2^zoom, y / 2^zoom)`.
    #[inline]
    pub fn scaled(&self) -> (f64, f64) {
        let n = Self::tiles_per_axis(self.zoom) as f64;
        (self.x as f64 / n, self.y as f64 / n)
    }
}

impl fmt::Display for TileCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.zoom, self.x, self.y)
    }
}

/// Geographic bounding box a map is restricted to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapBounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl MapBounds {
    /// Creates a bounding box, intersected with the Web Mercator range.
    pub fn new(min_lat: f64, max_lat: f64, min_lon: f64, max_lon: f64) -> Result<Self, CoordError> {
        if min_lat.is_nan() || max_lat.is_nan() || min_lat >= max_lat {
            return Err(CoordError::InvalidBounds(format!(
                "min_lat {} must be below max_lat {}",
                min_lat, max_lat
            )));
        }
        if min_lon.is_nan() || max_lon.is_nan() || min_lon >= max_lon {
            return Err(CoordError::InvalidBounds(format!(
                "min_lon {} must be below max_lon {}",
                min_lon, max_lon
            )));
        }
        Ok(Self {
            min_lat: min_lat.max(MIN_LAT),
            max_lat: max_lat.min(MAX_LAT),
            min_lon: min_lon.max(MIN_LON),
            max_lon: max_lon.min(MAX_LON),
        })
    }

    /// The whole Web Mercator world.
    pub fn world() -> Self {
        Self {
            min_lat: MIN_LAT,
            max_lat: MAX_LAT,
            min_lon: MIN_LON,
            max_lon: MAX_LON,
        }
    }

    /// Clamps a point into the box.
    #[inline]
    pub fn clamp(&self, lat: f64, lon: f64) -> (f64, f64) {
        (
            lat.clamp(self.min_lat, self.max_lat),
            lon.clamp(self.min_lon, self.max_lon),
        )
    }
}

impl Default for MapBounds {
    fn default() -> Self {
        Self::world()
    }
}

/// Errors that can occur during coordinate conversion.
#[derive(Debug, Clone, PartialEq)]
pub enum CoordError {
    /// Zoom level is outside valid range (0 to 23)
    InvalidZoom(u8),
    /// Tile column or row does not exist at the given zoom
    TileOutOfRange { zoom: u8, x: u32, y: u32 },
    /// Quadkey contains invalid characters or is too long
    InvalidQuadkey(String),
    /// Bounding box corners are inverted or empty
    InvalidBounds(String),
}

impl fmt::Display for CoordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoordError::InvalidZoom(zoom) => {
                write!(
                    f,
                    "Invalid zoom level: {} (must be between 0 and {})",
                    zoom, MAX_ZOOM
                )
            }
            CoordError::TileOutOfRange { zoom, x, y } => {
                write!(f, "Tile {}/{}/{} does not exist at zoom {}", zoom, x, y, zoom)
            }
            CoordError::InvalidQuadkey(quadkey) => {
                write!(
                    f,
                    "Invalid quadkey: '{}' (must contain only digits 0-3 and length <= {})",
                    quadkey, MAX_ZOOM
                )
            }
            CoordError::InvalidBounds(msg) => write!(f, "Invalid map bounds: {}", msg),
        }
    }
}

impl std::error::Error for CoordError {}
