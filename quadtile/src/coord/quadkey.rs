//! Quadkey addressing.
//!
//! A quadkey is a base-4 string with one digit per zoom level. Each digit
//! interleaves one bit of the tile column (value 1) and one bit of the tile
//! row (value 2), most significant level first, so the key of a tile is
//! always prefixed by the keys of its ancestors:
//!
//! ```text
//! zoom 1:  0 1      zoom 2: 00 01 10 11
//!          2 3              02 03 12 13
//!                           20 21 30 31
//!                           22 23 32 33
//! ```

use std::fmt;
use std::str::FromStr;

use super::types::{CoordError, TileCoord, MAX_ZOOM};

/// A validated quadkey. Its length is the zoom level it addresses.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QuadKey(String);

impl QuadKey {
    /// Zoom level addressed by this key.
    #[inline]
    pub fn zoom(&self) -> u8 {
        self.0.len() as u8
    }

    /// The key as a string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Converts the key back into tile coordinates.
    pub fn to_tile(&self) -> TileCoord {
        let mut x = 0u32;
        let mut y = 0u32;
        let zoom = self.zoom();
        for (position, digit) in self.0.bytes().enumerate() {
            let bit = 1u32 << (zoom as usize - 1 - position);
            let value = digit - b'0';
            if value & 1 != 0 {
                x |= bit;
            }
            if value & 2 != 0 {
                y |= bit;
            }
        }
        TileCoord { zoom, x, y }
    }
}

impl fmt::Display for QuadKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for QuadKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for QuadKey {
    type Err = CoordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() > MAX_ZOOM as usize || !s.bytes().all(|b| (b'0'..=b'3').contains(&b)) {
            return Err(CoordError::InvalidQuadkey(s.to_string()));
        }
        Ok(QuadKey(s.to_string()))
    }
}

/// Encodes tile coordinates as a quadkey of exactly `zoom` digits.
///
/// Bits of `x` and `y` above `zoom` are ignored. A `zoom` above
/// [`MAX_ZOOM`] is clamped to it.
pub fn encode_quadkey(zoom: u8, x: u32, y: u32) -> QuadKey {
    let zoom = zoom.min(MAX_ZOOM);
    let mut key = String::with_capacity(zoom as usize);
    for i in (1..=zoom).rev() {
        let mask = 1u32 << (i - 1);
        let mut digit = b'0';
        if x & mask != 0 {
            digit += 1;
        }
        if y & mask != 0 {
            digit += 2;
        }
        key.push(digit as char);
    }
    QuadKey(key)
}

/// Decodes a quadkey string into `(zoom, x, y)`.
pub fn decode_quadkey(key: &str) -> Result<(u8, u32, u32), CoordError> {
    let tile = key.parse::<QuadKey>()?.to_tile();
    Ok((tile.zoom, tile.x, tile.y))
}

impl TileCoord {
    /// Quadkey of this tile.
    #[inline]
    pub fn quadkey(&self) -> QuadKey {
        encode_quadkey(self.zoom, self.x, self.y)
    }

    /// Tile addressed by `key`.
    pub fn from_quadkey(key: &str) -> Result<Self, CoordError> {
        Ok(key.parse::<QuadKey>()?.to_tile())
    }
}
