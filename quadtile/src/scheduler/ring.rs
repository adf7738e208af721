//! Viewport tile windows and ring ordering.
//!
//! Tiles are requested nearest-first by walking concentric square rings
//! around the centre tile, row-major within each ring:
//!
//! ```text
//!   w=2 w=2 w=2 w=2 w=2
//!   w=2 w=1 w=1 w=1 w=2
//!   w=2 w=1 w=0 w=1 w=2
//!   w=2 w=1 w=1 w=1 w=2
//!   w=2 w=2 w=2 w=2 w=2
//! ```
//!
//! This gives a cheap breadth-first visual priority without a real priority
//! queue.

use crate::coord::{TileCoord, TILE_SIZE};

/// Half the number of tiles needed to span `viewport_px`, plus one margin tile.
#[inline]
pub fn half_window(viewport_px: u32, tile_px: f64) -> u32 {
    if tile_px <= 0.0 {
        return 1;
    }
    (viewport_px as f64 / tile_px / 2.0).ceil() as u32 + 1
}

/// Offsets `(dx, dy)` covering `[-x_window, x_window] × [-y_window, y_window]`
/// exactly once, in ring order.
pub fn ring_offsets(x_window: u32, y_window: u32) -> Vec<(i32, i32)> {
    let xw = x_window as i32;
    let yw = y_window as i32;
    let mut offsets = Vec::with_capacity(((2 * xw + 1) * (2 * yw + 1)) as usize);

    for w in 0..=xw.max(yw) {
        for dy in -w.min(yw)..=w.min(yw) {
            for dx in -w.min(xw)..=w.min(xw) {
                if dx.abs().max(dy.abs()) == w {
                    offsets.push((dx, dy));
                }
            }
        }
    }
    offsets
}

/// The block of tiles around a centre tile that a viewport needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewWindow {
    pub centre: TileCoord,
    pub x_window: u32,
    pub y_window: u32,
}

impl ViewWindow {
    /// Window for a viewport of `width × height` screen pixels where one
    /// tile covers `tile_px` screen pixels.
    pub fn new(centre: TileCoord, width: u32, height: u32, tile_px: f64) -> Self {
        Self {
            centre,
            x_window: half_window(width, tile_px),
            y_window: half_window(height, tile_px),
        }
    }

    /// Window for a viewport drawn at native tile resolution.
    pub fn native(centre: TileCoord, width: u32, height: u32) -> Self {
        Self::new(centre, width, height, TILE_SIZE as f64)
    }

    /// Tiles of the window in ring order, clipped to the map.
    pub fn tiles(&self) -> Vec<TileCoord> {
        let n = TileCoord::tiles_per_axis(self.centre.zoom) as i64;
        ring_offsets(self.x_window, self.y_window)
            .into_iter()
            .filter_map(|(dx, dy)| {
                let x = self.centre.x as i64 + dx as i64;
                let y = self.centre.y as i64 + dy as i64;
                if (0..n).contains(&x) && (0..n).contains(&y) {
                    Some(TileCoord::new(self.centre.zoom, x as u32, y as u32))
                } else {
                    None
                }
            })
            .collect()
    }

    /// Returns true if `tile` lies inside the window.
    pub fn contains(&self, tile: &TileCoord) -> bool {
        tile.zoom == self.centre.zoom
            && (tile.x as i64 - self.centre.x as i64).unsigned_abs() <= self.x_window as u64
            && (tile.y as i64 - self.centre.y as i64).unsigned_abs() <= self.y_window as u64
    }
}
