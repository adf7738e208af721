//! Running bounds of cached tile positions.

use parking_lot::Mutex;

/// Extent of a set of tiles in the unit square of the whole map.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extent {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Extent {
    /// Width of the extent in map units.
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    /// Height of the extent in map units.
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }
}

/// Min/max of the scaled positions of every tile recorded so far.
///
/// Only ever widens; releasing or forgetting tiles does not shrink it.
#[derive(Debug, Default)]
pub struct RangeBox {
    extent: Mutex<Option<Extent>>,
}

impl RangeBox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Widens the box to include `(x, y)`.
    pub fn include(&self, x: f64, y: f64) {
        let mut extent = self.extent.lock();
        match extent.as_mut() {
            Some(e) => {
                e.min_x = e.min_x.min(x);
                e.min_y = e.min_y.min(y);
                e.max_x = e.max_x.max(x);
                e.max_y = e.max_y.max(y);
            }
            None => {
                *extent = Some(Extent {
                    min_x: x,
                    min_y: y,
                    max_x: x,
                    max_y: y,
                });
            }
        }
    }

    /// Current extent, or `None` if nothing has been recorded.
    pub fn extent(&self) -> Option<Extent> {
        *self.extent.lock()
    }
}
