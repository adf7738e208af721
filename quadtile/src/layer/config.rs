//! A registered layer and the caches it owns.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::{LayerError, LayerSpec};
use crate::cache::{Bitmap, CacheError, InsertOutcome, RangeBox, TileCache, EMPTY_SET_FILE};
use crate::coord::{QuadKey, TileCoord};

/// A registered layer: its immutable spec, one cache per zoom level and the
/// running extent of every tile recorded for it.
pub struct LayerConfig<B> {
    spec: LayerSpec,
    directory: PathBuf,
    caches: Vec<TileCache<B>>,
    range: RangeBox,
}

impl<B: Bitmap> LayerConfig<B> {
    /// Validates `spec` and builds its caches under `root`.
    ///
    /// When the layer saves tiles, `{root}/{name}/{zoom}/` is created for
    /// every zoom level.
    pub fn new(spec: LayerSpec, root: &Path) -> Result<Self, LayerError> {
        let spec = spec.validated()?;
        let directory = root.join(&spec.name);
        let levels = (spec.max_zoom - spec.min_zoom) as usize + 1;
        let caches = (0..levels).map(|_| TileCache::new()).collect();

        let layer = Self {
            spec,
            directory,
            caches,
            range: RangeBox::new(),
        };

        if layer.spec.save {
            for zoom in layer.zoom_levels() {
                let dir = layer.zoom_dir(zoom);
                std::fs::create_dir_all(&dir)
                    .map_err(|e| LayerError::CreateDirectory { path: dir, source: e })?;
            }
        }

        debug!(
            layer = %layer.spec.name,
            min_zoom = layer.spec.min_zoom,
            max_zoom = layer.spec.max_zoom,
            "Layer registered"
        );
        Ok(layer)
    }

    pub fn spec(&self) -> &LayerSpec {
        &self.spec
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }

    pub fn min_zoom(&self) -> u8 {
        self.spec.min_zoom
    }

    pub fn max_zoom(&self) -> u8 {
        self.spec.max_zoom
    }

    /// Zoom levels served by this layer.
    pub fn zoom_levels(&self) -> impl Iterator<Item = u8> {
        self.spec.min_zoom..=self.spec.max_zoom
    }

    /// `{root}/{name}/{zoom}`.
    pub fn zoom_dir(&self, zoom: u8) -> PathBuf {
        self.directory.join(zoom.to_string())
    }

    /// `{root}/{name}/{zoom}/{quadkey}{extension}`.
    pub fn tile_path(&self, zoom: u8, key: &QuadKey) -> PathBuf {
        self.zoom_dir(zoom).join(format!("{}{}", key, self.spec.extension))
    }

    /// `{root}/{name}/{zoom}/empty.txt`.
    pub fn empty_set_path(&self, zoom: u8) -> PathBuf {
        self.zoom_dir(zoom).join(EMPTY_SET_FILE)
    }

    /// Request URL for `key`.
    pub fn url(&self, worker_index: usize, key: &QuadKey, api_key: &str) -> String {
        self.spec.url(worker_index, key.as_str(), api_key)
    }

    /// Cache for `zoom`, or `None` outside the layer's range.
    pub fn cache(&self, zoom: u8) -> Option<&TileCache<B>> {
        if zoom < self.spec.min_zoom || zoom > self.spec.max_zoom {
            return None;
        }
        self.caches.get((zoom - self.spec.min_zoom) as usize)
    }

    /// True if `key` is loaded or known empty at `zoom`.
    pub fn is_resolved(&self, zoom: u8, key: &QuadKey) -> bool {
        self.cache(zoom).is_some_and(|c| c.is_resolved(key))
    }

    /// Stores a decoded tile and widens the layer's range box.
    pub fn insert(&self, key: QuadKey, bitmap: B) -> Option<InsertOutcome> {
        let zoom = key.zoom();
        let cache = self.cache(zoom)?;
        let (sx, sy) = key.to_tile().scaled();
        self.range.include(sx, sy);
        Some(cache.insert(key, bitmap, sx, sy))
    }

    /// Records an unloaded tile found on disk.
    pub fn declare(&self, key: QuadKey) -> bool {
        let Some(cache) = self.cache(key.zoom()) else {
            return false;
        };
        let (sx, sy) = key.to_tile().scaled();
        self.range.include(sx, sy);
        cache.declare(key, sx, sy)
    }

    /// Records `key` as blank.
    pub fn mark_empty(&self, key: QuadKey) -> bool {
        match self.cache(key.zoom()) {
            Some(cache) => cache.mark_empty(key),
            None => false,
        }
    }

    /// Loaded bitmap of the tile at `coord`.
    pub fn bitmap(&self, coord: TileCoord) -> Option<std::sync::Arc<B>> {
        self.cache(coord.zoom)?.get(&coord.quadkey())
    }

    /// Extent of every tile recorded for this layer.
    pub fn range(&self) -> &RangeBox {
        &self.range
    }

    /// Drops the bitmaps of every zoom level. Returns the number released.
    pub fn release_all(&self) -> usize {
        self.caches.iter().map(|c| c.release_all()).sum()
    }

    /// Writes `empty.txt` for every zoom level with known-empty tiles.
    ///
    /// Returns the number of keys written.
    pub fn dump_empty_sets(&self) -> Result<usize, CacheError> {
        let mut written = 0;
        for zoom in self.zoom_levels() {
            let Some(cache) = self.cache(zoom) else {
                continue;
            };
            if cache.empty_count() == 0 {
                continue;
            }
            let dir = self.zoom_dir(zoom);
            if let Err(e) = std::fs::create_dir_all(&dir) {
                warn!(path = %dir.display(), error = %e, "Cannot create zoom directory");
                return Err(CacheError::Io { path: dir, source: e });
            }
            written += cache.dump_empty_set(&self.empty_set_path(zoom))?;
        }
        Ok(written)
    }
}

impl<B> std::fmt::Debug for LayerConfig<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayerConfig")
            .field("spec", &self.spec)
            .field("directory", &self.directory)
            .finish()
    }
}
