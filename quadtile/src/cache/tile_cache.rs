//! Per-zoom tile store with negative caching.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::{DashMap, DashSet};
use tracing::{debug, warn};

use super::bitmap::Bitmap;
use super::error::CacheError;
use crate::coord::QuadKey;

/// A cached tile: its bitmap, once loaded, and its position on the map.
pub struct Tile<B> {
    bitmap: Option<Arc<B>>,
    /// Column divided by `2^zoom`.
    pub scaled_x: f64,
    /// Row divided by `2^zoom`.
    pub scaled_y: f64,
}

impl<B> Tile<B> {
    fn new(bitmap: Option<Arc<B>>, scaled_x: f64, scaled_y: f64) -> Self {
        Self {
            bitmap,
            scaled_x,
            scaled_y,
        }
    }

    /// The decoded bitmap, if loaded.
    pub fn bitmap(&self) -> Option<&Arc<B>> {
        self.bitmap.as_ref()
    }

    /// Returns true if the bitmap has been loaded.
    pub fn is_loaded(&self) -> bool {
        self.bitmap.is_some()
    }
}

impl<B> Clone for Tile<B> {
    fn clone(&self) -> Self {
        Self {
            bitmap: self.bitmap.clone(),
            scaled_x: self.scaled_x,
            scaled_y: self.scaled_y,
        }
    }
}

impl<B> std::fmt::Debug for Tile<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tile")
            .field("loaded", &self.is_loaded())
            .field("scaled_x", &self.scaled_x)
            .field("scaled_y", &self.scaled_y)
            .finish()
    }
}

/// What [`TileCache::insert`] did with the bitmap it was given.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// No entry existed; one was created.
    Inserted,
    /// An empty entry existed and now holds the bitmap.
    Filled,
    /// The entry already held a bitmap; the new one was dropped.
    Duplicate,
}

/// Tile store for one zoom level of one layer.
///
/// Both the tile map and the empty set are sharded concurrent containers, so
/// workers insert without serializing on unrelated keys and the render thread
/// reads without waiting on them. Every entry is fully built before it becomes
/// visible.
pub struct TileCache<B> {
    tiles: DashMap<QuadKey, Tile<B>>,
    empty: DashSet<QuadKey>,
}

impl<B: Bitmap> TileCache<B> {
    pub fn new() -> Self {
        Self {
            tiles: DashMap::new(),
            empty: DashSet::new(),
        }
    }

    /// True if the key is known empty or its bitmap is loaded.
    pub fn is_resolved(&self, key: &QuadKey) -> bool {
        self.empty.contains(key) || self.tiles.get(key).is_some_and(|t| t.is_loaded())
    }

    /// True if the key is in the empty set.
    pub fn is_empty_tile(&self, key: &QuadKey) -> bool {
        self.empty.contains(key)
    }

    /// The loaded bitmap for `key`, if any.
    pub fn get(&self, key: &QuadKey) -> Option<Arc<B>> {
        self.tiles.get(key).and_then(|t| t.bitmap.clone())
    }

    /// Stores a decoded bitmap. The first bitmap stored for a key wins.
    pub fn insert(&self, key: QuadKey, bitmap: B, scaled_x: f64, scaled_y: f64) -> InsertOutcome {
        match self.tiles.entry(key) {
            Entry::Vacant(vacant) => {
                vacant.insert(Tile::new(Some(Arc::new(bitmap)), scaled_x, scaled_y));
                InsertOutcome::Inserted
            }
            Entry::Occupied(mut occupied) => {
                let tile = occupied.get_mut();
                if tile.bitmap.is_some() {
                    debug!(key = %occupied.key(), "Discarding duplicate tile bitmap");
                    drop(bitmap);
                    InsertOutcome::Duplicate
                } else {
                    tile.bitmap = Some(Arc::new(bitmap));
                    InsertOutcome::Filled
                }
            }
        }
    }

    /// Creates an unloaded entry for `key` if none exists.
    ///
    /// Returns true if an entry was created.
    pub fn declare(&self, key: QuadKey, scaled_x: f64, scaled_y: f64) -> bool {
        match self.tiles.entry(key) {
            Entry::Vacant(vacant) => {
                vacant.insert(Tile::new(None, scaled_x, scaled_y));
                true
            }
            Entry::Occupied(_) => false,
        }
    }

    /// Records `key` as having no usable content. Idempotent.
    ///
    /// Returns true if the key was not already known empty.
    pub fn mark_empty(&self, key: QuadKey) -> bool {
        self.empty.insert(key)
    }

    /// Drops every loaded bitmap. Entries stay, unloaded, so they are fetched
    /// again when next needed.
    pub fn release_all(&self) -> usize {
        let mut released = 0;
        for mut entry in self.tiles.iter_mut() {
            if entry.bitmap.take().is_some() {
                released += 1;
            }
        }
        released
    }

    /// Number of entries, loaded or not.
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    /// Returns true if no tiles are stored.
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Number of entries holding a bitmap.
    pub fn loaded_count(&self) -> usize {
        self.tiles.iter().filter(|t| t.is_loaded()).count()
    }

    /// Number of keys known empty.
    pub fn empty_count(&self) -> usize {
        self.empty.len()
    }

    /// Point-in-time copy of every entry.
    pub fn tiles(&self) -> Vec<(QuadKey, Tile<B>)> {
        self.tiles
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }

    /// Writes the empty set to `path`, one quadkey per line.
    pub fn dump_empty_set(&self, path: &Path) -> Result<usize, CacheError> {
        let mut keys: Vec<QuadKey> = self.empty.iter().map(|k| k.clone()).collect();
        keys.sort();

        let file = File::create(path).map_err(|e| CacheError::io(path, e))?;
        let mut writer = BufWriter::new(file);
        for key in &keys {
            writeln!(writer, "{}", key).map_err(|e| CacheError::io(path, e))?;
        }
        writer.flush().map_err(|e| CacheError::io(path, e))?;

        debug!(path = %path.display(), count = keys.len(), "Wrote empty tile set");
        Ok(keys.len())
    }

    /// Adds every quadkey listed in `path` to the empty set.
    ///
    /// Lines that are not valid quadkeys of length `zoom` are skipped.
    pub fn load_empty_set(&self, path: &Path, zoom: u8) -> Result<usize, CacheError> {
        let file = File::open(path).map_err(|e| CacheError::io(path, e))?;
        let mut loaded = 0;
        for line in BufReader::new(file).lines() {
            let line = line.map_err(|e| CacheError::io(path, e))?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match line.parse::<QuadKey>() {
                Ok(key) if key.zoom() == zoom => {
                    self.empty.insert(key);
                    loaded += 1;
                }
                _ => warn!(path = %path.display(), entry = line, "Skipping invalid empty tile entry"),
            }
        }
        Ok(loaded)
    }
}

impl<B: Bitmap> Default for TileCache<B> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::RgbaBitmap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn key(s: &str) -> QuadKey {
        s.parse().unwrap()
    }

    fn bitmap(tag: u8) -> RgbaBitmap {
        RgbaBitmap {
            width: 1,
            height: 1,
            pixels: vec![tag, tag, tag, 255],
        }
    }

    /// Bitmap that counts how many instances have been dropped.
    struct CountedBitmap {
        drops: Arc<AtomicUsize>,
    }

    impl Bitmap for CountedBitmap {
        fn dimensions(&self) -> (u32, u32) {
            (1, 1)
        }
    }

    impl Drop for CountedBitmap {
        fn drop(&mut self) {
            self.drops.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_unknown_key_is_unresolved() {
        let cache: TileCache<RgbaBitmap> = TileCache::new();
        assert!(!cache.is_resolved(&key("012")));
        assert!(cache.get(&key("012")).is_none());
    }

    #[test]
    fn test_first_insert_wins() {
        let cache = TileCache::new();
        assert_eq!(
            cache.insert(key("012"), bitmap(1), 0.25, 0.5),
            InsertOutcome::Inserted
        );
        assert_eq!(
            cache.insert(key("012"), bitmap(2), 0.25, 0.5),
            InsertOutcome::Duplicate
        );

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&key("012")).unwrap().pixels[0], 1);
    }

    #[test]
    fn test_duplicate_bitmap_is_released() {
        let drops = Arc::new(AtomicUsize::new(0));
        let cache = TileCache::new();
        cache.insert(key("1"), CountedBitmap { drops: drops.clone() }, 0.5, 0.0);
        cache.insert(key("1"), CountedBitmap { drops: drops.clone() }, 0.5, 0.0);
        assert_eq!(drops.load(Ordering::SeqCst), 1);

        cache.release_all();
        assert_eq!(drops.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_declared_tile_is_filled_in_place() {
        let cache = TileCache::new();
        assert!(cache.declare(key("30"), 0.25, 0.5));
        assert!(!cache.declare(key("30"), 0.25, 0.5));
        assert!(!cache.is_resolved(&key("30")));

        assert_eq!(
            cache.insert(key("30"), bitmap(7), 0.25, 0.5),
            InsertOutcome::Filled
        );
        assert!(cache.is_resolved(&key("30")));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_empty_set_dominates() {
        let cache: TileCache<RgbaBitmap> = TileCache::new();
        assert!(cache.mark_empty(key("0123")));
        assert!(!cache.mark_empty(key("0123")));
        assert!(cache.is_resolved(&key("0123")));

        cache.release_all();
        assert!(cache.is_resolved(&key("0123")));
        assert!(cache.get(&key("0123")).is_none());
    }

    #[test]
    fn test_release_all_keeps_entries() {
        let cache = TileCache::new();
        cache.insert(key("0"), bitmap(1), 0.0, 0.0);
        cache.insert(key("1"), bitmap(2), 0.5, 0.0);

        assert_eq!(cache.release_all(), 2);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.loaded_count(), 0);
        assert!(!cache.is_resolved(&key("0")));
        assert_eq!(
            cache.insert(key("0"), bitmap(3), 0.0, 0.0),
            InsertOutcome::Filled
        );
    }

    #[test]
    fn test_concurrent_inserts_keep_one_entry() {
        let cache = Arc::new(TileCache::new());
        let handles: Vec<_> = (0..8u8)
            .map(|i| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || cache.insert(key("2103"), bitmap(i), 0.0, 0.0))
            })
            .collect();

        let outcomes: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let winners = outcomes
            .iter()
            .filter(|o| **o == InsertOutcome::Inserted)
            .count();
        assert_eq!(winners, 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_empty_set_persists_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.txt");

        let cache: TileCache<RgbaBitmap> = TileCache::new();
        cache.mark_empty(key("0312"));
        cache.mark_empty(key("0011"));
        assert_eq!(cache.dump_empty_set(&path).unwrap(), 2);

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "0011\n0312\n");

        let restored: TileCache<RgbaBitmap> = TileCache::new();
        assert_eq!(restored.load_empty_set(&path, 4).unwrap(), 2);
        assert!(restored.is_resolved(&key("0312")));
    }

    #[test]
    fn test_load_empty_set_skips_bad_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.txt");
        std::fs::write(&path, "012\n\n0129\n01\n333\n").unwrap();

        let cache: TileCache<RgbaBitmap> = TileCache::new();
        assert_eq!(cache.load_empty_set(&path, 3).unwrap(), 2);
        assert_eq!(cache.empty_count(), 2);
    }

    #[test]
    fn test_load_missing_empty_set_errors() {
        let dir = tempfile::tempdir().unwrap();
        let cache: TileCache<RgbaBitmap> = TileCache::new();
        let result = cache.load_empty_set(&dir.path().join("missing.txt"), 3);
        assert!(matches!(result, Err(CacheError::Io { .. })));
    }
}
