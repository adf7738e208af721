//! Disk cache discovery.
//!
//! Walks `{root}/{layer}/{zoom}/` for every zoom level of a layer and
//! pre-populates its caches:
//!
//! - every `{quadkey}{ext}` file becomes a declared, not yet decoded tile;
//! - every `empty.txt` repopulates the empty set.
//!
//! Zoom directories are scanned in parallel with rayon. Decoding is left to
//! the workers, which find the file on their first fetch.

use std::path::Path;

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::cache::{Bitmap, EMPTY_SET_FILE};
use crate::coord::QuadKey;
use crate::layer::LayerConfig;

/// What a scan found.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanReport {
    /// Tile files declared.
    pub tiles: usize,
    /// Keys restored into empty sets.
    pub empty: usize,
    /// Files that did not look like tiles of their directory.
    pub skipped: usize,
}

impl ScanReport {
    fn merge(self, other: ScanReport) -> ScanReport {
        ScanReport {
            tiles: self.tiles + other.tiles,
            empty: self.empty + other.empty,
            skipped: self.skipped + other.skipped,
        }
    }
}

/// Scans every zoom directory of `layer`.
pub fn scan_layer<B: Bitmap>(layer: &LayerConfig<B>) -> ScanReport {
    let zooms: Vec<u8> = layer.zoom_levels().collect();
    let report = zooms
        .par_iter()
        .map(|&zoom| scan_zoom(layer, zoom))
        .reduce(ScanReport::default, ScanReport::merge);

    info!(
        layer = layer.name(),
        tiles = report.tiles,
        empty = report.empty,
        skipped = report.skipped,
        "Disk cache scan complete"
    );
    report
}

/// Scans one zoom directory of `layer`.
fn scan_zoom<B: Bitmap>(layer: &LayerConfig<B>, zoom: u8) -> ScanReport {
    let dir = layer.zoom_dir(zoom);
    let entries = match std::fs::read_dir(&dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %dir.display(), "No cache directory for zoom level");
            return ScanReport::default();
        }
        Err(e) => {
            warn!(path = %dir.display(), error = %e, "Failed to read cache directory");
            return ScanReport::default();
        }
    };

    let extension = layer.spec().extension.as_str();
    let mut report = ScanReport::default();

    for entry in entries.filter_map(|e| e.ok()) {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            report.skipped += 1;
            continue;
        };

        if name == EMPTY_SET_FILE {
            report.empty += load_empty(layer, zoom, &path);
            continue;
        }

        match tile_key(name, extension, zoom) {
            Some(key) => {
                layer.declare(key);
                report.tiles += 1;
            }
            None => report.skipped += 1,
        }
    }

    report
}

fn load_empty<B: Bitmap>(layer: &LayerConfig<B>, zoom: u8, path: &Path) -> usize {
    let Some(cache) = layer.cache(zoom) else {
        return 0;
    };
    match cache.load_empty_set(path, zoom) {
        Ok(count) => count,
        Err(e) => {
            warn!(error = %e, "Failed to load empty tile set");
            0
        }
    }
}

/// Parses `{quadkey}{extension}` into a key of the expected zoom.
fn tile_key(file_name: &str, extension: &str, zoom: u8) -> Option<QuadKey> {
    let stem = file_name.strip_suffix(extension)?;
    let key: QuadKey = stem.parse().ok()?;
    (key.zoom() == zoom).then_some(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::RgbaBitmap;
    use crate::layer::LayerSpec;

    #[test]
    fn test_tile_key_parsing() {
        assert_eq!(tile_key("030.png", ".png", 3), Some("030".parse().unwrap()));
        assert_eq!(tile_key("030.png", ".png", 4), None);
        assert_eq!(tile_key("030.jpg", ".png", 3), None);
        assert_eq!(tile_key("0a0.png", ".png", 3), None);
    }

    #[test]
    fn test_scan_declares_files_and_restores_empty_sets() {
        let root = tempfile::tempdir().unwrap();
        let spec = LayerSpec::new("osm", "http://h", "/{0}", ".png").with_zoom_range(2, 4);
        let layer: LayerConfig<RgbaBitmap> = LayerConfig::new(spec, root.path()).unwrap();

        let z3 = root.path().join("osm/3");
        std::fs::write(z3.join("030.png"), b"x").unwrap();
        std::fs::write(z3.join("031.png"), b"x").unwrap();
        std::fs::write(z3.join("notes.txt"), b"x").unwrap();
        std::fs::write(z3.join(EMPTY_SET_FILE), "333\n332\n").unwrap();
        std::fs::write(root.path().join("osm/2/00.png"), b"x").unwrap();

        let report = scan_layer(&layer);
        assert_eq!(report.tiles, 3);
        assert_eq!(report.empty, 2);
        assert_eq!(report.skipped, 1);

        let cache = layer.cache(3).unwrap();
        assert_eq!(cache.len(), 2);
        // Declared tiles still need decoding
        assert!(!cache.is_resolved(&"030".parse().unwrap()));
        assert!(cache.is_resolved(&"333".parse().unwrap()));
        assert!(layer.range().extent().is_some());
    }

    #[test]
    fn test_scan_without_directories() {
        let root = tempfile::tempdir().unwrap();
        let spec = LayerSpec::new("osm", "http://h", "/{0}", ".png").with_save(false);
        let layer: LayerConfig<RgbaBitmap> = LayerConfig::new(spec, root.path()).unwrap();
        assert_eq!(scan_layer(&layer), ScanReport::default());
    }
}
