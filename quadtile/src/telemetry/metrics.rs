//! Atomic counters.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use super::TelemetrySnapshot;

/// Counters shared by the scheduler and every worker.
#[derive(Debug)]
pub struct TileMetrics {
    started: Instant,
    downloads: AtomicU64,
    bytes_downloaded: AtomicU64,
    empty_downloads: AtomicU64,
    disk_hits: AtomicU64,
    failures: AtomicU64,
    decode_failures: AtomicU64,
    duplicates: AtomicU64,
    already_queued: AtomicU64,
    queued: AtomicU64,
}

impl TileMetrics {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            downloads: AtomicU64::new(0),
            bytes_downloaded: AtomicU64::new(0),
            empty_downloads: AtomicU64::new(0),
            disk_hits: AtomicU64::new(0),
            failures: AtomicU64::new(0),
            decode_failures: AtomicU64::new(0),
            duplicates: AtomicU64::new(0),
            already_queued: AtomicU64::new(0),
            queued: AtomicU64::new(0),
        }
    }

    /// A tile was downloaded and decoded.
    pub fn download_completed(&self, bytes: usize) {
        self.downloads.fetch_add(1, Ordering::Relaxed);
        self.bytes_downloaded.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    /// A download came back below the layer's size threshold.
    pub fn empty_download(&self) {
        self.empty_downloads.fetch_add(1, Ordering::Relaxed);
    }

    /// A tile was loaded from the disk cache.
    pub fn disk_hit(&self) {
        self.disk_hits.fetch_add(1, Ordering::Relaxed);
    }

    /// A tile could not be fetched.
    pub fn failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Tile bytes could not be decoded. Also counted as a failure.
    pub fn decode_failure(&self) {
        self.decode_failures.fetch_add(1, Ordering::Relaxed);
        self.failure();
    }

    /// A bitmap arrived for a tile that was already loaded.
    pub fn duplicate(&self) {
        self.duplicates.fetch_add(1, Ordering::Relaxed);
    }

    /// Wanted tiles were skipped because they were already queued.
    pub fn already_queued(&self, count: usize) {
        self.already_queued.fetch_add(count as u64, Ordering::Relaxed);
    }

    /// Tiles were pushed onto the work queue.
    pub fn queued(&self, count: usize) {
        self.queued.fetch_add(count as u64, Ordering::Relaxed);
    }

    /// Copies the counters.
    pub fn snapshot(&self, queue_depth: usize) -> TelemetrySnapshot {
        TelemetrySnapshot {
            downloads: self.downloads.load(Ordering::Relaxed),
            bytes_downloaded: self.bytes_downloaded.load(Ordering::Relaxed),
            empty_downloads: self.empty_downloads.load(Ordering::Relaxed),
            disk_hits: self.disk_hits.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            decode_failures: self.decode_failures.load(Ordering::Relaxed),
            duplicates: self.duplicates.load(Ordering::Relaxed),
            already_queued: self.already_queued.load(Ordering::Relaxed),
            queued: self.queued.load(Ordering::Relaxed),
            queue_depth,
            uptime_secs: self.started.elapsed().as_secs_f64(),
        }
    }
}

impl Default for TileMetrics {
    fn default() -> Self {
        Self::new()
    }
}
