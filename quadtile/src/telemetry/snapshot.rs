//! Point-in-time copy of the loader counters.

use serde::Serialize;

/// Counter values at the moment the snapshot was taken.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TelemetrySnapshot {
    /// Tiles downloaded and decoded.
    pub downloads: u64,
    pub bytes_downloaded: u64,
    /// Downloads below the layer's size threshold, cached as empty.
    pub empty_downloads: u64,
    /// Tiles decoded from the disk cache.
    pub disk_hits: u64,
    /// Network and decode failures.
    pub failures: u64,
    pub decode_failures: u64,
    /// Bitmaps discarded because another worker got there first.
    pub duplicates: u64,
    /// Wanted tiles skipped because they were already queued.
    pub already_queued: u64,
    /// Tiles ever pushed onto the queue.
    pub queued: u64,
    /// Tiles waiting in the queue now.
    pub queue_depth: usize,
    pub uptime_secs: f64,
}

impl TelemetrySnapshot {
    /// Tiles that reached a terminal state.
    pub fn resolved(&self) -> u64 {
        self.downloads + self.empty_downloads + self.disk_hits
    }

    /// Human-readable downloaded volume.
    pub fn bytes_downloaded_human(&self) -> String {
        format_bytes(self.bytes_downloaded)
    }

    /// Human-readable uptime, e.g. `1h 02m 03s`.
    pub fn uptime_human(&self) -> String {
        let secs = self.uptime_secs as u64;
        let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
        if h > 0 {
            format!("{}h {:02}m {:02}s", h, m, s)
        } else if m > 0 {
            format!("{}m {:02}s", m, s)
        } else {
            format!("{}s", s)
        }
    }
}

fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} B", bytes)
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}
