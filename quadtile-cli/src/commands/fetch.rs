//! Fetch command - load every tile of a view into the disk cache.
//!
//! Starts a [`TileService`] with the configured layers, points it at the
//! requested view and waits for the workers to drain the queue. Tiles the
//! disk cache already holds are decoded instead of downloaded, so running
//! the same fetch twice makes no requests the second time.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use quadtile::cache::{RgbaBitmap, RgbaBitmapFactory};
use quadtile::config::ConfigFile;
use quadtile::service::TileService;
use quadtile::telemetry::TelemetrySnapshot;

use super::load_config;
use crate::error::CliError;

const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Arguments for the fetch command.
#[derive(Debug, Args)]
pub struct FetchArgs {
    /// Layer to fetch (default: the first configured layer)
    #[arg(long)]
    pub layer: Option<String>,

    /// Latitude of the view centre
    #[arg(long, allow_hyphen_values = true)]
    pub lat: Option<f64>,

    /// Longitude of the view centre
    #[arg(long, allow_hyphen_values = true)]
    pub lon: Option<f64>,

    /// Zoom level
    #[arg(long)]
    pub zoom: Option<u8>,

    /// Viewport width in pixels
    #[arg(long)]
    pub width: Option<u32>,

    /// Viewport height in pixels
    #[arg(long)]
    pub height: Option<u32>,

    /// Number of download workers
    #[arg(long)]
    pub workers: Option<usize>,

    /// Give up after this many seconds
    #[arg(long, default_value_t = 300)]
    pub timeout: u64,

    /// Print the summary as JSON
    #[arg(long)]
    pub json: bool,
}

/// Run the fetch command.
pub fn run(args: FetchArgs, config: Option<&Path>) -> Result<(), CliError> {
    let config = load_config(config)?;
    let service = start_service(&args, &config)?;

    if let Some(name) = &args.layer {
        let index = service
            .layer_index(name)
            .ok_or_else(|| CliError::Config(format!("Unknown layer '{}'", name)))?;
        service.set_active_layer(index)?;
    }

    let interrupted = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&interrupted);
    ctrlc::set_handler(move || {
        flag.store(true, Ordering::SeqCst);
    })
    .map_err(|e| CliError::Config(format!("Failed to set signal handler: {}", e)))?;

    let view = service.view();
    if !args.json {
        let layer = service
            .active_layer()
            .map(|l| l.name().to_string())
            .unwrap_or_default();
        println!("quadtile v{}", quadtile::VERSION);
        println!();
        println!("Layer:  {}", layer);
        println!("Centre: {:.5}, {:.5}", view.lat, view.lon);
        println!("Zoom:   {}", view.effective_zoom());
        println!("Cache:  {}", service.root().display());
        println!();
    }

    let finished = wait_with_progress(&service, &args, &interrupted);

    let dumped = service.dump_empty_sets()?;
    let visible = service.visible_tiles();
    let telemetry = service.telemetry();
    service.shutdown();

    let loaded = visible.iter().filter(|t| t.bitmap.is_some()).count();
    let empty = visible.iter().filter(|t| t.empty).count();
    if args.json {
        let summary = serde_json::json!({
            "tiles": visible.len(),
            "loaded": loaded,
            "empty": empty,
            "empty_records_written": dumped,
            "complete": finished,
            "resolved": telemetry.resolved(),
            "telemetry": telemetry,
        });
        println!("{}", summary);
    } else {
        print_summary(visible.len(), loaded, empty, &telemetry);
    }

    if interrupted.load(Ordering::SeqCst) {
        return Err(CliError::Interrupted);
    }
    if !finished {
        return Err(CliError::Config(format!(
            "Tiles were still pending after {} seconds",
            args.timeout
        )));
    }
    Ok(())
}

fn start_service(
    args: &FetchArgs,
    config: &ConfigFile,
) -> Result<TileService<RgbaBitmap>, CliError> {
    if config.layers().is_empty() {
        return Err(CliError::Config("No layers configured".to_string()));
    }

    let view = &config.view;
    let mut builder =
        TileService::builder(config.map_spec()?, &config.cache.directory, RgbaBitmapFactory)
            .centre(args.lat.unwrap_or(view.lat), args.lon.unwrap_or(view.lon))
            .zoom(args.zoom.unwrap_or(view.zoom))
            .viewport(
                args.width.unwrap_or(view.width),
                args.height.unwrap_or(view.height),
            )
            .workers(args.workers.unwrap_or(config.download.workers))
            .timeout_secs(config.download.timeout);
    if let Some(key) = &config.download.api_key {
        builder = builder.api_key(key.clone());
    }
    let service = builder.build()?;
    for spec in config.layers() {
        service.register_layer(spec.clone())?;
    }
    Ok(service)
}

/// Polls the service until its queue drains, Ctrl+C is pressed or the
/// timeout expires. Returns true if the queue drained.
fn wait_with_progress(
    service: &TileService<RgbaBitmap>,
    args: &FetchArgs,
    interrupted: &AtomicBool,
) -> bool {
    let total = service.view().window().tiles().len() as u64;
    let progress = if args.json {
        ProgressBar::hidden()
    } else {
        ProgressBar::new(total)
    };
    progress.set_style(
        ProgressStyle::with_template("{bar:40} {pos:>5}/{len:5} tiles [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    let deadline = Instant::now() + Duration::from_secs(args.timeout);
    loop {
        if interrupted.load(Ordering::SeqCst) {
            progress.abandon_with_message("interrupted");
            break false;
        }
        let idle = service.wait_until_idle(POLL_INTERVAL);

        let resolved = service
            .visible_tiles()
            .iter()
            .filter(|t| t.bitmap.is_some() || t.empty)
            .count() as u64;
        progress.set_position(resolved);
        progress.set_message(format!("{} queued", service.queue_len()));

        if idle {
            progress.finish_with_message("done");
            break true;
        }
        if Instant::now() >= deadline {
            progress.abandon_with_message("timed out");
            break false;
        }
    }
}

fn print_summary(tiles: usize, loaded: usize, empty: usize, telemetry: &TelemetrySnapshot) {
    println!();
    println!("Tiles in view: {}", tiles);
    println!("  Loaded:      {}", loaded);
    println!("  Empty:       {}", empty);
    println!("  Missing:     {}", tiles.saturating_sub(loaded + empty));
    println!();
    println!(
        "Downloads:  {} ({})",
        telemetry.downloads,
        telemetry.bytes_downloaded_human()
    );
    println!("Disk hits:  {}", telemetry.disk_hits);
    println!("Resolved:   {}", telemetry.resolved());
    println!("Failures:   {}", telemetry.failures);
    println!("Elapsed:    {}", telemetry.uptime_human());
}
