//! Cache management CLI commands.

use std::path::Path;

use clap::Subcommand;
use quadtile::cache::RgbaBitmap;
use quadtile::layer::{LayerConfig, LayerSpec};
use quadtile::scheduler::{scan_layer, ScanReport};

use super::load_config;
use crate::error::CliError;

/// Cache action subcommands.
#[derive(Debug, Subcommand)]
pub enum CacheAction {
    /// Show the tiles and empty-tile records held on disk for each layer
    Stats,
    /// Delete the cached tiles of one layer, or of every layer
    Clear {
        /// Layer to clear (default: all configured layers)
        #[arg(long)]
        layer: Option<String>,
    },
}

/// Run a cache subcommand.
pub fn run(action: CacheAction, config: Option<&Path>) -> Result<(), CliError> {
    let config = load_config(config)?;
    let root = &config.cache.directory;

    match action {
        CacheAction::Stats => {
            println!("Disk cache: {}", root.display());
            for spec in config.layers() {
                let report = layer_stats(spec, root)?;
                println!();
                println!("[{}]", spec.name);
                println!("  Tiles:       {}", report.tiles);
                println!("  Empty tiles: {}", report.empty);
                if report.skipped > 0 {
                    println!("  Other files: {}", report.skipped);
                }
            }
            Ok(())
        }
        CacheAction::Clear { layer } => {
            let specs: Vec<&LayerSpec> = match &layer {
                Some(name) => vec![config
                    .layer(name)
                    .ok_or_else(|| CliError::Config(format!("Unknown layer '{}'", name)))?],
                None => config.layers().iter().collect(),
            };
            for spec in specs {
                let dir = root.join(&spec.name);
                if !dir.exists() {
                    continue;
                }
                println!("Clearing {}", dir.display());
                std::fs::remove_dir_all(&dir).map_err(|e| {
                    CliError::Config(format!("Failed to remove {}: {}", dir.display(), e))
                })?;
            }
            Ok(())
        }
    }
}

/// Scans the cache directories of one layer without creating any.
fn layer_stats(spec: &LayerSpec, root: &Path) -> Result<ScanReport, CliError> {
    let layer = LayerConfig::<RgbaBitmap>::new(spec.clone().with_save(false), root)
        .map_err(|e| CliError::Config(e.to_string()))?;
    Ok(scan_layer(&layer))
}
