//! Configuration management CLI commands.
//!
//! Provides `config init`, `config show` and `config path`.

use std::path::Path;

use clap::Subcommand;
use quadtile::config::{config_file_path, ConfigFile};

use super::load_config;
use crate::error::CliError;

/// Config subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Write a configuration file holding the default settings
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Show the effective settings
    Show,

    /// Show the configuration file path
    Path,
}

/// Run a config subcommand.
pub fn run(command: ConfigCommands, path: Option<&Path>) -> Result<(), CliError> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(config_file_path);
    match command {
        ConfigCommands::Init { force } => run_init(&path, force),
        ConfigCommands::Show => run_show(&path),
        ConfigCommands::Path => {
            println!("{}", path.display());
            Ok(())
        }
    }
}

/// Write the defaults to `path`.
fn run_init(path: &Path, force: bool) -> Result<(), CliError> {
    if path.exists() && !force {
        return Err(CliError::Config(format!(
            "{} already exists. Use --force to overwrite it.",
            path.display()
        )));
    }
    ConfigFile::default().save_to(path)?;
    println!("Wrote {}", path.display());
    Ok(())
}

/// Print every setting, grouped by section.
fn run_show(path: &Path) -> Result<(), CliError> {
    let config = load_config(Some(path))?;

    println!("Configuration Settings");
    println!("======================");
    println!();

    println!("[cache]");
    println!("  directory = {}", config.cache.directory.display());
    println!();

    println!("[download]");
    println!("  workers = {}", config.download.workers);
    println!("  timeout = {}", config.download.timeout);
    match &config.download.api_key {
        Some(_) => println!("  api_key = (set)"),
        None => println!("  api_key = (not set)"),
    }
    println!();

    println!("[map]");
    println!("  name = {}", config.map.name);
    println!("  lat = {} .. {}", config.map.min_lat, config.map.max_lat);
    println!("  lon = {} .. {}", config.map.min_lon, config.map.max_lon);
    println!();

    println!("[view]");
    println!("  centre = {}, {}", config.view.lat, config.view.lon);
    println!("  zoom = {}", config.view.zoom);
    println!("  size = {}x{}", config.view.width, config.view.height);

    for layer in config.layers() {
        println!();
        println!("[layer.{}]", layer.name);
        println!("  host = {}", layer.host_template);
        println!("  path = {}", layer.path_template);
        println!("  extension = {}", layer.extension);
        println!("  zoom = {} .. {}", layer.min_zoom, layer.max_zoom);
        println!("  save = {}", layer.save);
        println!("  min_size = {}", layer.min_size);
    }

    Ok(())
}
