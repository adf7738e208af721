//! quadtile CLI - Command-line interface
//!
//! Loads the tiles a map view needs into the disk cache, reports what the
//! cache holds, converts quadkeys and manages the configuration file.

mod commands;
mod error;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use quadtile::logging::{init_logging, LogConfig};

use crate::commands::cache::CacheAction;
use crate::commands::config::ConfigCommands;
use crate::commands::fetch::FetchArgs;
use crate::commands::quadkey::QuadkeyCommands;

#[derive(Debug, Parser)]
#[command(name = "quadtile", version, about = "Tiled map cache and background tile loader")]
struct Cli {
    /// Configuration file to use instead of ~/.config/quadtile/config.ini
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Also write daily log files into this directory
    #[arg(long, global = true, value_name = "DIR")]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Load every tile of a view into the disk cache
    Fetch(FetchArgs),

    /// Inspect the disk cache
    #[command(subcommand)]
    Cache(CacheAction),

    /// Convert between quadkeys and tile coordinates
    #[command(subcommand)]
    Quadkey(QuadkeyCommands),

    /// Manage the configuration file
    #[command(subcommand)]
    Config(ConfigCommands),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut log_config = if cli.verbose {
        LogConfig::verbose()
    } else {
        LogConfig::default()
    };
    if let Some(dir) = cli.log_dir {
        log_config = log_config.with_directory(dir);
    }
    // Logging is best effort; the commands still work without it
    let _guard = match init_logging(&log_config) {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("Warning: {}", e);
            None
        }
    };

    let config = cli.config.as_deref();
    let result = match cli.command {
        Commands::Fetch(args) => commands::fetch::run(args, config),
        Commands::Cache(action) => commands::cache::run(action, config),
        Commands::Quadkey(command) => commands::quadkey::run(command),
        Commands::Config(command) => commands::config::run(command, config),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            e.exit_code()
        }
    }
}
