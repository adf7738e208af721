//! CLI subcommands.

pub mod cache;
pub mod config;
pub mod fetch;
pub mod quadkey;

use std::path::Path;

use quadtile::config::ConfigFile;

use crate::error::CliError;

/// Loads `path` if given, otherwise the default configuration file.
///
/// A missing file yields the defaults.
pub fn load_config(path: Option<&Path>) -> Result<ConfigFile, CliError> {
    let config = match path {
        Some(path) => ConfigFile::load_from(path)?,
        None => ConfigFile::load()?,
    };
    Ok(config)
}
