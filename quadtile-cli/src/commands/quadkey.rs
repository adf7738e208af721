//! Quadkey conversion CLI commands.

use clap::Subcommand;
use quadtile::coord::{lat_lon_to_tile, CoordError, QuadKey, TileCoord, MAX_ZOOM};

use crate::error::CliError;

/// Quadkey subcommands.
#[derive(Debug, Subcommand)]
pub enum QuadkeyCommands {
    /// Encode tile coordinates as a quadkey
    Encode {
        /// Zoom level (0-23)
        zoom: u8,
        /// Tile column
        x: u32,
        /// Tile row
        y: u32,
    },

    /// Decode a quadkey into zoom level and tile coordinates
    Decode {
        /// Quadkey made of the digits 0-3
        key: String,
    },

    /// Find the tile containing a geographic position
    Locate {
        /// Latitude in degrees
        #[arg(allow_hyphen_values = true)]
        lat: f64,
        /// Longitude in degrees
        #[arg(allow_hyphen_values = true)]
        lon: f64,
        /// Zoom level (0-23)
        zoom: u8,
    },
}

/// Run a quadkey subcommand.
pub fn run(command: QuadkeyCommands) -> Result<(), CliError> {
    match command {
        QuadkeyCommands::Encode { zoom, x, y } => {
            println!("{}", encode(zoom, x, y)?);
        }
        QuadkeyCommands::Decode { key } => {
            let tile = decode(&key)?;
            println!("zoom={} x={} y={}", tile.zoom, tile.x, tile.y);
        }
        QuadkeyCommands::Locate { lat, lon, zoom } => {
            if zoom > MAX_ZOOM {
                return Err(CoordError::InvalidZoom(zoom).into());
            }
            let tile = lat_lon_to_tile(lat, lon, zoom);
            println!(
                "{} (zoom={} x={} y={})",
                tile.quadkey(),
                tile.zoom,
                tile.x,
                tile.y
            );
        }
    }
    Ok(())
}

fn encode(zoom: u8, x: u32, y: u32) -> Result<String, CoordError> {
    if zoom > MAX_ZOOM {
        return Err(CoordError::InvalidZoom(zoom));
    }
    let tile = TileCoord::new(zoom, x, y);
    if !tile.is_valid() {
        return Err(CoordError::TileOutOfRange { zoom, x, y });
    }
    Ok(tile.quadkey().as_str().to_string())
}

fn decode(key: &str) -> Result<TileCoord, CoordError> {
    Ok(key.parse::<QuadKey>()?.to_tile())
}
