//! INI configuration file.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use ini::{Ini, Properties};
use tracing::debug;

use super::{config_file_path, default_cache_dir, expand_tilde, ConfigError};
use crate::coord::{MapBounds, MAX_LAT, MAX_LON, MIN_LAT, MIN_LON};
use crate::layer::LayerSpec;
use crate::map::MapSpec;
use crate::provider::DEFAULT_TIMEOUT_SECS;
use crate::service::DEFAULT_WORKERS;

const LAYER_PREFIX: &str = "layer.";

/// `[cache]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheSettings {
    /// Root of the on-disk tile cache.
    pub directory: PathBuf,
}

/// `[download]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadSettings {
    pub workers: usize,
    /// Request timeout in seconds.
    pub timeout: u64,
    /// Substituted for `{1}` in layer path templates.
    pub api_key: Option<String>,
}

/// `[map]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct MapSettings {
    pub name: String,
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

/// `[view]` section: where a session starts.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewSettings {
    pub lat: f64,
    pub lon: f64,
    pub zoom: u8,
    pub width: u32,
    pub height: u32,
}

/// Parsed configuration file.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigFile {
    pub cache: CacheSettings,
    pub download: DownloadSettings,
    pub map: MapSettings,
    pub view: ViewSettings,
    /// One entry per `[layer.<name>]` section, in file order.
    pub layers: Vec<LayerSpec>,
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            cache: CacheSettings {
                directory: default_cache_dir(),
            },
            download: DownloadSettings {
                workers: DEFAULT_WORKERS,
                timeout: DEFAULT_TIMEOUT_SECS,
                api_key: None,
            },
            map: MapSettings {
                name: "world".to_string(),
                min_lat: MIN_LAT,
                max_lat: MAX_LAT,
                min_lon: MIN_LON,
                max_lon: MAX_LON,
            },
            view: ViewSettings {
                lat: 51.5,
                lon: -0.12,
                zoom: 10,
                width: 1280,
                height: 720,
            },
            layers: vec![LayerSpec::new(
                "road",
                "http://ecn.t{0}.tiles.virtualearth.net",
                "/tiles/r{0}.png?g=1",
                ".png",
            )],
        }
    }
}

impl ConfigFile {
    /// Loads the file at the default location, or the defaults if it does
    /// not exist.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&config_file_path())
    }

    /// Loads `path`, or the defaults if it does not exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            debug!(path = %path.display(), "No configuration file, using defaults");
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        let ini = Ini::load_from_str(&text).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_ini(&ini)
    }

    /// Builds settings from parsed INI, defaulting missing keys.
    pub fn from_ini(ini: &Ini) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let empty = Properties::new();
        let section = |name: &str| ini.section(Some(name)).unwrap_or(&empty);

        let cache = section("cache");
        let cache = CacheSettings {
            directory: cache
                .get("directory")
                .map(expand_tilde)
                .unwrap_or(defaults.cache.directory),
        };

        let download = section("download");
        let download = DownloadSettings {
            workers: parse(download, "download", "workers", defaults.download.workers)?,
            timeout: parse(download, "download", "timeout", defaults.download.timeout)?,
            api_key: download
                .get("api_key")
                .filter(|key| !key.trim().is_empty())
                .map(str::to_string),
        };

        let map = section("map");
        let map = MapSettings {
            name: map
                .get("name")
                .map(str::to_string)
                .unwrap_or(defaults.map.name),
            min_lat: parse(map, "map", "min_lat", defaults.map.min_lat)?,
            max_lat: parse(map, "map", "max_lat", defaults.map.max_lat)?,
            min_lon: parse(map, "map", "min_lon", defaults.map.min_lon)?,
            max_lon: parse(map, "map", "max_lon", defaults.map.max_lon)?,
        };

        let view = section("view");
        let view = ViewSettings {
            lat: parse(view, "view", "lat", defaults.view.lat)?,
            lon: parse(view, "view", "lon", defaults.view.lon)?,
            zoom: parse(view, "view", "zoom", defaults.view.zoom)?,
            width: parse(view, "view", "width", defaults.view.width)?,
            height: parse(view, "view", "height", defaults.view.height)?,
        };

        let mut layers = Vec::new();
        for (name, props) in ini.iter() {
            let Some(layer) = name.and_then(|n| n.strip_prefix(LAYER_PREFIX)) else {
                continue;
            };
            layers.push(parse_layer(layer, props)?);
        }
        if layers.is_empty() {
            layers = defaults.layers;
        }

        Ok(Self {
            cache,
            download,
            map,
            view,
            layers,
        })
    }

    /// Serialises the settings.
    pub fn to_ini(&self) -> Ini {
        let mut ini = Ini::new();
        ini.with_section(Some("cache"))
            .set("directory", self.cache.directory.display().to_string());
        ini.with_section(Some("download"))
            .set("workers", self.download.workers.to_string())
            .set("timeout", self.download.timeout.to_string())
            .set("api_key", self.download.api_key.clone().unwrap_or_default());
        ini.with_section(Some("map"))
            .set("name", self.map.name.clone())
            .set("min_lat", self.map.min_lat.to_string())
            .set("max_lat", self.map.max_lat.to_string())
            .set("min_lon", self.map.min_lon.to_string())
            .set("max_lon", self.map.max_lon.to_string());
        ini.with_section(Some("view"))
            .set("lat", self.view.lat.to_string())
            .set("lon", self.view.lon.to_string())
            .set("zoom", self.view.zoom.to_string())
            .set("width", self.view.width.to_string())
            .set("height", self.view.height.to_string());

        for layer in &self.layers {
            ini.with_section(Some(format!("{}{}", LAYER_PREFIX, layer.name)))
                .set("host", layer.host_template.clone())
                .set("path", layer.path_template.clone())
                .set("extension", layer.extension.clone())
                .set("save", layer.save.to_string())
                .set("min_size", layer.min_size.to_string())
                .set("min_zoom", layer.min_zoom.to_string())
                .set("max_zoom", layer.max_zoom.to_string());
        }
        ini
    }

    /// Writes the settings to the default location.
    pub fn save(&self) -> Result<PathBuf, ConfigError> {
        let path = config_file_path();
        self.save_to(&path)?;
        Ok(path)
    }

    /// Writes the settings to `path`, creating its directory.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let write_error = |e| ConfigError::Write {
            path: path.to_path_buf(),
            source: e,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(write_error)?;
        }
        self.to_ini().write_to_file(path).map_err(write_error)
    }

    /// The configured map.
    pub fn map_spec(&self) -> Result<MapSpec, ConfigError> {
        let m = &self.map;
        let bounds = MapBounds::new(m.min_lat, m.max_lat, m.min_lon, m.max_lon).map_err(|_| {
            ConfigError::InvalidValue {
                section: "map".to_string(),
                key: "bounds".to_string(),
                value: format!("{},{} .. {},{}", m.min_lat, m.min_lon, m.max_lat, m.max_lon),
            }
        })?;
        Ok(MapSpec::new(m.name.clone(), bounds))
    }

    /// Layer specs in file order.
    pub fn layers(&self) -> &[LayerSpec] {
        &self.layers
    }

    /// Layer called `name`.
    pub fn layer(&self, name: &str) -> Option<&LayerSpec> {
        self.layers.iter().find(|l| l.name == name)
    }
}

fn parse_layer(name: &str, props: &Properties) -> Result<LayerSpec, ConfigError> {
    let section = format!("{}{}", LAYER_PREFIX, name);
    let required = |key: &str| {
        props.get(key).map(str::to_string).ok_or_else(|| ConfigError::MissingKey {
            section: section.clone(),
            key: key.to_string(),
        })
    };
    let host = required("host")?;
    let path = required("path")?;
    let extension = props.get("extension").unwrap_or(".png");

    let defaults = LayerSpec::new(name, "", "", "");
    let save = match props.get("save") {
        Some(value) => parse_bool(value).ok_or_else(|| invalid(&section, "save", value))?,
        None => defaults.save,
    };

    Ok(LayerSpec::new(name, host, path, extension)
        .with_save(save)
        .with_min_size(parse(props, &section, "min_size", defaults.min_size)?)
        .with_zoom_range(
            parse(props, &section, "min_zoom", defaults.min_zoom)?,
            parse(props, &section, "max_zoom", defaults.max_zoom)?,
        ))
}

/// Parses `key`, or returns `default` if it is absent or blank.
fn parse<T: FromStr>(props: &Properties, section: &str, key: &str, default: T) -> Result<T, ConfigError> {
    match props.get(key).map(str::trim) {
        None | Some("") => Ok(default),
        Some(value) => value.parse().map_err(|_| invalid(section, key, value)),
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}

fn invalid(section: &str, key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[cache]
directory = /var/cache/tiles

[download]
workers = 8
api_key = secret

[view]
zoom = 5

[layer.road]
host = http://ecn.t{0}.tiles.virtualearth.net
path = /tiles/r{0}.png?g=1&key={1}
min_size = 1000
max_zoom = 19

[layer.aerial]
host = http://ecn.t{0}.tiles.virtualearth.net
path = /tiles/a{0}.jpeg?g=1
extension = .jpg
save = no
"#;

    fn parse_sample() -> ConfigFile {
        ConfigFile::from_ini(&Ini::load_from_str(SAMPLE).unwrap()).unwrap()
    }

    #[test]
    fn test_sections_parsed() {
        let config = parse_sample();
        assert_eq!(config.cache.directory, PathBuf::from("/var/cache/tiles"));
        assert_eq!(config.download.workers, 8);
        assert_eq!(config.download.timeout, DEFAULT_TIMEOUT_SECS);
        assert_eq!(config.download.api_key.as_deref(), Some("secret"));
        assert_eq!(config.view.zoom, 5);
        assert_eq!(config.view.width, 1280);
        assert_eq!(config.map.name, "world");
    }

    #[test]
    fn test_layers_in_file_order() {
        let config = parse_sample();
        let names: Vec<_> = config.layers().iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, ["road", "aerial"]);

        let road = config.layer("road").unwrap();
        assert_eq!(road.min_size, 1000);
        assert_eq!((road.min_zoom, road.max_zoom), (1, 19));
        assert!(road.save);

        let aerial = config.layer("aerial").unwrap();
        assert_eq!(aerial.extension, ".jpg");
        assert!(!aerial.save);
    }

    #[test]
    fn test_invalid_value_reported() {
        let ini = Ini::load_from_str("[download]\nworkers = many\n").unwrap();
        let err = ConfigFile::from_ini(&ini).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue { ref key, ref value, .. } if key == "workers" && value == "many"
        ));
    }

    #[test]
    fn test_layer_without_host_rejected() {
        let ini = Ini::load_from_str("[layer.road]\npath = /{0}\n").unwrap();
        let err = ConfigFile::from_ini(&ini).unwrap_err();
        assert!(matches!(err, ConfigError::MissingKey { ref key, .. } if key == "host"));
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = ConfigFile::load_from(&dir.path().join("config.ini")).unwrap();
        assert_eq!(config, ConfigFile::default());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/config.ini");
        let config = parse_sample();

        config.save_to(&path).unwrap();
        let reloaded = ConfigFile::load_from(&path).unwrap();
        assert_eq!(reloaded, config);
    }

    #[test]
    fn test_map_spec_validates_bounds() {
        let mut config = ConfigFile::default();
        assert_eq!(config.map_spec().unwrap().bounds, MapBounds::world());

        config.map.min_lat = 10.0;
        config.map.max_lat = 0.0;
        assert!(matches!(
            config.map_spec(),
            Err(ConfigError::InvalidValue { .. })
        ));
    }
}
