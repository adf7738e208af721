//! Layer registration data and URL templating.

use super::LayerError;
use crate::coord::MAX_ZOOM;

/// Description of a tile source as registered by the caller.
///
/// URL templates use positional placeholders:
/// - `host_template`: `{0}` is replaced with the worker index, which lets a
///   layer spread requests over numbered mirror hosts.
/// - `path_template`: `{0}` is the quadkey and `{1}` the API key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerSpec {
    /// Layer name, also its directory name in the disk cache.
    pub name: String,
    pub host_template: String,
    pub path_template: String,
    /// Suffix of cached tile files, including the dot (e.g. `.png`).
    pub extension: String,
    /// Whether downloaded tiles are written to disk.
    pub save: bool,
    /// Responses shorter than this many bytes are treated as blank tiles.
    pub min_size: usize,
    pub min_zoom: u8,
    pub max_zoom: u8,
}

impl LayerSpec {
    /// Creates a spec with no size threshold, saving enabled, zooms 1 to 17.
    pub fn new(
        name: impl Into<String>,
        host_template: impl Into<String>,
        path_template: impl Into<String>,
        extension: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            host_template: host_template.into(),
            path_template: path_template.into(),
            extension: extension.into(),
            save: true,
            min_size: 0,
            min_zoom: 1,
            max_zoom: 17,
        }
    }

    /// Set the zoom range.
    pub fn with_zoom_range(mut self, min_zoom: u8, max_zoom: u8) -> Self {
        self.min_zoom = min_zoom;
        self.max_zoom = max_zoom;
        self
    }

    /// Set the minimum acceptable response size.
    pub fn with_min_size(mut self, min_size: usize) -> Self {
        self.min_size = min_size;
        self
    }

    /// Set whether downloaded tiles are saved to disk.
    pub fn with_save(mut self, save: bool) -> Self {
        self.save = save;
        self
    }

    /// Checks the spec and normalizes the extension to start with a dot.
    pub(crate) fn validated(mut self) -> Result<Self, LayerError> {
        if self.name.is_empty()
            || self.name.contains(['/', '\\'])
            || self.name == "."
            || self.name == ".."
        {
            return Err(LayerError::InvalidName(self.name));
        }
        if self.min_zoom == 0 || self.min_zoom > self.max_zoom || self.max_zoom > MAX_ZOOM {
            return Err(LayerError::InvalidZoomRange {
                name: self.name,
                min_zoom: self.min_zoom,
                max_zoom: self.max_zoom,
            });
        }
        if self.host_template.is_empty() {
            return Err(LayerError::InvalidTemplate {
                name: self.name,
                reason: "host template is empty".to_string(),
            });
        }
        if !self.path_template.contains("{0}") {
            return Err(LayerError::InvalidTemplate {
                name: self.name,
                reason: "path template has no {0} quadkey placeholder".to_string(),
            });
        }
        if !self.extension.is_empty() && !self.extension.starts_with('.') {
            self.extension.insert(0, '.');
        }
        Ok(self)
    }

    /// Builds the request URL for `quadkey`.
    pub fn url(&self, worker_index: usize, quadkey: &str, api_key: &str) -> String {
        let host = fill_template(&self.host_template, &[&worker_index.to_string()]);
        let path = fill_template(&self.path_template, &[quadkey, api_key]);
        format!("{}{}", host, path)
    }
}

/// Replaces `{0}`, `{1}`, ... with the corresponding argument.
///
/// Placeholders without a matching argument are left untouched.
pub fn fill_template(template: &str, args: &[&str]) -> String {
    let mut out = template.to_string();
    for (i, arg) in args.iter().enumerate() {
        out = out.replace(&format!("{{{}}}", i), arg);
    }
    out
}
