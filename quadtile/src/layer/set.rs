//! Registry of layers shared between the UI thread and workers.

use std::sync::Arc;

use parking_lot::RwLock;

use super::{LayerConfig, LayerError};
use crate::cache::Bitmap;

/// Append-only list of registered layers, addressed by registration index.
///
/// Readers clone the `Arc` out under a short read lock and never hold it
/// across a fetch.
pub struct LayerSet<B> {
    layers: RwLock<Vec<Arc<LayerConfig<B>>>>,
}

impl<B: Bitmap> LayerSet<B> {
    pub fn new() -> Self {
        Self {
            layers: RwLock::new(Vec::new()),
        }
    }

    /// Appends a layer and returns its index. Names must be unique.
    pub fn push(&self, layer: Arc<LayerConfig<B>>) -> Result<usize, LayerError> {
        let mut layers = self.layers.write();
        if layers.iter().any(|l| l.name() == layer.name()) {
            return Err(LayerError::Duplicate(layer.name().to_string()));
        }
        layers.push(layer);
        Ok(layers.len() - 1)
    }

    pub fn get(&self, index: usize) -> Option<Arc<LayerConfig<B>>> {
        self.layers.read().get(index).cloned()
    }

    /// Index of the layer called `name`.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.layers.read().iter().position(|l| l.name() == name)
    }

    pub fn len(&self) -> usize {
        self.layers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.read().is_empty()
    }

    /// Copy of the current list.
    pub fn all(&self) -> Vec<Arc<LayerConfig<B>>> {
        self.layers.read().clone()
    }
}

impl<B: Bitmap> Default for LayerSet<B> {
    fn default() -> Self {
        Self::new()
    }
}
