//! Map view state.
//!
//! [`MapState`] holds where the user is looking: centre, zoom, active layer,
//! viewport size and the debug grid flag. Readers work from [`ViewState`]
//! copies, which also derive the tile window the scheduler requests.
//!
//! # Oversized tiles
//!
//! The view may zoom out past a layer's minimum zoom by up to
//! [`MAX_OVERSIZE_LEVELS`]. Tiles are then still fetched at the layer
//! minimum and drawn shrunk by `2^(min_zoom - zoom)`, so more of them are
//! needed to fill the viewport.

mod state;

pub use state::{MapSpec, MapState, ViewState, MAX_OVERSIZE_LEVELS};
