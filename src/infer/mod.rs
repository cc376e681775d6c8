//! Model inference providers.
//!
//! A `PoseBackend` turns a preprocessed frame into a heatmap stack. The
//! backend is owned by a single `PoseEstimator` for its whole lifetime; there is
//! no process-wide interpreter.

mod backend;
mod backends;

use anyhow::{anyhow, Result};

pub use backend::{HeatmapLayout, PoseBackend, TensorLayout};
pub use backends::synthetic::{SYNTHETIC_GRID_HEIGHT, SYNTHETIC_GRID_WIDTH};
pub use backends::SyntheticBackend;
#[cfg(feature = "backend-tract")]
pub use backends::{TractBackend, TractOptions};

use crate::config::ModelSettings;

/// Open the backend named in `settings`.
pub fn open_backend(settings: &ModelSettings) -> Result<Box<dyn PoseBackend>> {
    match settings.backend.as_str() {
        "synthetic" => Ok(Box::new(SyntheticBackend::new(settings.input_spec()))),
        "tract" => open_tract(settings),
        other => Err(anyhow!(
            "unknown model backend '{}'; expected synthetic or tract",
            other
        )),
    }
}

#[cfg(feature = "backend-tract")]
fn open_tract(settings: &ModelSettings) -> Result<Box<dyn PoseBackend>> {
    let options = TractOptions {
        input: settings.input_spec(),
        tensor_layout: settings.tensor_layout,
        heatmap_layout: settings.heatmap_layout,
    };
    Ok(Box::new(TractBackend::new(&settings.path, options)?))
}

#[cfg(not(feature = "backend-tract"))]
fn open_tract(_settings: &ModelSettings) -> Result<Box<dyn PoseBackend>> {
    Err(anyhow!("the tract backend requires the backend-tract feature"))
}
