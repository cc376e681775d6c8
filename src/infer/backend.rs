use anyhow::Result;
use serde::Deserialize;

use crate::pose::{HeatmapStack, InputSpec, PreprocessedInput};

/// Model inference provider.
///
/// Implementations receive a preprocessed input matching `input_spec()` and
/// return one heatmap per keypoint, in the model's channel order.
pub trait PoseBackend: Send {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Input resolution and encoding the model expects.
    fn input_spec(&self) -> InputSpec;

    /// Run inference on one preprocessed frame.
    fn infer(&mut self, input: &PreprocessedInput) -> Result<HeatmapStack>;

    /// Optional warm-up hook, called once when an estimator opens the backend.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }

    /// Optional teardown hook, called once when the estimator is closed.
    fn shutdown(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Memory layout of the input tensor handed to the model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TensorLayout {
    #[default]
    Nchw,
    Nhwc,
}

/// Memory layout of the heatmap output tensor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeatmapLayout {
    /// `[1, K, H, W]`
    #[default]
    ChannelsFirst,
    /// `[1, H, W, K]`
    ChannelsLast,
}

pub(crate) fn check_input(spec: &InputSpec, input: &PreprocessedInput) -> Result<()> {
    if input.width != spec.width || input.height != spec.height {
        return Err(anyhow::anyhow!(
            "input size {}x{} does not match model input {}x{}",
            input.width,
            input.height,
            spec.width,
            spec.height
        ));
    }
    if input.tensor.encoding() != spec.encoding {
        return Err(anyhow::anyhow!(
            "input encoding {:?} does not match model encoding {:?}",
            input.tensor.encoding(),
            spec.encoding
        ));
    }
    let expected = (spec.width as usize)
        .checked_mul(spec.height as usize)
        .and_then(|v| v.checked_mul(3))
        .ok_or_else(|| anyhow::anyhow!("input dimensions overflow"))?;
    if input.tensor.len() != expected {
        return Err(anyhow::anyhow!(
            "expected {} input values, received {}",
            expected,
            input.tensor.len()
        ));
    }
    Ok(())
}
