#![cfg(feature = "backend-tract")]

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use tract_onnx::prelude::*;

use crate::infer::backend::{check_input, HeatmapLayout, PoseBackend, TensorLayout};
use crate::pose::{HeatmapStack, InputEncoding, InputSpec, InputTensor, PreprocessedInput};

/// Options for loading a pose model with tract.
#[derive(Clone, Copy, Debug)]
pub struct TractOptions {
    pub input: InputSpec,
    pub tensor_layout: TensorLayout,
    pub heatmap_layout: HeatmapLayout,
}

/// Tract-based backend for ONNX pose models.
///
/// Loads a local model file once and runs it on preprocessed frames. Output 0
/// must be a rank-4 heatmap tensor with a batch of one.
pub struct TractBackend {
    model: TypedRunnableModel<TypedModel>,
    options: TractOptions,
}

impl TractBackend {
    /// Load an ONNX model from disk and prepare it for inference.
    pub fn new<P: AsRef<Path>>(model_path: P, options: TractOptions) -> Result<Self> {
        let model_path = model_path.as_ref();
        let datum = match options.input.encoding {
            InputEncoding::Uint8 => u8::datum_type(),
            InputEncoding::Float01 => f32::datum_type(),
        };
        let model = tract_onnx::onnx()
            .model_for_path(model_path)
            .with_context(|| format!("failed to load ONNX model from {}", model_path.display()))?
            .with_input_fact(
                0,
                InferenceFact::dt_shape(datum, input_shape(&options)),
            )
            .context("failed to set input fact")?
            .into_optimized()
            .context("failed to optimize ONNX model")?
            .into_runnable()
            .context("failed to build runnable ONNX model")?;

        log::info!(
            "TractBackend: loaded {} ({}x{} {:?} {:?})",
            model_path.display(),
            options.input.width,
            options.input.height,
            options.input.encoding,
            options.tensor_layout
        );

        Ok(Self { model, options })
    }

    fn build_input(&self, input: &PreprocessedInput) -> Result<Tensor> {
        check_input(&self.options.input, input)?;
        let width = input.width as usize;
        let height = input.height as usize;
        let layout = self.options.tensor_layout;

        let tensor = match &input.tensor {
            InputTensor::Uint8(data) => to_array(data, width, height, layout).into_tensor(),
            InputTensor::Float01(data) => to_array(data, width, height, layout).into_tensor(),
        };
        Ok(tensor)
    }

    fn extract_heatmaps(&self, outputs: TVec<TValue>) -> Result<HeatmapStack> {
        let output = outputs
            .first()
            .ok_or_else(|| anyhow!("model produced no outputs"))?;
        let scores = output
            .cast_to::<f32>()
            .context("model output could not be cast to f32")?;
        let shape = scores.shape().to_vec();
        if shape.len() != 4 || shape[0] != 1 {
            return Err(anyhow!(
                "expected heatmap output of shape [1, _, _, _], got {:?}",
                shape
            ));
        }
        let values: Vec<f32> = scores
            .to_array_view::<f32>()
            .context("model output tensor was not f32")?
            .iter()
            .copied()
            .collect();

        let stack = match self.options.heatmap_layout {
            HeatmapLayout::ChannelsFirst => HeatmapStack::new(values, shape[1], shape[2], shape[3])?,
            HeatmapLayout::ChannelsLast => {
                HeatmapStack::from_channels_last(&values, shape[1], shape[2], shape[3])?
            }
        };
        Ok(stack)
    }
}

fn input_shape(options: &TractOptions) -> TVec<usize> {
    let width = options.input.width as usize;
    let height = options.input.height as usize;
    match options.tensor_layout {
        TensorLayout::Nchw => tvec!(1, 3, height, width),
        TensorLayout::Nhwc => tvec!(1, height, width, 3),
    }
}

fn to_array<T: Copy>(
    data: &[T],
    width: usize,
    height: usize,
    layout: TensorLayout,
) -> tract_ndarray::Array4<T> {
    match layout {
        TensorLayout::Nchw => {
            tract_ndarray::Array4::from_shape_fn((1, 3, height, width), |(_, channel, y, x)| {
                data[(y * width + x) * 3 + channel]
            })
        }
        TensorLayout::Nhwc => {
            tract_ndarray::Array4::from_shape_fn((1, height, width, 3), |(_, y, x, channel)| {
                data[(y * width + x) * 3 + channel]
            })
        }
    }
}

impl PoseBackend for TractBackend {
    fn name(&self) -> &'static str {
        "tract"
    }

    fn input_spec(&self) -> InputSpec {
        self.options.input
    }

    fn infer(&mut self, input: &PreprocessedInput) -> Result<HeatmapStack> {
        let tensor = self.build_input(input)?;
        let outputs = self
            .model
            .run(tvec!(tensor.into()))
            .context("ONNX inference failed")?;
        self.extract_heatmaps(outputs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nchw_array_splits_interleaved_channels() {
        // 2x1 image: pixel 0 = (1,2,3), pixel 1 = (4,5,6)
        let data = [1u8, 2, 3, 4, 5, 6];
        let array = to_array(&data, 2, 1, TensorLayout::Nchw);
        assert_eq!(array[[0, 0, 0, 0]], 1);
        assert_eq!(array[[0, 0, 0, 1]], 4);
        assert_eq!(array[[0, 2, 0, 1]], 6);

        let nhwc = to_array(&data, 2, 1, TensorLayout::Nhwc);
        assert_eq!(nhwc[[0, 0, 1, 1]], 5);
    }
}
