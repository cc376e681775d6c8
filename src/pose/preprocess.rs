//! Frame preprocessing for model input.
//!
//! Frames are resized (bilinear) to the model input resolution and kept as
//! interleaved HWC data. The encoding is chosen per model:
//!
//! - `Uint8`: raw bytes, no normalization. Quantized models (HRNet w8a8).
//! - `Float01`: `f32` in `[0, 1]`. Float models.

use image::imageops::{self, FilterType};
use serde::Deserialize;

use super::error::PoseError;
use super::heatmap::InputSize;
use crate::frame::RgbFrame;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputEncoding {
    #[default]
    Uint8,
    Float01,
}

impl std::str::FromStr for InputEncoding {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "uint8" | "u8" => Ok(Self::Uint8),
            "float01" | "f32" => Ok(Self::Float01),
            other => Err(anyhow::anyhow!(
                "unknown input encoding '{}'; expected uint8 or float01",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelOrder {
    #[default]
    Rgb,
    Bgr,
}

impl std::str::FromStr for ChannelOrder {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "rgb" => Ok(Self::Rgb),
            "bgr" => Ok(Self::Bgr),
            other => Err(anyhow::anyhow!(
                "unknown channel order '{}'; expected rgb or bgr",
                other
            )),
        }
    }
}

/// What a model expects as input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputSpec {
    pub width: u32,
    pub height: u32,
    pub encoding: InputEncoding,
    pub channel_order: ChannelOrder,
}

impl InputSpec {
    pub fn size(&self) -> InputSize {
        InputSize::new(self.width, self.height)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum InputTensor {
    Uint8(Vec<u8>),
    Float01(Vec<f32>),
}

impl InputTensor {
    pub fn len(&self) -> usize {
        match self {
            Self::Uint8(data) => data.len(),
            Self::Float01(data) => data.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn encoding(&self) -> InputEncoding {
        match self {
            Self::Uint8(_) => InputEncoding::Uint8,
            Self::Float01(_) => InputEncoding::Float01,
        }
    }
}

/// Resized, encoded frame ready for inference. HWC, 3 channels.
#[derive(Debug, Clone, PartialEq)]
pub struct PreprocessedInput {
    pub width: u32,
    pub height: u32,
    pub channel_order: ChannelOrder,
    pub tensor: InputTensor,
}

impl PreprocessedInput {
    pub fn size(&self) -> InputSize {
        InputSize::new(self.width, self.height)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Preprocessor {
    spec: InputSpec,
}

impl Preprocessor {
    pub fn new(spec: InputSpec) -> Result<Self, PoseError> {
        if spec.width == 0 || spec.height == 0 {
            return Err(PoseError::invalid_shape(format!(
                "model input size must be positive, got {}x{}",
                spec.width, spec.height
            )));
        }
        Ok(Self { spec })
    }

    pub fn spec(&self) -> InputSpec {
        self.spec
    }

    pub fn run(&self, frame: &RgbFrame) -> anyhow::Result<PreprocessedInput> {
        let image = frame.to_image()?;
        let resized = if image.dimensions() == (self.spec.width, self.spec.height) {
            image
        } else {
            imageops::resize(
                &image,
                self.spec.width,
                self.spec.height,
                FilterType::Triangle,
            )
        };

        let mut bytes = resized.into_raw();
        if self.spec.channel_order == ChannelOrder::Bgr {
            for pixel in bytes.chunks_exact_mut(3) {
                pixel.swap(0, 2);
            }
        }

        let tensor = match self.spec.encoding {
            InputEncoding::Uint8 => InputTensor::Uint8(bytes),
            InputEncoding::Float01 => {
                InputTensor::Float01(bytes.iter().map(|&b| b as f32 / 255.0).collect())
            }
        };

        Ok(PreprocessedInput {
            width: self.spec.width,
            height: self.spec.height,
            channel_order: self.spec.channel_order,
            tensor,
        })
    }
}
