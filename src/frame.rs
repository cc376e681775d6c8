//! Captured frames.
//!
//! `RgbFrame` is the only frame representation the pipeline accepts. It is
//! built by the ingestion layer and validated on construction, so a failed or
//! empty capture never reaches preprocessing.

use anyhow::{anyhow, Result};
use image::RgbImage;

use crate::pose::FrameSize;

const RGB_CHANNELS: usize = 3;

/// Interleaved 8-bit RGB frame.
#[derive(Clone, Debug)]
pub struct RgbFrame {
    data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl RgbFrame {
    pub fn new(data: Vec<u8>, width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(anyhow!("frame dimensions must be non-zero, got {}x{}", width, height));
        }
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|v| v.checked_mul(RGB_CHANNELS))
            .ok_or_else(|| anyhow!("frame dimensions overflow"))?;
        if data.len() != expected {
            return Err(anyhow!(
                "RGB frame length mismatch: expected {}, got {}",
                expected,
                data.len()
            ));
        }
        Ok(Self {
            data,
            width,
            height,
        })
    }

    pub fn from_image(image: RgbImage) -> Result<Self> {
        let (width, height) = image.dimensions();
        Self::new(image.into_raw(), width, height)
    }

    pub fn pixels(&self) -> &[u8] {
        &self.data
    }

    pub fn size(&self) -> FrameSize {
        FrameSize::new(self.width, self.height)
    }

    pub(crate) fn to_image(&self) -> Result<RgbImage> {
        RgbImage::from_raw(self.width, self.height, self.data.clone())
            .ok_or_else(|| anyhow!("frame buffer does not match {}x{}", self.width, self.height))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_and_mis_sized_frames() {
        assert!(RgbFrame::new(Vec::new(), 0, 0).is_err());
        assert!(RgbFrame::new(vec![0u8; 11], 2, 2).is_err());
        let frame = RgbFrame::new(vec![0u8; 12], 2, 2).unwrap();
        assert_eq!(frame.size(), FrameSize::new(2, 2));
    }

    #[test]
    fn image_round_trip_preserves_pixels() {
        let image = RgbImage::from_fn(3, 2, |x, y| image::Rgb([x as u8, y as u8, 7]));
        let frame = RgbFrame::from_image(image.clone()).unwrap();
        assert_eq!(frame.to_image().unwrap(), image);
    }
}
