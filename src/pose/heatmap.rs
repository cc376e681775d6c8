//! Heatmap-to-keypoint decoding.
//!
//! A pose model emits one heatmap per keypoint. Each channel is decoded on its
//! own: the peak cell is located (first occurrence in row-major order on ties)
//! and mapped from heatmap-grid space back to pixels of the original frame.
//!
//! Two scaling conventions exist. Models with a strided output (HRNet emits a
//! 64x48 grid for a 256x192 input) need the heatmap resolution as divisor.
//! Dividing by the preprocessing input size instead is only correct when the
//! two resolutions coincide; it is kept as [`ScaleDivisor::InputSize`] for
//! parity with deployments calibrated against it.

use serde::Deserialize;

use super::error::PoseError;
use super::keypoint::{Keypoint, KeypointSet};

/// Stack of K heatmaps of H x W scores, stored channel-major.
#[derive(Debug, Clone, PartialEq)]
pub struct HeatmapStack {
    data: Vec<f32>,
    channels: usize,
    height: usize,
    width: usize,
}

impl HeatmapStack {
    /// Build from a channels-first `[K, H, W]` buffer.
    pub fn new(
        data: Vec<f32>,
        channels: usize,
        height: usize,
        width: usize,
    ) -> Result<Self, PoseError> {
        let expected = checked_len(channels, height, width)?;
        if data.len() != expected {
            return Err(PoseError::invalid_shape(format!(
                "expected {} heatmap values for {}x{}x{}, got {}",
                expected,
                channels,
                height,
                width,
                data.len()
            )));
        }
        Ok(Self {
            data,
            channels,
            height,
            width,
        })
    }

    /// Build from a channels-last `[H, W, K]` buffer, as emitted by NHWC models.
    pub fn from_channels_last(
        data: &[f32],
        height: usize,
        width: usize,
        channels: usize,
    ) -> Result<Self, PoseError> {
        let expected = checked_len(channels, height, width)?;
        if data.len() != expected {
            return Err(PoseError::invalid_shape(format!(
                "expected {} heatmap values for {}x{}x{}, got {}",
                expected,
                height,
                width,
                channels,
                data.len()
            )));
        }
        let plane = height * width;
        let mut out = vec![0.0f32; expected];
        for (idx, value) in data.iter().enumerate() {
            let channel = idx % channels;
            let cell = idx / channels;
            out[channel * plane + cell] = *value;
        }
        Ok(Self {
            data: out,
            channels,
            height,
            width,
        })
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Row-major scores of one channel.
    pub fn channel(&self, index: usize) -> Option<&[f32]> {
        if index >= self.channels {
            return None;
        }
        let plane = self.height * self.width;
        Some(&self.data[index * plane..(index + 1) * plane])
    }

    /// Locate the peak of one channel as `(row, col, score)`.
    ///
    /// Ties resolve to the first occurrence in row-major order. NaN cells never win.
    pub fn peak(&self, index: usize) -> Option<(usize, usize, f32)> {
        let map = self.channel(index)?;
        let mut best = 0usize;
        let mut best_score = f32::NEG_INFINITY;
        for (idx, &score) in map.iter().enumerate() {
            if score > best_score {
                best = idx;
                best_score = score;
            }
        }
        Some((best / self.width, best % self.width, best_score))
    }
}

fn checked_len(channels: usize, height: usize, width: usize) -> Result<usize, PoseError> {
    if channels == 0 {
        return Err(PoseError::invalid_shape("heatmap stack is empty"));
    }
    if height == 0 || width == 0 {
        return Err(PoseError::invalid_shape(format!(
            "heatmap dimensions must be non-zero, got {}x{}",
            height, width
        )));
    }
    channels
        .checked_mul(height)
        .and_then(|v| v.checked_mul(width))
        .ok_or_else(|| PoseError::invalid_shape("heatmap dimensions overflow"))
}

/// Dimensions of the original frame the heatmaps were computed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

impl FrameSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Resolution the frame was resized to before inference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputSize {
    pub width: u32,
    pub height: u32,
}

impl InputSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Which resolution maps grid cells back to pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScaleDivisor {
    /// `x = col * frame_w / heatmap_w`
    #[default]
    HeatmapGrid,
    /// `x = col * frame_w / input_w`
    InputSize,
}

impl std::str::FromStr for ScaleDivisor {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "heatmap_grid" | "heatmap" => Ok(Self::HeatmapGrid),
            "input_size" | "input" => Ok(Self::InputSize),
            other => Err(anyhow::anyhow!(
                "unknown scale divisor '{}'; expected heatmap_grid or input_size",
                other
            )),
        }
    }
}

/// Stateless heatmap decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeatmapDecoder {
    input: InputSize,
    divisor: ScaleDivisor,
}

impl HeatmapDecoder {
    pub fn new(input: InputSize, divisor: ScaleDivisor) -> Self {
        Self { input, divisor }
    }

    pub fn input_size(&self) -> InputSize {
        self.input
    }

    pub fn divisor(&self) -> ScaleDivisor {
        self.divisor
    }

    /// Decode every channel of `stack` into a keypoint in `frame` pixel space.
    pub fn decode(&self, stack: &HeatmapStack, frame: FrameSize) -> Result<KeypointSet, PoseError> {
        if frame.width == 0 || frame.height == 0 {
            return Err(PoseError::invalid_shape(format!(
                "frame dimensions must be positive, got {}x{}",
                frame.width, frame.height
            )));
        }
        if self.input.width == 0 || self.input.height == 0 {
            return Err(PoseError::invalid_shape(format!(
                "input dimensions must be positive, got {}x{}",
                self.input.width, self.input.height
            )));
        }
        // Divisors below must be non-zero.
        checked_len(stack.channels, stack.height, stack.width)?;

        let (div_w, div_h) = match self.divisor {
            ScaleDivisor::HeatmapGrid => (stack.width as f64, stack.height as f64),
            ScaleDivisor::InputSize => (self.input.width as f64, self.input.height as f64),
        };
        let mut points = Vec::with_capacity(stack.channels);
        for channel in 0..stack.channels {
            let (row, col, score) = stack
                .peak(channel)
                .ok_or_else(|| PoseError::invalid_shape("heatmap channel out of range"))?;
            let x = col as f64 * frame.width as f64 / div_w;
            let y = row as f64 * frame.height as f64 / div_h;
            points.push(Keypoint::new(x as f32, y as f32, score));
        }
        Ok(KeypointSet::from_vec(points))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single_peak(h: usize, w: usize, row: usize, col: usize) -> HeatmapStack {
        let mut data = vec![0.0f32; h * w];
        data[row * w + col] = 1.0;
        HeatmapStack::new(data, 1, h, w).unwrap()
    }

    fn decoder(in_w: u32, in_h: u32, divisor: ScaleDivisor) -> HeatmapDecoder {
        HeatmapDecoder::new(InputSize::new(in_w, in_h), divisor)
    }

    #[test]
    fn yields_one_keypoint_per_channel_in_order() {
        let (k, h, w) = (5, 3, 4);
        let mut data = vec![0.0f32; k * h * w];
        for channel in 0..k {
            // Peak for channel i sits in column i % w, row i % h.
            data[channel * h * w + (channel % h) * w + (channel % w)] = 1.0;
        }
        let stack = HeatmapStack::new(data, k, h, w).unwrap();
        let set = decoder(4, 3, ScaleDivisor::HeatmapGrid)
            .decode(&stack, FrameSize::new(4, 3))
            .unwrap();

        assert_eq!(set.len(), k);
        for (channel, point) in set.iter().enumerate() {
            assert_eq!(point.x, (channel % w) as f32);
            assert_eq!(point.y, (channel % h) as f32);
        }
    }

    #[test]
    fn isolated_peak_maps_with_exact_formula() {
        let stack = single_peak(64, 48, 10, 7);
        let set = decoder(192, 256, ScaleDivisor::HeatmapGrid)
            .decode(&stack, FrameSize::new(640, 480))
            .unwrap();
        let point = set.get(0).unwrap();
        assert_eq!(point.x, (7.0f64 * 640.0 / 48.0) as f32);
        assert_eq!(point.y, (10.0f64 * 480.0 / 64.0) as f32);
        assert_eq!(point.score, 1.0);
    }

    #[test]
    fn ties_resolve_to_first_row_major_occurrence() {
        let (h, w) = (4, 4);
        let mut data = vec![0.1f32; h * w];
        data[2 * w + 1] = 0.9;
        data[w + 3] = 0.9;
        data[3 * w] = 0.9;
        let stack = HeatmapStack::new(data, 1, h, w).unwrap();
        assert_eq!(stack.peak(0), Some((1, 3, 0.9)));

        let dec = decoder(4, 4, ScaleDivisor::HeatmapGrid);
        let first = dec.decode(&stack, FrameSize::new(4, 4)).unwrap();
        for _ in 0..10 {
            assert_eq!(dec.decode(&stack, FrameSize::new(4, 4)).unwrap(), first);
        }
        assert_eq!(first.get(0).unwrap().position(), [3.0, 1.0]);
    }

    #[test]
    fn flat_heatmap_decodes_to_origin() {
        let stack = HeatmapStack::new(vec![0.25; 12], 1, 3, 4).unwrap();
        let set = decoder(192, 256, ScaleDivisor::HeatmapGrid)
            .decode(&stack, FrameSize::new(640, 480))
            .unwrap();
        assert_eq!(set.get(0).unwrap().position(), [0.0, 0.0]);
    }

    #[test]
    fn scaling_is_linear_in_frame_width() {
        let stack = single_peak(8, 8, 3, 5);
        let dec = decoder(192, 192, ScaleDivisor::HeatmapGrid);
        let base = dec.decode(&stack, FrameSize::new(320, 240)).unwrap();
        let doubled = dec.decode(&stack, FrameSize::new(640, 240)).unwrap();
        assert_eq!(doubled.get(0).unwrap().x, 2.0 * base.get(0).unwrap().x);
        assert_eq!(doubled.get(0).unwrap().y, base.get(0).unwrap().y);
    }

    #[test]
    fn decoding_is_pure() {
        let stack = single_peak(16, 12, 9, 4);
        let dec = decoder(192, 256, ScaleDivisor::InputSize);
        let a = dec.decode(&stack, FrameSize::new(1280, 720)).unwrap();
        let b = dec.decode(&stack, FrameSize::new(1280, 720)).unwrap();
        for (pa, pb) in a.iter().zip(b.iter()) {
            assert_eq!(pa.x.to_bits(), pb.x.to_bits());
            assert_eq!(pa.y.to_bits(), pb.y.to_bits());
        }
    }

    #[test]
    fn corner_peaks_stay_inside_frame() {
        let dec = decoder(192, 256, ScaleDivisor::HeatmapGrid);
        let frame = FrameSize::new(640, 480);

        let origin = dec.decode(&single_peak(64, 48, 0, 0), frame).unwrap();
        assert_eq!(origin.get(0).unwrap().position(), [0.0, 0.0]);

        let corner = dec.decode(&single_peak(64, 48, 63, 47), frame).unwrap();
        let point = corner.get(0).unwrap();
        assert_eq!(point.x, (47.0f64 * 640.0 / 48.0) as f32);
        assert_eq!(point.y, (63.0f64 * 480.0 / 64.0) as f32);
        assert!(point.x < 640.0);
        assert!(point.y < 480.0);
    }

    #[test]
    fn small_grid_example_under_both_conventions() {
        let stack = single_peak(4, 4, 1, 2);
        let frame = FrameSize::new(384, 384);

        let grid = decoder(192, 192, ScaleDivisor::HeatmapGrid)
            .decode(&stack, frame)
            .unwrap();
        assert_eq!(grid.get(0).unwrap().position(), [192.0, 96.0]);

        let input = decoder(192, 192, ScaleDivisor::InputSize)
            .decode(&stack, frame)
            .unwrap();
        assert_eq!(input.get(0).unwrap().position(), [4.0, 2.0]);
    }

    #[test]
    fn conventions_agree_when_resolutions_match() {
        let stack = single_peak(256, 192, 100, 50);
        let frame = FrameSize::new(1920, 1080);
        let grid = decoder(192, 256, ScaleDivisor::HeatmapGrid)
            .decode(&stack, frame)
            .unwrap();
        let input = decoder(192, 256, ScaleDivisor::InputSize)
            .decode(&stack, frame)
            .unwrap();
        assert_eq!(grid, input);
    }

    #[test]
    fn empty_stack_is_rejected() {
        let err = HeatmapStack::new(Vec::new(), 0, 4, 4).unwrap_err();
        assert!(matches!(err, PoseError::InvalidShape(_)));
    }

    #[test]
    fn zero_dimensions_are_rejected() {
        assert!(matches!(
            HeatmapStack::new(Vec::new(), 3, 0, 4),
            Err(PoseError::InvalidShape(_))
        ));
        assert!(matches!(
            HeatmapStack::new(Vec::new(), 3, 4, 0),
            Err(PoseError::InvalidShape(_))
        ));
    }

    #[test]
    fn mismatched_buffer_is_rejected() {
        assert!(matches!(
            HeatmapStack::new(vec![0.0; 15], 1, 4, 4),
            Err(PoseError::InvalidShape(_))
        ));
    }

    #[test]
    fn non_positive_sizes_are_rejected() {
        let stack = single_peak(4, 4, 1, 1);
        let dec = decoder(192, 192, ScaleDivisor::HeatmapGrid);
        assert!(matches!(
            dec.decode(&stack, FrameSize::new(0, 100)),
            Err(PoseError::InvalidShape(_))
        ));
        assert!(matches!(
            decoder(0, 192, ScaleDivisor::InputSize).decode(&stack, FrameSize::new(100, 100)),
            Err(PoseError::InvalidShape(_))
        ));
    }

    #[test]
    fn channels_last_buffers_are_transposed() {
        // 2x2 grid, 2 channels; channel 0 peaks at (1, 0), channel 1 at (0, 1).
        let hwc = vec![
            0.0, 0.0, // (0,0)
            0.0, 1.0, // (0,1)
            1.0, 0.0, // (1,0)
            0.0, 0.0, // (1,1)
        ];
        let stack = HeatmapStack::from_channels_last(&hwc, 2, 2, 2).unwrap();
        assert_eq!(stack.channel(0).unwrap(), &[0.0, 0.0, 1.0, 0.0]);
        assert_eq!(stack.peak(0), Some((1, 0, 1.0)));
        assert_eq!(stack.peak(1), Some((0, 1, 1.0)));
    }

    #[test]
    fn nan_cells_never_win() {
        let stack = HeatmapStack::new(vec![f32::NAN, 0.2, 0.5, f32::NAN], 1, 2, 2).unwrap();
        assert_eq!(stack.peak(0), Some((1, 0, 0.5)));
    }

    #[test]
    fn scale_divisor_parses_config_names() {
        assert_eq!("heatmap_grid".parse::<ScaleDivisor>().unwrap(), ScaleDivisor::HeatmapGrid);
        assert_eq!("INPUT".parse::<ScaleDivisor>().unwrap(), ScaleDivisor::InputSize);
        assert!("stride".parse::<ScaleDivisor>().is_err());
    }
}
