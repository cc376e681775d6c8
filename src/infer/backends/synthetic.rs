use anyhow::Result;

use crate::infer::backend::{check_input, PoseBackend};
use crate::pose::{CocoJoint, HeatmapStack, InputSpec, PreprocessedInput};

/// Heatmap grid emitted by the synthetic backend (HRNet stride-4 output for 256x192).
pub const SYNTHETIC_GRID_HEIGHT: usize = 64;
pub const SYNTHETIC_GRID_WIDTH: usize = 48;

const PEAK_SIGMA: f32 = 1.5;

/// Normalized `(x, y)` positions of a person standing upright, COCO order.
const STANDING_FIGURE: [(f32, f32); CocoJoint::COUNT] = [
    (0.50, 0.10),
    (0.47, 0.08),
    (0.53, 0.08),
    (0.44, 0.10),
    (0.56, 0.10),
    (0.40, 0.22),
    (0.60, 0.22),
    (0.36, 0.38),
    (0.64, 0.38),
    (0.34, 0.52),
    (0.66, 0.52),
    (0.44, 0.55),
    (0.56, 0.55),
    (0.44, 0.75),
    (0.56, 0.75),
    (0.44, 0.95),
    (0.56, 0.95),
];

/// Deterministic stand-in for a pose model.
///
/// Emits 17 Gaussian peaks laid out as a standing figure on a 64x48 grid,
/// regardless of frame content. Inputs are still validated against the
/// declared input spec.
pub struct SyntheticBackend {
    spec: InputSpec,
    calls: u64,
}

impl SyntheticBackend {
    pub fn new(spec: InputSpec) -> Self {
        Self { spec, calls: 0 }
    }

    /// Grid cell `(row, col)` of the peak for every channel.
    pub fn peak_cells() -> Vec<(usize, usize)> {
        STANDING_FIGURE
            .iter()
            .map(|&(x, y)| {
                let col = (x * (SYNTHETIC_GRID_WIDTH - 1) as f32).round() as usize;
                let row = (y * (SYNTHETIC_GRID_HEIGHT - 1) as f32).round() as usize;
                (row, col)
            })
            .collect()
    }

    pub fn calls(&self) -> u64 {
        self.calls
    }
}

impl PoseBackend for SyntheticBackend {
    fn name(&self) -> &'static str {
        "synthetic"
    }

    fn input_spec(&self) -> InputSpec {
        self.spec
    }

    fn infer(&mut self, input: &PreprocessedInput) -> Result<HeatmapStack> {
        check_input(&self.spec, input)?;
        self.calls += 1;

        let plane = SYNTHETIC_GRID_HEIGHT * SYNTHETIC_GRID_WIDTH;
        let mut data = vec![0.0f32; CocoJoint::COUNT * plane];
        let denom = 2.0 * PEAK_SIGMA * PEAK_SIGMA;
        for (channel, (peak_row, peak_col)) in Self::peak_cells().into_iter().enumerate() {
            let map = &mut data[channel * plane..(channel + 1) * plane];
            for row in 0..SYNTHETIC_GRID_HEIGHT {
                for col in 0..SYNTHETIC_GRID_WIDTH {
                    let dy = row as f32 - peak_row as f32;
                    let dx = col as f32 - peak_col as f32;
                    map[row * SYNTHETIC_GRID_WIDTH + col] = (-(dx * dx + dy * dy) / denom).exp();
                }
            }
        }

        Ok(HeatmapStack::new(
            data,
            CocoJoint::COUNT,
            SYNTHETIC_GRID_HEIGHT,
            SYNTHETIC_GRID_WIDTH,
        )?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::RgbFrame;
    use crate::pose::{ChannelOrder, InputEncoding, Preprocessor};

    fn spec() -> InputSpec {
        InputSpec {
            width: 192,
            height: 256,
            encoding: InputEncoding::Uint8,
            channel_order: ChannelOrder::Rgb,
        }
    }

    fn input() -> PreprocessedInput {
        let frame = RgbFrame::new(vec![128u8; 64 * 48 * 3], 64, 48).unwrap();
        Preprocessor::new(spec()).unwrap().run(&frame).unwrap()
    }

    #[test]
    fn emits_one_peak_per_coco_joint() -> Result<()> {
        let mut backend = SyntheticBackend::new(spec());
        let stack = backend.infer(&input())?;

        assert_eq!(stack.channels(), CocoJoint::COUNT);
        assert_eq!(stack.height(), SYNTHETIC_GRID_HEIGHT);
        assert_eq!(stack.width(), SYNTHETIC_GRID_WIDTH);
        for (channel, (row, col)) in SyntheticBackend::peak_cells().into_iter().enumerate() {
            assert_eq!(stack.peak(channel), Some((row, col, 1.0)));
        }
        assert_eq!(backend.calls(), 1);
        Ok(())
    }

    #[test]
    fn output_is_deterministic() -> Result<()> {
        let mut backend = SyntheticBackend::new(spec());
        let a = backend.infer(&input())?;
        let b = backend.infer(&input())?;
        assert_eq!(a, b);
        Ok(())
    }

    #[test]
    fn rejects_input_of_wrong_size() {
        let mut backend = SyntheticBackend::new(InputSpec {
            width: 96,
            ..spec()
        });
        assert!(backend.infer(&input()).is_err());
        assert_eq!(backend.calls(), 0);
    }
}
