//! Pose estimator handle.
//!
//! `PoseEstimator` owns one inference backend for its whole lifetime:
//! `open` warms the backend up, `close` shuts it down. Callers hold the
//! handle and pass it where pose estimation is needed.

use anyhow::{Context, Result};

use super::heatmap::{HeatmapDecoder, ScaleDivisor};
use super::keypoint::KeypointSet;
use super::preprocess::Preprocessor;
use crate::frame::RgbFrame;
use crate::infer::PoseBackend;

pub struct PoseEstimator {
    backend: Box<dyn PoseBackend>,
    preprocessor: Preprocessor,
    decoder: HeatmapDecoder,
    estimates: u64,
}

impl PoseEstimator {
    /// Take ownership of `backend` and warm it up.
    pub fn open(mut backend: Box<dyn PoseBackend>, divisor: ScaleDivisor) -> Result<Self> {
        let spec = backend.input_spec();
        let preprocessor = Preprocessor::new(spec)?;
        let decoder = HeatmapDecoder::new(spec.size(), divisor);
        backend
            .warm_up()
            .with_context(|| format!("warm-up of backend '{}' failed", backend.name()))?;
        log::info!(
            "pose estimator ready: backend={}, input={}x{}, encoding={:?}, divisor={:?}",
            backend.name(),
            spec.width,
            spec.height,
            spec.encoding,
            divisor
        );
        Ok(Self {
            backend,
            preprocessor,
            decoder,
            estimates: 0,
        })
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub fn decoder(&self) -> HeatmapDecoder {
        self.decoder
    }

    pub fn estimates(&self) -> u64 {
        self.estimates
    }

    /// Estimate keypoints for one frame, in the frame's own pixel space.
    pub fn estimate(&mut self, frame: &RgbFrame) -> Result<KeypointSet> {
        let input = self.preprocessor.run(frame)?;
        let heatmaps = self
            .backend
            .infer(&input)
            .with_context(|| format!("inference with backend '{}' failed", self.backend.name()))?;
        let keypoints = self.decoder.decode(&heatmaps, frame.size())?;
        self.estimates += 1;
        log::debug!(
            "estimated {} keypoints from {}x{} frame ({}x{} heatmaps)",
            keypoints.len(),
            frame.width,
            frame.height,
            heatmaps.height(),
            heatmaps.width()
        );
        Ok(keypoints)
    }

    /// Shut the backend down and release it.
    pub fn close(mut self) -> Result<()> {
        log::info!(
            "closing pose estimator (backend={}, estimates={})",
            self.backend.name(),
            self.estimates
        );
        self.backend.shutdown()
    }
}
