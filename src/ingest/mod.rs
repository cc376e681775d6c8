//! Frame ingestion sources.
//!
//! This module provides the sources a coaching session captures from:
//! - Local image files (re-read on every capture)
//! - USB/V4L2 cameras (feature: ingest-v4l2)
//! - Synthetic `stub://` sources (testing)
//!
//! Every source hands out validated `RgbFrame`s. A failed capture is an error,
//! never an empty frame.

pub mod file;
#[cfg(feature = "ingest-v4l2")]
pub mod v4l2;

use anyhow::Result;

use crate::frame::RgbFrame;

pub use file::{FileConfig, FileSource};
#[cfg(feature = "ingest-v4l2")]
pub use v4l2::{V4l2Config, V4l2Source};

/// A source of frames for pose estimation.
pub trait FrameSource {
    /// Capture the next frame.
    fn next_frame(&mut self) -> Result<RgbFrame>;

    /// Human-readable description of where frames come from.
    fn describe(&self) -> String;
}

/// Open a frame source from a config string.
///
/// `v4l2://<device>` and `/dev/video*` select a camera; anything else is a
/// local image path (or `stub://` for synthetic frames).
pub fn open_frame_source(spec: &str) -> Result<Box<dyn FrameSource>> {
    if let Some(device) = camera_device(spec) {
        return open_camera(device);
    }
    let mut source = FileSource::new(FileConfig {
        path: spec.to_string(),
        ..FileConfig::default()
    })?;
    source.connect()?;
    Ok(Box::new(source))
}

fn camera_device(spec: &str) -> Option<&str> {
    if let Some(device) = spec.strip_prefix("v4l2://") {
        return Some(device);
    }
    if spec.starts_with("/dev/video") {
        return Some(spec);
    }
    None
}

#[cfg(feature = "ingest-v4l2")]
fn open_camera(device: &str) -> Result<Box<dyn FrameSource>> {
    let mut source = V4l2Source::new(V4l2Config {
        device: device.to_string(),
        ..V4l2Config::default()
    })?;
    source.connect()?;
    Ok(Box::new(source))
}

#[cfg(not(feature = "ingest-v4l2"))]
fn open_camera(device: &str) -> Result<Box<dyn FrameSource>> {
    Err(anyhow::anyhow!(
        "camera capture from {} requires the ingest-v4l2 feature",
        device
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn camera_specs_are_recognized() {
        assert_eq!(camera_device("v4l2:///dev/video2"), Some("/dev/video2"));
        assert_eq!(camera_device("/dev/video0"), Some("/dev/video0"));
        assert_eq!(camera_device("test.jpg"), None);
        assert_eq!(camera_device("stub://mat"), None);
    }

    #[test]
    fn stub_spec_opens_synthetic_file_source() -> Result<()> {
        let mut source = open_frame_source("stub://mat")?;
        let frame = source.next_frame()?;
        assert!(frame.width > 0 && frame.height > 0);
        Ok(())
    }
}
