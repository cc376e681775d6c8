//! Local file frame source.
//!
//! `FileSource` reads a still image (PNG or JPEG) from a local path. The file
//! is decoded again on every capture so that an external process can replace
//! it between rounds. `stub://` paths produce synthetic frames for tests.
//!
//! Remote URLs are rejected; fetching frames over the network is not a file
//! source's job.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};

use super::FrameSource;
use crate::frame::RgbFrame;

/// Configuration for a local file source.
#[derive(Clone, Debug)]
pub struct FileConfig {
    /// Local image path (e.g., "test.jpg") or `stub://<name>`.
    pub path: String,
    /// Size of synthetic frames for `stub://` paths.
    pub synthetic_width: u32,
    pub synthetic_height: u32,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            path: String::new(),
            synthetic_width: 640,
            synthetic_height: 480,
        }
    }
}

/// Local file frame source.
pub struct FileSource {
    backend: FileBackend,
}

enum FileBackend {
    Synthetic(SyntheticFileSource),
    Image(ImageFileSource),
}

impl FileSource {
    pub fn new(config: FileConfig) -> Result<Self> {
        if !is_local_file_path(&config.path) {
            return Err(anyhow!(
                "file ingestion only supports local paths (no URL schemes), got '{}'",
                config.path
            ));
        }
        if config.path.starts_with("stub://") {
            Ok(Self {
                backend: FileBackend::Synthetic(SyntheticFileSource::new(config)),
            })
        } else {
            Ok(Self {
                backend: FileBackend::Image(ImageFileSource::new(config)),
            })
        }
    }

    /// Connect to the file source.
    pub fn connect(&mut self) -> Result<()> {
        match &mut self.backend {
            FileBackend::Synthetic(source) => source.connect(),
            FileBackend::Image(source) => source.connect(),
        }
    }

    /// Capture the next frame.
    pub fn next_frame(&mut self) -> Result<RgbFrame> {
        match &mut self.backend {
            FileBackend::Synthetic(source) => source.next_frame(),
            FileBackend::Image(source) => source.next_frame(),
        }
    }

    /// Get frame statistics.
    pub fn stats(&self) -> FileStats {
        match &self.backend {
            FileBackend::Synthetic(source) => FileStats {
                frames_captured: source.frame_count,
                path: source.config.path.clone(),
            },
            FileBackend::Image(source) => FileStats {
                frames_captured: source.frame_count,
                path: source.config.path.clone(),
            },
        }
    }
}

impl FrameSource for FileSource {
    fn next_frame(&mut self) -> Result<RgbFrame> {
        FileSource::next_frame(self)
    }

    fn describe(&self) -> String {
        format!("file:{}", self.stats().path)
    }
}

/// Statistics for a file source.
#[derive(Clone, Debug)]
pub struct FileStats {
    pub frames_captured: u64,
    pub path: String,
}

// ----------------------------------------------------------------------------
// Image file source
// ----------------------------------------------------------------------------

struct ImageFileSource {
    config: FileConfig,
    path: PathBuf,
    frame_count: u64,
}

impl ImageFileSource {
    fn new(config: FileConfig) -> Self {
        Self {
            path: PathBuf::from(&config.path),
            config,
            frame_count: 0,
        }
    }

    fn connect(&mut self) -> Result<()> {
        if !self.path.is_file() {
            log::warn!(
                "FileSource: {} does not exist yet; captures fail until it does",
                self.path.display()
            );
        } else {
            log::info!("FileSource: reading frames from {}", self.path.display());
        }
        Ok(())
    }

    fn next_frame(&mut self) -> Result<RgbFrame> {
        let frame = read_frame(&self.path)?;
        self.frame_count += 1;
        Ok(frame)
    }
}

fn read_frame(path: &Path) -> Result<RgbFrame> {
    if !path.is_file() {
        return Err(anyhow!("could not read image file {}: not found", path.display()));
    }
    let image = image::open(path)
        .with_context(|| format!("could not decode image file {}", path.display()))?;
    RgbFrame::from_image(image.to_rgb8())
}

// ----------------------------------------------------------------------------
// Synthetic source (stub://) for tests
// ----------------------------------------------------------------------------

struct SyntheticFileSource {
    config: FileConfig,
    frame_count: u64,
}

impl SyntheticFileSource {
    fn new(config: FileConfig) -> Self {
        Self {
            config,
            frame_count: 0,
        }
    }

    fn connect(&mut self) -> Result<()> {
        log::info!("FileSource: connected to {} (synthetic)", self.config.path);
        Ok(())
    }

    fn next_frame(&mut self) -> Result<RgbFrame> {
        self.frame_count += 1;
        let width = self.config.synthetic_width;
        let height = self.config.synthetic_height;
        let pixels = self.generate_synthetic_pixels(width, height);
        RgbFrame::new(pixels, width, height)
    }

    fn generate_synthetic_pixels(&self, width: u32, height: u32) -> Vec<u8> {
        let pixel_count = (width as usize) * (height as usize) * 3;
        let mut pixels = vec![0u8; pixel_count];
        for (i, pixel) in pixels.iter_mut().enumerate() {
            *pixel = ((i as u64 + self.frame_count) % 256) as u8;
        }
        pixels
    }
}

fn is_local_file_path(path: &str) -> bool {
    if path.trim().is_empty() {
        return false;
    }
    if path.starts_with("stub://") {
        return true;
    }
    !path.contains("://")
}
