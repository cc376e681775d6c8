//! USB camera capture over V4L2.
//!
//! Frames are requested in the driver's packed RGB3 format so they can be
//! handed to the estimator without conversion. A `stub://` device yields a
//! moving test pattern instead of opening hardware.

use anyhow::{anyhow, Context, Result};
use ouroboros::self_referencing;

use super::FrameSource;
use crate::frame::RgbFrame;

const RGB3: &[u8; 4] = b"RGB3";
const STREAM_BUFFERS: u32 = 4;

#[derive(Clone, Debug)]
pub struct V4l2Config {
    /// Device node, e.g. `/dev/video0`.
    pub device: String,
    /// Requested rate; 0 leaves the driver default.
    pub target_fps: u32,
    pub width: u32,
    pub height: u32,
}

impl Default for V4l2Config {
    fn default() -> Self {
        Self {
            device: "/dev/video0".to_string(),
            target_fps: 10,
            width: 640,
            height: 480,
        }
    }
}

/// Camera frame source. Call [`V4l2Source::connect`] before capturing.
pub struct V4l2Source {
    config: V4l2Config,
    capture: Capture,
    frames_captured: u64,
}

enum Capture {
    Pattern,
    Closed,
    Streaming {
        stream: CameraStream,
        width: u32,
        height: u32,
    },
}

#[self_referencing]
struct CameraStream {
    device: v4l::Device,
    #[borrows(mut device)]
    #[covariant]
    buffers: v4l::prelude::MmapStream<'this, v4l::Device>,
}

impl V4l2Source {
    pub fn new(config: V4l2Config) -> Result<Self> {
        if config.width == 0 || config.height == 0 {
            return Err(anyhow!(
                "camera size must be non-zero, got {}x{}",
                config.width,
                config.height
            ));
        }
        let capture = if config.device.starts_with("stub://") {
            Capture::Pattern
        } else {
            Capture::Closed
        };
        Ok(Self {
            config,
            capture,
            frames_captured: 0,
        })
    }

    /// Open the device, negotiate RGB3 and start the mmap stream.
    pub fn connect(&mut self) -> Result<()> {
        if matches!(self.capture, Capture::Pattern) {
            log::info!("camera {}: test pattern", self.config.device);
            return Ok(());
        }

        use v4l::buffer::Type;
        use v4l::video::Capture as _;

        let device_path = self.config.device.clone();
        let mut device = v4l::Device::with_path(&device_path)
            .with_context(|| format!("open camera {}", device_path))?;

        let mut wanted = device.format().context("query camera format")?;
        wanted.width = self.config.width;
        wanted.height = self.config.height;
        wanted.fourcc = v4l::FourCC::new(RGB3);
        let granted = device
            .set_format(&wanted)
            .with_context(|| format!("negotiate format on {}", device_path))?;
        if granted.fourcc != v4l::FourCC::new(RGB3) {
            return Err(anyhow!(
                "camera {} cannot deliver RGB3 frames (driver offered {})",
                device_path,
                granted.fourcc
            ));
        }
        if granted.width != self.config.width || granted.height != self.config.height {
            log::info!(
                "camera {}: driver chose {}x{} instead of {}x{}",
                device_path,
                granted.width,
                granted.height,
                self.config.width,
                self.config.height
            );
        }

        if self.config.target_fps > 0 {
            let params = v4l::video::capture::Parameters::with_fps(self.config.target_fps);
            if let Err(err) = device.set_params(&params) {
                log::warn!("camera {}: fps not applied: {}", device_path, err);
            }
        }

        let stream = CameraStreamTryBuilder {
            device,
            buffers_builder: |device| {
                v4l::prelude::MmapStream::with_buffers(device, Type::VideoCapture, STREAM_BUFFERS)
                    .context("map camera buffers")
            },
        }
        .try_build()?;

        self.capture = Capture::Streaming {
            stream,
            width: granted.width,
            height: granted.height,
        };
        log::info!(
            "camera {}: streaming {}x{}",
            device_path,
            granted.width,
            granted.height
        );
        Ok(())
    }

    pub fn frames_captured(&self) -> u64 {
        self.frames_captured
    }

    fn capture_frame(&mut self) -> Result<RgbFrame> {
        use v4l::io::traits::CaptureStream;

        let frame = match &mut self.capture {
            Capture::Pattern => {
                test_pattern(self.config.width, self.config.height, self.frames_captured)?
            }
            Capture::Closed => {
                return Err(anyhow!("camera {} is not connected", self.config.device))
            }
            Capture::Streaming {
                stream,
                width,
                height,
            } => {
                let (width, height) = (*width, *height);
                let buf = stream
                    .with_buffers_mut(|buffers| buffers.next().map(|(buf, _meta)| buf.to_vec()))
                    .context("dequeue camera buffer")?;
                frame_from_buffer(&buf, width, height)?
            }
        };
        self.frames_captured += 1;
        Ok(frame)
    }
}

impl FrameSource for V4l2Source {
    fn next_frame(&mut self) -> Result<RgbFrame> {
        self.capture_frame()
    }

    fn describe(&self) -> String {
        format!("v4l2:{}", self.config.device)
    }
}

/// Packed RGB3 buffer to frame. Drivers may pad the buffer past the image,
/// so only the leading `width * height * 3` bytes are used.
fn frame_from_buffer(buf: &[u8], width: u32, height: u32) -> Result<RgbFrame> {
    let needed = (width as usize) * (height as usize) * 3;
    if buf.len() < needed {
        return Err(anyhow!(
            "truncated camera buffer: {} bytes for {}x{} RGB3, need {}",
            buf.len(),
            width,
            height,
            needed
        ));
    }
    RgbFrame::new(buf[..needed].to_vec(), width, height)
}

fn test_pattern(width: u32, height: u32, tick: u64) -> Result<RgbFrame> {
    let len = (width as usize) * (height as usize) * 3;
    let pixels = (0..len)
        .map(|i| ((i as u64).wrapping_add(tick) % 256) as u8)
        .collect();
    RgbFrame::new(pixels, width, height)
}
