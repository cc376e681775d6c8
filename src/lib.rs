//! Yoga coach
//!
//! Estimates a user's body pose from camera frames and coaches them through a
//! sequence of yoga positions.
//!
//! # Architecture
//!
//! The core is heatmap-to-keypoint decoding: a pose model emits one
//! confidence heatmap per joint, and the decoder maps each heatmap's peak
//! back into the pixel space of the original frame. Everything around it is
//! glue:
//!
//! 1. **Inference**: a `PoseBackend` turns a preprocessed frame into heatmaps.
//! 2. **Ingest**: a `FrameSource` supplies RGB frames (image files, V4L2).
//! 3. **Position service**: an HTTP server hands out target positions.
//! 4. **Coach**: polls the target, estimates the pose, speaks feedback.
//! 5. **Tools**: a JSON-RPC tool server exposes speech, pose estimation and
//!    board info to assistant clients.
//!
//! # Module Structure
//!
//! - `pose`: heatmap decoding, keypoints, preprocessing, the estimator handle
//! - `infer`: model backends (synthetic, tract)
//! - `frame` / `ingest`: validated frames and their sources
//! - `position`, `coach`, `speech`, `tools`, `sysinfo`: application glue
//! - `http`, `config`: shared plumbing

pub mod coach;
pub mod config;
pub mod frame;
pub mod http;
pub mod infer;
pub mod ingest;
pub mod pose;
pub mod position;
pub mod speech;
pub mod sysinfo;
pub mod tools;

pub use coach::{Coach, CoachStats, PoseClassifier, RoundOutcome, TargetSource, UnlabeledClassifier};
pub use config::CoachConfig;
pub use frame::RgbFrame;
pub use infer::{open_backend, PoseBackend, SyntheticBackend};
pub use ingest::{open_frame_source, FileConfig, FileSource, FrameSource};
#[cfg(feature = "ingest-v4l2")]
pub use ingest::{V4l2Config, V4l2Source};
pub use pose::{
    FrameSize, HeatmapDecoder, HeatmapStack, InputSize, Keypoint, KeypointSet, PoseError,
    PoseEstimator, ScaleDivisor,
};
pub use position::{PositionCatalog, PositionClient, PositionConfig, PositionServer};
pub use speech::{speaker_from_command, CommandSpeaker, LogSpeaker, Speaker};
pub use sysinfo::{SoftwareInfo, SoftwareInfoSource};
pub use tools::{Tool, ToolError, ToolRegistry, ToolServer, ToolServerConfig};
