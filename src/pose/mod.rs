//! Pose estimation core.
//!
//! - `heatmap`: decoding of per-keypoint heatmaps into pixel-space keypoints.
//! - `keypoint`: keypoint types and the optional COCO joint labels.
//! - `preprocess`: frame resizing and encoding for model input.
//! - `estimator`: long-lived handle tying preprocessing, inference and decoding together.

mod error;
pub mod estimator;
pub mod heatmap;
pub mod keypoint;
pub mod preprocess;

pub use error::PoseError;
pub use estimator::PoseEstimator;
pub use heatmap::{FrameSize, HeatmapDecoder, HeatmapStack, InputSize, ScaleDivisor};
pub use keypoint::{CocoJoint, Keypoint, KeypointSet};
pub use preprocess::{
    ChannelOrder, InputEncoding, InputSpec, InputTensor, PreprocessedInput, Preprocessor,
};
