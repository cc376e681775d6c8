//! Tools shipped with the yoga coach.

use anyhow::{anyhow, Context, Result};
use serde_json::{json, Value};

use super::{empty_object_schema, string_argument, Tool, ToolError};
use crate::ingest::{FileConfig, FileSource};
use crate::pose::PoseEstimator;
use crate::speech::Speaker;
use crate::sysinfo::SoftwareInfoSource;

/// Speaks the next position to the user.
pub struct TalkToYogi {
    speaker: Box<dyn Speaker>,
}

impl TalkToYogi {
    pub fn new(speaker: Box<dyn Speaker>) -> Self {
        Self { speaker }
    }
}

impl Tool for TalkToYogi {
    fn name(&self) -> &'static str {
        "talk_to_yogi"
    }

    fn description(&self) -> &'static str {
        "Announces the next yoga position to be performed using text-to-speech."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "text_to_say": {
                    "type": "string",
                    "description": "The name of the yoga position to announce"
                }
            },
            "required": ["text_to_say"]
        })
    }

    fn call(&mut self, arguments: &Value) -> Result<Value, ToolError> {
        let text = string_argument(arguments, "text_to_say")?;
        self.speaker.say(text)?;
        Ok(Value::String(format!("Announced position: {}", text)))
    }
}

/// Estimates keypoints on the configured image.
///
/// The image is read again on every call. The result lists `[x, y]` per model
/// channel, in original image pixels. The estimator is closed on shutdown.
pub struct YogaPoseEstimation {
    estimator: Option<PoseEstimator>,
    source: FileSource,
}

impl YogaPoseEstimation {
    pub fn new(estimator: PoseEstimator, image_path: &str) -> Result<Self> {
        let mut source = FileSource::new(FileConfig {
            path: image_path.to_string(),
            ..FileConfig::default()
        })?;
        source.connect()?;
        Ok(Self {
            estimator: Some(estimator),
            source,
        })
    }
}

impl Tool for YogaPoseEstimation {
    fn name(&self) -> &'static str {
        "yoga_pose_estimation"
    }

    fn description(&self) -> &'static str {
        "Performs yoga pose estimation on the configured image and returns one [x, y] keypoint per joint."
    }

    fn input_schema(&self) -> Value {
        empty_object_schema()
    }

    fn call(&mut self, _arguments: &Value) -> Result<Value, ToolError> {
        let estimator = self
            .estimator
            .as_mut()
            .ok_or_else(|| anyhow!("pose estimator is closed"))?;
        let frame = self
            .source
            .next_frame()
            .context("could not read image file")?;
        let keypoints = estimator.estimate(&frame)?;
        Ok(json!(keypoints.positions()))
    }

    fn shutdown(&mut self) -> Result<()> {
        match self.estimator.take() {
            Some(estimator) => estimator.close(),
            None => Ok(()),
        }
    }
}

/// Reports board software versions.
#[derive(Default)]
pub struct SoftwareInfoTool {
    source: SoftwareInfoSource,
}

impl SoftwareInfoTool {
    pub fn new(source: SoftwareInfoSource) -> Self {
        Self { source }
    }
}

impl Tool for SoftwareInfoTool {
    fn name(&self) -> &'static str {
        "get_rubik_sw_info"
    }

    fn description(&self) -> &'static str {
        "Provides information about the Rubik board software (Linux kernel version and Jetpack version)."
    }

    fn input_schema(&self) -> Value {
        empty_object_schema()
    }

    fn call(&mut self, _arguments: &Value) -> Result<Value, ToolError> {
        log::info!("collecting software info");
        let info = self.source.collect();
        Ok(serde_json::to_value(info).context("serialize software info")?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infer::SyntheticBackend;
    use crate::pose::{ChannelOrder, InputEncoding, InputSpec, ScaleDivisor};
    use image::RgbImage;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Recorder(Arc<Mutex<Vec<String>>>);

    impl Speaker for Recorder {
        fn say(&mut self, text: &str) -> anyhow::Result<()> {
            self.0.lock().unwrap().push(text.to_string());
            Ok(())
        }
    }

    fn estimator() -> PoseEstimator {
        let spec = InputSpec {
            width: 192,
            height: 256,
            encoding: InputEncoding::Uint8,
            channel_order: ChannelOrder::Rgb,
        };
        PoseEstimator::open(Box::new(SyntheticBackend::new(spec)), ScaleDivisor::HeatmapGrid)
            .unwrap()
    }

    #[test]
    fn talk_to_yogi_announces_text() {
        let recorder = Recorder::default();
        let mut tool = TalkToYogi::new(Box::new(recorder.clone()));
        let result = tool.call(&json!({ "text_to_say": "Tree Pose" })).unwrap();
        assert_eq!(result, json!("Announced position: Tree Pose"));
        assert_eq!(*recorder.0.lock().unwrap(), vec!["Tree Pose".to_string()]);
    }

    #[test]
    fn talk_to_yogi_requires_text() {
        let mut tool = TalkToYogi::new(Box::new(Recorder::default()));
        assert!(matches!(
            tool.call(&json!({ "text_to_say": 3 })),
            Err(ToolError::InvalidArguments(_))
        ));
    }

    #[test]
    fn pose_estimation_returns_one_point_per_channel() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.png");
        RgbImage::new(384, 512).save(&path).unwrap();

        let mut tool = YogaPoseEstimation::new(estimator(), path.to_str().unwrap()).unwrap();
        let result = tool.call(&json!({})).unwrap();
        let points = result.as_array().unwrap();
        assert_eq!(points.len(), 17);
        for point in points {
            let xy = point.as_array().unwrap();
            assert_eq!(xy.len(), 2);
            let x = xy[0].as_f64().unwrap();
            let y = xy[1].as_f64().unwrap();
            assert!((0.0..384.0).contains(&x));
            assert!((0.0..512.0).contains(&y));
        }
        tool.shutdown().unwrap();
        assert!(matches!(tool.call(&json!({})), Err(ToolError::Failed(_))));
        // A second shutdown is a no-op.
        tool.shutdown().unwrap();
    }

    #[test]
    fn pose_estimation_fails_on_missing_image() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.jpg");
        let mut tool = YogaPoseEstimation::new(estimator(), path.to_str().unwrap()).unwrap();
        assert!(matches!(tool.call(&json!({})), Err(ToolError::Failed(_))));
    }

    #[test]
    fn software_info_reports_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let version = dir.path().join("version");
        std::fs::write(&version, "Linux version 5.10.120-tegra\n").unwrap();
        let mut tool = SoftwareInfoTool::new(SoftwareInfoSource {
            jetpack_release_path: dir.path().join("nv_tegra_release"),
            linux_version_path: version,
        });
        let result = tool.call(&json!({})).unwrap();
        assert_eq!(result["jetpack_release"], "Error: File not found");
        assert_eq!(result["linux_version"], "Linux version 5.10.120-tegra");
        assert_eq!(result["errors"].as_array().unwrap().len(), 1);
    }
}
