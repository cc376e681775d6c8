use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::infer::{HeatmapLayout, TensorLayout};
use crate::pose::{ChannelOrder, InputEncoding, InputSpec, ScaleDivisor};

const DEFAULT_MODEL_BACKEND: &str = "synthetic";
const DEFAULT_MODEL_PATH: &str = "hrnet_pose-hrnetpose-w8a8.onnx";
const DEFAULT_INPUT_WIDTH: u32 = 192;
const DEFAULT_INPUT_HEIGHT: u32 = 256;
const DEFAULT_FRAME_SOURCE: &str = "test.jpg";
const DEFAULT_POSITION_URL: &str = "http://localhost:5000";
const DEFAULT_POSITION_LISTEN: &str = "0.0.0.0:5000";
const DEFAULT_POLL_INTERVAL_MS: u64 = 2_000;
const DEFAULT_SPEECH_COMMAND: &str = "espeak";
const DEFAULT_TOOLS_LISTEN: &str = "0.0.0.0:8000";
const DEFAULT_TOOLS_IMAGE: &str = "test.jpg";

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct CoachConfigFile {
    model: Option<ModelConfigFile>,
    frames: Option<FramesConfigFile>,
    position: Option<PositionConfigFile>,
    coach: Option<LoopConfigFile>,
    speech: Option<SpeechConfigFile>,
    tools: Option<ToolsConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct ModelConfigFile {
    backend: Option<String>,
    path: Option<PathBuf>,
    input_width: Option<u32>,
    input_height: Option<u32>,
    encoding: Option<InputEncoding>,
    channel_order: Option<ChannelOrder>,
    scale_divisor: Option<ScaleDivisor>,
    tensor_layout: Option<TensorLayout>,
    heatmap_layout: Option<HeatmapLayout>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct FramesConfigFile {
    source: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct PositionConfigFile {
    url: Option<String>,
    listen: Option<String>,
    positions: Option<Vec<String>>,
    instructions: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct LoopConfigFile {
    poll_interval_ms: Option<u64>,
    max_rounds: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct SpeechConfigFile {
    command: Option<String>,
    args: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct ToolsConfigFile {
    listen: Option<String>,
    image_path: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CoachConfig {
    pub model: ModelSettings,
    pub frame_source: String,
    pub position: PositionSettings,
    pub coach: LoopSettings,
    pub speech: SpeechSettings,
    pub tools: ToolsSettings,
}

#[derive(Debug, Clone)]
pub struct ModelSettings {
    /// `synthetic` or `tract`.
    pub backend: String,
    pub path: PathBuf,
    pub input_width: u32,
    pub input_height: u32,
    pub encoding: InputEncoding,
    pub channel_order: ChannelOrder,
    pub scale_divisor: ScaleDivisor,
    pub tensor_layout: TensorLayout,
    pub heatmap_layout: HeatmapLayout,
}

impl ModelSettings {
    pub fn input_spec(&self) -> InputSpec {
        InputSpec {
            width: self.input_width,
            height: self.input_height,
            encoding: self.encoding,
            channel_order: self.channel_order,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PositionSettings {
    /// Base URL the coach fetches targets from.
    pub url: String,
    /// Listen address of the position server.
    pub listen: String,
    /// Catalog override; `None` serves the built-in positions.
    pub positions: Option<Vec<String>>,
    pub instructions: Option<String>,
}

#[derive(Debug, Clone)]
pub struct LoopSettings {
    pub poll_interval: Duration,
    pub max_rounds: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct SpeechSettings {
    /// TTS program; `None` only logs what would be said.
    pub command: Option<String>,
    pub args: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ToolsSettings {
    pub listen: String,
    pub image_path: String,
}

impl CoachConfig {
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("YOGA_COACH_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) if !path.trim().is_empty() => Some(read_config_file(Path::new(path))?),
            _ => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default());
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: CoachConfigFile) -> Self {
        let model_file = file.model.unwrap_or_default();
        let model = ModelSettings {
            backend: model_file
                .backend
                .unwrap_or_else(|| DEFAULT_MODEL_BACKEND.to_string()),
            path: model_file
                .path
                .unwrap_or_else(|| PathBuf::from(DEFAULT_MODEL_PATH)),
            input_width: model_file.input_width.unwrap_or(DEFAULT_INPUT_WIDTH),
            input_height: model_file.input_height.unwrap_or(DEFAULT_INPUT_HEIGHT),
            encoding: model_file.encoding.unwrap_or_default(),
            channel_order: model_file.channel_order.unwrap_or_default(),
            scale_divisor: model_file.scale_divisor.unwrap_or_default(),
            tensor_layout: model_file.tensor_layout.unwrap_or_default(),
            heatmap_layout: model_file.heatmap_layout.unwrap_or_default(),
        };
        let frame_source = file
            .frames
            .and_then(|frames| frames.source)
            .unwrap_or_else(|| DEFAULT_FRAME_SOURCE.to_string());
        let position_file = file.position.unwrap_or_default();
        let position = PositionSettings {
            url: position_file
                .url
                .unwrap_or_else(|| DEFAULT_POSITION_URL.to_string()),
            listen: position_file
                .listen
                .unwrap_or_else(|| DEFAULT_POSITION_LISTEN.to_string()),
            positions: position_file.positions,
            instructions: position_file.instructions,
        };
        let coach = LoopSettings {
            poll_interval: Duration::from_millis(
                file.coach
                    .as_ref()
                    .and_then(|coach| coach.poll_interval_ms)
                    .unwrap_or(DEFAULT_POLL_INTERVAL_MS),
            ),
            max_rounds: file.coach.and_then(|coach| coach.max_rounds),
        };
        let speech = SpeechSettings {
            command: match file.speech.as_ref() {
                Some(speech) => speech.command.clone(),
                None => Some(DEFAULT_SPEECH_COMMAND.to_string()),
            },
            args: file
                .speech
                .and_then(|speech| speech.args)
                .unwrap_or_default(),
        };
        let tools = ToolsSettings {
            listen: file
                .tools
                .as_ref()
                .and_then(|tools| tools.listen.clone())
                .unwrap_or_else(|| DEFAULT_TOOLS_LISTEN.to_string()),
            image_path: file
                .tools
                .and_then(|tools| tools.image_path)
                .unwrap_or_else(|| DEFAULT_TOOLS_IMAGE.to_string()),
        };
        Self {
            model,
            frame_source,
            position,
            coach,
            speech,
            tools,
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Some(backend) = non_empty_env("YOGA_MODEL_BACKEND") {
            self.model.backend = backend;
        }
        if let Some(path) = non_empty_env("YOGA_MODEL_PATH") {
            self.model.path = PathBuf::from(path);
        }
        if let Some(divisor) = non_empty_env("YOGA_SCALE_DIVISOR") {
            self.model.scale_divisor = divisor.parse()?;
        }
        if let Some(source) = non_empty_env("YOGA_FRAME_SOURCE") {
            self.frame_source = source;
        }
        if let Some(url) = non_empty_env("YOGA_POSITION_URL") {
            self.position.url = url;
        }
        if let Some(listen) = non_empty_env("YOGA_POSITION_LISTEN") {
            self.position.listen = listen;
        }
        if let Some(listen) = non_empty_env("YOGA_TOOLS_LISTEN") {
            self.tools.listen = listen;
        }
        if let Some(image) = non_empty_env("YOGA_TOOLS_IMAGE") {
            self.tools.image_path = image;
        }
        if let Some(interval) = non_empty_env("YOGA_POLL_INTERVAL_MS") {
            let millis: u64 = interval.parse().map_err(|_| {
                anyhow!("YOGA_POLL_INTERVAL_MS must be an integer number of milliseconds")
            })?;
            self.coach.poll_interval = Duration::from_millis(millis);
        }
        // Set but empty disables TTS.
        if let Ok(command) = std::env::var("YOGA_SPEECH_COMMAND") {
            let command = command.trim();
            self.speech.command = if command.is_empty() {
                None
            } else {
                Some(command.to_string())
            };
        }
        Ok(())
    }

    fn validate(&mut self) -> Result<()> {
        self.model.backend = self.model.backend.trim().to_ascii_lowercase();
        match self.model.backend.as_str() {
            "synthetic" => {}
            "tract" => {
                if self.model.path.as_os_str().is_empty() {
                    return Err(anyhow!("model.path is required for the tract backend"));
                }
            }
            other => {
                return Err(anyhow!(
                    "unknown model backend '{}'; expected synthetic or tract",
                    other
                ))
            }
        }
        if self.model.input_width == 0 || self.model.input_height == 0 {
            return Err(anyhow!("model input size must be greater than zero"));
        }
        if self.frame_source.trim().is_empty() {
            return Err(anyhow!("frame source must not be empty"));
        }
        if self.tools.image_path.trim().is_empty() {
            return Err(anyhow!("tools.image_path must not be empty"));
        }
        if self.coach.poll_interval.is_zero() {
            return Err(anyhow!("poll interval must be greater than zero"));
        }
        if let Some(positions) = self.position.positions.as_mut() {
            positions.retain(|position| !position.trim().is_empty());
            if positions.is_empty() {
                return Err(anyhow!("position.positions must name at least one position"));
            }
        }
        Ok(())
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn read_config_file(path: &Path) -> Result<CoachConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let cfg = toml::from_str(&raw)
        .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_prototype() -> Result<()> {
        let mut cfg = CoachConfig::from_file(CoachConfigFile::default());
        cfg.validate()?;
        assert_eq!(cfg.model.backend, "synthetic");
        assert_eq!(cfg.model.input_spec().size(), crate::pose::InputSize::new(192, 256));
        assert_eq!(cfg.model.scale_divisor, ScaleDivisor::HeatmapGrid);
        assert_eq!(cfg.model.channel_order, ChannelOrder::Rgb);
        assert_eq!(cfg.frame_source, "test.jpg");
        assert_eq!(cfg.position.url, "http://localhost:5000");
        assert_eq!(cfg.tools.listen, "0.0.0.0:8000");
        assert_eq!(cfg.coach.poll_interval, Duration::from_secs(2));
        assert_eq!(cfg.speech.command.as_deref(), Some("espeak"));
        Ok(())
    }

    #[test]
    fn parses_toml_sections() -> Result<()> {
        let file: CoachConfigFile = toml::from_str(
            r#"
            [model]
            backend = "Tract"
            path = "pose.onnx"
            encoding = "float01"
            channel_order = "bgr"
            scale_divisor = "input_size"
            heatmap_layout = "channels_last"

            [speech]
            args = ["-s", "140"]

            [coach]
            max_rounds = 3
            "#,
        )?;
        let mut cfg = CoachConfig::from_file(file);
        cfg.validate()?;
        assert_eq!(cfg.model.backend, "tract");
        assert_eq!(cfg.model.encoding, InputEncoding::Float01);
        assert_eq!(cfg.model.channel_order, ChannelOrder::Bgr);
        assert_eq!(cfg.model.scale_divisor, ScaleDivisor::InputSize);
        assert_eq!(cfg.model.heatmap_layout, HeatmapLayout::ChannelsLast);
        assert_eq!(cfg.model.tensor_layout, TensorLayout::Nchw);
        assert_eq!(cfg.coach.max_rounds, Some(3));
        // A [speech] table without a command means no TTS.
        assert_eq!(cfg.speech.command, None);
        assert_eq!(cfg.speech.args, vec!["-s", "140"]);
        Ok(())
    }

    #[test]
    fn rejects_unknown_backend_and_empty_catalog() {
        let mut cfg = CoachConfig::from_file(CoachConfigFile::default());
        cfg.model.backend = "tflite".to_string();
        assert!(cfg.validate().is_err());

        let mut cfg = CoachConfig::from_file(CoachConfigFile::default());
        cfg.position.positions = Some(vec!["  ".to_string()]);
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_unknown_keys() {
        let parsed: std::result::Result<CoachConfigFile, _> =
            toml::from_str("[model]\nbackedn = \"tract\"\n");
        assert!(parsed.is_err());
    }
}
