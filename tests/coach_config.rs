use std::sync::Mutex;
use std::time::Duration;

use tempfile::NamedTempFile;

use yoga_coach::config::CoachConfig;
use yoga_coach::infer::TensorLayout;
use yoga_coach::pose::{InputEncoding, ScaleDivisor};

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn clear_env() {
    for key in [
        "YOGA_COACH_CONFIG",
        "YOGA_MODEL_BACKEND",
        "YOGA_MODEL_PATH",
        "YOGA_SCALE_DIVISOR",
        "YOGA_FRAME_SOURCE",
        "YOGA_POSITION_URL",
        "YOGA_POSITION_LISTEN",
        "YOGA_TOOLS_LISTEN",
        "YOGA_TOOLS_IMAGE",
        "YOGA_POLL_INTERVAL_MS",
        "YOGA_SPEECH_COMMAND",
    ] {
        std::env::remove_var(key);
    }
}

#[test]
fn loads_config_from_file_and_env_overrides() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    let toml = r#"
        [model]
        backend = "synthetic"
        input_width = 256
        input_height = 320
        encoding = "float01"
        tensor_layout = "nhwc"

        [frames]
        source = "stub://mat"

        [position]
        url = "http://coach-host:5000"
        positions = ["Tree Pose", "Cobra Pose"]

        [coach]
        poll_interval_ms = 500

        [speech]
        command = "espeak-ng"
        args = ["-v", "en"]

        [tools]
        listen = "127.0.0.1:8100"
    "#;
    std::io::Write::write_all(&mut file, toml.as_bytes()).expect("write config");

    std::env::set_var("YOGA_COACH_CONFIG", file.path());
    std::env::set_var("YOGA_POLL_INTERVAL_MS", "750");
    std::env::set_var("YOGA_SCALE_DIVISOR", "input_size");
    std::env::set_var("YOGA_TOOLS_IMAGE", "/tmp/pose.jpg");

    let cfg = CoachConfig::load().expect("load config");
    assert_eq!(cfg.model.input_width, 256);
    assert_eq!(cfg.model.input_height, 320);
    assert_eq!(cfg.model.encoding, InputEncoding::Float01);
    assert_eq!(cfg.model.tensor_layout, TensorLayout::Nhwc);
    assert_eq!(cfg.model.scale_divisor, ScaleDivisor::InputSize);
    assert_eq!(cfg.frame_source, "stub://mat");
    assert_eq!(cfg.position.url, "http://coach-host:5000");
    assert_eq!(
        cfg.position.positions,
        Some(vec!["Tree Pose".to_string(), "Cobra Pose".to_string()])
    );
    assert_eq!(cfg.coach.poll_interval, Duration::from_millis(750));
    assert_eq!(cfg.speech.command.as_deref(), Some("espeak-ng"));
    assert_eq!(cfg.speech.args, vec!["-v", "en"]);
    assert_eq!(cfg.tools.listen, "127.0.0.1:8100");
    assert_eq!(cfg.tools.image_path, "/tmp/pose.jpg");

    clear_env();
}

#[test]
fn defaults_apply_without_config_file() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let cfg = CoachConfig::load().expect("load defaults");
    assert_eq!(cfg.model.backend, "synthetic");
    assert_eq!((cfg.model.input_width, cfg.model.input_height), (192, 256));
    assert_eq!(cfg.model.scale_divisor, ScaleDivisor::HeatmapGrid);
    assert_eq!(cfg.position.listen, "0.0.0.0:5000");
    assert_eq!(cfg.tools.image_path, "test.jpg");
    assert_eq!(cfg.coach.max_rounds, None);
}

#[test]
fn empty_speech_command_disables_tts() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();
    std::env::set_var("YOGA_SPEECH_COMMAND", "");

    let cfg = CoachConfig::load().expect("load config");
    assert_eq!(cfg.speech.command, None);

    clear_env();
}

#[test]
fn rejects_invalid_env_values() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("YOGA_POLL_INTERVAL_MS", "soon");
    assert!(CoachConfig::load().is_err());
    clear_env();

    std::env::set_var("YOGA_MODEL_BACKEND", "tflite");
    assert!(CoachConfig::load().is_err());
    clear_env();

    std::env::set_var("YOGA_POLL_INTERVAL_MS", "0");
    assert!(CoachConfig::load().is_err());
    clear_env();
}

#[test]
fn rejects_malformed_config_file() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    std::io::Write::write_all(&mut file, b"[model\nbackend = ").expect("write config");
    std::env::set_var("YOGA_COACH_CONFIG", file.path());
    assert!(CoachConfig::load().is_err());

    std::env::set_var("YOGA_COACH_CONFIG", file.path().with_extension("missing"));
    assert!(CoachConfig::load().is_err());

    clear_env();
}
