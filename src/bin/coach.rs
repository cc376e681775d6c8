//! coach - interactive yoga coaching loop.
//!
//! Each round:
//! 1. Fetches the target position from the position server
//! 2. Captures a frame and estimates the user's keypoints
//! 3. Speaks hold instructions on a match, corrective feedback otherwise

use anyhow::Result;
use clap::Parser;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use yoga_coach::{
    open_backend, open_frame_source, speaker_from_command, Coach, CoachConfig, PoseEstimator,
    PositionClient,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Coach a user through yoga positions")]
struct Args {
    /// Stop after this many rounds (default: run until Ctrl-C).
    #[arg(long, env = "YOGA_MAX_ROUNDS")]
    max_rounds: Option<u64>,

    /// Frame source: image path, v4l2://<device> or /dev/videoN.
    #[arg(long)]
    source: Option<String>,

    /// Position server base URL.
    #[arg(long)]
    position_url: Option<String>,

    /// Milliseconds between rounds.
    #[arg(long)]
    poll_interval_ms: Option<u64>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let config = CoachConfig::load()?;

    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_handler = shutdown.clone();
    ctrlc::set_handler(move || {
        shutdown_handler.store(true, Ordering::SeqCst);
    })?;

    let targets = PositionClient::new(args.position_url.as_deref().unwrap_or(&config.position.url))?;
    let frames = open_frame_source(args.source.as_deref().unwrap_or(&config.frame_source))?;
    let estimator = PoseEstimator::open(open_backend(&config.model)?, config.model.scale_divisor)?;
    let speaker = speaker_from_command(config.speech.command.as_deref(), &config.speech.args)?;
    let poll_interval = args
        .poll_interval_ms
        .map(Duration::from_millis)
        .unwrap_or(config.coach.poll_interval);

    let mut coach = Coach::new(Box::new(targets), frames, estimator, speaker, poll_interval);
    let stats = coach.run(args.max_rounds.or(config.coach.max_rounds), &shutdown)?;
    log::info!(
        "coach stopped after {} rounds ({} matches, {} failures)",
        stats.rounds,
        stats.matches,
        stats.failures
    );
    coach.finish()
}
