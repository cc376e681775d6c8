//! estimate_pose - run pose estimation once and print the keypoints.

use anyhow::Result;
use clap::Parser;
use serde::Serialize;

use yoga_coach::pose::CocoJoint;
use yoga_coach::{open_backend, open_frame_source, CoachConfig, PoseEstimator, ScaleDivisor};

#[derive(Parser, Debug)]
#[command(author, version, about = "Estimate keypoints for one frame")]
struct Args {
    /// Image path or camera (defaults to the configured frame source).
    source: Option<String>,

    /// Divisor used to map heatmap cells to pixels: heatmap_grid or input_size.
    #[arg(long)]
    scale_divisor: Option<ScaleDivisor>,

    /// Print only [x, y] pairs.
    #[arg(long)]
    positions_only: bool,
}

#[derive(Serialize)]
struct NamedKeypoint {
    channel: usize,
    joint: Option<&'static str>,
    x: f32,
    y: f32,
    score: f32,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let config = CoachConfig::load()?;

    let mut source = open_frame_source(args.source.as_deref().unwrap_or(&config.frame_source))?;
    let divisor = args.scale_divisor.unwrap_or(config.model.scale_divisor);
    let mut estimator = PoseEstimator::open(open_backend(&config.model)?, divisor)?;

    let frame = source.next_frame()?;
    let keypoints = estimator.estimate(&frame)?;
    let output = if args.positions_only {
        serde_json::to_string_pretty(&keypoints.positions())?
    } else {
        let named: Vec<NamedKeypoint> = keypoints
            .iter()
            .enumerate()
            .map(|(channel, point)| NamedKeypoint {
                channel,
                joint: CocoJoint::from_index(channel).map(|joint| joint.name()),
                x: point.x,
                y: point.y,
                score: point.score,
            })
            .collect();
        serde_json::to_string_pretty(&named)?
    };
    println!("{}", output);

    estimator.close()
}
