//! tool_server - JSON-RPC tool server for assistant clients.
//!
//! Registers the speech, pose estimation and software info tools and serves
//! them on `POST /mcp`.

use anyhow::Result;
use clap::Parser;
use std::sync::mpsc;

use yoga_coach::tools::{SoftwareInfoTool, TalkToYogi, YogaPoseEstimation};
use yoga_coach::{
    open_backend, speaker_from_command, CoachConfig, PoseEstimator, SoftwareInfoSource,
    ToolRegistry, ToolServer, ToolServerConfig,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Serve yoga coach tools over JSON-RPC")]
struct Args {
    /// Listen address (overrides the config file).
    #[arg(long)]
    listen: Option<String>,

    /// Image the pose estimation tool reads (overrides the config file).
    #[arg(long)]
    image: Option<String>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let config = CoachConfig::load()?;

    let estimator = PoseEstimator::open(open_backend(&config.model)?, config.model.scale_divisor)?;
    let speaker = speaker_from_command(config.speech.command.as_deref(), &config.speech.args)?;
    let image = args.image.unwrap_or(config.tools.image_path);

    let mut registry = ToolRegistry::new();
    registry.register(TalkToYogi::new(speaker))?;
    registry.register(YogaPoseEstimation::new(estimator, &image)?)?;
    registry.register(SoftwareInfoTool::new(SoftwareInfoSource::default()))?;

    let handle = ToolServer::new(
        ToolServerConfig {
            addr: args.listen.unwrap_or(config.tools.listen),
            ..ToolServerConfig::default()
        },
        registry,
    )
    .spawn()?;
    log::info!("tool server listening on {} (POST /mcp)", handle.addr);

    let (tx, rx) = mpsc::channel();
    ctrlc::set_handler(move || {
        let _ = tx.send(());
    })?;

    let _ = rx.recv();
    log::info!("shutdown signal received, stopping tool server...");
    handle.stop()?;
    Ok(())
}
