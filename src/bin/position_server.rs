//! position_server - serves target yoga positions to the coach.

use anyhow::Result;
use clap::Parser;
use std::sync::mpsc;

use yoga_coach::{CoachConfig, PositionCatalog, PositionConfig, PositionServer};

#[derive(Parser, Debug)]
#[command(author, version, about = "Serve target yoga positions over HTTP")]
struct Args {
    /// Listen address (overrides the config file).
    #[arg(long)]
    listen: Option<String>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let config = CoachConfig::load()?;

    let catalog = PositionCatalog::from_settings(&config.position)?;
    let catalog_len = catalog.positions().len();
    let handle = PositionServer::new(PositionConfig {
        addr: args.listen.unwrap_or(config.position.listen),
        catalog,
    })
    .spawn()?;
    log::info!(
        "position server listening on {} ({} positions)",
        handle.addr,
        catalog_len
    );

    let (tx, rx) = mpsc::channel();
    ctrlc::set_handler(move || {
        let _ = tx.send(());
    })?;

    let _ = rx.recv();
    log::info!("shutdown signal received, stopping position server...");
    handle.stop()?;
    Ok(())
}
