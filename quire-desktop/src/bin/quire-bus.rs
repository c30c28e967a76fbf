//! `quire-bus`: message bus daemon shared by editor processes.

use clap::Parser;
use log::{error, info};
use quire_sync::bus::BusDaemon;
use quire_sync::config::Config;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(author, version, about = "Session message bus for Quire editors", long_about = None)]
struct Args {
    /// Address to listen on, overrides the configuration file
    #[arg(short, long)]
    bind: Option<String>,

    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut config = match Config::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };
    if let Some(bind) = args.bind {
        config.bus.bind_addr = bind;
    }

    info!("Starting quire-bus on {}", config.bus.bind_addr);
    let daemon = BusDaemon::new(config.bus);
    tokio::select! {
        result = daemon.run() => {
            if let Err(e) = result {
                error!("Bus daemon failed: {e}");
                return ExitCode::FAILURE;
            }
        }
        _ = tokio::signal::ctrl_c() => {
            let stats = daemon.stats().await;
            info!(
                "Stopping: {} connections served, {} signals relayed",
                stats.total_connections, stats.relayed_signals
            );
        }
    }
    ExitCode::SUCCESS
}
