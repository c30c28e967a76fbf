//! `quire`: headless editor process joined to a replication session.
//!
//! Reads editing commands from stdin, one per line, and applies actions
//! received from the other members of the session as they arrive.

mod commands;

use clap::Parser;
use commands::Outcome;
use log::{error, info, warn};
use quire_core::{Editor, EditorContext};
use quire_sync::config::Config;
use quire_sync::session::{SessionSelection, SessionSlot};
use quire_sync::transport::BusEndpoint;
use quire_sync::SyncCoordinator;
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::io::{AsyncBufReadExt, BufReader};

static SESSION_SLOT: SessionSlot = SessionSlot::new();

#[derive(Parser, Debug)]
#[command(author, version, about = "Collaborative rich-text editor process", long_about = None)]
struct Args {
    /// Join the named session (default: "common")
    #[arg(short, long, conflicts_with_all = ["detached", "disabled"])]
    session: Option<String>,

    /// Join a fresh session nobody else knows about
    #[arg(long, conflicts_with = "disabled")]
    detached: bool,

    /// Edit locally without replication
    #[arg(long)]
    disabled: bool,

    /// Bus daemon URL, overrides the configuration file
    #[arg(short, long)]
    bus: Option<String>,

    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let selection = SessionSelection {
        name: args.session,
        detached: args.detached,
        disabled: args.disabled,
    };
    let mode = selection.resolve()?;

    let mut config = Config::load(args.config.as_deref())?;
    if let Some(url) = args.bus {
        config.sync.bus_url = url;
    }

    let endpoint = BusEndpoint::daemon(&config.sync.bus_url);
    let session = SESSION_SLOT.create(mode, &endpoint, &config.sync).await?;
    let mut coordinator = SyncCoordinator::new(Editor::new(config.sync.history_limit), session);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    info!("Input closed");
                    break;
                };
                let command = match commands::parse(&line) {
                    Ok(Some(command)) => command,
                    Ok(None) => continue,
                    Err(e) => {
                        warn!("{e}");
                        continue;
                    }
                };
                match commands::execute(&mut coordinator, command) {
                    Ok(Outcome::Continue) => {}
                    Ok(Outcome::Print(text)) => println!("{text}"),
                    Ok(Outcome::Quit) => break,
                    Err(e) => warn!("Command failed: {e}"),
                }
            }
            event = coordinator.next_event() => {
                let Some(event) = event else {
                    warn!("Session stream closed");
                    break;
                };
                if let Some(applied) = coordinator.apply(event) {
                    info!(
                        "Applied {} from {} ({} chars)",
                        applied.action_type,
                        applied.origin,
                        coordinator.editor().document().len()
                    );
                }
            }
        }
    }

    info!("Shutting down");
    Ok(())
}
