//! Dualtrack Player - Main entry point
//!
//! Plays one track described by a TOML manifest and reads transport commands
//! from stdin. Status lines go to stdout, logs to stderr (or the configured
//! log file).

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use dualtrack_common::config::{self, LoggingConfig};
use dualtrack_common::events::PlayerEvent;
use dualtrack_common::Track;
use dualtrack_player::shell::{self, ShellCommand};
use dualtrack_player::{PlayerDriver, PlayerHandle};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Command-line arguments for dualtrack-player
#[derive(Parser, Debug)]
#[command(name = "dualtrack-player")]
#[command(about = "Play a track and switch between its compressed and lossless renditions")]
#[command(version)]
struct Args {
    /// Track manifest (TOML)
    #[arg(short, long, env = "DUALTRACK_TRACK")]
    track: PathBuf,

    /// Configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level or filter directive, overrides the config file
    #[arg(short, long, env = "DUALTRACK_LOG_LEVEL")]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let (config, source) =
        config::load_config(args.config.as_deref()).context("Failed to load configuration")?;
    init_tracing(&config.logging, args.log_level.as_deref())?;
    source.log();

    let track = Track::load(&args.track)
        .with_context(|| format!("Failed to load track manifest {}", args.track.display()))?;
    info!("Loaded track '{}' from {}", track.title(), args.track.display());

    let (driver, handle) = PlayerDriver::for_track(track.clone(), &config.playback)
        .context("Failed to initialize player")?;
    let driver_task = driver.spawn();

    println!("{}", shell::render_header(&track));
    if let Some(artwork) = track.artwork() {
        println!("artwork: {} ({})", artwork.url, artwork.alt_text(track.title()));
    }
    println!("{}", shell::render_tabs(&track, &handle.snapshot()));
    println!("{}", shell::HELP);

    tokio::spawn(report_events(handle.clone()));

    tokio::select! {
        result = prompt_loop(&handle, &track) => result?,
        _ = shutdown_signal() => {}
    }

    handle.shutdown().await.context("Failed to stop player")?;
    driver_task.await.context("Player task panicked")?;
    info!("Shutdown complete");
    Ok(())
}

/// Read commands from stdin until `quit` or end of input
async fn prompt_loop(handle: &PlayerHandle, track: &Track) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        let command = match shell::parse_command(&line) {
            Ok(command) => command,
            Err(e) => {
                println!("{}", e);
                continue;
            }
        };

        match command {
            ShellCommand::Quit => break,
            ShellCommand::Help => println!("{}", shell::HELP),
            ShellCommand::Status => println!("{}", shell::render_status(&handle.snapshot())),
            ShellCommand::Json => {
                println!("{}", serde_json::to_string_pretty(&handle.snapshot())?)
            }
            ShellCommand::Player(command) => {
                if let Some(reason) = shell::disabled_reason(command, &handle.snapshot()) {
                    println!("{}", reason);
                    continue;
                }
                match handle.send(command).await {
                    Ok(snapshot) => {
                        println!("{}", shell::render_tabs(track, &snapshot));
                        println!("{}", shell::render_status(&snapshot));
                    }
                    Err(e) => println!("{}", e),
                }
            }
        }
    }

    Ok(())
}

/// Print notable player events as they happen
async fn report_events(handle: PlayerHandle) {
    let mut events = handle.subscribe();
    loop {
        match events.recv().await {
            Ok(PlayerEvent::LoadFailed { rendition, reason, .. }) => {
                println!("! {} failed to load: {}", rendition, reason);
            }
            Ok(PlayerEvent::PlaybackEnded { rendition, .. }) => {
                println!("■ {} finished", rendition);
            }
            Ok(PlayerEvent::RenditionSwitched { from, to, .. }) => {
                println!("↻ switching {} -> {}", from, to);
            }
            Ok(PlayerEvent::SnapshotChanged { .. }) => {}
            Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                warn!("Event reporter lagged, skipped {} events", skipped);
            }
            Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
        }
    }
}

/// Initialize tracing from config, `RUST_LOG` taking precedence
fn init_tracing(logging: &LoggingConfig, level_override: Option<&str>) -> Result<()> {
    let level = level_override.unwrap_or(&logging.level);
    let directive = match level.trim() {
        bare @ ("trace" | "debug" | "info" | "warn" | "error") => {
            format!("dualtrack_player={bare},dualtrack_common={bare}")
        }
        custom => custom.to_string(),
    };

    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&directive)
            .with_context(|| format!("Invalid log filter '{}'", directive))?,
    };

    let registry = tracing_subscriber::registry().with(filter);
    match &logging.file {
        Some(path) => {
            let file = open_log_file(path)?;
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_ansi(false)
                        .with_writer(std::sync::Mutex::new(file)),
                )
                .init();
        }
        None => {
            registry
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    Ok(())
}

fn open_log_file(path: &Path) -> Result<std::fs::File> {
    std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file {}", path.display()))
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
