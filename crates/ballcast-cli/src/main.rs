//! Ballcast CLI - live game scoreboard and stream launcher
//!
//! Features:
//! - Today's scoreboard, refreshed in the background
//! - Playable stream discovery per game feed
//! - Stream playback through streamlink and a local proxy

use anyhow::Context;
use ballcast_core::Config;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod output;
mod process;

/// Ballcast - live game streams from the terminal
#[derive(Parser)]
#[command(name = "ballcast")]
#[command(version)]
#[command(about = "Scoreboard and stream launcher for live games", long_about = None)]
struct Cli {
    /// JSON configuration file
    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,

    /// Serve the stream over HTTP instead of playing it locally
    #[arg(long)]
    http: bool,

    /// Only show games for this team abbreviation
    #[arg(short, long)]
    team: Option<String>,

    /// Call letters or feed id of a stream to start right away
    #[arg(short, long)]
    stream: Option<String>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_writer(std::io::stderr)
        .init();

    let config = Config::load(&cli.config)
        .with_context(|| format!("unable to load {}", cli.config.display()))?;

    commands::run(
        config,
        commands::Options {
            http: cli.http,
            team: cli.team,
            stream: cli.stream,
        },
    )
    .await
}
