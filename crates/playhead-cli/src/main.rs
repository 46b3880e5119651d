//! Playhead CLI - Video metadata inspection and playback simulation
//!
//! Features:
//! - Normalize raw video metadata files
//! - Resolve videos and playlists through the playback API or a local catalog
//! - Drive the playback facade over a simulated engine

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod output;

/// Playhead CLI - Playback state toolkit
#[derive(Parser)]
#[command(name = "playhead")]
#[command(version)]
#[command(about = "Inspect video metadata and simulate playback sessions", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format (text, json, table)
    #[arg(short, long, default_value = "text", global = true)]
    format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Normalize a raw video metadata file
    Inspect {
        /// Path to the metadata JSON
        metadata: PathBuf,
    },

    /// Resolve a video by id
    Lookup {
        /// Video id (or reference id with --reference)
        id: String,

        /// Player configuration with account id and policy key
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Local catalog JSON used instead of the playback API
        #[arg(long)]
        catalog: Option<PathBuf>,

        /// Treat the id as a reference id
        #[arg(short, long)]
        reference: bool,
    },

    /// Resolve a playlist and list its videos
    Playlist {
        /// Playlist id
        id: String,

        /// Player configuration with account id and policy key
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Local catalog JSON used instead of the playback API
        #[arg(long)]
        catalog: Option<PathBuf>,
    },

    /// Run a scripted session through the player over a simulated engine
    Simulate {
        /// Metadata JSON path, or a direct media URL
        input: String,

        /// Seconds between progress events
        #[arg(short, long, default_value = "10")]
        step: f64,

        /// Report an engine failure once this position is reached
        #[arg(long)]
        fail_at: Option<f64>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(level)
        .with_writer(std::io::stderr)
        .init();

    playhead_core::init();

    match cli.command {
        Commands::Inspect { metadata } => {
            commands::inspect(&metadata, &cli.format)?;
        }
        Commands::Lookup { id, config, catalog, reference } => {
            commands::lookup(&id, config, catalog, reference, &cli.format).await?;
        }
        Commands::Playlist { id, config, catalog } => {
            commands::playlist(&id, config, catalog, &cli.format).await?;
        }
        Commands::Simulate { input, step, fail_at } => {
            commands::simulate(&input, step, fail_at, &cli.format).await?;
        }
    }

    Ok(())
}
