mod commands;

use std::path::PathBuf;

use anyhow::Result;
use calc_history::HistoryConfig;
use clap::{Parser, Subcommand};

use crate::commands::ReplayOptions;

/// Replays calculator event logs through the history engine.
#[derive(Parser, Debug)]
#[command(name = "calc-history", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Feed a JSON array of event envelopes through a fresh engine and list the history.
    Replay {
        /// Event log to replay.
        events: PathBuf,

        /// Include intermediate states in the listing.
        #[arg(long)]
        all: bool,

        /// Promote the listed states into saved history.
        #[arg(long)]
        save: bool,

        /// Write the saved history to this file.
        #[arg(long)]
        export: Option<PathBuf>,

        /// JSON config file. Falls back to defaults and the environment.
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// List an exported saved-history file.
    Inspect {
        /// Saved history file to read.
        path: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let output = match cli.command {
        Command::Replay {
            events,
            all,
            save,
            export,
            config,
        } => {
            let config = match config {
                Some(path) => HistoryConfig::load_or_default(&path),
                None => HistoryConfig::from_env(),
            };
            tracing::debug!(?config, "Starting replay");
            let options = ReplayOptions { all, save, export };
            commands::replay(&events, &config, &options)?
        }
        Command::Inspect { path } => commands::inspect(&path)?,
    };

    print!("{output}");
    Ok(())
}
