//! CLI argument parsing with subcommands.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Signal bot that manages subscriber groups and broadcasts to them.
#[derive(Parser)]
#[command(name = "signal-group-bot")]
#[command(about = "Signal bot for subscriber groups and group broadcasts")]
#[command(version)]
pub struct Cli {
    /// Path to the JSON configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Subcommand)]
pub enum Commands {
    /// Connect to the signal-cli daemon and answer commands until stopped
    Run,

    /// Handle a single command locally and print every message it would send
    Exec {
        /// Phone number the command appears to come from
        #[arg(long)]
        from: String,

        /// Command text, e.g. `bot list Choir`
        #[arg(required = true, trailing_var_arg = true)]
        text: Vec<String>,
    },

    /// Show current configuration status
    Status,
}
