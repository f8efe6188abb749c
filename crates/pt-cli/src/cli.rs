//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::commands::{ingest::IngestArgs, timeline::TimelineArgs};

/// Presence timeline tracker.
///
/// Records per-platform presence snapshots and rebuilds daily status
/// timelines for a user in a guild.
#[derive(Debug, Parser)]
#[command(name = "pt", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Record presence events read as JSON Lines from stdin.
    Ingest(IngestArgs),

    /// Show the status timeline of one or more users for a day.
    Timeline(TimelineArgs),

    /// Show tracked users and database location.
    Status,
}
