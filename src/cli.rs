use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "dom-mirror",
    about = "Mirror a primary DOM tree into a replica through patches",
    version,
    propagate_version = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Drive a scripted counter page on the primary and mirror it on a replica thread.
    Demo {
        /// Number of counter increments, one checkpoint each.
        #[arg(long, default_value_t = 3)]
        steps: u32,
        /// Report each mutation before running it instead of after it succeeds.
        /// Defaults to DOM_MIRROR_REPORT_BEFORE.
        #[arg(long)]
        report_before: bool,
        /// Swap the primary root at the end and recover through a full resync.
        #[arg(long)]
        swap_root: bool,
        /// Resync evaluation timeout in milliseconds. Defaults to
        /// DOM_MIRROR_RESYNC_TIMEOUT_MS, then 5000.
        #[arg(long)]
        resync_timeout_ms: Option<u64>,
        /// Also write the primary event stream to this file as JSON lines.
        #[arg(long)]
        record: Option<PathBuf>,
    },
    /// Apply a recorded JSON-lines event stream to a markup file and print the result.
    Replay {
        /// Initial replica markup.
        markup: PathBuf,
        /// Recorded primary events, one JSON object per line.
        events: PathBuf,
        /// Print replica events to stderr as they happen.
        #[arg(long)]
        verbose: bool,
    },
}
