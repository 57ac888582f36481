use mimalloc::MiMalloc;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

mod cli;
mod demo;
mod replay;

use anyhow::{Result, anyhow};
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt};

fn main() -> Result<()> {
    init_tracing()?;
    let cli = cli::Cli::parse();
    match cli.command {
        cli::Commands::Demo {
            steps,
            report_before,
            swap_root,
            resync_timeout_ms,
            record,
        } => demo::run(demo::DemoOptions {
            steps,
            report_before,
            swap_root,
            resync_timeout_ms,
            record,
        }),
        cli::Commands::Replay {
            markup,
            events,
            verbose,
        } => replay::run(&markup, &events, verbose),
    }
}

/// `log` records from the library crates reach the subscriber through its log bridge.
fn init_tracing() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| anyhow!(err))
}
