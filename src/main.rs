//! # harvest
//!
//! Entry point for the bookwalker catalog harvester.
//!
//! ## Run Sequence
//!
//! 1. **Parse CLI** - global flags plus one of `api`, `scrape`, `auto` (default)
//! 2. **Tracing** - `RUST_LOG` or `info`; `--verbose` forces `debug`
//! 3. **Configuration** - defaults, then the config file, then `HARVEST_*`
//!    environment variables, then command-line flags
//! 4. **Acquire** - the chosen path builds one catalog in memory
//! 5. **Write** - the catalog is written once, as a single JSON document
//!
//! ## Error Handling
//!
//! Library errors are typed; here they are wrapped with `anyhow` context.
//! A listing or API failure aborts the run; a single failed detail page never does.

#![forbid(unsafe_code)]
#![forbid(clippy::unwrap_used)]
#![forbid(clippy::panic)]
#![deny(clippy::expect_used)]

mod cli;
mod commands;

use std::time::Instant;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let start_time = Instant::now();
    info!(output = %cli.output.display(), "Harvest starting");

    commands::execute_command(cli).await?;

    info!("Harvest finished in {:?}", start_time.elapsed());
    Ok(())
}

/// Initialize tracing subscriber with environment filter.
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
