//! CLI command handlers.
//!
//! Each path produces a [`Catalog`]; writing it is shared.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

use std::path::Path;

use anyhow::{Context, Result};
use harvest_core::{Catalog, write_catalog};
use harvest_fetch::{
    ApiFetcher, DetailFetcher, HarvestConfig, HttpClient, ListingFetcher, fetch_details,
    group_series,
};
use tracing::{info, warn};

use crate::cli::{Cli, Commands};

/// Execute a CLI invocation: load config, run the chosen path, write the output.
pub async fn execute_command(cli: Cli) -> Result<()> {
    let command = cli.command.unwrap_or_default();
    let config = HarvestConfig::load(cli.config.as_deref())
        .context("Failed to load configuration")?;
    let config = command.apply(config);
    config.validate().context("Invalid command-line overrides")?;

    let catalog = match command {
        Commands::Api { .. } => cmd_api(&config).await,
        Commands::Scrape { .. } => cmd_scrape(&config).await,
        Commands::Auto { .. } => cmd_auto(&config).await,
    }?;

    write_output(&cli.output, &catalog)
}

fn client(config: &HarvestConfig) -> Result<HttpClient> {
    HttpClient::new(&config.http, config.retry.clone()).context("Failed to build HTTP client")
}

/// Catalog API, grouped into series.
async fn cmd_api(config: &HarvestConfig) -> Result<Catalog> {
    let fetcher = ApiFetcher::new(client(config)?, &config.api)
        .context("Invalid catalog API settings")?;
    let items = fetcher
        .fetch_all()
        .await
        .with_context(|| format!("Catalog API request to {} failed", config.api.endpoint))?;

    let groups = group_series(&items, &config.rules);
    info!(items = items.len(), series = groups.len(), "Catalog grouped into series");
    Ok(Catalog::Series(groups))
}

/// HTML listing, then every product page.
async fn cmd_scrape(config: &HarvestConfig) -> Result<Catalog> {
    let client = client(config)?;
    let listing = ListingFetcher::new(client.clone(), &config.listing, config.rules.clone())
        .context("Invalid listing settings")?;
    let books = listing
        .fetch_all()
        .await
        .with_context(|| format!("Listing walk of {} failed", config.listing.base_url))?;

    let fetcher = DetailFetcher::new(client, &config.detail);
    let report = fetch_details(&fetcher, books, config.detail.workers).await;
    if !report.failures.is_empty() {
        warn!(
            failed = report.failures.len(),
            kept = config.detail.keep_failed,
            mode = %config.detail.mode,
            "Some detail pages were abandoned"
        );
    }

    Ok(Catalog::Books(report.into_books(config.detail.keep_failed)))
}

/// API first; any failure there falls back to the HTML path.
async fn cmd_auto(config: &HarvestConfig) -> Result<Catalog> {
    match cmd_api(config).await {
        Ok(catalog) => Ok(catalog),
        Err(e) => {
            warn!(error = format!("{e:#}"), "Catalog API unavailable, falling back to HTML listing");
            cmd_scrape(config).await
        }
    }
}

fn write_output(path: &Path, catalog: &Catalog) -> Result<()> {
    write_catalog(path, catalog)
        .with_context(|| format!("Failed to write catalog to {}", path.display()))
}
