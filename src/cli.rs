//! CLI command definitions using clap.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use harvest_fetch::{DetailMode, HarvestConfig, Pacing};

/// bookwalker-harvest
#[derive(Parser, Debug)]
#[command(name = "harvest")]
#[command(version)]
#[command(about = "Harvest the bookwalker.in.th catalog into a single JSON file")]
#[command(
    long_about = "Reads the storefront's JSON catalog API and groups books into series, or walks the paginated HTML listing and fetches every product page. `auto` tries the API first and falls back to the listing."
)]
pub struct Cli {
    /// Configuration file (.toml or .json)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Output file
    #[arg(short, long, global = true, default_value = "data.json")]
    pub output: PathBuf,

    /// Log at debug level
    #[arg(short, long, global = true, default_value_t = false)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Read the catalog API and group books into series
    Api {
        #[command(flatten)]
        api: ApiArgs,

        #[command(flatten)]
        paging: PagingArgs,
    },

    /// Walk the HTML listing and fetch every product page
    Scrape {
        #[command(flatten)]
        scrape: ScrapeArgs,

        #[command(flatten)]
        paging: PagingArgs,
    },

    /// Try the catalog API, fall back to the HTML listing on failure
    Auto {
        #[command(flatten)]
        api: ApiArgs,

        #[command(flatten)]
        scrape: ScrapeArgs,

        #[command(flatten)]
        paging: PagingArgs,
    },
}

impl Default for Commands {
    fn default() -> Self {
        Self::Auto {
            api: ApiArgs::default(),
            scrape: ScrapeArgs::default(),
            paging: PagingArgs::default(),
        }
    }
}

impl Commands {
    /// Apply this command's flags on top of the loaded configuration.
    #[must_use]
    pub fn apply(&self, config: HarvestConfig) -> HarvestConfig {
        match self {
            Self::Api { api, paging } => paging.apply(api.apply(config)),
            Self::Scrape { scrape, paging } => paging.apply(scrape.apply(config)),
            Self::Auto { api, scrape, paging } => paging.apply(scrape.apply(api.apply(config))),
        }
    }
}

/// Catalog API overrides.
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct ApiArgs {
    /// Items requested per API page
    #[arg(long)]
    pub page_size: Option<u32>,

    /// API sort key (e.g. release_date)
    #[arg(long)]
    pub sort_by: Option<String>,
}

impl ApiArgs {
    fn apply(&self, mut config: HarvestConfig) -> HarvestConfig {
        if let Some(size) = self.page_size {
            config.api.page_size = size;
        }
        if let Some(sort_by) = &self.sort_by {
            config.api.sort_by.clone_from(sort_by);
        }
        config
    }
}

/// HTML listing and detail-page overrides.
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct ScrapeArgs {
    /// Concurrent detail-page fetches
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Fixed pause before each detail request, in milliseconds (0 disables)
    #[arg(long)]
    pub delay_ms: Option<u64>,

    /// Keep partial detail and fill the gaps with the sentinel instead of retrying
    #[arg(long, default_value_t = false)]
    pub best_effort: bool,

    /// Emit books whose detail page failed, without a detail block
    #[arg(long, default_value_t = false)]
    pub keep_failed: bool,
}

impl ScrapeArgs {
    fn apply(&self, mut config: HarvestConfig) -> HarvestConfig {
        if let Some(workers) = self.workers {
            config.detail.workers = workers;
        }
        match self.delay_ms {
            Some(0) => config.detail.request_delay = Pacing::None,
            Some(ms) => {
                config.detail.request_delay = Pacing::Fixed {
                    delay: Duration::from_millis(ms),
                };
            }
            None => {}
        }
        if self.best_effort {
            config.detail.mode = DetailMode::BestEffort;
        }
        if self.keep_failed {
            config.detail.keep_failed = true;
        }
        config
    }
}

/// Page limit shared by both paths.
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct PagingArgs {
    /// Stop after this many pages
    #[arg(long)]
    pub max_pages: Option<u32>,
}

impl PagingArgs {
    fn apply(&self, mut config: HarvestConfig) -> HarvestConfig {
        if let Some(max) = self.max_pages {
            config.api.max_pages = Some(max);
            config.listing.max_pages = Some(max);
        }
        config
    }
}
