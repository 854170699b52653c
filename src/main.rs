//! Command-line entry point for the catalog scraper.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use tracing::{error, info};

use dibscraper::application::PageTraversal;
use dibscraper::domain::recovery::{HaltPolicy, RecoveryPolicy, RetryBudgetPolicy};
use dibscraper::infrastructure::browser::ChromiumSession;
use dibscraper::infrastructure::checkpoint::Checkpointer;
use dibscraper::infrastructure::config::{resolve_category, ScraperConfig};
use dibscraper::infrastructure::logging::init_logging;
use dibscraper::infrastructure::session::DomSession;

#[derive(Debug, Parser)]
#[command(name = "dibscraper", version)]
#[command(about = "Scrape 1stDibs product listings and detail pages")]
struct Cli {
    /// Catalog section key (1=lighting, 2=seating, 3=tables, 4=storage)
    /// or a full starting URL
    #[arg(short, long, env = "DIBSCRAPER_CATEGORY", default_value = "1")]
    category: String,

    /// Maximum number of listing pages to process
    #[arg(short = 'p', long, env = "DIBSCRAPER_MAX_PAGES")]
    max_pages: Option<u32>,

    /// Output directory for checkpoints, product files, and diagnostics
    #[arg(short, long, default_value = "scraped_data")]
    output_dir: PathBuf,

    /// Run the browser with a visible window
    #[arg(long)]
    headed: bool,

    /// Retry budget for stalls and pagination faults (0 halts immediately)
    #[arg(long, default_value_t = 0)]
    retry_budget: u32,

    /// Optional JSON config file overriding the built-in defaults
    #[arg(long)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, None)?;

    let mut config = ScraperConfig::load_or_default(cli.config.as_deref()).await?;
    config.output_dir = cli.output_dir.clone();
    config.headless = !cli.headed;

    let category = resolve_category(&cli.category);
    info!("starting scraper for 1stdibs products: {}", category.url);

    let session = Arc::new(
        ChromiumSession::launch(&config)
            .await
            .context("failed to launch browser session")?,
    );

    let run_stamp = Utc::now().format("%Y%m%d_%H%M%S").to_string();
    let checkpointer = Checkpointer::create(&config.output_dir, &category.name, &run_stamp)
        .await
        .context("failed to prepare output directories")?;

    let policy: Arc<dyn RecoveryPolicy> = if cli.retry_budget > 0 {
        Arc::new(RetryBudgetPolicy::new(cli.retry_budget))
    } else {
        Arc::new(HaltPolicy)
    };

    let traversal = PageTraversal::new(
        Arc::clone(&session) as Arc<dyn DomSession>,
        Arc::new(config),
        checkpointer,
        policy,
        cli.max_pages,
    );

    let result = traversal.run(&category.url).await;
    session.shutdown().await;

    match result {
        Ok(outcome) => {
            info!(
                "scraping complete: {} total valid product listings, {} detailed product pages (stopped on page {})",
                outcome.listings.len(),
                outcome.details.len(),
                outcome.pagination.current_page
            );
            Ok(())
        }
        Err(err) => {
            error!("scraper run failed: {err}");
            Err(err.into())
        }
    }
}
