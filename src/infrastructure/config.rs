//! Configuration infrastructure
//!
//! Contains configuration loading and management for catalog crawling.
//! Defaults cover everything; a JSON config file can override any part
//! without a rebuild.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::info;

use crate::infrastructure::extraction::SelectorConfig;

/// 1stDibs site constants and the fixed category table.
pub mod first_dibs {
    /// Catalog section start URLs.
    pub const LIGHTING_URL: &str = "https://www.1stdibs.com/furniture/lighting/";
    pub const SEATING_URL: &str = "https://www.1stdibs.com/furniture/seating/";
    pub const TABLES_URL: &str = "https://www.1stdibs.com/furniture/tables/";
    pub const STORAGE_URL: &str = "https://www.1stdibs.com/furniture/storage-case-pieces/";

    /// Browser user agent mimicking a regular desktop session.
    pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
        AppleWebKit/537.36 (KHTML, like Gecko) Chrome/90.0.4430.212 Safari/537.36";
}

/// One catalog section: display key plus its start URL.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Category {
    pub name: String,
    pub url: String,
}

impl Category {
    fn new(name: &str, url: &str) -> Self {
        Self {
            name: name.to_string(),
            url: url.to_string(),
        }
    }
}

/// Resolve a category selection: a known key (1-4), a literal URL, or
/// the lighting default for anything else.
pub fn resolve_category(choice: &str) -> Category {
    match choice {
        "1" => Category::new("lighting", first_dibs::LIGHTING_URL),
        "2" => Category::new("seating", first_dibs::SEATING_URL),
        "3" => Category::new("tables", first_dibs::TABLES_URL),
        "4" => Category::new("storage", first_dibs::STORAGE_URL),
        url if url.contains("://") => Category::new("products", url),
        _ => Category::new("products", first_dibs::LIGHTING_URL),
    }
}

/// Complete scraper configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScraperConfig {
    /// Directory receiving checkpoints, product files, and diagnostics
    pub output_dir: PathBuf,

    /// Browser user agent
    pub user_agent: String,

    /// Run the browser without a visible window
    pub headless: bool,

    /// Settle delays and scroll behavior
    pub timing: TimingConfig,

    /// Selector cascades for extraction and navigation
    pub selectors: SelectorConfig,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("scraped_data"),
            user_agent: first_dibs::USER_AGENT.to_string(),
            headless: true,
            timing: TimingConfig::default(),
            selectors: SelectorConfig::default(),
        }
    }
}

impl ScraperConfig {
    /// Load configuration from a JSON file, or fall back to defaults
    /// when no path is given.
    pub async fn load_or_default(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let body = fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config: Self = serde_json::from_str(&body)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        info!("configuration loaded from {}", path.display());
        Ok(config)
    }
}

/// Timing knobs. The engine never relies on a DOM-ready signal; these
/// explicit settle delays are the synchronization model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Pause after landing on a listing page, before tile discovery
    pub page_settle_ms: u64,

    /// Pause after navigating to a product detail page
    pub detail_settle_ms: u64,

    /// Pause after returning from a detail page to the listing page
    pub return_settle_ms: u64,

    /// Pause after activating the next-page control
    pub next_page_settle_ms: u64,

    /// Lazy-load scroll passes per listing page
    pub scroll_passes: u32,

    /// Vertical pixels per scroll pass
    pub scroll_step_px: i64,

    /// Pause between scroll passes
    pub scroll_pause_ms: u64,

    /// Pause after scrolling to the bottom before seeking pagination
    pub pagination_scroll_settle_ms: u64,

    /// Bounded wait for the consent overlay
    pub consent_wait_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            page_settle_ms: 5000,
            detail_settle_ms: 3000,
            return_settle_ms: 2000,
            next_page_settle_ms: 3000,
            scroll_passes: 4,
            scroll_step_px: 800,
            scroll_pause_ms: 1000,
            pagination_scroll_settle_ms: 2000,
            consent_wait_ms: 5000,
        }
    }
}

impl TimingConfig {
    /// Zeroed delays for tests driving a scripted session.
    pub fn instant() -> Self {
        Self {
            page_settle_ms: 0,
            detail_settle_ms: 0,
            return_settle_ms: 0,
            next_page_settle_ms: 0,
            scroll_passes: 0,
            scroll_step_px: 0,
            scroll_pause_ms: 0,
            pagination_scroll_settle_ms: 0,
            consent_wait_ms: 0,
        }
    }
}
