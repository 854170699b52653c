//! Pagination state machine driving the whole crawl.
//!
//! `PageTraversal` discovers tiles on the current page, delegates each
//! tile to the listing and detail extractors, checkpoints the
//! accumulated collections after every page, and seeks the next-page
//! control until the result set is exhausted or a page limit is hit.
//! Recoverable faults are routed to the recovery policy; only a fatal
//! session error or a checkpoint failure aborts the run.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::domain::pagination::PaginationState;
use crate::domain::product::{DetailedProduct, ListingRecord};
use crate::domain::recovery::{FaultContext, RecoveryDecision, RecoveryPolicy};
use crate::infrastructure::checkpoint::{CheckpointError, Checkpointer};
use crate::infrastructure::config::ScraperConfig;
use crate::infrastructure::extraction::{DetailExtractor, ListingExtractor};
use crate::infrastructure::session::{
    recover_or, DomSession, Scope, SessionError, SessionResult,
};

/// Class/data-tn fragments scanned for likely tile markup on a stall.
const STALL_SCAN_TERMS: [&str; 5] = ["product", "item", "tile", "card", "listing"];

#[derive(Error, Debug)]
pub enum CrawlError {
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Checkpoint(#[from] CheckpointError),
}

/// Traversal phases. One page moves through
/// Discovering -> ProcessingTiles -> CheckpointingPage -> SeekingNextPage,
/// with Stalled entered from Discovering when no tile strategy matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Discovering,
    ProcessingTiles,
    CheckpointingPage,
    SeekingNextPage,
    Stalled,
    Terminated,
}

/// Everything a finished (or cleanly halted) run produced.
#[derive(Debug)]
pub struct TraversalOutcome {
    pub listings: Vec<ListingRecord>,
    pub details: Vec<DetailedProduct>,
    pub pagination: PaginationState,
    pub pages_checkpointed: u32,
}

pub struct PageTraversal {
    session: Arc<dyn DomSession>,
    config: Arc<ScraperConfig>,
    listing_extractor: ListingExtractor,
    detail_extractor: DetailExtractor,
    checkpointer: Checkpointer,
    policy: Arc<dyn RecoveryPolicy>,
    state: PaginationState,
    listings: Vec<ListingRecord>,
    details: Vec<DetailedProduct>,
    pages_checkpointed: u32,
    adopted_tile_selector: Option<String>,
    tile_count: usize,
    run_id: Uuid,
}

impl PageTraversal {
    pub fn new(
        session: Arc<dyn DomSession>,
        config: Arc<ScraperConfig>,
        checkpointer: Checkpointer,
        policy: Arc<dyn RecoveryPolicy>,
        page_limit: Option<u32>,
    ) -> Self {
        let listing_extractor =
            ListingExtractor::new(Arc::clone(&session), config.selectors.listing.clone());
        let detail_extractor = DetailExtractor::new(
            Arc::clone(&session),
            config.selectors.detail.clone(),
            Duration::from_millis(config.timing.detail_settle_ms),
        );
        Self {
            session,
            config,
            listing_extractor,
            detail_extractor,
            checkpointer,
            policy,
            state: PaginationState::new(page_limit),
            listings: Vec::new(),
            details: Vec::new(),
            pages_checkpointed: 0,
            adopted_tile_selector: None,
            tile_count: 0,
            run_id: Uuid::new_v4(),
        }
    }

    /// Walk the result set from `start_url` until termination.
    ///
    /// On an unexpected abort a diagnostic page dump is attempted before
    /// the error is returned.
    pub async fn run(mut self, start_url: &str) -> Result<TraversalOutcome, CrawlError> {
        match self.execute(start_url).await {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                error!("traversal aborted: {err}");
                let _ = self.dump_page("error_page_source.html").await;
                Err(err)
            }
        }
    }

    async fn execute(&mut self, start_url: &str) -> Result<TraversalOutcome, CrawlError> {
        info!(run_id = %self.run_id, "starting traversal of {start_url}");
        self.session.navigate(start_url).await?;
        self.accept_consent_overlay().await?;

        let mut phase = Phase::Discovering;
        loop {
            phase = match phase {
                Phase::Discovering => self.discover_tiles().await?,
                Phase::ProcessingTiles => self.process_tiles().await?,
                Phase::CheckpointingPage => self.checkpoint_page().await?,
                Phase::SeekingNextPage => self.seek_next_page().await?,
                Phase::Stalled => self.handle_stall().await?,
                Phase::Terminated => break,
            };
        }

        self.checkpointer
            .save_final(&self.listings, &self.details)
            .await?;
        info!(
            "traversal complete: {} listings, {} detailed products",
            self.listings.len(),
            self.details.len()
        );
        Ok(TraversalOutcome {
            listings: std::mem::take(&mut self.listings),
            details: std::mem::take(&mut self.details),
            pagination: self.state.clone(),
            pages_checkpointed: self.pages_checkpointed,
        })
    }

    /// Dismiss the consent overlay when it shows up within the bounded
    /// wait. Absence is the common case and not an error.
    async fn accept_consent_overlay(&self) -> SessionResult<()> {
        let Some(selector) = self.config.selectors.navigation.consent_button.first() else {
            return Ok(());
        };
        let timeout = Duration::from_millis(self.config.timing.consent_wait_ms);
        if !recover_or(self.session.wait_for(selector, timeout).await, false)? {
            debug!("no consent overlay detected");
            return Ok(());
        }
        let buttons = recover_or(self.session.find(Scope::Page, selector).await, Vec::new())?;
        if let Some(&button) = buttons.first() {
            if recover_or(self.session.click(button).await.map(|()| true), false)? {
                info!("consent overlay dismissed");
            } else {
                debug!("failed to dismiss consent overlay; continuing");
            }
        }
        Ok(())
    }

    /// Settle, trigger lazy loading, then adopt the first tile-container
    /// selector that matches anything on the page.
    async fn discover_tiles(&mut self) -> Result<Phase, CrawlError> {
        info!("--- processing page {} ---", self.state.current_page);
        self.settle(self.config.timing.page_settle_ms).await;
        for _ in 0..self.config.timing.scroll_passes {
            recover_or(
                self.session
                    .scroll_by(0, self.config.timing.scroll_step_px)
                    .await,
                (),
            )?;
            self.settle(self.config.timing.scroll_pause_ms).await;
        }

        for selector in &self.config.selectors.listing.tile_container {
            debug!("trying tile selector: {selector}");
            let tiles = recover_or(self.session.find(Scope::Page, selector).await, Vec::new())?;
            if !tiles.is_empty() {
                info!("found {} tiles with selector: {selector}", tiles.len());
                self.adopted_tile_selector = Some(selector.clone());
                self.tile_count = tiles.len();
                return Ok(Phase::ProcessingTiles);
            }
        }
        warn!(
            "could not find product listings on page {} with any known selector",
            self.state.current_page
        );
        Ok(Phase::Stalled)
    }

    /// Dump diagnostics and ask the recovery policy what to do.
    async fn handle_stall(&mut self) -> Result<Phase, CrawlError> {
        self.dump_page(&format!("page_source_page{}.html", self.state.current_page))
            .await?;
        self.scan_for_candidates().await?;

        let fault = FaultContext::TileDiscoveryStall {
            page: self.state.current_page,
        };
        match self.policy.decide(&fault).await {
            RecoveryDecision::Halt => {
                info!("halting at tile-discovery stall on page {}", self.state.current_page);
                Ok(Phase::Terminated)
            }
            RecoveryDecision::RetrySamePage => {
                info!("re-attempting tile discovery on page {}", self.state.current_page);
                Ok(Phase::Discovering)
            }
            RecoveryDecision::SkipToNextPage => {
                info!("skipping page {} after stall", self.state.current_page);
                Ok(Phase::CheckpointingPage)
            }
        }
    }

    /// Log elements whose class or data-tn hints at product markup, for
    /// offline selector maintenance.
    async fn scan_for_candidates(&self) -> Result<(), CrawlError> {
        info!("scanning page for potential product elements");
        for term in STALL_SCAN_TERMS {
            let selector = format!("[class*='{term}'], [data-tn*='{term}']");
            let matches = recover_or(self.session.find(Scope::Page, &selector).await, Vec::new())?;
            if !matches.is_empty() {
                info!(
                    "found {} potential elements containing '{term}' in class or data attributes",
                    matches.len()
                );
            }
        }
        Ok(())
    }

    /// Process every discovered tile index. No per-tile error escapes its
    /// tile unless fatal.
    async fn process_tiles(&mut self) -> Result<Phase, CrawlError> {
        let Some(selector) = self.adopted_tile_selector.clone() else {
            return Ok(Phase::CheckpointingPage);
        };
        let total = self.tile_count;
        info!("starting to scrape {total} product listings");
        for index in 0..total {
            match self.process_tile(&selector, index).await {
                Ok(()) => {}
                Err(err) if err.is_fatal() => return Err(err.into()),
                Err(err) => warn!("error processing listing {} of {total}: {err}", index + 1),
            }
        }
        Ok(Phase::CheckpointingPage)
    }

    /// One tile: re-locate by the adopted selector so the handle is fresh
    /// after earlier detail round-trips, extract, visit the detail page,
    /// and restore the listing position.
    async fn process_tile(&mut self, selector: &str, index: usize) -> SessionResult<()> {
        debug!("scraping listing {} of {}", index + 1, self.tile_count);
        let tiles = self.session.find(Scope::Page, selector).await?;
        let Some(&tile) = tiles.get(index) else {
            debug!("tile {} no longer present after re-discovery", index + 1);
            return Ok(());
        };

        let page_url = self.session.current_url().await?;
        let Some(listing) = self.listing_extractor.extract(tile, &page_url).await? else {
            info!("skipping listing {} due to missing required data", index + 1);
            return Ok(());
        };
        self.listings.push(listing.clone());

        let extracted = self
            .detail_extractor
            .extract(&listing.url, listing.product_id.as_deref(), &listing)
            .await?;
        if let Some(product) = extracted {
            if let Err(err) = self.checkpointer.save_product(&product).await {
                warn!(
                    "failed to persist product file for {}: {err}",
                    product.product_id
                );
            }
            self.details.push(product);
        }

        // Restore position so subsequent tile lookups on this page work.
        self.session.navigate(&page_url).await?;
        self.settle(self.config.timing.return_settle_ms).await;
        Ok(())
    }

    /// Full-snapshot save of the accumulated collections, then the
    /// page-limit check.
    async fn checkpoint_page(&mut self) -> Result<Phase, CrawlError> {
        self.checkpointer
            .save_page(&self.listings, &self.details)
            .await?;
        self.pages_checkpointed += 1;
        info!(
            "page {} complete: {} total listings, {} detailed products so far",
            self.state.current_page,
            self.listings.len(),
            self.details.len()
        );

        if self.state.limit_reached() {
            info!(
                "reached the maximum number of pages ({}); stopping",
                self.state.page_limit.unwrap_or_default()
            );
            return Ok(Phase::Terminated);
        }
        Ok(Phase::SeekingNextPage)
    }

    /// Find and activate the next-page control, or terminate.
    async fn seek_next_page(&mut self) -> Result<Phase, CrawlError> {
        match self.try_advance().await {
            Ok(true) => {
                self.state.advance();
                info!("navigating to page {}", self.state.current_page);
                self.settle(self.config.timing.next_page_settle_ms).await;
                Ok(Phase::Discovering)
            }
            Ok(false) => {
                info!("no more pages available");
                self.state.exhaust();
                Ok(Phase::Terminated)
            }
            Err(err) if err.is_fatal() => Err(err.into()),
            Err(err) => {
                warn!("error navigating to next page: {err}");
                self.dump_page(&format!(
                    "pagination_error_page{}.html",
                    self.state.current_page
                ))
                .await?;
                let fault = FaultContext::PaginationFailure {
                    page: self.state.current_page,
                    reason: err.to_string(),
                };
                match self.policy.decide(&fault).await {
                    RecoveryDecision::RetrySamePage => Ok(Phase::SeekingNextPage),
                    decision => {
                        if decision == RecoveryDecision::SkipToNextPage {
                            debug!("skip decision not applicable to a pagination fault; halting");
                        }
                        self.state.exhaust();
                        Ok(Phase::Terminated)
                    }
                }
            }
        }
    }

    /// Locate the first visible-and-enabled next button and activate it.
    /// A disabled class token means the control is unusable. Direct
    /// interaction is tried first, forced activation on interception or
    /// staleness.
    async fn try_advance(&self) -> SessionResult<bool> {
        self.session.scroll_to_bottom().await?;
        self.settle(self.config.timing.pagination_scroll_settle_ms)
            .await;

        let mut button = None;
        for selector in &self.config.selectors.navigation.next_button {
            let candidates =
                recover_or(self.session.find(Scope::Page, selector).await, Vec::new())?;
            for &candidate in &candidates {
                let visible = recover_or(self.session.is_visible(candidate).await, false)?;
                let enabled = recover_or(self.session.is_enabled(candidate).await, false)?;
                if visible && enabled {
                    button = Some(candidate);
                    break;
                }
            }
            if button.is_some() {
                break;
            }
        }
        let Some(button) = button else {
            return Ok(false);
        };

        let class =
            recover_or(self.session.attribute(button, "class").await, None)?.unwrap_or_default();
        if class.contains("disabled") {
            return Ok(false);
        }

        match self.session.click(button).await {
            Ok(()) => Ok(true),
            Err(err @ (SessionError::Interaction { .. } | SessionError::Stale(_))) => {
                debug!("direct activation failed ({err}); attempting forced activation");
                self.session.force_click(button).await?;
                Ok(true)
            }
            Err(err) => Err(err),
        }
    }

    /// Best-effort diagnostic page dump. Only a fatal session error
    /// propagates; a failed write is logged and swallowed.
    async fn dump_page(&self, file_name: &str) -> Result<(), CrawlError> {
        let source = recover_or(self.session.page_source().await, String::new())?;
        if source.is_empty() {
            return Ok(());
        }
        if let Err(err) = self.checkpointer.save_diagnostic(file_name, &source).await {
            warn!("could not save diagnostic dump {file_name}: {err}");
        }
        Ok(())
    }

    async fn settle(&self, ms: u64) {
        if ms > 0 {
            sleep(Duration::from_millis(ms)).await;
        }
    }
}
