//! dibscraper - Resilient 1stDibs Catalog Scraper
//!
//! Extracts structured product records from paginated catalog pages
//! rendered by a JavaScript-heavy front end, resolving each logical
//! field through ordered selector cascades so unpredictable markup
//! degrades extraction gracefully instead of breaking it.

// Module declarations
pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod testing;

// Re-export the engine surface for binary and integration-test use
pub use application::{CrawlError, PageTraversal, TraversalOutcome};
pub use domain::{DetailedProduct, ListingRecord, PaginationState};
pub use infrastructure::{Checkpointer, ChromiumSession, DomSession, ScraperConfig};
