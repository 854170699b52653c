//! Infrastructure layer for browser access, extraction, and persistence
//!
//! This module provides the browser session port and its chromiumoxide
//! adapter, the cascade-based extraction components, checkpointing,
//! configuration, and logging.

pub mod browser;
pub mod checkpoint;
pub mod config;
pub mod extraction;
pub mod logging;
pub mod session;

// Re-export commonly used items
pub use browser::ChromiumSession;
pub use checkpoint::{CheckpointError, Checkpointer};
pub use config::{resolve_category, Category, ScraperConfig, TimingConfig};
pub use extraction::{
    DetailExtractor, FieldResolver, ListingExtractor, SelectorCascade, SelectorConfig,
};
pub use logging::init_logging;
pub use session::{DomSession, ElementHandle, Scope, SessionError, SessionResult};
