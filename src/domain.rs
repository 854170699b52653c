//! Domain module - Core business logic and entities
//!
//! This module contains the product records, pagination state, and the
//! recovery-policy seam that the traversal engine is built around.
//!
//! Modern Rust module organization (Rust 2018+ style):
//! - Each module is its own file in the domain/ directory
//! - Public exports are defined here for convenience

pub mod pagination;
pub mod product;
pub mod recovery;

// Re-export commonly used items for convenience
pub use pagination::PaginationState;
pub use product::{extract_product_id, DetailedProduct, ListingRecord, RawProductData};
pub use recovery::{FaultContext, HaltPolicy, RecoveryDecision, RecoveryPolicy, RetryBudgetPolicy};
