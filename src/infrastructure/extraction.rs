//! DOM extraction infrastructure.
//!
//! Cascade-based field resolution plus the listing and detail extractors
//! built on it, with the required-field validation gate.

pub mod config;
pub mod detail;
pub mod listing;
pub mod resolver;
pub mod validator;

// Re-export public types
pub use config::{DetailSelectors, ListingSelectors, NavigationSelectors, SelectorConfig};
pub use detail::DetailExtractor;
pub use listing::ListingExtractor;
pub use resolver::{FieldResolver, SelectorCascade, SelectorStrategy, ValueSource};
pub use validator::ValidationError;
