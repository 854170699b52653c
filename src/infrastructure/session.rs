//! Browser session port consumed by the extraction engine.
//!
//! Everything the core needs from a live page goes through `DomSession`:
//! scoped element lookup, text/attribute reads, navigation, scrolling,
//! bounded waits, and the two activation strategies. Implementations are
//! the chromiumoxide adapter and the scripted double in `testing`.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// Opaque handle to a DOM element in the current document.
///
/// Handles are only meaningful until the session navigates; using one
/// afterwards yields `SessionError::Stale`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementHandle(pub u64);

/// Query scope: the whole page or a previously located element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Page,
    Element(ElementHandle),
}

impl From<ElementHandle> for Scope {
    fn from(handle: ElementHandle) -> Self {
        Self::Element(handle)
    }
}

/// Session-level failures, split into recoverable faults (expected under
/// unknown markup, contained at the strategy or tile boundary) and the
/// one fatal case where the underlying browser session is gone.
#[derive(Error, Debug, Clone)]
pub enum SessionError {
    #[error("no element matched selector '{selector}'")]
    NotFound { selector: String },

    #[error("stale element handle {0:?}")]
    Stale(ElementHandle),

    #[error("interaction failed: {reason}")]
    Interaction { reason: String },

    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("browser protocol error: {0}")]
    Protocol(String),

    #[error("browser session invalidated: {0}")]
    Invalidated(String),
}

impl SessionError {
    /// Fatal errors abort the whole run; everything else stays inside the
    /// failing strategy, field, or tile.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Invalidated(_))
    }
}

pub type SessionResult<T> = Result<T, SessionError>;

/// Collapse a recoverable failure into a default value.
///
/// Fatal errors pass through untouched so no caller can accidentally
/// swallow a dead session.
pub fn recover_or<T>(result: SessionResult<T>, default: T) -> SessionResult<T> {
    match result {
        Ok(value) => Ok(value),
        Err(err) if err.is_fatal() => Err(err),
        Err(_) => Ok(default),
    }
}

/// Capability the extraction core consumes for all DOM access.
///
/// All operations are strictly sequential; the session is an exclusively
/// owned resource with no concurrent access.
#[async_trait]
pub trait DomSession: Send + Sync {
    /// Locate elements matching a CSS selector within the given scope.
    /// An empty result is not an error.
    async fn find(&self, scope: Scope, selector: &str) -> SessionResult<Vec<ElementHandle>>;

    /// Visible text content of an element.
    async fn text(&self, element: ElementHandle) -> SessionResult<String>;

    /// Attribute value, `None` when the attribute is absent.
    async fn attribute(&self, element: ElementHandle, name: &str)
        -> SessionResult<Option<String>>;

    async fn navigate(&self, url: &str) -> SessionResult<()>;

    async fn current_url(&self) -> SessionResult<String>;

    async fn scroll_by(&self, dx: i64, dy: i64) -> SessionResult<()>;

    async fn scroll_to_bottom(&self) -> SessionResult<()>;

    /// Wait up to `timeout` for a selector to match; returns whether it did.
    async fn wait_for(&self, selector: &str, timeout: Duration) -> SessionResult<bool>;

    async fn is_visible(&self, element: ElementHandle) -> SessionResult<bool>;

    async fn is_enabled(&self, element: ElementHandle) -> SessionResult<bool>;

    /// Direct activation, as a user would click.
    async fn click(&self, element: ElementHandle) -> SessionResult<()>;

    /// Forced activation for intercepted or stale-prone controls.
    async fn force_click(&self, element: ElementHandle) -> SessionResult<()>;

    /// Raw markup of the current page, for diagnostic dumps.
    async fn page_source(&self) -> SessionResult<String>;
}
