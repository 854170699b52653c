//! Recovery policy seam replacing interactive operator prompts.
//!
//! When traversal hits a recoverable fault (tile-discovery stall or a
//! failed pagination action) it asks the policy what to do instead of
//! blocking on an operator. Unattended runs plug in one of the
//! non-interactive defaults below.

use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;

/// Context handed to the policy when traversal needs a decision.
#[derive(Debug, Clone)]
pub enum FaultContext {
    /// No tile-container strategy matched the current page markup.
    TileDiscoveryStall { page: u32 },
    /// The next-page control was missing, not actionable, or activation failed.
    PaginationFailure { page: u32, reason: String },
}

impl FaultContext {
    pub fn page(&self) -> u32 {
        match self {
            Self::TileDiscoveryStall { page } | Self::PaginationFailure { page, .. } => *page,
        }
    }
}

/// What the traversal should do about a recoverable fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryDecision {
    /// Clean up and terminate the run.
    Halt,
    /// Re-attempt the failed step on the same page index.
    RetrySamePage,
    /// Give up on the current page and seek the next one.
    SkipToNextPage,
}

/// Decides how traversal reacts to stalls and pagination faults.
#[async_trait]
pub trait RecoveryPolicy: Send + Sync {
    async fn decide(&self, fault: &FaultContext) -> RecoveryDecision;
}

/// Always halts. The default for unattended operation.
#[derive(Debug, Default)]
pub struct HaltPolicy;

#[async_trait]
impl RecoveryPolicy for HaltPolicy {
    async fn decide(&self, _fault: &FaultContext) -> RecoveryDecision {
        RecoveryDecision::Halt
    }
}

/// Retries the same page until a shared budget runs out, then halts.
#[derive(Debug)]
pub struct RetryBudgetPolicy {
    budget: u32,
    used: AtomicU32,
}

impl RetryBudgetPolicy {
    pub fn new(budget: u32) -> Self {
        Self {
            budget,
            used: AtomicU32::new(0),
        }
    }
}

#[async_trait]
impl RecoveryPolicy for RetryBudgetPolicy {
    async fn decide(&self, _fault: &FaultContext) -> RecoveryDecision {
        if self.used.fetch_add(1, Ordering::SeqCst) < self.budget {
            RecoveryDecision::RetrySamePage
        } else {
            RecoveryDecision::Halt
        }
    }
}
