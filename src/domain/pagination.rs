//! Pagination state owned by the traversal loop.

use serde::{Deserialize, Serialize};

/// Where the traversal currently stands in the paginated result set.
///
/// Traversal terminates when `has_next` is false or `current_page` has
/// reached `page_limit`. The limit check leaves `has_next` untouched, so
/// a limit-terminated run still reports whether more pages existed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PaginationState {
    pub current_page: u32,
    pub has_next: bool,
    pub page_limit: Option<u32>,
}

impl PaginationState {
    /// Fresh state positioned on the first page.
    pub fn new(page_limit: Option<u32>) -> Self {
        Self {
            current_page: 1,
            has_next: true,
            page_limit,
        }
    }

    /// True once the configured page ceiling has been reached.
    pub fn limit_reached(&self) -> bool {
        self.page_limit
            .is_some_and(|limit| self.current_page >= limit)
    }

    /// Record a successful advance to the next page.
    pub fn advance(&mut self) {
        self.current_page += 1;
    }

    /// Record that no further page is reachable.
    pub fn exhaust(&mut self) {
        self.has_next = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unbounded_state_never_reaches_limit() {
        let mut state = PaginationState::new(None);
        for _ in 0..1000 {
            state.advance();
        }
        assert!(!state.limit_reached());
        assert!(state.has_next);
    }

    #[test]
    fn limit_reached_counts_the_current_page() {
        let mut state = PaginationState::new(Some(2));
        assert!(!state.limit_reached());
        state.advance();
        assert!(state.limit_reached());
    }

    #[test]
    fn limit_of_one_stops_on_the_first_page() {
        let state = PaginationState::new(Some(1));
        assert!(state.limit_reached());
    }

    #[test]
    fn exhaust_clears_has_next_only() {
        let mut state = PaginationState::new(Some(5));
        state.exhaust();
        assert!(!state.has_next);
        assert_eq!(state.current_page, 1);
    }
}
