//! Cyclic keyword search over the filtered dataset.
//!
//! Each submission of the same keyword advances to the next match and wraps
//! after the last one. Live keyword edits are debounced: the keyword itself
//! is stored immediately (which resets the cycle), but the match list is
//! only computed once typing pauses.

use crate::error::{GeodashError, Result};
use crate::models::{DashboardState, PointRef, SearchState, StatePatch};
use crate::store::ReactiveStore;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;

/// 1-based position shown next to the search box
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchPosition {
    pub current: usize,
    pub total: usize,
    pub is_error: bool,
}

impl SearchPosition {
    pub fn no_matches() -> Self {
        Self { current: 0, total: 0, is_error: true }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    /// Keyword was blank; search state reset
    Cleared,
    /// Keyword matched nothing, reported as `0/0`
    NoMatches(SearchPosition),
    Advanced {
        target: PointRef,
        position: SearchPosition,
    },
}

impl SearchOutcome {
    pub fn position(&self) -> Option<SearchPosition> {
        match self {
            SearchOutcome::Cleared => None,
            SearchOutcome::NoMatches(position) => Some(*position),
            SearchOutcome::Advanced { position, .. } => Some(*position),
        }
    }
}

/// Trimmed keyword, or `BlankKeyword`
pub fn parse_keyword(raw: &str) -> Result<String> {
    let keyword = raw.trim();
    if keyword.is_empty() {
        Err(GeodashError::BlankKeyword)
    } else {
        Ok(keyword.to_string())
    }
}

/// Points whose name contains `keyword` (case-sensitive), in dataset order
pub fn find_matches(filtered: &[PointRef], keyword: &str) -> Vec<PointRef> {
    filtered.iter().filter(|p| p.name.contains(keyword)).cloned().collect()
}

/// Compute the next search state for a submission of `raw_keyword`
pub fn advance(
    state: &SearchState,
    filtered: &[PointRef],
    raw_keyword: &str,
) -> (SearchState, SearchOutcome) {
    let keyword = match parse_keyword(raw_keyword) {
        Ok(keyword) => keyword,
        Err(_) => return (SearchState::reset(""), SearchOutcome::Cleared),
    };

    let current = if state.keyword == keyword {
        state.clone()
    } else {
        SearchState::reset(keyword.clone())
    };

    let matches = if current.matches.is_empty() {
        find_matches(filtered, &keyword)
    } else {
        current.matches
    };

    if matches.is_empty() {
        return (
            SearchState::reset(keyword),
            SearchOutcome::NoMatches(SearchPosition::no_matches()),
        );
    }

    let next = current.index.map_or(0, |i| (i + 1) % matches.len());
    let target = Arc::clone(&matches[next]);
    let position = SearchPosition {
        current: next + 1,
        total: matches.len(),
        is_error: false,
    };

    (
        SearchState { keyword, matches, index: Some(next) },
        SearchOutcome::Advanced { target, position },
    )
}

/// Store-backed search navigator with a debounced keyword input
pub struct SearchCycler {
    store: ReactiveStore<DashboardState>,
    debounce: Duration,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl SearchCycler {
    pub fn new(store: ReactiveStore<DashboardState>, debounce: Duration) -> Self {
        Self { store, debounce, pending: Mutex::new(None) }
    }

    /// Advance to the next match of `keyword` and store the new position
    pub fn advance(&self, keyword: &str) -> SearchOutcome {
        self.cancel_pending();
        let state = self.store.get_state();
        let (next, outcome) = advance(&state.search, &state.filtered_data, keyword);
        self.store.set_state(StatePatch::search(next));
        outcome
    }

    /// Live keyword edit. Blank input clears immediately; otherwise match
    /// computation waits until no further edit arrives within the debounce.
    pub fn input(&self, raw_keyword: &str) {
        self.cancel_pending();

        let keyword = match parse_keyword(raw_keyword) {
            Ok(keyword) => keyword,
            Err(_) => {
                self.store.set_state(StatePatch::search(SearchState::reset("")));
                return;
            }
        };

        self.store.set_state(StatePatch::search(SearchState::reset(keyword.clone())));

        let store = self.store.clone();
        let debounce = self.debounce;
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let task = handle.spawn(async move {
                    tokio::time::sleep(debounce).await;
                    fill_matches(&store, &keyword);
                });
                *self.pending.lock().unwrap_or_else(PoisonError::into_inner) = Some(task);
            }
            Err(_) => fill_matches(&store, &keyword),
        }
    }

    /// Drop a debounced match computation that has not run yet
    pub fn cancel_pending(&self) {
        if let Some(task) = self.pending.lock().unwrap_or_else(PoisonError::into_inner).take() {
            task.abort();
        }
    }
}

impl Drop for SearchCycler {
    fn drop(&mut self) {
        self.cancel_pending();
    }
}

fn fill_matches(store: &ReactiveStore<DashboardState>, keyword: &str) {
    let state = store.get_state();
    // Superseded by another edit, or the cycle already started
    if state.search.keyword != keyword || state.search.index.is_some() {
        return;
    }

    let matches = find_matches(&state.filtered_data, keyword);
    tracing::debug!(keyword, matches = matches.len(), "Search matches computed");
    store.set_state(StatePatch::search(SearchState {
        keyword: keyword.to_string(),
        matches,
        index: None,
    }));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CustomerPoint, LngLat};

    fn filtered(names: &[&str]) -> Vec<PointRef> {
        names
            .iter()
            .map(|n| Arc::new(CustomerPoint::new(*n, LngLat::new(120.0, 28.0).unwrap())))
            .collect()
    }

    #[test]
    fn test_cycle_wraps_after_last_match() {
        let data = filtered(&["Acme North", "Acme South", "Beta", "Acme East"]);
        let mut state = SearchState::default();
        let mut positions = Vec::new();

        for _ in 0..4 {
            let (next, outcome) = advance(&state, &data, "Acme");
            positions.push(outcome.position().unwrap().current);
            state = next;
        }

        assert_eq!(positions, vec![1, 2, 3, 1]);
        assert_eq!(state.matches.len(), 3);
    }

    #[test]
    fn test_no_matches_reports_error_position() {
        let data = filtered(&["Acme"]);
        let (state, outcome) = advance(&SearchState::default(), &data, "Zeta");
        assert_eq!(
            outcome,
            SearchOutcome::NoMatches(SearchPosition { current: 0, total: 0, is_error: true })
        );
        assert_eq!(state.index, None);
        assert_eq!(state.keyword, "Zeta");
    }

    #[test]
    fn test_blank_keyword_clears() {
        let data = filtered(&["Acme"]);
        let (state, outcome) = advance(&SearchState::default(), &data, "   ");
        assert_eq!(outcome, SearchOutcome::Cleared);
        assert_eq!(state, SearchState::reset(""));
        assert!(matches!(parse_keyword(" "), Err(GeodashError::BlankKeyword)));
    }

    #[test]
    fn test_keyword_change_restarts_cycle() {
        let data = filtered(&["Acme", "Acme 2", "Beta"]);
        let (state, _) = advance(&SearchState::default(), &data, "Acme");
        let (state, _) = advance(&state, &data, "Acme");
        assert_eq!(state.index, Some(1));

        let (state, outcome) = advance(&state, &data, "Beta");
        assert_eq!(state.index, Some(0));
        assert_eq!(outcome.position().unwrap().total, 1);
    }

    #[test]
    fn test_case_sensitive_match() {
        let data = filtered(&["acme", "Acme"]);
        assert_eq!(find_matches(&data, "Acme").len(), 1);
    }

    fn store_with(names: &[&str]) -> ReactiveStore<DashboardState> {
        let data = Arc::new(filtered(names));
        ReactiveStore::new(DashboardState {
            all_data: Arc::clone(&data),
            filtered_data: data,
            ..DashboardState::default()
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_input_debounces_match_computation() {
        let store = store_with(&["Acme", "Acme 2"]);
        let cycler = SearchCycler::new(store.clone(), Duration::from_millis(300));

        cycler.input("Ac");
        tokio::time::sleep(Duration::from_millis(100)).await;
        cycler.input("Acme");
        assert_eq!(store.get_state().search.keyword, "Acme");
        assert!(store.get_state().search.matches.is_empty());

        tokio::time::sleep(Duration::from_millis(299)).await;
        assert!(store.get_state().search.matches.is_empty());

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(store.get_state().search.matches.len(), 2);
        assert_eq!(store.get_state().search.index, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_blank_input_clears_immediately() {
        let store = store_with(&["Acme"]);
        let cycler = SearchCycler::new(store.clone(), Duration::from_millis(300));

        cycler.input("Acme");
        cycler.input("");
        assert_eq!(store.get_state().search, SearchState::reset(""));

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(store.get_state().search, SearchState::reset(""));
    }

    #[tokio::test(start_paused = true)]
    async fn test_advance_before_pause_wins() {
        let store = store_with(&["Acme", "Acme 2"]);
        let cycler = SearchCycler::new(store.clone(), Duration::from_millis(300));

        cycler.input("Acme");
        let outcome = cycler.advance("Acme");
        assert_eq!(outcome.position().unwrap().current, 1);

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(store.get_state().search.index, Some(0));
    }
}
