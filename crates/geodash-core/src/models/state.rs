//! Dashboard state held by the reactive store.

use crate::models::criteria::FilterCriteria;
use crate::models::customer::PointRef;
use crate::store::Mergeable;
use std::sync::Arc;

/// Cyclic search position over the filtered dataset.
///
/// `index` is `None` or a valid position in `matches`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchState {
    pub keyword: String,
    pub matches: Vec<PointRef>,
    pub index: Option<usize>,
}

impl SearchState {
    /// Fresh state for a keyword: no matches computed, nothing selected
    pub fn reset(keyword: impl Into<String>) -> Self {
        Self {
            keyword: keyword.into(),
            matches: Vec::new(),
            index: None,
        }
    }

    pub fn active(&self) -> Option<&PointRef> {
        self.index.and_then(|i| self.matches.get(i))
    }
}

/// Snapshot published by the store
#[derive(Debug, Clone, Default)]
pub struct DashboardState {
    pub all_data: Arc<Vec<PointRef>>,
    pub filters: FilterCriteria,
    pub filtered_data: Arc<Vec<PointRef>>,
    pub search: SearchState,
}

/// Partial update; `None` fields are left untouched
#[derive(Debug, Clone, Default)]
pub struct StatePatch {
    pub all_data: Option<Arc<Vec<PointRef>>>,
    pub filters: Option<FilterCriteria>,
    pub filtered_data: Option<Arc<Vec<PointRef>>>,
    pub search: Option<SearchState>,
}

impl StatePatch {
    pub fn search(search: SearchState) -> Self {
        Self { search: Some(search), ..Self::default() }
    }

    pub fn filtered(filtered_data: Vec<PointRef>) -> Self {
        Self { filtered_data: Some(Arc::new(filtered_data)), ..Self::default() }
    }
}

impl Mergeable for DashboardState {
    type Patch = StatePatch;

    fn merge(&mut self, patch: StatePatch) {
        if let Some(all_data) = patch.all_data {
            self.all_data = all_data;
        }
        if let Some(filters) = patch.filters {
            self.filters = filters;
        }
        if let Some(filtered_data) = patch.filtered_data {
            self.filtered_data = filtered_data;
        }
        if let Some(search) = patch.search {
            self.search = search;
        }
    }
}
