//! Sort/filter state controller
//!
//! Owns the current sort and filter criteria. Every mutation reports whether
//! it changed anything so the grid knows when to resynchronize; the
//! identifier column is silently ignored and unknown keys are rejected.

use tracing::debug;

use crate::data::query_state::{FilterState, QueryState, SortDirection, SortState};
use crate::data::record::ColumnKey;
use crate::error::GridResult;

/// Outcome of a state mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateChange {
    /// The state was mutated and a query should follow
    Changed,
    /// The call targeted the identifier column and was ignored
    Ignored,
}

impl StateChange {
    pub fn is_changed(&self) -> bool {
        matches!(self, StateChange::Changed)
    }
}

#[derive(Debug, Clone, Default)]
pub struct StateController {
    state: QueryState,
}

impl StateController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sort(&self) -> SortState {
        self.state.sort
    }

    pub fn filter(&self) -> &FilterState {
        &self.state.filter
    }

    /// Non-empty patterns, in column order
    pub fn active_filters(&self) -> Vec<(ColumnKey, String)> {
        self.state
            .filter
            .active()
            .map(|(key, pattern)| (key, pattern.to_string()))
            .collect()
    }

    /// Copy of the current criteria for the synchronizer
    pub fn snapshot(&self) -> QueryState {
        self.state.clone()
    }

    /// Sort by `column`: the active column flips direction, any other column
    /// becomes active in ascending order.
    pub fn set_sort(&mut self, column: &str) -> GridResult<StateChange> {
        let key: ColumnKey = column.parse()?;
        if key.is_identifier() {
            debug!(target: "grid", "Ignoring sort request on identifier column");
            return Ok(StateChange::Ignored);
        }

        let sort = &mut self.state.sort;
        if sort.column == key {
            sort.direction = sort.direction.flipped();
        } else {
            *sort = SortState::new(key, SortDirection::Ascending);
        }
        debug!(target: "grid", "Sort is now {}", sort);
        Ok(StateChange::Changed)
    }

    /// Replace the pattern of one column, leaving the others untouched
    pub fn set_filter(&mut self, column: &str, pattern: &str) -> GridResult<StateChange> {
        let key: ColumnKey = column.parse()?;
        if key.is_identifier() {
            debug!(target: "grid", "Ignoring filter on identifier column");
            return Ok(StateChange::Ignored);
        }

        self.state.filter.set(key, pattern.to_string());
        debug!(target: "grid", "Filter {} = {:?}", key, pattern);
        Ok(StateChange::Changed)
    }

    /// Empty every filter entry; sort stays as it is
    pub fn clear_filters(&mut self) -> StateChange {
        self.state.filter.clear();
        debug!(target: "grid", "Cleared all filters");
        StateChange::Changed
    }

    /// Back to default sort and empty filters
    pub fn reset(&mut self) -> StateChange {
        self.state = QueryState::default();
        StateChange::Changed
    }
}
