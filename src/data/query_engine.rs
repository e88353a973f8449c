use std::time::Instant;
use tracing::debug;

use crate::data::query_state::{QueryState, SortDirection};
use crate::data::record::Record;

/// Filters and orders an in-memory record set
#[derive(Debug, Clone, Copy)]
pub struct QueryEngine {
    case_insensitive: bool,
}

impl QueryEngine {
    pub fn new() -> Self {
        Self::with_case_insensitive(true)
    }

    pub fn with_case_insensitive(case_insensitive: bool) -> Self {
        Self { case_insensitive }
    }

    /// Run a query over `rows`.
    ///
    /// Every non-empty filter pattern must occur as a substring of the
    /// column's display text. Rows are sorted ascending with a stable sort and
    /// the whole result is reversed for descending order, so equal keys come
    /// out in reverse stored order there. Result rows are renumbered 0..n in
    /// their `id` field.
    pub fn execute(&self, rows: &[Record], query: &QueryState) -> Vec<Record> {
        let start = Instant::now();

        let patterns: Vec<_> = query
            .filter
            .active()
            .map(|(key, pattern)| (key, self.normalize(pattern)))
            .collect();

        let mut matched: Vec<Record> = rows
            .iter()
            .filter(|row| {
                patterns.iter().all(|(key, pattern)| {
                    self.normalize(&row.display_value(*key))
                        .contains(pattern.as_str())
                })
            })
            .cloned()
            .collect();

        let column = query.sort.column;
        matched.sort_by(|a, b| a.value(column).cmp(&b.value(column)));
        if query.sort.direction == SortDirection::Descending {
            matched.reverse();
        }

        for (index, row) in matched.iter_mut().enumerate() {
            row.id = index as i64;
        }

        debug!(
            target: "query",
            "{} of {} rows matched {} in {:?}",
            matched.len(),
            rows.len(),
            query,
            start.elapsed()
        );
        matched
    }

    fn normalize(&self, text: &str) -> String {
        if self.case_insensitive {
            text.to_uppercase()
        } else {
            text.to_string()
        }
    }
}

impl Default for QueryEngine {
    fn default() -> Self {
        Self::new()
    }
}
