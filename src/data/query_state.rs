//! Sort and filter criteria sent with every query

use std::collections::BTreeMap;
use std::fmt;

use crate::data::record::ColumnKey;

/// Sort order for columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn flipped(self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Ascending => "asc",
            SortDirection::Descending => "desc",
        }
    }
}

/// The single active sort column and its direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortState {
    pub column: ColumnKey,
    pub direction: SortDirection,
}

impl SortState {
    pub fn new(column: ColumnKey, direction: SortDirection) -> Self {
        Self { column, direction }
    }
}

impl Default for SortState {
    fn default() -> Self {
        Self::new(ColumnKey::Id, SortDirection::Ascending)
    }
}

impl fmt::Display for SortState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.column, self.direction.as_str())
    }
}

/// Substring pattern per filterable column. An empty pattern means
/// "no constraint on that column".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterState {
    patterns: BTreeMap<ColumnKey, String>,
}

impl FilterState {
    /// Pattern for a column; empty when unconstrained
    pub fn pattern(&self, key: ColumnKey) -> &str {
        self.patterns.get(&key).map(String::as_str).unwrap_or("")
    }

    /// All entries, empty ones included
    pub fn entries(&self) -> impl Iterator<Item = (ColumnKey, &str)> {
        self.patterns.iter().map(|(k, v)| (*k, v.as_str()))
    }

    /// Only the entries that constrain the result
    pub fn active(&self) -> impl Iterator<Item = (ColumnKey, &str)> {
        self.entries().filter(|(_, pattern)| !pattern.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.active().next().is_none()
    }

    pub(crate) fn set(&mut self, key: ColumnKey, pattern: String) {
        debug_assert!(!key.is_identifier());
        self.patterns.insert(key, pattern);
    }

    pub(crate) fn clear(&mut self) {
        for pattern in self.patterns.values_mut() {
            pattern.clear();
        }
    }
}

impl Default for FilterState {
    fn default() -> Self {
        Self {
            patterns: ColumnKey::filterable()
                .map(|key| (key, String::new()))
                .collect(),
        }
    }
}

/// Immutable snapshot of the criteria handed to the query gateway
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryState {
    pub sort: SortState,
    pub filter: FilterState,
}

impl fmt::Display for QueryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sort=[{}]", self.sort)?;
        for (key, pattern) in self.filter.active() {
            write!(f, " {}~{:?}", key, pattern)?;
        }
        Ok(())
    }
}
