//! Large tables that must always be filtered.

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Tables in the ticketing schema whose row counts make an unfiltered scan unacceptable.
pub const DEFAULT_PROTECTED_TABLES: &[&str] = &[
    "master_ticketing_groups",
    "master_events",
    "ticket_listings",
    "ticket_price_history",
    "search_query_log",
];

/// A fixed set of table identifiers that require a filtering predicate.
///
/// Names are stored lower-cased together with a whole-identifier matcher, so
/// `master_events` matches `FROM Master_Events e` but not `master_events_archive`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct ProtectedTableSet {
    tables: Vec<(String, Regex)>,
}

impl ProtectedTableSet {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut tables: Vec<(String, Regex)> = Vec::new();
        for name in names {
            let name = name.as_ref().trim().to_lowercase();
            if name.is_empty() || tables.iter().any(|(existing, _)| *existing == name) {
                continue;
            }
            // An escaped literal between word boundaries is always a valid pattern.
            if let Ok(pattern) = Regex::new(&format!(r"\b{}\b", regex::escape(&name))) {
                tables.push((name, pattern));
            }
        }
        Self { tables }
    }

    /// Parse a comma-separated list such as `"a, b ,c"`.
    pub fn parse(list: &str) -> Self {
        Self::new(list.split(','))
    }

    /// Protected tables named in `lowered`, in set order.
    ///
    /// `lowered` must already be lower-cased.
    pub fn matches<'a>(&'a self, lowered: &str) -> Vec<&'a str> {
        self.tables
            .iter()
            .filter(|(_, pattern)| pattern.is_match(lowered))
            .map(|(name, _)| name.as_str())
            .collect()
    }

    pub fn contains(&self, table: &str) -> bool {
        let table = table.to_lowercase();
        self.tables.iter().any(|(name, _)| *name == table)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tables.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

impl Default for ProtectedTableSet {
    fn default() -> Self {
        Self::new(DEFAULT_PROTECTED_TABLES.iter().copied())
    }
}

impl From<Vec<String>> for ProtectedTableSet {
    fn from(names: Vec<String>) -> Self {
        Self::new(names)
    }
}

impl From<ProtectedTableSet> for Vec<String> {
    fn from(set: ProtectedTableSet) -> Self {
        set.tables.into_iter().map(|(name, _)| name).collect()
    }
}
