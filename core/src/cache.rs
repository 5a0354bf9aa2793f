use std::collections::HashMap;

use protocol::ResultSet;

/// Results of earlier searches, keyed by the exact query string.
///
/// Entries are never evicted nor expire. Queries are not normalized here,
/// `"Pizza"` and `"pizza "` are different keys.
#[derive(Debug, Default)]
pub struct QueryCache {
    entries: HashMap<String, ResultSet>,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a handle to the stored set, sharing its items.
    pub fn get(&self, query: &str) -> Option<ResultSet> {
        self.entries.get(query).cloned()
    }

    /// Stores `results` for `query`, silently replacing an older entry.
    pub fn put(&mut self, query: impl Into<String>, results: ResultSet) {
        self.entries.insert(query.into(), results);
    }

    pub fn contains(&self, query: &str) -> bool {
        self.entries.contains_key(query)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
