use std::sync::Arc;

use crate::{ItemId, ResultItem};

/// The ordered results of one query.
///
/// A set is never changed after creation. Clones share the same items, which
/// is what lets a cache hit hand out the very set that was fetched.
#[derive(Debug, Clone)]
pub struct ResultSet {
    query: String,
    items: Arc<[ResultItem]>,
}

impl ResultSet {
    pub fn new(query: impl Into<String>, items: Vec<ResultItem>) -> Self {
        Self {
            query: query.into(),
            items: items.into(),
        }
    }

    pub fn empty(query: impl Into<String>) -> Self {
        Self::new(query, Vec::new())
    }

    /// The query that produced these results.
    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn items(&self) -> &[ResultItem] {
        &self.items
    }

    pub fn get(&self, index: usize) -> Option<&ResultItem> {
        self.items.get(index)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ResultItem> {
        self.items.iter()
    }

    pub fn position(&self, id: &ItemId) -> Option<usize> {
        self.items.iter().position(|item| &item.id == id)
    }

    /// True if both sets share the same allocation, i.e. one is a clone of
    /// the other.
    pub fn ptr_eq(this: &Self, other: &Self) -> bool {
        Arc::ptr_eq(&this.items, &other.items)
    }
}

impl Default for ResultSet {
    fn default() -> Self {
        Self::empty("")
    }
}

impl PartialEq for ResultSet {
    fn eq(&self, other: &Self) -> bool {
        self.query == other.query && self.items == other.items
    }
}

impl Eq for ResultSet {}

impl<'a> IntoIterator for &'a ResultSet {
    type Item = &'a ResultItem;
    type IntoIter = std::slice::Iter<'a, ResultItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
