//! Sorted distinct category projection and filter selection persistence.
//!
//! # Responsibility
//! - Derive the category list from the current quote collection.
//! - Round-trip the selected category filter through the durable store.
//!
//! # Invariants
//! - `categories` is sorted, deduplicated and equals the distinct categories
//!   of the store passed to the last `recompute`.
//! - Restored selections always name an indexed category or `"all"`.

use crate::model::quote::ALL_CATEGORIES;
use crate::repo::kv_repo::{KeyValueStore, StorageResult};
use crate::repo::quote_repo::{load_selected_category, save_categories, save_selected_category};
use crate::store::quote_store::QuoteStore;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryIndex {
    categories: Vec<String>,
}

impl CategoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an index already computed from `store`.
    pub fn from_store(store: &QuoteStore) -> Self {
        let mut index = Self::new();
        index.recompute(store);
        index
    }

    /// Recomputes the sorted distinct category list.
    pub fn recompute(&mut self, store: &QuoteStore) -> &[String] {
        self.categories = store
            .all()
            .iter()
            .map(|quote| quote.category.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        &self.categories
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    pub fn contains(&self, category: &str) -> bool {
        self.categories
            .binary_search_by(|probe| probe.as_str().cmp(category))
            .is_ok()
    }

    /// Persists the filter selection; blank input is stored as `"all"`.
    pub fn persist_selection(
        &self,
        durable: &dyn KeyValueStore,
        category: &str,
    ) -> StorageResult<()> {
        let trimmed = category.trim();
        let selection = if trimmed.is_empty() {
            ALL_CATEGORIES
        } else {
            trimmed
        };
        save_selected_category(durable, selection)
    }

    /// Restores the persisted selection, falling back to `"all"` when the
    /// stored category is missing or no longer indexed.
    pub fn restore_selection(&self, durable: &dyn KeyValueStore) -> StorageResult<String> {
        let restored = match load_selected_category(durable)? {
            Some(saved) if saved == ALL_CATEGORIES || self.contains(&saved) => saved,
            _ => ALL_CATEGORIES.to_string(),
        };
        Ok(restored)
    }

    /// Writes the informational category cache.
    pub fn persist_cache(&self, durable: &dyn KeyValueStore) -> StorageResult<()> {
        save_categories(durable, &self.categories)
    }
}
