//! Typed access to quote state stored under well-known keys.
//!
//! # Responsibility
//! - Encode/decode quotes, category cache, selection and last-viewed values.
//! - Keep storage key names in one place.
//!
//! # Invariants
//! - Missing keys decode to `None`; malformed values are reported, not masked.

use crate::model::quote::{LastViewed, Quote};
use crate::repo::kv_repo::{KeyValueStore, StorageError, StorageResult};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Durable key holding the JSON array of quotes.
pub const QUOTES_KEY: &str = "Quotes";
/// Durable key holding the derived category list (informational).
pub const CATEGORIES_KEY: &str = "Categories";
/// Durable key holding the last selected category filter.
pub const SELECTED_CATEGORY_KEY: &str = "selectedCategory";
/// Session key holding the last viewed quote.
pub const LAST_VIEWED_KEY: &str = "lastViewedQuote";

pub fn load_quotes(store: &dyn KeyValueStore) -> StorageResult<Option<Vec<Quote>>> {
    load_json(store, QUOTES_KEY)
}

pub fn save_quotes(store: &dyn KeyValueStore, quotes: &[Quote]) -> StorageResult<()> {
    save_json(store, QUOTES_KEY, &quotes)
}

pub fn save_categories(store: &dyn KeyValueStore, categories: &[String]) -> StorageResult<()> {
    save_json(store, CATEGORIES_KEY, &categories)
}

pub fn load_categories(store: &dyn KeyValueStore) -> StorageResult<Option<Vec<String>>> {
    load_json(store, CATEGORIES_KEY)
}

pub fn load_selected_category(store: &dyn KeyValueStore) -> StorageResult<Option<String>> {
    store.get(SELECTED_CATEGORY_KEY)
}

pub fn save_selected_category(store: &dyn KeyValueStore, category: &str) -> StorageResult<()> {
    store.set(SELECTED_CATEGORY_KEY, category)
}

pub fn load_last_viewed(store: &dyn KeyValueStore) -> StorageResult<Option<LastViewed>> {
    load_json(store, LAST_VIEWED_KEY)
}

pub fn save_last_viewed(store: &dyn KeyValueStore, viewed: &LastViewed) -> StorageResult<()> {
    save_json(store, LAST_VIEWED_KEY, viewed)
}

fn load_json<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> StorageResult<Option<T>> {
    match store.get(key)? {
        Some(raw) => serde_json::from_str(&raw)
            .map(Some)
            .map_err(|err| StorageError::InvalidData {
                key: key.to_string(),
                message: err.to_string(),
            }),
        None => Ok(None),
    }
}

fn save_json<T: Serialize + ?Sized>(
    store: &dyn KeyValueStore,
    key: &str,
    value: &T,
) -> StorageResult<()> {
    let encoded = serde_json::to_string(value).map_err(|err| StorageError::Encode {
        key: key.to_string(),
        message: err.to_string(),
    })?;
    store.set(key, &encoded)
}
