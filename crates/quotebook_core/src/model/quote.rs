//! Quote domain model.
//!
//! # Responsibility
//! - Define the canonical record shared by store, codec and sync paths.
//! - Normalize and validate user-provided text and category values.
//!
//! # Invariants
//! - `text` and `category` are non-blank after `Quote::validate()` succeeds.
//! - `updated_at` never decreases for one record; it breaks upsert ties.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::{SystemTime, UNIX_EPOCH};

/// Category assigned when input carries none.
pub const UNCATEGORIZED: &str = "Uncategorized";

/// Pseudo-category meaning "no filter applied".
pub const ALL_CATEGORIES: &str = "all";

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid ws regex"));

/// Opaque quote identifier.
///
/// Locally created quotes get sequential ids; imported or remote records may
/// carry string keys. Serialized untagged so JSON keeps plain numbers/strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QuoteId {
    Seq(u64),
    Key(String),
}

impl QuoteId {
    /// Returns the sequential value, if this id is numeric.
    pub fn as_seq(&self) -> Option<u64> {
        match self {
            Self::Seq(value) => Some(*value),
            Self::Key(_) => None,
        }
    }

    /// False for `Seq(u64::MAX)`, which leaves no room for a following id.
    pub fn is_assignable(&self) -> bool {
        self.as_seq() != Some(u64::MAX)
    }
}

impl Display for QuoteId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Seq(value) => write!(f, "{value}"),
            Self::Key(value) => write!(f, "{value}"),
        }
    }
}

impl From<u64> for QuoteId {
    fn from(value: u64) -> Self {
        Self::Seq(value)
    }
}

impl From<&str> for QuoteId {
    fn from(value: &str) -> Self {
        Self::Key(value.to_string())
    }
}

/// Validation failures for quote records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuoteValidationError {
    EmptyText,
    EmptyCategory,
}

impl Display for QuoteValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyText => write!(f, "quote text cannot be empty"),
            Self::EmptyCategory => write!(f, "quote category cannot be empty"),
        }
    }
}

impl Error for QuoteValidationError {}

/// Canonical quote record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub id: QuoteId,
    pub text: String,
    pub category: String,
    /// Unix epoch milliseconds. Older payloads without it load as `0`.
    #[serde(default)]
    pub updated_at: i64,
}

impl Quote {
    /// Creates a quote with normalized text/category.
    ///
    /// A blank category falls back to [`UNCATEGORIZED`]. Callers still need
    /// `validate()` to reject blank text.
    pub fn new(
        id: impl Into<QuoteId>,
        text: impl AsRef<str>,
        category: impl AsRef<str>,
        updated_at: i64,
    ) -> Self {
        Self {
            id: id.into(),
            text: normalize_text(text.as_ref()),
            category: normalize_category(category.as_ref()),
            updated_at,
        }
    }

    /// Checks record-level invariants.
    pub fn validate(&self) -> Result<(), QuoteValidationError> {
        if self.text.trim().is_empty() {
            return Err(QuoteValidationError::EmptyText);
        }
        if self.category.trim().is_empty() {
            return Err(QuoteValidationError::EmptyCategory);
        }
        Ok(())
    }

    /// Returns whether text and category match, ignoring id and timestamp.
    pub fn same_content(&self, other: &Quote) -> bool {
        self.text == other.text && self.category == other.category
    }

    /// Returns whether this quote passes a category filter.
    pub fn matches_category(&self, category: &str) -> bool {
        category == ALL_CATEGORIES || self.category == category
    }
}

/// Session-scoped record of the last quote shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastViewed {
    pub id: QuoteId,
    pub text: String,
    pub category: String,
    /// Unix epoch milliseconds when the quote was shown.
    pub at: i64,
}

impl LastViewed {
    pub fn from_quote(quote: &Quote, at: i64) -> Self {
        Self {
            id: quote.id.clone(),
            text: quote.text.clone(),
            category: quote.category.clone(),
            at,
        }
    }
}

/// Trims and collapses internal whitespace runs to one space.
pub fn normalize_text(value: &str) -> String {
    WHITESPACE_RE.replace_all(value.trim(), " ").into_owned()
}

/// Normalizes a category, mapping blank input to [`UNCATEGORIZED`].
pub fn normalize_category(value: &str) -> String {
    let normalized = normalize_text(value);
    if normalized.is_empty() {
        UNCATEGORIZED.to_string()
    } else {
        normalized
    }
}

/// Current wall-clock time in Unix epoch milliseconds.
pub fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}
