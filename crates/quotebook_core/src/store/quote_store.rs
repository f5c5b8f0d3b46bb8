//! Ordered in-memory quote collection.
//!
//! # Responsibility
//! - Provide add/read/filter/replace/upsert over one owned `Vec<Quote>`.
//! - Allocate fresh sequential ids.
//!
//! # Invariants
//! - `quotes` never holds two records with the same id.
//! - `replace_all` validates the whole batch before swapping it in, so a
//!   rejected batch leaves the store untouched.
//! - Upsert is last-writer-wins on `updated_at` (strictly greater).

use crate::model::quote::{now_epoch_ms, Quote, QuoteId, QuoteValidationError};
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Errors for batch replacement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplaceError {
    Invalid {
        id: QuoteId,
        source: QuoteValidationError,
    },
    DuplicateId(QuoteId),
}

impl Display for ReplaceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Invalid { id, source } => write!(f, "invalid quote {id}: {source}"),
            Self::DuplicateId(id) => write!(f, "duplicate quote id in batch: {id}"),
        }
    }
}

impl Error for ReplaceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Invalid { source, .. } => Some(source),
            Self::DuplicateId(_) => None,
        }
    }
}

/// Errors for adding one quote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddError {
    Invalid(QuoteValidationError),
    /// The largest stored sequential id has no successor.
    IdsExhausted,
}

impl Display for AddError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Invalid(err) => write!(f, "{err}"),
            Self::IdsExhausted => write!(f, "no sequential quote id left to assign"),
        }
    }
}

impl Error for AddError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Invalid(err) => Some(err),
            Self::IdsExhausted => None,
        }
    }
}

impl From<QuoteValidationError> for AddError {
    fn from(value: QuoteValidationError) -> Self {
        Self::Invalid(value)
    }
}

/// Result of an upsert call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
    /// Stored record is as new or newer; nothing changed.
    Ignored,
}

/// Ordered quote collection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuoteStore {
    quotes: Vec<Quote>,
}

impl QuoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store from a persisted or seeded batch.
    pub fn from_quotes(quotes: Vec<Quote>) -> Result<Self, ReplaceError> {
        let mut store = Self::new();
        store.replace_all(quotes)?;
        Ok(store)
    }

    /// Adds a quote with a fresh id and `updated_at = now`.
    pub fn add(
        &mut self,
        text: impl AsRef<str>,
        category: impl AsRef<str>,
    ) -> Result<Quote, AddError> {
        let id = self.next_id().ok_or(AddError::IdsExhausted)?;
        let quote = Quote::new(id, text, category, now_epoch_ms());
        quote.validate()?;
        self.quotes.push(quote.clone());
        Ok(quote)
    }

    pub fn all(&self) -> &[Quote] {
        &self.quotes
    }

    /// Returns quotes in `category`, or every quote for the `"all"` sentinel.
    pub fn by_category(&self, category: &str) -> Vec<Quote> {
        self.quotes
            .iter()
            .filter(|quote| quote.matches_category(category))
            .cloned()
            .collect()
    }

    pub fn get(&self, id: &QuoteId) -> Option<&Quote> {
        self.quotes.iter().find(|quote| &quote.id == id)
    }

    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }

    /// Next sequential id: one past the largest numeric id, starting at 1.
    ///
    /// `None` once no assignable id follows the largest one.
    pub fn next_id(&self) -> Option<QuoteId> {
        next_seq_after(self.quotes.iter().map(|quote| &quote.id)).map(QuoteId::Seq)
    }

    /// Swaps the entire collection in one assignment.
    pub fn replace_all(&mut self, quotes: Vec<Quote>) -> Result<(), ReplaceError> {
        let mut seen = HashSet::with_capacity(quotes.len());
        for quote in &quotes {
            quote.validate().map_err(|source| ReplaceError::Invalid {
                id: quote.id.clone(),
                source,
            })?;
            if !seen.insert(&quote.id) {
                return Err(ReplaceError::DuplicateId(quote.id.clone()));
            }
        }
        drop(seen);
        self.quotes = quotes;
        Ok(())
    }

    /// Appends a validated batch whose ids are already unique against the store.
    pub fn extend(&mut self, quotes: Vec<Quote>) -> Result<(), ReplaceError> {
        let mut combined = self.quotes.clone();
        combined.extend(quotes);
        self.replace_all(combined)
    }

    /// Inserts or updates one quote by id.
    pub fn upsert(&mut self, quote: Quote) -> Result<UpsertOutcome, QuoteValidationError> {
        quote.validate()?;
        match self.quotes.iter_mut().find(|stored| stored.id == quote.id) {
            Some(stored) if quote.updated_at > stored.updated_at => {
                *stored = quote;
                Ok(UpsertOutcome::Updated)
            }
            Some(_) => Ok(UpsertOutcome::Ignored),
            None => {
                self.quotes.push(quote);
                Ok(UpsertOutcome::Inserted)
            }
        }
    }

    /// Picks one quote uniformly among those matching `category`.
    ///
    /// Returns `None` when nothing matches.
    pub fn random_quote<R: Rng + ?Sized>(&self, category: &str, rng: &mut R) -> Option<Quote> {
        let candidates: Vec<&Quote> = self
            .quotes
            .iter()
            .filter(|quote| quote.matches_category(category))
            .collect();
        candidates.choose(rng).map(|quote| (*quote).clone())
    }
}

/// Returns one past the largest sequential id among `ids`, or 1.
///
/// `None` when that successor would overflow or land on `u64::MAX`.
pub fn next_seq_after<'a>(ids: impl Iterator<Item = &'a QuoteId>) -> Option<u64> {
    match ids.filter_map(QuoteId::as_seq).max() {
        Some(max) => max.checked_add(1).filter(|next| *next < u64::MAX),
        None => Some(1),
    }
}
