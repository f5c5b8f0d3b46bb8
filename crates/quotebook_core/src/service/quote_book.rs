//! Quote book use-case service.
//!
//! # Responsibility
//! - Own the quote store, category index and both key-value stores.
//! - Apply mutations with persistence and category re-index side effects.
//! - Commit sync resolutions produced by the reconciler.
//!
//! # Invariants
//! - After any successful mutation, durable `Quotes` equals `quotes()` and
//!   `categories()` equals the distinct categories of `quotes()`.
//! - A mutation whose durable write fails is rolled back in memory.

use crate::codec::import_export::{export_json, import_json, CodecError, ImportReport};
use crate::category::category_index::CategoryIndex;
use crate::model::quote::{now_epoch_ms, LastViewed, Quote, QuoteValidationError};
use crate::repo::kv_repo::{KeyValueStore, SqliteKeyValueStore, StorageError};
use crate::repo::quote_repo::{load_last_viewed, load_quotes, save_last_viewed, save_quotes};
use crate::store::quote_store::{AddError, QuoteStore, ReplaceError, UpsertOutcome};
use crate::sync::reconciler::{ResolutionStrategy, Snapshot, SyncError, SyncOutcome, SyncReconciler};
use log::{error, info, warn};
use rand::Rng;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Quote book shared between callers and the sync scheduler.
pub type SharedQuoteBook = Arc<Mutex<QuoteBook>>;

/// Boxed key-value collaborator accepted by the quote book.
pub type BoxedStore = Box<dyn KeyValueStore + Send>;

/// Service error for quote book use-cases.
#[derive(Debug)]
pub enum QuoteBookError {
    Validation(QuoteValidationError),
    /// No sequential id is left for a new quote.
    IdsExhausted,
    Replace(ReplaceError),
    Codec(CodecError),
    Storage(StorageError),
    Sync(SyncError),
}

impl Display for QuoteBookError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::IdsExhausted => write!(f, "{}", AddError::IdsExhausted),
            Self::Replace(err) => write!(f, "{err}"),
            Self::Codec(err) => write!(f, "{err}"),
            Self::Storage(err) => write!(f, "{err}"),
            Self::Sync(err) => write!(f, "{err}"),
        }
    }
}

impl Error for QuoteBookError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::IdsExhausted => None,
            Self::Replace(err) => Some(err),
            Self::Codec(err) => Some(err),
            Self::Storage(err) => Some(err),
            Self::Sync(err) => Some(err),
        }
    }
}

impl From<QuoteValidationError> for QuoteBookError {
    fn from(value: QuoteValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<AddError> for QuoteBookError {
    fn from(value: AddError) -> Self {
        match value {
            AddError::Invalid(err) => Self::Validation(err),
            AddError::IdsExhausted => Self::IdsExhausted,
        }
    }
}

impl From<ReplaceError> for QuoteBookError {
    fn from(value: ReplaceError) -> Self {
        Self::Replace(value)
    }
}

impl From<CodecError> for QuoteBookError {
    fn from(value: CodecError) -> Self {
        Self::Codec(value)
    }
}

impl From<StorageError> for QuoteBookError {
    fn from(value: StorageError) -> Self {
        Self::Storage(value)
    }
}

impl From<SyncError> for QuoteBookError {
    fn from(value: SyncError) -> Self {
        Self::Sync(value)
    }
}

pub type QuoteBookResult<T> = Result<T, QuoteBookError>;

/// Owned quote state plus its persistence collaborators.
pub struct QuoteBook {
    store: QuoteStore,
    categories: CategoryIndex,
    durable: BoxedStore,
    session: BoxedStore,
}

impl QuoteBook {
    /// Loads quotes from `durable`, seeding defaults when none are stored.
    pub fn open(durable: BoxedStore, session: BoxedStore) -> QuoteBookResult<Self> {
        let (quotes, seeded) = match load_quotes(&*durable)? {
            Some(quotes) => (quotes, false),
            None => (default_quotes(now_epoch_ms()), true),
        };
        let store = QuoteStore::from_quotes(quotes)?;
        let categories = CategoryIndex::from_store(&store);
        let book = Self {
            store,
            categories,
            durable,
            session,
        };
        if seeded {
            book.persist()?;
        }

        info!(
            "event=quotebook_open module=service status=ok quotes={} categories={} seeded={}",
            book.store.len(),
            book.categories.categories().len(),
            seeded
        );
        Ok(book)
    }

    /// Opens a book whose durable and session stores are both in memory.
    pub fn open_in_memory() -> QuoteBookResult<Self> {
        Self::open(
            Box::new(SqliteKeyValueStore::in_memory()?),
            Box::new(SqliteKeyValueStore::in_memory()?),
        )
    }

    pub fn into_shared(self) -> SharedQuoteBook {
        Arc::new(Mutex::new(self))
    }

    pub fn store(&self) -> &QuoteStore {
        &self.store
    }

    pub fn quotes(&self) -> &[Quote] {
        self.store.all()
    }

    /// Quotes in `category`; `"all"` returns every quote in order.
    pub fn quotes_in(&self, category: &str) -> Vec<Quote> {
        self.store.by_category(category)
    }

    pub fn categories(&self) -> &[String] {
        self.categories.categories()
    }

    /// Adds one quote.
    ///
    /// # Errors
    /// - `QuoteBookError::Validation` for blank text; nothing is stored.
    pub fn add_quote(
        &mut self,
        text: impl AsRef<str>,
        category: impl AsRef<str>,
    ) -> QuoteBookResult<Quote> {
        let quote = self.apply("add", |store| Ok(store.add(text, category)?))?;
        info!(
            "event=quote_add module=service status=ok id={} total={}",
            quote.id,
            self.store.len()
        );
        Ok(quote)
    }

    /// Inserts or last-writer-wins updates one quote by id.
    pub fn upsert_quote(&mut self, quote: Quote) -> QuoteBookResult<UpsertOutcome> {
        self.apply("upsert", |store| Ok(store.upsert(quote)?))
    }

    /// Replaces the whole collection.
    pub fn replace_all(&mut self, quotes: Vec<Quote>) -> QuoteBookResult<()> {
        self.apply("replace_all", |store| Ok(store.replace_all(quotes)?))
    }

    /// Appends quotes parsed from a JSON payload.
    ///
    /// # Errors
    /// - `QuoteBookError::Codec` when the payload is not a JSON array; the
    ///   store is unchanged.
    pub fn import_json(&mut self, payload: &str) -> QuoteBookResult<ImportReport> {
        let report = import_json(payload, &self.store, now_epoch_ms())?;
        let batch = report.imported.clone();
        self.apply("import", |store| Ok(store.extend(batch)?))?;
        info!(
            "event=quotes_import module=service status=ok imported={} skipped={} total={}",
            report.imported_count(),
            report.skipped,
            self.store.len()
        );
        Ok(report)
    }

    /// Pretty-printed JSON export of every quote in store order.
    pub fn export_json(&self) -> QuoteBookResult<String> {
        Ok(export_json(self.store.all())?)
    }

    /// Persists the filter selection and returns the filtered quotes.
    pub fn select_category(&self, category: &str) -> QuoteBookResult<Vec<Quote>> {
        self.categories
            .persist_selection(&*self.durable, category)?;
        Ok(self.store.by_category(category.trim()))
    }

    /// Restored filter selection, or `"all"` when it no longer applies.
    pub fn restore_selection(&self) -> QuoteBookResult<String> {
        Ok(self.categories.restore_selection(&*self.durable)?)
    }

    /// Picks a random quote in `category` and records it as last viewed.
    pub fn show_random_quote<R: Rng + ?Sized>(
        &self,
        category: &str,
        rng: &mut R,
    ) -> QuoteBookResult<Option<Quote>> {
        let picked = self.store.random_quote(category, rng);
        if let Some(quote) = &picked {
            save_last_viewed(
                &*self.session,
                &LastViewed::from_quote(quote, now_epoch_ms()),
            )?;
        }
        Ok(picked)
    }

    pub fn last_viewed(&self) -> QuoteBookResult<Option<LastViewed>> {
        Ok(load_last_viewed(&*self.session)?)
    }

    /// Runs one check cycle against current quotes.
    ///
    /// Holds `&self` for the whole fetch; shared books should use
    /// `sync_cycle::run_sync_cycle` instead.
    pub fn check_remote(&self, reconciler: &SyncReconciler) -> QuoteBookResult<SyncOutcome> {
        Ok(reconciler.check(self.store.all())?)
    }

    /// Resolves the reconciler's pending remote snapshot and commits it.
    ///
    /// # Errors
    /// - `SyncError::NothingPending` when no conflict is waiting.
    pub fn resolve_conflict(
        &mut self,
        reconciler: &SyncReconciler,
        strategy: ResolutionStrategy,
    ) -> QuoteBookResult<Snapshot> {
        let resolved = reconciler.resolve_pending(strategy, self.store.all())?;
        let committed = resolved.clone();
        self.apply("resolve", |store| Ok(store.replace_all(committed)?))?;
        reconciler.mark_committed()?;
        info!(
            "event=sync_resolve module=service status=ok strategy={} total={}",
            strategy.as_str(),
            resolved.len()
        );
        Ok(resolved)
    }

    fn apply<T>(
        &mut self,
        operation: &'static str,
        mutation: impl FnOnce(&mut QuoteStore) -> QuoteBookResult<T>,
    ) -> QuoteBookResult<T> {
        let previous = self.store.clone();
        let value = mutation(&mut self.store)?;
        self.categories.recompute(&self.store);

        if let Err(err) = self.persist() {
            error!(
                "event=quotes_persist module=service status=error operation={} error={}",
                operation, err
            );
            self.store = previous;
            self.categories.recompute(&self.store);
            return Err(err);
        }
        Ok(value)
    }

    fn persist(&self) -> QuoteBookResult<()> {
        save_quotes(&*self.durable, self.store.all())?;
        if let Err(err) = self.categories.persist_cache(&*self.durable) {
            warn!(
                "event=categories_persist module=service status=error error={}",
                err
            );
        }
        Ok(())
    }
}

/// Locks a shared quote book, recovering the guard after a panic elsewhere.
pub fn lock_book(book: &Mutex<QuoteBook>) -> MutexGuard<'_, QuoteBook> {
    book.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Quotes used when the durable store has none.
pub fn default_quotes(now: i64) -> Vec<Quote> {
    vec![
        Quote::new(
            1u64,
            "The best way to predict the future is to create it.",
            "Motivation",
            now,
        ),
        Quote::new(2u64, "Do one thing every day that scares you.", "Courage", now),
        Quote::new(3u64, "Everything you can imagine is real.", "Creativity", now),
    ]
}

#[cfg(test)]
mod tests {
    use super::{default_quotes, QuoteBook};

    #[test]
    fn defaults_have_unique_ids_and_three_categories() {
        let quotes = default_quotes(0);
        assert_eq!(quotes.len(), 3);
        for quote in &quotes {
            quote.validate().expect("default quote should be valid");
        }
    }

    #[test]
    fn open_in_memory_seeds_defaults() {
        let book = QuoteBook::open_in_memory().expect("open");
        assert_eq!(book.quotes().len(), 3);
        assert_eq!(book.categories(), ["Courage", "Creativity", "Motivation"]);
    }
}
