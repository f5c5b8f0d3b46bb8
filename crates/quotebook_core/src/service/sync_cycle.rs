//! Sync cycles against a shared quote book.
//!
//! # Responsibility
//! - Fetch without holding the quote book lock.
//! - Discard results when the book was dropped during the fetch.
//! - Optionally commit conflicts with a configured strategy.

use crate::service::quote_book::{lock_book, QuoteBook, QuoteBookResult, SharedQuoteBook};
use crate::sync::reconciler::{ResolutionStrategy, SyncOutcome, SyncReconciler};
use crate::sync::scheduler::SyncScheduler;
use log::{info, warn};
use std::io;
use std::sync::{Arc, Mutex, Weak};

/// Result of one background cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    Checked(SyncOutcome),
    /// A conflict was committed with the configured strategy.
    Resolved(ResolutionStrategy),
    /// The quote book was torn down; nothing was applied.
    Discarded,
}

/// Runs one fetch/compare cycle and, if configured, resolves conflicts.
pub fn run_sync_cycle(
    book: &Weak<Mutex<QuoteBook>>,
    reconciler: &SyncReconciler,
) -> QuoteBookResult<CycleOutcome> {
    let local = match book.upgrade() {
        Some(shared) => {
            let guard = lock_book(&shared);
            guard.quotes().to_vec()
        }
        None => return Ok(CycleOutcome::Discarded),
    };

    let outcome = reconciler.check(&local)?;

    let Some(shared) = book.upgrade() else {
        reconciler.discard_pending();
        info!("event=sync_cycle module=service status=discarded reason=book_dropped");
        return Ok(CycleOutcome::Discarded);
    };

    match (outcome, reconciler.config().auto_strategy) {
        (SyncOutcome::Conflict { .. }, Some(strategy)) => {
            lock_book(&shared).resolve_conflict(reconciler, strategy)?;
            Ok(CycleOutcome::Resolved(strategy))
        }
        _ => Ok(CycleOutcome::Checked(outcome)),
    }
}

/// Starts periodic sync cycles for `book` at the reconciler's interval.
///
/// Cycles stop doing work once the book is dropped; stop the returned
/// scheduler to end the thread.
pub fn spawn_periodic_sync(
    book: &SharedQuoteBook,
    reconciler: Arc<SyncReconciler>,
) -> io::Result<SyncScheduler> {
    let weak = Arc::downgrade(book);
    let interval = reconciler.config().interval();
    SyncScheduler::start(interval, move || {
        if let Err(err) = run_sync_cycle(&weak, &reconciler) {
            warn!("event=sync_cycle module=service status=error error={err}");
        }
    })
}
