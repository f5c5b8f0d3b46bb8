//! Core domain logic for Quotebook.
//! This crate is the single source of truth for quote store, category and
//! sync reconciliation invariants; presentation layers call into it.

pub mod category;
pub mod codec;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod store;
pub mod sync;

pub use category::category_index::CategoryIndex;
pub use codec::import_export::{
    export_json, import_json, CodecError, ImportReport, EXPORT_FILE_NAME, EXPORT_MIME_TYPE,
};
pub use config::{ConfigError, SyncConfig};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::quote::{
    LastViewed, Quote, QuoteId, QuoteValidationError, ALL_CATEGORIES, UNCATEGORIZED,
};
pub use repo::kv_repo::{KeyValueStore, SqliteKeyValueStore, StorageError, StorageResult};
pub use service::quote_book::{
    lock_book, QuoteBook, QuoteBookError, QuoteBookResult, SharedQuoteBook,
};
pub use service::sync_cycle::{run_sync_cycle, spawn_periodic_sync, CycleOutcome};
pub use store::quote_store::{next_seq_after, AddError, QuoteStore, ReplaceError, UpsertOutcome};
pub use sync::reconciler::{
    detect_divergence, resolve, union_merge, ResolutionStrategy, Snapshot, SyncError,
    SyncOutcome, SyncReconciler, SyncState,
};
pub use sync::remote::{NetworkError, RemoteResponse, RemoteSource};
pub use sync::retry::{Backoff, RetryPolicy};
pub use sync::scheduler::SyncScheduler;

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
