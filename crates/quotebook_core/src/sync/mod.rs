//! Remote snapshot sync and conflict reconciliation.
//!
//! # Responsibility
//! - Fetch remote snapshots through an injected `RemoteSource`.
//! - Detect divergence and resolve it with one of three strategies.
//! - Run sync cycles periodically on a cancelable background thread.
//!
//! # Invariants
//! - At most one fetch is in flight per reconciler.
//! - Resolution is pure; callers commit results through the quote store.

pub mod reconciler;
pub mod remote;
pub mod retry;
pub mod scheduler;
