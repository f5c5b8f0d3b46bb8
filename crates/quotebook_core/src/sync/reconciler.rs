//! Sync reconciler state machine and resolution strategies.
//!
//! # Responsibility
//! - Fetch remote snapshots with bounded retries.
//! - Decide whether a remote snapshot is new and whether it diverges from
//!   local state.
//! - Resolve divergence with adopt-remote, keep-local or union-merge.
//!
//! # Invariants
//! - Phases move `Idle -> Fetching -> Idle` on an unchanged or in-sync
//!   remote and `Idle -> Fetching -> Resolving -> Idle` on divergence.
//! - A fetch issued while another is in flight fails with
//!   `SyncError::ConcurrentSync` and never reaches the remote source.
//! - The divergence baseline only advances when local state is known to
//!   agree with it: after an in-sync check or a committed resolution.

use crate::config::SyncConfig;
use crate::model::quote::{now_epoch_ms, Quote, QuoteId};
use crate::sync::remote::{map_remote_payload, NetworkError, RemoteSource};
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;
use uuid::Uuid;

/// Point-in-time ordered quote sequence.
pub type Snapshot = Vec<Quote>;

/// How to settle a divergence between local and remote snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionStrategy {
    AdoptRemote,
    KeepLocal,
    UnionMerge,
}

impl ResolutionStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AdoptRemote => "adopt_remote",
            Self::KeepLocal => "keep_local",
            Self::UnionMerge => "union_merge",
        }
    }
}

/// Reconciler phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Idle,
    Fetching,
    /// A diverged remote snapshot waits for a resolution.
    Resolving,
}

/// Result of one check cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Remote matches the last known remote snapshot.
    NoChange,
    /// Remote changed but already agrees with local state.
    InSync,
    /// Remote diverges from local; a resolution is pending.
    Conflict {
        local_count: usize,
        remote_count: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    Network(NetworkError),
    /// Another fetch is still in flight on this reconciler.
    ConcurrentSync,
    /// A resolution was requested without a pending remote snapshot.
    NothingPending,
}

impl Display for SyncError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Network(err) => write!(f, "{err}"),
            Self::ConcurrentSync => write!(f, "a sync fetch is already in flight"),
            Self::NothingPending => write!(f, "no remote snapshot is waiting for resolution"),
        }
    }
}

impl Error for SyncError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Network(err) => Some(err),
            Self::ConcurrentSync | Self::NothingPending => None,
        }
    }
}

impl From<NetworkError> for SyncError {
    fn from(value: NetworkError) -> Self {
        Self::Network(value)
    }
}

#[derive(Debug)]
struct ReconcilerState {
    phase: SyncState,
    last_remote: Option<Snapshot>,
    pending: Option<Snapshot>,
}

/// Shared sync coordinator; safe to use from the scheduler and callers.
pub struct SyncReconciler {
    source: Arc<dyn RemoteSource>,
    config: SyncConfig,
    state: Mutex<ReconcilerState>,
}

impl SyncReconciler {
    pub fn new(source: Arc<dyn RemoteSource>, config: SyncConfig) -> Self {
        Self {
            source,
            config,
            state: Mutex::new(ReconcilerState {
                phase: SyncState::Idle,
                last_remote: None,
                pending: None,
            }),
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn state(&self) -> SyncState {
        self.lock_state().phase
    }

    /// Baseline used to decide whether a fetched snapshot is new.
    pub fn last_known_remote(&self) -> Option<Snapshot> {
        self.lock_state().last_remote.clone()
    }

    pub fn pending_remote(&self) -> Option<Snapshot> {
        self.lock_state().pending.clone()
    }

    /// Fetches and maps the remote snapshot, retrying per the configured policy.
    ///
    /// # Errors
    /// - `SyncError::ConcurrentSync` when a fetch is already in flight.
    /// - `SyncError::Network` when every attempt fails.
    pub fn fetch(&self) -> Result<Snapshot, SyncError> {
        self.fetch_in_cycle(Uuid::new_v4())
    }

    /// Runs one fetch-and-compare cycle against `local`.
    ///
    /// On `Conflict` the reconciler stays in `Resolving` until
    /// `mark_committed` or `discard_pending` is called.
    pub fn check(&self, local: &[Quote]) -> Result<SyncOutcome, SyncError> {
        let cycle_id = Uuid::new_v4();
        let remote = self.fetch_in_cycle(cycle_id)?;

        let mut state = self.lock_state();
        let unchanged = state
            .last_remote
            .as_deref()
            .is_some_and(|baseline| same_snapshot(baseline, &remote));
        if unchanged {
            state.phase = SyncState::Idle;
            state.pending = None;
            info!("event=sync_check module=sync status=ok cycle_id={cycle_id} outcome=no_change");
            return Ok(SyncOutcome::NoChange);
        }

        if detect_divergence(local, &remote) {
            let outcome = SyncOutcome::Conflict {
                local_count: local.len(),
                remote_count: remote.len(),
            };
            warn!(
                "event=sync_check module=sync status=conflict cycle_id={} local_count={} remote_count={}",
                cycle_id,
                local.len(),
                remote.len()
            );
            state.pending = Some(remote);
            state.phase = SyncState::Resolving;
            return Ok(outcome);
        }

        info!("event=sync_check module=sync status=ok cycle_id={cycle_id} outcome=in_sync");
        state.last_remote = Some(remote);
        state.pending = None;
        state.phase = SyncState::Idle;
        Ok(SyncOutcome::InSync)
    }

    /// Resolves the pending remote snapshot against `local` without
    /// changing reconciler state.
    pub fn resolve_pending(
        &self,
        strategy: ResolutionStrategy,
        local: &[Quote],
    ) -> Result<Snapshot, SyncError> {
        let state = self.lock_state();
        let remote = state.pending.as_deref().ok_or(SyncError::NothingPending)?;
        Ok(resolve(strategy, local, remote))
    }

    /// Records that a resolution was committed; the pending remote becomes
    /// the new baseline.
    pub fn mark_committed(&self) -> Result<(), SyncError> {
        let mut state = self.lock_state();
        let remote = state.pending.take().ok_or(SyncError::NothingPending)?;
        state.last_remote = Some(remote);
        state.phase = SyncState::Idle;
        Ok(())
    }

    /// Drops a pending remote snapshot without advancing the baseline.
    pub fn discard_pending(&self) {
        let mut state = self.lock_state();
        state.pending = None;
        if state.phase == SyncState::Resolving {
            state.phase = SyncState::Idle;
        }
    }

    fn fetch_in_cycle(&self, cycle_id: Uuid) -> Result<Snapshot, SyncError> {
        let _guard = FetchGuard::acquire(self)?;
        let started_at = Instant::now();
        let url = self.config.remote_url.as_str();
        info!("event=sync_fetch module=sync status=start cycle_id={cycle_id}");

        let result = self.config.retry.run(|attempt| {
            self.fetch_once(url).map_err(|err| {
                warn!(
                    "event=sync_fetch module=sync status=retry cycle_id={} attempt={} error_code={}",
                    cycle_id,
                    attempt,
                    err.error_code()
                );
                err
            })
        });

        match result {
            Ok(snapshot) => {
                info!(
                    "event=sync_fetch module=sync status=ok cycle_id={} records={} duration_ms={}",
                    cycle_id,
                    snapshot.len(),
                    started_at.elapsed().as_millis()
                );
                Ok(snapshot)
            }
            Err(err) => {
                error!(
                    "event=sync_fetch module=sync status=error cycle_id={} duration_ms={} error_code={} error={}",
                    cycle_id,
                    started_at.elapsed().as_millis(),
                    err.error_code(),
                    err
                );
                Err(err.into())
            }
        }
    }

    fn fetch_once(&self, url: &str) -> Result<Snapshot, NetworkError> {
        let response = self.source.fetch_remote(url)?;
        if !response.is_success() {
            return Err(NetworkError::Status(response.status));
        }
        map_remote_payload(&response.body, self.config.remote_limit, now_epoch_ms())
    }

    fn lock_state(&self) -> MutexGuard<'_, ReconcilerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Holds the `Fetching` phase and restores the previous phase on drop.
struct FetchGuard<'a> {
    reconciler: &'a SyncReconciler,
    previous: SyncState,
}

impl<'a> FetchGuard<'a> {
    fn acquire(reconciler: &'a SyncReconciler) -> Result<Self, SyncError> {
        let mut state = reconciler.lock_state();
        if state.phase == SyncState::Fetching {
            warn!("event=sync_fetch module=sync status=rejected error_code=concurrent_sync");
            return Err(SyncError::ConcurrentSync);
        }
        let previous = std::mem::replace(&mut state.phase, SyncState::Fetching);
        Ok(Self {
            reconciler,
            previous,
        })
    }
}

impl Drop for FetchGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.reconciler.lock_state();
        if state.phase == SyncState::Fetching {
            state.phase = self.previous;
        }
    }
}

/// Returns whether local and remote disagree in membership or content.
///
/// Diverges when lengths differ, when an id is present on only one side, or
/// when the records filed under an id differ in text or category. Order and
/// timestamps are ignored.
pub fn detect_divergence(local: &[Quote], remote: &[Quote]) -> bool {
    local.len() != remote.len() || content_by_id(local) != content_by_id(remote)
}

/// Groups `(text, category)` pairs by id, sorted so order never matters.
fn content_by_id(snapshot: &[Quote]) -> HashMap<&QuoteId, Vec<(&str, &str)>> {
    let mut grouped: HashMap<&QuoteId, Vec<(&str, &str)>> = HashMap::new();
    for quote in snapshot {
        grouped
            .entry(&quote.id)
            .or_default()
            .push((quote.text.as_str(), quote.category.as_str()));
    }
    for contents in grouped.values_mut() {
        contents.sort_unstable();
    }
    grouped
}

/// Applies `strategy` to two snapshots. Pure.
pub fn resolve(strategy: ResolutionStrategy, local: &[Quote], remote: &[Quote]) -> Snapshot {
    match strategy {
        ResolutionStrategy::AdoptRemote => remote.to_vec(),
        ResolutionStrategy::KeepLocal => local.to_vec(),
        ResolutionStrategy::UnionMerge => union_merge(local, remote),
    }
}

/// Remote-first union deduplicated by exact text, re-ided from 1.
///
/// Ids are renumbered; references to pre-merge ids are invalid afterwards.
pub fn union_merge(local: &[Quote], remote: &[Quote]) -> Snapshot {
    let mut seen_texts = HashSet::new();
    remote
        .iter()
        .chain(local)
        .filter(|quote| seen_texts.insert(quote.text.clone()))
        .zip(1u64..)
        .map(|(quote, seq)| Quote {
            id: QuoteId::Seq(seq),
            ..quote.clone()
        })
        .collect()
}

fn same_snapshot(left: &[Quote], right: &[Quote]) -> bool {
    left.len() == right.len()
        && left
            .iter()
            .zip(right)
            .all(|(a, b)| a.id == b.id && a.same_content(b))
}
