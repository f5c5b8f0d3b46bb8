//! Network collaborator contract and remote payload mapping.
//!
//! # Responsibility
//! - Define the fetch-like interface the reconciler depends on.
//! - Map generic remote JSON records onto quotes.
//!
//! # Invariants
//! - Only 2xx responses are treated as data.
//! - Mapped snapshots never contain duplicate ids.

use crate::model::quote::{normalize_text, Quote, QuoteId};
use serde_json::Value;
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Category assigned to remote records without one.
pub const REMOTE_CATEGORY: &str = "Server";

/// Raw response returned by a `RemoteSource`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteResponse {
    pub status: u16,
    pub body: String,
}

impl RemoteResponse {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Remote fetch failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkError {
    /// Request could not be completed.
    Transport(String),
    /// Server answered with a non-success status.
    Status(u16),
    /// Body is not a usable JSON array.
    Payload(String),
}

impl NetworkError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Transport(_) => "transport_failed",
            Self::Status(_) => "bad_status",
            Self::Payload(_) => "invalid_payload",
        }
    }
}

impl Display for NetworkError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transport(message) => write!(f, "remote request failed: {message}"),
            Self::Status(status) => write!(f, "remote responded with status {status}"),
            Self::Payload(message) => write!(f, "remote payload is invalid: {message}"),
        }
    }
}

impl Error for NetworkError {}

/// Fetch-like collaborator injected into the reconciler.
pub trait RemoteSource: Send + Sync {
    fn fetch_remote(&self, url: &str) -> Result<RemoteResponse, NetworkError>;
}

/// Maps a remote JSON body onto a quote snapshot.
///
/// Field mapping per element (1-based position `N`):
/// - `text`: `title`, then `text`, then `Server quote N`.
/// - `category`: `category`, then [`REMOTE_CATEGORY`].
/// - `id`: `id` (number or string), then `N`. Repeated or unusable ids fall
///   back to `N`, or to the next unused sequential id when `N` is taken.
/// - `updatedAt`: element value, then `fetched_at`.
///
/// At most `limit` elements are mapped.
pub fn map_remote_payload(
    body: &str,
    limit: usize,
    fetched_at: i64,
) -> Result<Vec<Quote>, NetworkError> {
    let parsed: Value =
        serde_json::from_str(body).map_err(|err| NetworkError::Payload(err.to_string()))?;
    let Value::Array(elements) = parsed else {
        return Err(NetworkError::Payload("expected a JSON array".to_string()));
    };

    let mut seen: HashSet<QuoteId> = HashSet::new();
    let mut snapshot = Vec::with_capacity(elements.len().min(limit));
    for (index, element) in elements.iter().take(limit).enumerate() {
        let position = index as u64 + 1;
        let explicit = match element.get("id") {
            Some(Value::Number(number)) => number.as_u64().map(QuoteId::Seq),
            Some(Value::String(key)) if !key.trim().is_empty() => {
                Some(QuoteId::Key(key.trim().to_string()))
            }
            _ => None,
        };
        let id = match explicit.filter(|id| id.is_assignable() && !seen.contains(id)) {
            Some(id) => id,
            None => (position..u64::MAX)
                .map(QuoteId::Seq)
                .find(|candidate| !seen.contains(candidate))
                .ok_or_else(|| NetworkError::Payload("no free sequential id left".to_string()))?,
        };
        seen.insert(id.clone());

        let text = ["title", "text"]
            .iter()
            .filter_map(|key| element.get(*key).and_then(Value::as_str))
            .map(normalize_text)
            .find(|value| !value.is_empty())
            .unwrap_or_else(|| format!("Server quote {position}"));
        let category = element
            .get("category")
            .and_then(Value::as_str)
            .map(normalize_text)
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| REMOTE_CATEGORY.to_string());
        let updated_at = element
            .get("updatedAt")
            .and_then(Value::as_i64)
            .unwrap_or(fetched_at);

        snapshot.push(Quote {
            id,
            text,
            category,
            updated_at,
        });
    }

    Ok(snapshot)
}
