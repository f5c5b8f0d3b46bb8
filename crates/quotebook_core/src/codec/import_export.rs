//! Quote JSON import and export.
//!
//! # Responsibility
//! - Turn an external JSON array into quote records ready to append.
//! - Serialize the current collection for file export.
//!
//! # Invariants
//! - Import never mutates the store; callers append the returned batch.
//! - Imported ids never collide with the store or with each other.
//! - One malformed element is skipped without failing the whole payload.

use crate::model::quote::{normalize_category, normalize_text, Quote, QuoteId};
use crate::store::quote_store::{next_seq_after, QuoteStore};
use log::warn;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Suggested file name for exported quotes.
pub const EXPORT_FILE_NAME: &str = "quotes_export.json";
/// MIME type of exported quotes.
pub const EXPORT_MIME_TYPE: &str = "application/json";

/// Import/export failures.
#[derive(Debug)]
pub enum CodecError {
    /// Payload is not JSON or not a JSON array.
    Format(String),
    /// Serialization failed during export.
    Encode(serde_json::Error),
    /// An element needed a fresh id and none was left.
    IdsExhausted,
}

impl Display for CodecError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Format(message) => write!(f, "invalid import payload: {message}"),
            Self::Encode(err) => write!(f, "failed to encode quotes: {err}"),
            Self::IdsExhausted => write!(f, "no sequential quote id left for imported quotes"),
        }
    }
}

impl Error for CodecError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Format(_) | Self::IdsExhausted => None,
            Self::Encode(err) => Some(err),
        }
    }
}

/// Outcome of one import call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportReport {
    /// Quotes synthesized from well-formed elements, in payload order.
    pub imported: Vec<Quote>,
    /// Elements that could not be turned into a quote.
    pub skipped: usize,
}

impl ImportReport {
    pub fn imported_count(&self) -> usize {
        self.imported.len()
    }
}

/// Parses `payload` into quotes to append to `store`.
///
/// Element mapping:
/// - `text`: `text`, then `title`, then `Imported quote N` when both absent.
/// - `category`: `category`, or `Uncategorized`.
/// - `id`: element `id` unless absent, unusable (`u64::MAX` included) or
///   already taken.
/// - `updatedAt`: element value, or `now`.
///
/// # Errors
/// - `CodecError::Format` when the payload is not a JSON array.
/// - `CodecError::IdsExhausted` when a fresh sequential id cannot be allocated.
pub fn import_json(payload: &str, store: &QuoteStore, now: i64) -> Result<ImportReport, CodecError> {
    let parsed: Value =
        serde_json::from_str(payload).map_err(|err| CodecError::Format(err.to_string()))?;
    let Value::Array(elements) = parsed else {
        return Err(CodecError::Format("expected a JSON array".to_string()));
    };

    let mut taken: HashSet<QuoteId> = store.all().iter().map(|quote| quote.id.clone()).collect();
    let mut next_seq = next_seq_after(taken.iter());
    let mut imported = Vec::with_capacity(elements.len());
    let mut skipped = 0;

    for (position, element) in elements.iter().enumerate() {
        let Some(fields) = element.as_object() else {
            skipped += 1;
            continue;
        };
        let Some(text) = element_text(fields, position) else {
            skipped += 1;
            continue;
        };

        let id = match element_id(fields) {
            Some(id) if id.is_assignable() && !taken.contains(&id) => id,
            _ => QuoteId::Seq(next_seq.ok_or(CodecError::IdsExhausted)?),
        };
        if let (QuoteId::Seq(value), Some(current)) = (&id, next_seq) {
            if *value >= current {
                next_seq = next_seq_after(std::iter::once(&id));
            }
        }
        taken.insert(id.clone());

        let category = fields
            .get("category")
            .and_then(Value::as_str)
            .map(normalize_category)
            .unwrap_or_else(|| normalize_category(""));
        let updated_at = fields
            .get("updatedAt")
            .and_then(Value::as_i64)
            .unwrap_or(now);

        imported.push(Quote {
            id,
            text,
            category,
            updated_at,
        });
    }

    if skipped > 0 {
        warn!(
            "event=quotes_import module=codec status=partial imported={} skipped={}",
            imported.len(),
            skipped
        );
    }

    Ok(ImportReport { imported, skipped })
}

/// Serializes quotes as a pretty-printed JSON array in the given order.
pub fn export_json(quotes: &[Quote]) -> Result<String, CodecError> {
    serde_json::to_string_pretty(quotes).map_err(CodecError::Encode)
}

fn element_text(fields: &Map<String, Value>, position: usize) -> Option<String> {
    for key in ["text", "title"] {
        match fields.get(key) {
            None | Some(Value::Null) => continue,
            Some(Value::String(raw)) => {
                let normalized = normalize_text(raw);
                if normalized.is_empty() {
                    return None;
                }
                return Some(normalized);
            }
            // Present but not text: the element is malformed.
            Some(_) => return None,
        }
    }
    Some(format!("Imported quote {}", position + 1))
}

fn element_id(fields: &Map<String, Value>) -> Option<QuoteId> {
    match fields.get("id")? {
        Value::Number(number) => number.as_u64().filter(|value| *value > 0).map(QuoteId::Seq),
        Value::String(key) => {
            let trimmed = key.trim();
            (!trimmed.is_empty()).then(|| QuoteId::Key(trimmed.to_string()))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::{element_id, import_json, CodecError};
    use crate::model::quote::{Quote, QuoteId};
    use crate::store::quote_store::QuoteStore;
    use serde_json::json;

    #[test]
    fn rejects_non_array_payloads() {
        let store = QuoteStore::new();
        assert!(matches!(
            import_json(r#"{"text":"x"}"#, &store, 0),
            Err(CodecError::Format(_))
        ));
        assert!(matches!(
            import_json("not json", &store, 0),
            Err(CodecError::Format(_))
        ));
    }

    #[test]
    fn missing_text_uses_title_then_placeholder() {
        let store = QuoteStore::new();
        let report = import_json(r#"[{"title":"From title"},{"category":"C"}]"#, &store, 5)
            .expect("import");
        assert_eq!(report.imported[0].text, "From title");
        assert_eq!(report.imported[1].text, "Imported quote 2");
        assert_eq!(report.imported[1].category, "C");
        assert_eq!(report.imported[1].updated_at, 5);
    }

    #[test]
    fn malformed_elements_are_skipped() {
        let store = QuoteStore::new();
        let report = import_json(r#"[1, null, {"text": 42}, {"text":"  "}, {"text":"ok"}]"#, &store, 0)
            .expect("import");
        assert_eq!(report.imported_count(), 1);
        assert_eq!(report.skipped, 4);
    }

    #[test]
    fn colliding_ids_are_reassigned() {
        let store = QuoteStore::from_quotes(vec![Quote::new(1u64, "a", "X", 0)]).expect("seed");
        let report = import_json(
            r#"[{"id":1,"text":"b"},{"id":1,"text":"c"},{"id":7,"text":"d"}]"#,
            &store,
            0,
        )
        .expect("import");
        let ids: Vec<QuoteId> = report.imported.iter().map(|q| q.id.clone()).collect();
        assert_eq!(ids, vec![QuoteId::Seq(2), QuoteId::Seq(3), QuoteId::Seq(7)]);
    }

    #[test]
    fn max_id_is_replaced_with_a_fresh_one() {
        let report = import_json(
            r#"[{"id":18446744073709551615,"text":"x"},{"text":"y"}]"#,
            &QuoteStore::new(),
            0,
        )
        .expect("import");
        let ids: Vec<QuoteId> = report.imported.iter().map(|q| q.id.clone()).collect();
        assert_eq!(ids, vec![QuoteId::Seq(1), QuoteId::Seq(2)]);
    }

    #[test]
    fn near_max_ids_stop_fresh_allocation_instead_of_wrapping() {
        let report = import_json(
            r#"[{"id":18446744073709551614,"text":"x"},{"text":"y"}]"#,
            &QuoteStore::new(),
            0,
        );
        assert!(matches!(report, Err(CodecError::IdsExhausted)));

        let store =
            QuoteStore::from_quotes(vec![Quote::new(u64::MAX - 1, "edge", "X", 0)]).expect("seed");
        let report = import_json(r#"[{"id":5,"text":"keeps its id"}]"#, &store, 0).expect("import");
        assert_eq!(report.imported[0].id, QuoteId::Seq(5));
        assert!(matches!(
            import_json(r#"[{"id":5,"text":"a"},{"text":"b"}]"#, &store, 0),
            Err(CodecError::IdsExhausted)
        ));
    }

    #[test]
    fn element_id_accepts_positive_numbers_and_keys() {
        let fields = |value: serde_json::Value| json!({ "id": value }).as_object().cloned().expect("object");
        assert_eq!(element_id(&fields(json!(3))), Some(QuoteId::Seq(3)));
        assert_eq!(element_id(&fields(json!("k"))), Some(QuoteId::Key("k".to_string())));
        assert_eq!(element_id(&fields(json!(0))), None);
        assert_eq!(element_id(&fields(json!(-2))), None);
        assert_eq!(element_id(&fields(json!(""))), None);
    }
}
