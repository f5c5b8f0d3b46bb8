//! Quote domain model.
//!
//! # Responsibility
//! - Define canonical data structures used by core business logic.
//! - Keep one serialized shape shared by storage, import/export and sync.
//!
//! # Invariants
//! - Every quote is identified by a `QuoteId` unique within its store.
//! - Text and category are never blank once a quote is validated.

pub mod quote;
