//! In-memory quote collection.
//!
//! # Responsibility
//! - Own the ordered quote collection and its id allocation.
//!
//! # Invariants
//! - Ids are unique across the collection at all times.
//! - Insertion order is preserved.

pub mod quote_store;
