//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate store, category index, codec and persistence into
//!   use-case level APIs for the presentation layer.
//! - Wire sync cycles to a shared quote book.
//!
//! # Invariants
//! - Every store mutation is followed by a category recompute and a
//!   durable write before the call returns.

pub mod quote_book;
pub mod sync_cycle;
