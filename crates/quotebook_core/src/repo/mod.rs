//! Persistence gateway over key-value collaborators.
//!
//! # Responsibility
//! - Define the narrow `KeyValueStore` contract used by core services.
//! - Map typed quote state onto well-known storage keys.
//!
//! # Invariants
//! - Core code never touches SQL outside `kv_repo`.
//! - Stored values are UTF-8 strings; structured values are JSON.

pub mod kv_repo;
pub mod quote_repo;
