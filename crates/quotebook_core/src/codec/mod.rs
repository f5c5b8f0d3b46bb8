//! JSON import/export of quote collections.

pub mod import_export;
