//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `quotebook_core` linkage.
//! - Optionally print the JSON export of an existing durable quote store file.
//!
//! # Invariants
//! - Exporting never creates or seeds a store file.

use quotebook_core::repo::quote_repo::load_quotes;
use quotebook_core::{export_json, SqliteKeyValueStore};
use std::error::Error;
use std::path::Path;
use std::process::ExitCode;

fn main() -> ExitCode {
    println!("quotebook_core ping={}", quotebook_core::ping());
    println!("quotebook_core version={}", quotebook_core::core_version());

    let Some(db_path) = std::env::args().nth(1) else {
        return ExitCode::SUCCESS;
    };

    match export_store(Path::new(&db_path)) {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("quotebook export failed: {err}");
            ExitCode::FAILURE
        }
    }
}

fn export_store(db_path: &Path) -> Result<String, Box<dyn Error>> {
    if !db_path.is_file() {
        return Err(format!("no quote store at {}", db_path.display()).into());
    }
    let store = SqliteKeyValueStore::open(db_path)?;
    let quotes = load_quotes(&store)?.unwrap_or_default();
    Ok(export_json(&quotes)?)
}

#[cfg(test)]
mod tests {
    use super::export_store;
    use quotebook_core::repo::quote_repo::save_quotes;
    use quotebook_core::{Quote, SqliteKeyValueStore};

    #[test]
    fn missing_store_is_an_error_and_stays_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.db");

        assert!(export_store(&path).is_err());
        assert!(!path.exists());
    }

    #[test]
    fn existing_store_exports_without_seeding() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quotes.db");
        {
            let store = SqliteKeyValueStore::open(&path).unwrap();
            save_quotes(&store, &[Quote::new(7u64, "Only one", "Solo", 0)]).unwrap();
        }

        let json = export_store(&path).unwrap();
        let exported: Vec<Quote> = serde_json::from_str(&json).unwrap();
        assert_eq!(exported.len(), 1);
        assert_eq!(exported[0].text, "Only one");
    }
}
