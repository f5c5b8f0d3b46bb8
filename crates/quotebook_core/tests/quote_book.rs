mod common;

use common::{quote, texts, FlakyStore};
use quotebook_core::repo::quote_repo::{load_categories, load_quotes, SELECTED_CATEGORY_KEY};
use quotebook_core::{
    KeyValueStore, QuoteBook, QuoteBookError, QuoteId, QuoteValidationError, SqliteKeyValueStore,
    UpsertOutcome, ALL_CATEGORIES,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::atomic::Ordering;

fn durable_file_book(path: &std::path::Path) -> QuoteBook {
    QuoteBook::open(
        Box::new(SqliteKeyValueStore::open(path).unwrap()),
        Box::new(SqliteKeyValueStore::in_memory().unwrap()),
    )
    .unwrap()
}

#[test]
fn quotes_survive_reopen_of_durable_store() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("quotes.db");

    {
        let mut book = durable_file_book(&path);
        assert_eq!(book.quotes().len(), 3);
        book.add_quote("Persist me", "Memory").unwrap();
    }

    let reopened = durable_file_book(&path);
    assert_eq!(reopened.quotes().len(), 4);
    assert_eq!(reopened.quotes()[3].text, "Persist me");
    assert!(reopened.categories().iter().any(|c| c == "Memory"));
}

#[test]
fn add_continues_sequence_after_seeded_quotes() {
    let mut book = QuoteBook::open_in_memory().unwrap();
    let added = book.add_quote("Fresh", "Zen").unwrap();
    assert_eq!(added.id, QuoteId::Seq(4));
    assert_eq!(book.categories().last().map(String::as_str), Some("Zen"));
}

#[test]
fn add_rejects_empty_text_without_state_change() {
    let mut book = QuoteBook::open_in_memory().unwrap();
    let before = book.quotes().to_vec();

    let err = book.add_quote("   ", "Life").unwrap_err();
    assert!(matches!(
        err,
        QuoteBookError::Validation(QuoteValidationError::EmptyText)
    ));
    assert_eq!(book.quotes(), before.as_slice());
}

#[test]
fn add_after_largest_possible_id_errors_without_state_change() {
    let mut book = QuoteBook::open_in_memory().unwrap();
    book.replace_all(vec![quote(u64::MAX, "edge", "X")]).unwrap();

    let err = book.add_quote("one more", "X").unwrap_err();
    assert!(matches!(err, QuoteBookError::IdsExhausted));
    assert_eq!(texts(book.quotes()), vec!["edge"]);
}

#[test]
fn imported_max_id_is_reassigned_and_adds_continue() {
    let mut book = QuoteBook::open_in_memory().unwrap();
    let report = book
        .import_json(r#"[{"id":18446744073709551615,"text":"x"}]"#)
        .unwrap();
    assert_eq!(report.imported[0].id, QuoteId::Seq(4));
    assert_eq!(book.add_quote("next", "X").unwrap().id, QuoteId::Seq(5));
}

#[test]
fn failed_persist_rolls_back_mutation() {
    let (durable, fail_writes) = FlakyStore::new();
    let mut book = QuoteBook::open(
        Box::new(durable),
        Box::new(SqliteKeyValueStore::in_memory().unwrap()),
    )
    .unwrap();
    let before = book.quotes().to_vec();
    let categories_before = book.categories().to_vec();

    fail_writes.store(true, Ordering::SeqCst);
    let err = book.add_quote("Lost", "Nowhere").unwrap_err();
    assert!(matches!(err, QuoteBookError::Storage(_)));
    assert_eq!(book.quotes(), before.as_slice());
    assert_eq!(book.categories(), categories_before.as_slice());

    let err = book
        .import_json(r#"[{"text":"a"},{"text":"b"}]"#)
        .unwrap_err();
    assert!(matches!(err, QuoteBookError::Storage(_)));
    assert_eq!(book.quotes(), before.as_slice());
}

#[test]
fn restore_selection_falls_back_when_category_disappears() {
    let mut book = QuoteBook::open_in_memory().unwrap();
    book.replace_all(vec![quote(1, "a", "Life"), quote(2, "b", "Wisdom")])
        .unwrap();

    let filtered = book.select_category("Wisdom").unwrap();
    assert_eq!(texts(&filtered), vec!["b"]);
    assert_eq!(book.restore_selection().unwrap(), "Wisdom");

    book.replace_all(vec![quote(1, "a", "Life")]).unwrap();
    assert_eq!(book.restore_selection().unwrap(), ALL_CATEGORIES);
}

#[test]
fn select_all_returns_everything() {
    let mut book = QuoteBook::open_in_memory().unwrap();
    book.replace_all(vec![
        quote(1, "a", "Life"),
        quote(2, "b", "Wisdom"),
        quote(3, "c", "Life"),
    ])
    .unwrap();
    let all = book.select_category(ALL_CATEGORIES).unwrap();
    assert_eq!(texts(&all), vec!["a", "b", "c"]);
    assert_eq!(book.restore_selection().unwrap(), ALL_CATEGORIES);
}

#[test]
fn random_quote_is_recorded_in_session_store() {
    let book = QuoteBook::open_in_memory().unwrap();
    let mut rng = StdRng::seed_from_u64(3);

    assert!(book.last_viewed().unwrap().is_none());
    let shown = book
        .show_random_quote("Courage", &mut rng)
        .unwrap()
        .expect("one courage quote");
    let viewed = book.last_viewed().unwrap().expect("last viewed recorded");
    assert_eq!(viewed.id, shown.id);
    assert_eq!(viewed.text, shown.text);
    assert_eq!(viewed.category, "Courage");

    assert!(book
        .show_random_quote("Nothing here", &mut rng)
        .unwrap()
        .is_none());
    assert_eq!(book.last_viewed().unwrap().unwrap().id, shown.id);
}

#[test]
fn upsert_through_book_persists_newer_records_only() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("upsert.db");
    let mut book = durable_file_book(&path);
    book.replace_all(vec![quote(1, "old", "Life")]).unwrap();

    let mut newer = quote(1, "new", "Life");
    newer.updated_at = 10;
    assert_eq!(book.upsert_quote(newer).unwrap(), UpsertOutcome::Updated);
    assert_eq!(
        book.upsert_quote(quote(1, "stale", "Life")).unwrap(),
        UpsertOutcome::Ignored
    );
    drop(book);

    let store = SqliteKeyValueStore::open(&path).unwrap();
    let stored = load_quotes(&store).unwrap().unwrap();
    assert_eq!(texts(&stored), vec!["new"]);
    assert_eq!(load_categories(&store).unwrap().unwrap(), vec!["Life"]);
    assert!(store.get(SELECTED_CATEGORY_KEY).unwrap().is_none());
}
