//! Integration tests for the discovery journal on the on-disk store.

use fogwalker::geo::Coordinate;
use fogwalker::journal::{Journal, JournalError, NewJournalEntry};
use fogwalker::storage::{Database, LocalStore, JOURNAL_KEY, PROGRESS_KEY};
use std::sync::Arc;

fn entry(notes: &str, location: Coordinate) -> NewJournalEntry {
    NewJournalEntry {
        image_data_url: Some("data:image/jpeg;base64,/9j/4AAQ".to_string()),
        ai_description: Some("A red door set into an old brick wall.".to_string()),
        user_notes: notes.to_string(),
        location: Some(location),
    }
}

#[test]
fn test_journal_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fogwalker.db");

    let first_id = {
        let store = Arc::new(Database::open(&path).unwrap());
        let mut journal = Journal::load(store);
        let id = journal
            .add_entry(entry("corner cafe", Coordinate::new(52.52, 13.405)))
            .unwrap()
            .id;
        journal
            .add_entry(entry("bridge", Coordinate::new(52.521, 13.41)))
            .unwrap();
        id
    };

    let store = Arc::new(Database::open(&path).unwrap());
    let journal = Journal::load(store.clone());
    assert_eq!(journal.len(), 2);
    assert_eq!(journal.entries()[0].user_notes, "bridge");
    assert_eq!(journal.entries()[1].id, first_id);
    // Journal and progress live under separate keys
    assert!(store.get(PROGRESS_KEY).unwrap().is_none());
}

#[test]
fn test_invalid_location_rejected() {
    let store = Arc::new(Database::open_in_memory().unwrap());
    let mut journal = Journal::load(store.clone());

    let result = journal.add_entry(entry("nowhere", Coordinate::new(95.0, 0.0)));
    assert!(matches!(result, Err(JournalError::InvalidLocation(_))));
    assert!(journal.is_empty());
    assert!(store.get(JOURNAL_KEY).unwrap().is_none());
}

#[test]
fn test_missing_image_rejected() {
    let mut journal = Journal::load(Arc::new(Database::open_in_memory().unwrap()));
    let result = journal.add_entry(NewJournalEntry {
        image_data_url: None,
        ..entry("no photo", Coordinate::new(0.0, 0.0))
    });
    assert!(matches!(result, Err(JournalError::MissingData("image"))));
}
