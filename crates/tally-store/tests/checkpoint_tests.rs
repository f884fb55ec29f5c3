//! Integration tests for the JSON checkpoint store
//!
//! These tests exercise persistence across reopen, idempotent append and
//! recovery from missing or corrupt files.

use std::fs;
use tally_domain::traits::CheckpointStore;
use tally_domain::{AppendOutcome, CategoryResult, DocumentRecord, ItemKey};
use tally_store::{JsonCheckpointStore, StoreError};
use tempfile::TempDir;

fn record(key: &str, category: &str, amount: Option<f64>) -> DocumentRecord {
    let mut record = DocumentRecord::uncategorized(ItemKey::new(key), format!("/in/{}", key))
        .with_category(CategoryResult::new(category, 0.8));
    record.total_amount_clean = amount;
    record.total_amount_raw = amount.map(|a| format!("{:.2}", a));
    record
}

#[test]
fn test_missing_file_starts_empty() {
    let dir = TempDir::new().unwrap();
    let store = JsonCheckpointStore::open(dir.path().join("nested/checkpoint.json")).unwrap();
    assert!(store.is_empty());
    assert!(dir.path().join("nested").is_dir(), "Parent directory should be created");
}

#[test]
fn test_empty_file_starts_empty() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("checkpoint.json");
    fs::write(&path, "").unwrap();

    let store = JsonCheckpointStore::open(&path).unwrap();
    assert!(store.is_empty());
    assert!(path.exists(), "An empty file is not corrupt and stays in place");
}

#[test]
fn test_append_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("checkpoint.json");

    {
        let mut store = JsonCheckpointStore::open(&path).unwrap();
        assert_eq!(store.append(record("a.jpg", "Electronics", Some(10.0))).unwrap(), AppendOutcome::Inserted);
        assert_eq!(store.append(record("b.jpg", "Food and Restaurant", None)).unwrap(), AppendOutcome::Inserted);
    }

    let store = JsonCheckpointStore::open(&path).unwrap();
    assert_eq!(store.len(), 2);
    assert!(store.contains(&ItemKey::new("a.jpg")));
    assert!(store.contains(&ItemKey::new("b.jpg")));
    assert_eq!(store.records()[0].item_key.as_str(), "a.jpg");
    assert_eq!(store.records()[1], record("b.jpg", "Food and Restaurant", None));
}

#[test]
fn test_duplicate_append_never_changes_stored_record() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("checkpoint.json");
    let mut store = JsonCheckpointStore::open(&path).unwrap();

    let original = record("a.jpg", "Electronics", Some(10.0));
    store.append(original.clone()).unwrap();
    let before = fs::read_to_string(&path).unwrap();

    let replacement = record("a.jpg", "Fuel and Gas Station", Some(99.0));
    assert_eq!(store.append(replacement).unwrap(), AppendOutcome::Duplicate);

    assert_eq!(store.len(), 1);
    assert_eq!(store.records()[0], original);
    assert_eq!(fs::read_to_string(&path).unwrap(), before);
}

#[test]
fn test_file_uses_camel_case_field_names() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("checkpoint.json");
    let mut store = JsonCheckpointStore::open(&path).unwrap();
    store.append(record("a.jpg", "Electronics", Some(10.0))).unwrap();

    let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert!(json.is_array());
    assert_eq!(json[0]["itemKey"], "a.jpg");
    assert_eq!(json[0]["totalAmountClean"], 10.0);
    assert_eq!(json[0]["categoryConfidence"], 0.8);
}

#[test]
fn test_corrupt_file_is_quarantined() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("checkpoint.json");
    fs::write(&path, "[{\"itemKey\": \"a.jpg\", ").unwrap();

    let mut store = JsonCheckpointStore::open(&path).unwrap();
    assert!(store.is_empty());
    assert!(!path.exists(), "Corrupt file should be moved aside");

    let preserved: Vec<_> = fs::read_dir(dir.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .filter(|name| name.starts_with("checkpoint.json.corrupt-"))
        .collect();
    assert_eq!(preserved.len(), 1);
    let kept = fs::read_to_string(dir.path().join(&preserved[0])).unwrap();
    assert_eq!(kept, "[{\"itemKey\": \"a.jpg\", ");

    // The store keeps working after recovery
    store.append(record("b.jpg", "Electronics", None)).unwrap();
    assert_eq!(JsonCheckpointStore::read_records(&path).unwrap().len(), 1);
}

#[test]
fn test_non_utf8_file_is_quarantined() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("checkpoint.json");
    let garbage: [u8; 5] = [0x5b, 0xff, 0xfe, 0x00, 0x9c];
    fs::write(&path, garbage).unwrap();

    let store = JsonCheckpointStore::open(&path).unwrap();
    assert!(store.is_empty());
    assert!(!path.exists());

    let preserved: Vec<_> = fs::read_dir(dir.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().starts_with("checkpoint.json.corrupt-"))
        .map(|e| e.path())
        .collect();
    assert_eq!(preserved.len(), 1);
    assert_eq!(fs::read(&preserved[0]).unwrap(), garbage);

    assert!(matches!(
        JsonCheckpointStore::read_records(&preserved[0]),
        Err(StoreError::Corrupt { .. })
    ));
}

#[test]
fn test_read_records_reports_corruption() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("checkpoint.json");
    fs::write(&path, "not json").unwrap();

    let result = JsonCheckpointStore::read_records(&path);
    assert!(matches!(result, Err(StoreError::Corrupt { .. })));
    assert!(path.exists(), "Reading must not move the file");
}

#[test]
fn test_reload_replaces_in_memory_state() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("checkpoint.json");
    let mut first = JsonCheckpointStore::open(&path).unwrap();
    let mut second = JsonCheckpointStore::open(&path).unwrap();

    first.append(record("a.jpg", "Electronics", None)).unwrap();
    assert!(!second.contains(&ItemKey::new("a.jpg")));

    let loaded = second.load().unwrap();
    assert_eq!(loaded.len(), 1);
    assert!(second.contains(&ItemKey::new("a.jpg")));
}
