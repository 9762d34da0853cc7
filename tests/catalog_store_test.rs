//! Catalog persistence tests through the public API.

use std::fs;

use buscribe::catalog::{CatalogEntry, CatalogStore};
use buscribe::frame::Frame;
use tempfile::TempDir;

const ON_HEX: &str = "AA 55 30 BC 00 0E 01 01 65 00 0D 0D";
const OFF_HEX: &str = "AA 55 30 BC 00 0E 01 00 65 00 0D 0D";

/// Upsert → reload returns an equal entry; repeating the identical upsert
/// leaves identical bytes on disk.
#[test]
fn test_persisted_entry_round_trips_byte_stable() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("catalog.json");

    let on = Frame::from_hex(ON_HEX).unwrap();
    let off = Frame::from_hex(OFF_HEX).unwrap();
    let entry = CatalogEntry::new(&on, Some(&off), true);

    let mut store = CatalogStore::load(&path).unwrap();
    store.upsert("light", entry.clone()).unwrap();
    let first = fs::read(&path).unwrap();

    let reloaded = CatalogStore::load(&path).unwrap();
    assert_eq!(reloaded.get("light"), Some(&entry));

    let mut store = CatalogStore::load(&path).unwrap();
    store.upsert("light", entry).unwrap();
    assert_eq!(fs::read(&path).unwrap(), first);
}

/// Saving never leaves the temporary file behind, and the file on disk is
/// always complete version-2 JSON.
#[test]
fn test_save_is_atomic_and_clean() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("catalog.json");

    let on = Frame::from_hex(ON_HEX).unwrap();
    let mut store = CatalogStore::load(&path).unwrap();
    store
        .upsert("a", CatalogEntry::new(&on, None, false))
        .unwrap();

    let leftovers: Vec<_> = fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name())
        .collect();
    assert_eq!(leftovers, vec!["catalog.json"]);

    let value: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(value["version"], 2);
    assert_eq!(value["commands"]["a"]["on"], ON_HEX);
    assert_eq!(value["commands"]["a"]["off"], serde_json::Value::Null);
}

/// Both legacy file shapes load, and the next save rewrites them as one
/// version-2 file.
#[test]
fn test_legacy_shapes_migrate_to_versioned_schema() {
    let dir = TempDir::new().unwrap();

    // Flat name→hex map.
    let flat = dir.path().join("flat.json");
    fs::write(&flat, format!(r#"{{"거실조명ON": "{ON_HEX}"}}"#)).unwrap();
    let store = CatalogStore::load(&flat).unwrap();
    let entry = store.get("거실조명ON").unwrap();
    assert_eq!(entry.on, ON_HEX);
    assert_eq!(entry.off, None);
    assert!(!entry.verified);

    // Unversioned paired map.
    let paired = dir.path().join("paired.json");
    fs::write(
        &paired,
        format!(
            r#"{{"거실조명": {{"ON": "{ON_HEX}", "OFF": "{OFF_HEX}", "captured_at": "2025-11-02 21:14:05"}}}}"#
        ),
    )
    .unwrap();
    let mut store = CatalogStore::load(&paired).unwrap();
    let entry = store.get("거실조명").unwrap().clone();
    assert_eq!(entry.off.as_deref(), Some(OFF_HEX));

    store.upsert("거실조명", entry).unwrap();
    let value: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&paired).unwrap()).unwrap();
    assert_eq!(value["version"], 2);
    assert!(value["commands"]["거실조명"]["captured_at"]
        .as_str()
        .unwrap()
        .starts_with("2025-11-02"));
}
