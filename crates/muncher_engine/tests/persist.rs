use std::fs;

use muncher_core::{DocType, IdLookup};
use muncher_engine::{
    load_id_lookup, save_id_lookup, AtomicFileWriter, DownloadLedger, KeyedJsonStore,
};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tempfile::TempDir;

#[test]
fn atomic_writer_creates_directory_and_replaces_content() {
    let tmp = TempDir::new().unwrap();
    let writer = AtomicFileWriter::new(tmp.path().join("nested"));

    writer.write("a.json", "first").unwrap();
    let path = writer.write("a.json", "second").unwrap();

    assert_eq!(fs::read_to_string(path).unwrap(), "second");
}

#[test]
fn saving_a_section_keeps_other_adventures() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("downloads.json");
    fs::write(&path, r#"{"cos": ["maps/a.png"]}"#).unwrap();
    let store = KeyedJsonStore::new(&path);

    store.save_section("lmop", &vec!["maps/b.png"]).unwrap();

    let saved: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(saved, json!({"cos": ["maps/a.png"], "lmop": ["maps/b.png"]}));
}

#[test]
fn missing_and_malformed_files_read_as_empty() {
    let tmp = TempDir::new().unwrap();
    let missing = KeyedJsonStore::new(tmp.path().join("nope.json"));
    let section: Vec<String> = missing.load_section("lmop");
    assert!(section.is_empty());

    let broken = tmp.path().join("broken.json");
    fs::write(&broken, "{not json").unwrap();
    let section: Vec<String> = KeyedJsonStore::new(&broken).load_section("lmop");
    assert!(section.is_empty());

    let wrong_shape = tmp.path().join("shape.json");
    fs::write(&wrong_shape, r#"{"lmop": 42}"#).unwrap();
    let section: Vec<String> = KeyedJsonStore::new(&wrong_shape).load_section("lmop");
    assert!(section.is_empty());
}

#[test]
fn malformed_ledger_is_overwritten_on_save() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("downloads.json");
    fs::write(&path, "garbage").unwrap();
    let store = KeyedJsonStore::new(&path);

    let ledger: DownloadLedger = ["/maps/a.png"].into_iter().collect();
    ledger.save(&store, "lmop").unwrap();

    let reloaded = DownloadLedger::load(&store, "lmop");
    assert_eq!(reloaded.iter().collect::<Vec<_>>(), vec!["maps/a.png"]);
}

#[test]
fn download_ledger_normalizes_leading_separators() {
    let mut ledger = DownloadLedger::new();
    assert!(ledger.insert("/maps/a.png"));
    assert!(!ledger.insert("maps/a.png"));
    assert!(ledger.contains("\\maps/a.png"));
    assert_eq!(ledger.len(), 1);
}

#[test]
fn id_lookups_survive_a_round_trip_through_disk() {
    let tmp = TempDir::new().unwrap();
    let store = KeyedJsonStore::new(tmp.path().join("lookups.json"));
    let mut ids = IdLookup::new();
    let scene = ids.assign(DocType::Scene, 7, Some("map-1"));
    let table = ids.assign(DocType::RollTable, 7, Some("t-1"));

    save_id_lookup(&store, "lmop", &ids).unwrap();
    let mut reloaded = load_id_lookup(&store, "lmop");

    assert_eq!(reloaded.len(), 2);
    assert_eq!(reloaded.assign(DocType::Scene, 7, Some("map-1")), scene);
    assert_eq!(reloaded.find(DocType::RollTable, 7, Some("t-1")), Some(table.as_str()));
    assert!(load_id_lookup(&store, "cos").is_empty());
}
