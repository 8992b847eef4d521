use gleaner_core::models::{NOT_SPECIFIED, Record};
use gleaner_core::store::DeduplicationStore;
use gleaner_core::traits::PersistenceWriter;

use crate::integration::common::{record, temp_store};

const HEADER: &str = "Company Name,Job Title,Job Description,Skills Required\n";

#[test]
fn missing_file_loads_empty() {
    let (store, path, _dir) = temp_store();
    assert!(!path.exists());
    assert!(store.load().unwrap().is_empty());
}

#[test]
fn empty_set_still_writes_header() {
    let (store, path, _dir) = temp_store();
    store.replace_all(&[]).unwrap();
    assert_eq!(std::fs::read_to_string(&path).unwrap(), HEADER);
    assert!(store.load().unwrap().is_empty());
}

#[test]
fn writes_fixed_columns_in_order() {
    let (store, path, _dir) = temp_store();
    store.replace_all(&[record("Acme", "Rust Engineer")]).unwrap();

    let raw = std::fs::read_to_string(&path).unwrap();
    assert_eq!(
        raw,
        format!("{HEADER}Acme,Rust Engineer,Full-time,\"Skills: Rust, SQL\"\n")
    );
}

#[test]
fn load_returns_what_was_written() {
    let (store, _path, _dir) = temp_store();
    let mut multi_line = record("Beta, Inc.", "SRE");
    multi_line.description = "On call\n\"follow the sun\"".to_string();
    let records = vec![record("Acme", "Rust Engineer"), multi_line];

    store.replace_all(&records).unwrap();
    assert_eq!(store.load().unwrap(), records);
}

#[test]
fn missing_columns_become_placeholder() {
    let (store, path, _dir) = temp_store();
    std::fs::write(&path, "Company Name,Job Title\nAcme,Engineer\nBeta\n").unwrap();

    let records = store.load().unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].title, "Engineer");
    assert_eq!(records[0].skills, NOT_SPECIFIED);
    assert_eq!(records[1].company, "Beta");
    assert_eq!(records[1].title, NOT_SPECIFIED);
}

#[test]
fn merge_twice_is_byte_identical() {
    let (store, path, _dir) = temp_store();
    store
        .replace_all(&[record("Old Co", "Analyst"), record("Acme", "Old Title")])
        .unwrap();

    let mut collected = DeduplicationStore::load_from(&store).unwrap();
    collected.upsert(record("Acme", "New Title"));
    collected.upsert(record("Cobalt", "SRE"));

    store.merge(&collected).unwrap();
    let first = std::fs::read(&path).unwrap();
    let summary = store.merge(&collected).unwrap();
    let second = std::fs::read(&path).unwrap();

    assert_eq!(first, second);
    assert_eq!(summary.added, 0);
    assert_eq!(summary.updated, 0);
    assert_eq!(summary.total, 3);
}

#[test]
fn merge_keeps_unseen_records_and_overwrites_seen_ones() {
    let (store, _path, _dir) = temp_store();
    store
        .replace_all(&[record("Old Co", "Analyst"), record("Acme", "Old Title")])
        .unwrap();

    let mut collected = DeduplicationStore::new();
    collected.upsert(record("Acme", "New Title"));
    collected.upsert(record("Cobalt", "SRE"));
    let summary = store.merge(&collected).unwrap();

    let names: Vec<_> = store
        .load()
        .unwrap()
        .into_iter()
        .map(|r| (r.company, r.title))
        .collect();
    assert_eq!(
        names,
        vec![
            ("Old Co".to_string(), "Analyst".to_string()),
            ("Acme".to_string(), "New Title".to_string()),
            ("Cobalt".to_string(), "SRE".to_string()),
        ]
    );
    assert_eq!(summary.added, 1);
    assert_eq!(summary.updated, 1);
}

#[test]
fn record_count_never_decreases_across_merges() {
    let (store, _path, _dir) = temp_store();
    let mut collected = DeduplicationStore::new();
    let mut totals = Vec::new();

    for name in ["A", "B", "A", "C"] {
        collected.upsert(record(name, "t"));
        totals.push(store.merge(&collected).unwrap().total);
    }
    // A run that collects fewer records still leaves earlier ones in place.
    totals.push(store.merge(&DeduplicationStore::new()).unwrap().total);

    assert_eq!(totals, vec![1, 2, 2, 3, 3]);
}

#[test]
fn no_temp_files_left_behind() {
    let (store, _path, dir) = temp_store();
    store.replace_all(&[record("Acme", "t")]).unwrap();
    store.replace_all(&[record("Acme", "t2")]).unwrap();

    let entries: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name())
        .collect();
    assert_eq!(entries, vec![std::ffi::OsString::from("records.csv")]);
}

#[test]
fn creates_missing_parent_directory() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("nested").join("records.csv");
    let store = gleaner_store::CsvRecordStore::new(&path);

    store.replace_all(&[Record::new("Acme")]).unwrap();
    assert_eq!(store.load().unwrap(), vec![Record::new("Acme")]);
}

#[cfg(unix)]
#[test]
fn replace_keeps_existing_file_mode() {
    use std::os::unix::fs::PermissionsExt;

    let (store, path, _dir) = temp_store();
    store.replace_all(&[record("Acme", "t")]).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o640)).unwrap();

    store.replace_all(&[record("Acme", "t2")]).unwrap();

    let mode = std::fs::metadata(&path).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o640);
    assert_eq!(store.load().unwrap()[0].title, "t2");
}
