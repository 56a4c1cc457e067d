use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::*;

static DIR_COUNTER: AtomicUsize = AtomicUsize::new(0);

fn make_temp_dir() -> PathBuf {
    let mut dir = std::env::temp_dir();
    let id = DIR_COUNTER.fetch_add(1, Ordering::SeqCst);
    dir.push(format!("fnirs_workload_ci_lookup_{}_{}", std::process::id(), id));
    fs::create_dir_all(&dir).unwrap();
    dir
}

#[test]
fn test_read_resolves_relative_folders() {
    let dir = make_temp_dir();
    let path = dir.join("lookup.tsv");
    fs::write(
        &path,
        "subject_id\texperiment_folder\n86\t86/lr0.001_dropout0.5\n56\t/abs/56/C1.0\n",
    )
    .unwrap();

    let table = LookupTable::read_tsv(&path).unwrap();
    assert_eq!(table.len(), 2);
    assert_eq!(
        table.experiment_dir(&SubjectId::from(86)).unwrap(),
        dir.join("86/lr0.001_dropout0.5")
    );
    assert_eq!(
        table.experiment_dir(&SubjectId::from(56)).unwrap(),
        Path::new("/abs/56/C1.0")
    );
    assert_eq!(table.subjects(), vec![SubjectId::from(86), SubjectId::from(56)]);
}

#[test]
fn test_column_order_is_by_header() {
    let dir = make_temp_dir();
    let path = dir.join("lookup.tsv");
    fs::write(&path, "experiment_folder\tsubject_id\n/r/7/C10\t7\n").unwrap();
    let table = LookupTable::read_tsv(&path).unwrap();
    assert_eq!(
        table.experiment_dir(&SubjectId::from(7)).unwrap(),
        Path::new("/r/7/C10")
    );
}

#[test]
fn test_duplicate_subject_rejected() {
    let dir = make_temp_dir();
    let path = dir.join("lookup.tsv");
    fs::write(
        &path,
        "subject_id\texperiment_folder\n1\t/a\n1\t/b\n",
    )
    .unwrap();
    let err = LookupTable::read_tsv(&path).unwrap_err();
    assert!(err.to_string().contains("duplicate subject 1"));
}

#[test]
fn test_missing_header_columns() {
    let dir = make_temp_dir();
    let path = dir.join("lookup.tsv");
    fs::write(&path, "subject\tfolder\n1\t/a\n").unwrap();
    assert!(matches!(
        LookupTable::read_tsv(&path),
        Err(InputError::Parse(_))
    ));
}

#[test]
fn test_write_then_read_keeps_order() {
    let dir = make_temp_dir();
    let mut table = LookupTable::new();
    table
        .insert(SubjectId::from(93), dir.join("93").join("C0.1"))
        .unwrap();
    table
        .insert(SubjectId::from(14), dir.join("14").join("C10.0"))
        .unwrap();
    assert!(table.insert(SubjectId::from(93), dir.join("x")).is_err());

    let path = dir.join("out").join("lookup.tsv");
    table.write_tsv(&path).unwrap();
    let back = LookupTable::read_tsv(&path).unwrap();
    assert_eq!(back, table);
}
