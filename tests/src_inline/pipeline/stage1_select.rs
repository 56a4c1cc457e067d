use std::sync::atomic::{AtomicUsize, Ordering};

use super::*;

static DIR_COUNTER: AtomicUsize = AtomicUsize::new(0);

fn make_temp_dir() -> PathBuf {
    let mut dir = std::env::temp_dir();
    let id = DIR_COUNTER.fetch_add(1, Ordering::SeqCst);
    dir.push(format!("fnirs_workload_ci_select_{}_{}", std::process::id(), id));
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn write_result(root: &Path, subject: &str, experiment: &str, val: Option<f64>) {
    let dir = root.join(subject).join(experiment).join("predictions");
    fs::create_dir_all(&dir).unwrap();
    let val = val.map(|v| format!("\"bestepoch_val_accuracy\": {v},")).unwrap_or_default();
    fs::write(
        dir.join("result_save.json"),
        format!(
            "{{{val} \"bestepoch_test_logits\": [[1.0, 0.0]], \"bestepoch_test_class_labels\": [0]}}"
        ),
    )
    .unwrap();
}

#[test]
fn test_highest_validation_accuracy_wins() {
    let root = make_temp_dir();
    write_result(&root, "7", "lr0.001", Some(55.0));
    write_result(&root, "7", "lr0.01", Some(80.0));
    write_result(&root, "7", "lr0.1", Some(60.0));

    let selection = select_subject(&root, &SubjectId::from(7)).unwrap();
    assert_eq!(selection.experiment, "lr0.01");
    assert_eq!(selection.val_accuracy, 80.0);
    assert_eq!(selection.dir, root.join("7").join("lr0.01"));
}

#[test]
fn test_tie_keeps_smallest_name() {
    let root = make_temp_dir();
    write_result(&root, "7", "b", Some(75.0));
    write_result(&root, "7", "a", Some(75.0));
    write_result(&root, "7", "c", Some(75.0));
    let selection = select_subject(&root, &SubjectId::from(7)).unwrap();
    assert_eq!(selection.experiment, "a");
}

#[test]
fn test_experiments_without_val_accuracy_are_skipped() {
    let root = make_temp_dir();
    write_result(&root, "7", "a", None);
    write_result(&root, "7", "b", Some(40.0));
    fs::create_dir_all(root.join("7").join("c")).unwrap();
    let selection = select_subject(&root, &SubjectId::from(7)).unwrap();
    assert_eq!(selection.experiment, "b");

    write_result(&root, "8", "a", None);
    assert!(matches!(
        select_subject(&root, &SubjectId::from(8)),
        Err(InputError::MissingInput(_))
    ));
}

#[test]
fn test_missing_subject_directory() {
    let root = make_temp_dir();
    assert!(matches!(
        select_subject(&root, &SubjectId::from(3)),
        Err(InputError::MissingInput(_))
    ));
}

#[test]
fn test_run_stage1_builds_lookup_once_per_subject() {
    let root = make_temp_dir();
    write_result(&root, "1", "x", Some(50.0));
    write_result(&root, "2", "y", Some(90.0));
    let subjects = [SubjectId::from(2), SubjectId::from(1), SubjectId::from(2)];

    let out = run_stage1(&root, &subjects).unwrap();
    assert_eq!(out.selections.len(), 2);
    assert_eq!(out.lookup.subjects(), vec![SubjectId::from(2), SubjectId::from(1)]);
    assert_eq!(
        out.lookup.experiment_dir(&SubjectId::from(1)).unwrap(),
        root.join("1").join("x")
    );
}
