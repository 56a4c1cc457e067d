use crate::model::features::FeatureMatrix;
use crate::model::metrics::ConfusionMatrix;

use super::features::write_feature_tsv;
use super::text::{render_confusion, render_report_text};
use super::*;

fn summary() -> SummaryData {
    let confusion = ConfusionMatrix::from_predictions(2, &[0, 1, 1], &[0, 1, 0]).unwrap();
    SummaryData {
        tool: "fnirs-workload-ci".to_string(),
        version: "0.1.0".to_string(),
        task: "binary".to_string(),
        seed: 0,
        num_samples: 5000,
        upper_percentile: 97.5,
        lower_percentile: 2.5,
        n_candidates: 1,
        n_unique_subjects: 1,
        interval: ConfidenceInterval {
            upper: 80.0,
            lower: 55.5,
        },
        observed_mean_accuracy: 66.6667,
        sample_mean: 66.0,
        sample_std: 7.0,
        subjects: vec![SubjectSummary {
            subject: SubjectId::from(86),
            n_chunks: 3,
            observed_accuracy: 200.0 / 3.0,
            val_accuracy: None,
            confusion,
        }],
    }
}

#[test]
fn test_class_label_falls_back_to_index() {
    let names = ["0back", "2back"];
    assert_eq!(class_label(&names, 1), "2back");
    assert_eq!(class_label(&names, 3), "class3");
}

#[test]
fn test_render_confusion_layout() {
    let cm = ConfusionMatrix::from_predictions(2, &[0, 1, 1], &[0, 1, 0]).unwrap();
    let text = render_confusion(&cm, &["0back", "2back"]);
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0], "  true\\pred |     0back     2back");
    assert_eq!(lines[1], "      0back |         1         1");
    assert_eq!(lines[2], "      2back |         0         1");
}

#[test]
fn test_report_text_sections() {
    let text = render_report_text(&summary(), &["0back", "2back"], 1.234);
    assert!(text.contains("1. Run"));
    assert!(text.contains("2. Confidence interval"));
    assert!(text.contains(
        "95.0000% interval (2.5000 / 97.5000 percentiles): [55.5000, 80.0000] width 24.5000"
    ));
    assert!(text.contains(
        "subject 86: chunks=3 correct=2 test_accuracy=66.6667 val_accuracy=NA"
    ));
    assert!(text.ends_with("program_time: 1.23 seconds\n"));
}

#[test]
fn test_summary_json_omits_confusion() {
    let json = serde_json::to_value(summary()).unwrap();
    let subject = &json["subjects"][0];
    assert_eq!(subject["subject"], "86");
    assert!(subject.get("confusion").is_none());
    assert!(subject.get("val_accuracy").is_none());
}

#[test]
fn test_feature_tsv_layout() {
    let matrix = FeatureMatrix {
        columns: vec!["c1_mean".to_string(), "c1_std".to_string()],
        rows: vec![vec![1.0, 0.5], vec![-2.0, 0.25]],
        labels: vec![0, 1],
    };
    let path = std::env::temp_dir()
        .join(format!("fnirs_workload_ci_features_{}", std::process::id()))
        .join("features.tsv");
    write_feature_tsv(&matrix, &path).unwrap();
    let text = std::fs::read_to_string(&path).unwrap();
    assert_eq!(
        text,
        "label\tc1_mean\tc1_std\n0\t1.000000\t0.500000\n1\t-2.000000\t0.250000\n"
    );
}
