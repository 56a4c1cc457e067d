use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::input::SubjectId;
use crate::model::metrics::{ConfusionMatrix, MetricsError, mean, predicted_classes, std_dev};
use crate::model::task::ClassificationTask;
use crate::pipeline::stage2_bootstrap::{BootstrapParams, Stage2Output, SubjectPredictions};
use crate::report::text::render_report_text;
use crate::report::{SubjectSummary, SummaryData};

pub const SUMMARY_FILE: &str = "bootstrap_ci.json";
pub const REPORT_FILE: &str = "report.txt";
pub const SUBJECTS_FILE: &str = "subjects.tsv";
pub const SAMPLES_FILE: &str = "bootstrap_samples.tsv";

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot serialize summary: {0}")]
    Json(#[from] serde_json::Error),
    #[error("subject {subject}: {source}")]
    Metrics {
        subject: SubjectId,
        #[source]
        source: MetricsError,
    },
}

#[derive(Debug)]
pub struct Stage3Input<'a> {
    pub subjects: &'a [SubjectPredictions],
    pub bootstrap: &'a Stage2Output,
    pub params: &'a BootstrapParams,
    pub task: ClassificationTask,
    pub seed: u64,
    pub elapsed_secs: f64,
    pub keep_samples: bool,
}

/// Subjects whose score rows are not as wide as the task's class count, with
/// the width found. Reports of such runs label the extra classes by index.
pub fn task_width_mismatches(
    task: ClassificationTask,
    subjects: &[SubjectPredictions],
) -> Vec<(SubjectId, usize)> {
    let mut seen = BTreeSet::new();
    subjects
        .iter()
        .filter(|s| seen.insert(&s.subject))
        .map(|s| (s.subject.clone(), s.record.n_classes()))
        .filter(|&(_, width)| width != task.n_classes())
        .collect()
}

pub fn build_summary(input: &Stage3Input<'_>) -> Result<SummaryData, ReportError> {
    for (subject, width) in task_width_mismatches(input.task, input.subjects) {
        tracing::warn!(
            %subject,
            scores = width,
            task = input.task.name(),
            classes = input.task.n_classes(),
            "score width does not match the classification task"
        );
    }

    let mut seen = BTreeSet::new();
    let mut subjects = Vec::new();
    for s in input.subjects {
        if !seen.insert(s.subject.clone()) {
            continue;
        }
        let n_classes = input.task.n_classes().max(s.record.n_classes());
        let predicted = predicted_classes(&s.record.scores);
        let confusion = ConfusionMatrix::from_predictions(n_classes, &predicted, &s.record.labels)
            .map_err(|source| ReportError::Metrics {
                subject: s.subject.clone(),
                source,
            })?;
        subjects.push(SubjectSummary {
            subject: s.subject.clone(),
            n_chunks: s.record.n_chunks(),
            observed_accuracy: s.observed_accuracy(),
            val_accuracy: s.record.val_accuracy,
            confusion,
        });
    }

    let observed: Vec<f64> = input.subjects.iter().map(|s| s.observed_accuracy()).collect();

    Ok(SummaryData {
        tool: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        task: input.task.name().to_string(),
        seed: input.seed,
        num_samples: input.params.num_samples,
        upper_percentile: input.params.upper_percentile,
        lower_percentile: input.params.lower_percentile,
        n_candidates: input.subjects.len(),
        n_unique_subjects: subjects.len(),
        interval: input.bootstrap.interval,
        observed_mean_accuracy: mean(&observed),
        sample_mean: mean(&input.bootstrap.samples),
        sample_std: std_dev(&input.bootstrap.samples),
        subjects,
    })
}

pub fn write_reports(input: &Stage3Input<'_>, out_dir: &Path) -> Result<SummaryData, ReportError> {
    fs::create_dir_all(out_dir).map_err(|e| io_err(out_dir, e))?;
    let summary = build_summary(input)?;

    let json = serde_json::to_string_pretty(&summary)?;
    write_text(&out_dir.join(SUMMARY_FILE), &json)?;

    let report = render_report_text(&summary, input.task.class_names(), input.elapsed_secs);
    write_text(&out_dir.join(REPORT_FILE), &report)?;

    write_subjects_tsv(&summary, &out_dir.join(SUBJECTS_FILE))?;

    if input.keep_samples {
        write_samples_tsv(&input.bootstrap.samples, &out_dir.join(SAMPLES_FILE))?;
    }

    tracing::info!(out_dir = %out_dir.display(), "reports written");
    Ok(summary)
}

fn write_subjects_tsv(summary: &SummaryData, path: &Path) -> Result<(), ReportError> {
    let file = File::create(path).map_err(|e| io_err(path, e))?;
    let mut w = BufWriter::new(file);
    let mut write = || -> std::io::Result<()> {
        writeln!(w, "subject_id\tn_chunks\ttest_accuracy\tval_accuracy")?;
        for s in &summary.subjects {
            let val = s
                .val_accuracy
                .map(|v| format!("{v:.6}"))
                .unwrap_or_else(|| "NA".to_string());
            writeln!(
                w,
                "{}\t{}\t{:.6}\t{}",
                s.subject, s.n_chunks, s.observed_accuracy, val
            )?;
        }
        w.flush()
    };
    write().map_err(|e| io_err(path, e))
}

fn write_samples_tsv(samples: &[f64], path: &Path) -> Result<(), ReportError> {
    let file = File::create(path).map_err(|e| io_err(path, e))?;
    let mut w = BufWriter::new(file);
    let mut write = || -> std::io::Result<()> {
        writeln!(w, "sample\taccuracy")?;
        for (i, v) in samples.iter().enumerate() {
            writeln!(w, "{i}\t{v:.6}")?;
        }
        w.flush()
    };
    write().map_err(|e| io_err(path, e))
}

fn write_text(path: &Path, contents: &str) -> Result<(), ReportError> {
    fs::write(path, contents).map_err(|e| io_err(path, e))
}

fn io_err(path: &Path, source: std::io::Error) -> ReportError {
    ReportError::Io {
        path: path.to_path_buf(),
        source,
    }
}

#[cfg(test)]
#[path = "../../tests/src_inline/pipeline/stage3_report.rs"]
mod tests;
