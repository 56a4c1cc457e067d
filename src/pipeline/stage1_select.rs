use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::input::lookup::LookupTable;
use crate::input::predictions::{EvaluationResult, RESULT_FILE};
use crate::input::{InputError, SubjectId};

#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub subject: SubjectId,
    pub experiment: String,
    pub dir: PathBuf,
    pub val_accuracy: f64,
    pub test_accuracy: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct Stage1Output {
    pub lookup: LookupTable,
    pub selections: Vec<Selection>,
}

/// Picks, per subject, the hyperparameter setting with the highest validation
/// accuracy under `<results_root>/<subject>/<experiment>/`. Ties keep the
/// lexicographically smallest experiment name.
pub fn run_stage1(results_root: &Path, subjects: &[SubjectId]) -> Result<Stage1Output, InputError> {
    let mut lookup = LookupTable::new();
    let mut selections = Vec::with_capacity(subjects.len());
    let mut seen = BTreeSet::new();

    for subject in subjects {
        if !seen.insert(subject.clone()) {
            tracing::warn!(%subject, "subject listed twice; selecting once");
            continue;
        }
        let selection = select_subject(results_root, subject)?;
        tracing::info!(
            %subject,
            experiment = %selection.experiment,
            val_accuracy = selection.val_accuracy,
            "selected experiment"
        );
        lookup.insert(subject.clone(), selection.dir.clone())?;
        selections.push(selection);
    }

    Ok(Stage1Output { lookup, selections })
}

pub fn select_subject(results_root: &Path, subject: &SubjectId) -> Result<Selection, InputError> {
    let subject_dir = results_root.join(subject.as_str());
    if !subject_dir.is_dir() {
        return Err(InputError::MissingInput(format!(
            "no results directory for subject {subject}: {}",
            subject_dir.display()
        )));
    }

    let mut experiments = Vec::new();
    for entry in fs::read_dir(&subject_dir).map_err(|e| InputError::io(&subject_dir, e))? {
        let entry = entry.map_err(|e| InputError::io(&subject_dir, e))?;
        let path = entry.path();
        if path.is_dir() {
            experiments.push((entry.file_name().to_string_lossy().into_owned(), path));
        }
    }
    experiments.sort_by(|a, b| a.0.cmp(&b.0));

    let mut best: Option<Selection> = None;
    for (name, dir) in experiments {
        let result_path = dir.join(RESULT_FILE);
        if !result_path.exists() {
            tracing::debug!(%subject, experiment = %name, "no cached result; skipping");
            continue;
        }
        let result = EvaluationResult::load(&result_path)?;
        let Some(val_accuracy) = result.bestepoch_val_accuracy.filter(|v| v.is_finite()) else {
            tracing::warn!(
                %subject,
                experiment = %name,
                "result has no usable validation accuracy; skipping"
            );
            continue;
        };
        let better = best
            .as_ref()
            .is_none_or(|b| val_accuracy > b.val_accuracy);
        if better {
            best = Some(Selection {
                subject: subject.clone(),
                experiment: name,
                dir,
                val_accuracy,
                test_accuracy: result.bestepoch_test_accuracy,
            });
        }
    }

    best.ok_or_else(|| {
        InputError::MissingInput(format!(
            "no experiment with a validation accuracy for subject {subject} under {}",
            subject_dir.display()
        ))
    })
}

#[cfg(test)]
#[path = "../../tests/src_inline/pipeline/stage1_select.rs"]
mod tests;
