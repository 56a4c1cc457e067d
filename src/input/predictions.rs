use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::input::lookup::LookupTable;
use crate::input::{InputError, SubjectId};

/// Evaluation artifact location inside one experiment directory.
pub const RESULT_FILE: &str = "predictions/result_save.json";

/// Evaluation results cached by a training run for one subject and one
/// hyperparameter setting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bestepoch_val_accuracy: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bestepoch_test_accuracy: Option<f64>,
    #[serde(alias = "test_scores")]
    pub bestepoch_test_logits: Vec<Vec<f64>>,
    #[serde(alias = "test_labels")]
    pub bestepoch_test_class_labels: Vec<u32>,
}

impl EvaluationResult {
    pub fn load(path: &Path) -> Result<Self, InputError> {
        let raw = std::fs::read_to_string(path).map_err(|e| InputError::io(path, e))?;
        serde_json::from_str(&raw).map_err(|source| InputError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn into_record(self) -> PredictionRecord {
        let mut record =
            PredictionRecord::new(self.bestepoch_test_logits, self.bestepoch_test_class_labels);
        record.val_accuracy = self.bestepoch_val_accuracy;
        record
    }
}

/// Held-out class scores and true labels of one subject.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionRecord {
    pub scores: Vec<Vec<f64>>,
    pub labels: Vec<u32>,
    pub val_accuracy: Option<f64>,
}

impl PredictionRecord {
    pub fn new(scores: Vec<Vec<f64>>, labels: Vec<u32>) -> Self {
        Self {
            scores,
            labels,
            val_accuracy: None,
        }
    }

    pub fn n_chunks(&self) -> usize {
        self.labels.len()
    }

    /// Widest score row; the class count used for confusion matrices.
    pub fn n_classes(&self) -> usize {
        self.scores.iter().map(Vec::len).max().unwrap_or(0)
    }
}

pub trait PredictionStore {
    fn load(&self, subject: &SubjectId) -> Result<PredictionRecord, InputError>;
}

impl PredictionStore for BTreeMap<SubjectId, PredictionRecord> {
    fn load(&self, subject: &SubjectId) -> Result<PredictionRecord, InputError> {
        self.get(subject)
            .cloned()
            .ok_or_else(|| InputError::MissingInput(format!("no predictions for subject {subject}")))
    }
}

/// Resolves subjects through a lookup table to their selected experiment
/// directory and reads the cached evaluation result there.
#[derive(Debug, Clone)]
pub struct LookupStore {
    table: LookupTable,
}

impl LookupStore {
    pub fn new(table: LookupTable) -> Self {
        Self { table }
    }

    pub fn result_path(&self, subject: &SubjectId) -> Result<PathBuf, InputError> {
        let dir = self.table.experiment_dir(subject).ok_or_else(|| {
            InputError::MissingInput(format!("subject {subject} is not in the lookup table"))
        })?;
        Ok(dir.join(RESULT_FILE))
    }
}

impl PredictionStore for LookupStore {
    fn load(&self, subject: &SubjectId) -> Result<PredictionRecord, InputError> {
        let path = self.result_path(subject)?;
        if !path.exists() {
            return Err(InputError::MissingInput(format!(
                "result file for subject {subject} not found: {}",
                path.display()
            )));
        }
        tracing::trace!(%subject, path = %path.display(), "reading cached predictions");
        Ok(EvaluationResult::load(&path)?.into_record())
    }
}

#[cfg(test)]
#[path = "../../tests/src_inline/input/predictions.rs"]
mod tests;
