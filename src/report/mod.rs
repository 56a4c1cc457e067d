pub mod features;
pub mod text;

use serde::Serialize;

use crate::input::SubjectId;
use crate::model::metrics::ConfusionMatrix;
use crate::pipeline::stage2_bootstrap::ConfidenceInterval;

#[derive(Debug, Clone, Serialize)]
pub struct SubjectSummary {
    pub subject: SubjectId,
    pub n_chunks: usize,
    pub observed_accuracy: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub val_accuracy: Option<f64>,
    #[serde(skip)]
    pub confusion: ConfusionMatrix,
}

#[derive(Debug, Clone, Serialize)]
pub struct SummaryData {
    pub tool: String,
    pub version: String,
    pub task: String,
    pub seed: u64,
    pub num_samples: usize,
    pub upper_percentile: f64,
    pub lower_percentile: f64,
    pub n_candidates: usize,
    pub n_unique_subjects: usize,
    pub interval: ConfidenceInterval,
    pub observed_mean_accuracy: f64,
    pub sample_mean: f64,
    pub sample_std: f64,
    pub subjects: Vec<SubjectSummary>,
}

pub fn format_f64_4(v: f64) -> String {
    format!("{:.4}", v)
}

pub fn class_label(names: &[&str], idx: usize) -> String {
    names
        .get(idx)
        .map(|s| s.to_string())
        .unwrap_or_else(|| format!("class{idx}"))
}

#[cfg(test)]
#[path = "../../tests/src_inline/report/mod.rs"]
mod tests;
