use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum MetricsError {
    #[error("score rows ({scores}) and labels ({labels}) differ in length")]
    LengthMismatch { scores: usize, labels: usize },
    #[error("label {label} outside {n_classes} classes")]
    LabelOutOfRange { label: u32, n_classes: usize },
}

/// Index of the first maximal score. NaN never wins; an all-NaN or empty row
/// yields 0.
pub fn argmax(row: &[f64]) -> usize {
    let mut best = 0usize;
    let mut best_value = f64::NEG_INFINITY;
    let mut found = false;
    for (i, &v) in row.iter().enumerate() {
        if v.is_nan() {
            continue;
        }
        if !found || v > best_value {
            best = i;
            best_value = v;
            found = true;
        }
    }
    best
}

pub fn predicted_classes(scores: &[Vec<f64>]) -> Vec<u32> {
    scores.iter().map(|row| argmax(row) as u32).collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfusionMatrix {
    pub n_classes: usize,
    /// `counts[true][predicted]`.
    pub counts: Vec<Vec<u64>>,
}

impl ConfusionMatrix {
    pub fn from_predictions(
        n_classes: usize,
        predicted: &[u32],
        labels: &[u32],
    ) -> Result<Self, MetricsError> {
        if predicted.len() != labels.len() {
            return Err(MetricsError::LengthMismatch {
                scores: predicted.len(),
                labels: labels.len(),
            });
        }
        let mut counts = vec![vec![0u64; n_classes]; n_classes];
        for (&p, &t) in predicted.iter().zip(labels) {
            for label in [p, t] {
                if label as usize >= n_classes {
                    return Err(MetricsError::LabelOutOfRange { label, n_classes });
                }
            }
            counts[t as usize][p as usize] += 1;
        }
        Ok(Self { n_classes, counts })
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().flatten().sum()
    }

    pub fn correct(&self) -> u64 {
        (0..self.n_classes).map(|i| self.counts[i][i]).sum()
    }
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation.
pub fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / values.len() as f64;
    var.sqrt()
}

/// Percentile of ascending `sorted` data, linear interpolation between the
/// order statistics around `p / 100 * (n - 1)`.
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let n = sorted.len();
    let pos = (p / 100.0).clamp(0.0, 1.0) * (n - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    if lo == hi {
        return sorted[lo];
    }
    let frac = pos - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

pub fn sort_ascending(values: &mut [f64]) {
    values.sort_by(|a, b| a.total_cmp(b));
}

#[cfg(test)]
#[path = "../../tests/src_inline/model/metrics.rs"]
mod tests;
