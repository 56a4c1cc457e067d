use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use thiserror::Error;

use crate::input::predictions::{PredictionRecord, PredictionStore};
use crate::input::{InputError, SubjectId};
use crate::model::metrics::{argmax, percentile, sort_ascending};

pub const DEFAULT_BOOTSTRAP_SAMPLES: usize = 5000;
pub const DEFAULT_UPPER_PERCENTILE: f64 = 97.5;
pub const DEFAULT_LOWER_PERCENTILE: f64 = 2.5;
pub const DEFAULT_SEED: u64 = 0;

const PROGRESS_EVERY: usize = 1000;

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("candidate subject list is empty")]
    NoCandidates,
    #[error("number of bootstrap samples must be positive")]
    NoSamples,
    #[error("{name} percentile {value} is outside [0, 100]")]
    PercentileOutOfRange { name: &'static str, value: f64 },
    #[error("lower percentile {lower} exceeds upper percentile {upper}")]
    InvertedPercentiles { lower: f64, upper: f64 },
    #[error("cannot load predictions for subject {subject}: {source}")]
    Store {
        subject: SubjectId,
        #[source]
        source: InputError,
    },
    #[error("subject {0} has no evaluated chunks")]
    EmptyRecord(SubjectId),
    #[error("subject {subject} has {scores} score rows but {labels} labels")]
    LengthMismatch {
        subject: SubjectId,
        scores: usize,
        labels: usize,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BootstrapParams {
    pub num_samples: usize,
    pub upper_percentile: f64,
    pub lower_percentile: f64,
}

impl Default for BootstrapParams {
    fn default() -> Self {
        Self {
            num_samples: DEFAULT_BOOTSTRAP_SAMPLES,
            upper_percentile: DEFAULT_UPPER_PERCENTILE,
            lower_percentile: DEFAULT_LOWER_PERCENTILE,
        }
    }
}

impl BootstrapParams {
    pub fn validate(&self) -> Result<(), BootstrapError> {
        if self.num_samples == 0 {
            return Err(BootstrapError::NoSamples);
        }
        for (name, value) in [
            ("upper", self.upper_percentile),
            ("lower", self.lower_percentile),
        ] {
            if !(0.0..=100.0).contains(&value) {
                return Err(BootstrapError::PercentileOutOfRange { name, value });
            }
        }
        if self.lower_percentile > self.upper_percentile {
            return Err(BootstrapError::InvertedPercentiles {
                lower: self.lower_percentile,
                upper: self.upper_percentile,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ConfidenceInterval {
    pub upper: f64,
    pub lower: f64,
}

impl ConfidenceInterval {
    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }
}

/// One candidate subject with its record and per-chunk correctness.
#[derive(Debug, Clone)]
pub struct SubjectPredictions {
    pub subject: SubjectId,
    pub record: PredictionRecord,
    correct: Vec<bool>,
}

impl SubjectPredictions {
    pub fn new(subject: SubjectId, record: PredictionRecord) -> Result<Self, BootstrapError> {
        if record.scores.len() != record.labels.len() {
            return Err(BootstrapError::LengthMismatch {
                subject,
                scores: record.scores.len(),
                labels: record.labels.len(),
            });
        }
        if record.labels.is_empty() {
            return Err(BootstrapError::EmptyRecord(subject));
        }
        let correct = record
            .scores
            .iter()
            .zip(&record.labels)
            .map(|(row, &label)| argmax(row) as u32 == label)
            .collect();
        Ok(Self {
            subject,
            record,
            correct,
        })
    }

    /// Accuracy on the full held-out set, without resampling.
    pub fn observed_accuracy(&self) -> f64 {
        let hits = self.correct.iter().filter(|&&c| c).count();
        hits as f64 / self.correct.len() as f64 * 100.0
    }

    fn resampled_accuracy<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        let n = self.correct.len();
        let hits = (0..n)
            .filter(|_| self.correct[rng.gen_range(0..n)])
            .count();
        hits as f64 / n as f64 * 100.0
    }
}

#[derive(Debug, Clone)]
pub struct Stage2Output {
    pub interval: ConfidenceInterval,
    /// Bootstrap sample accuracies in draw order.
    pub samples: Vec<f64>,
}

/// Resolves every candidate through the store before any resampling starts.
/// Candidates keep their order; duplicates load twice.
pub fn load_subjects(
    candidates: &[SubjectId],
    store: &dyn PredictionStore,
) -> Result<Vec<SubjectPredictions>, BootstrapError> {
    if candidates.is_empty() {
        return Err(BootstrapError::NoCandidates);
    }
    candidates
        .iter()
        .map(|subject| {
            let record = store.load(subject).map_err(|source| BootstrapError::Store {
                subject: subject.clone(),
                source,
            })?;
            SubjectPredictions::new(subject.clone(), record)
        })
        .collect()
}

/// Nested bootstrap over subjects and, within each drawn subject occurrence,
/// over its held-out chunks. All draws come from `rng` in a fixed order: the
/// subject draws of a repetition first, then each occurrence's chunk draws.
pub fn run_stage2<R: Rng + ?Sized>(
    subjects: &[SubjectPredictions],
    params: &BootstrapParams,
    rng: &mut R,
) -> Result<Stage2Output, BootstrapError> {
    params.validate()?;
    if subjects.is_empty() {
        return Err(BootstrapError::NoCandidates);
    }

    let mut samples = Vec::with_capacity(params.num_samples);
    for i in 0..params.num_samples {
        samples.push(sample_accuracy(subjects, rng));
        if (i + 1) % PROGRESS_EVERY == 0 {
            tracing::debug!(done = i + 1, total = params.num_samples, "bootstrap progress");
        }
    }

    let mut sorted = samples.clone();
    sort_ascending(&mut sorted);
    let interval = ConfidenceInterval {
        upper: percentile(&sorted, params.upper_percentile),
        lower: percentile(&sorted, params.lower_percentile),
    };
    tracing::info!(
        subjects = subjects.len(),
        samples = params.num_samples,
        upper = interval.upper,
        lower = interval.lower,
        "bootstrap confidence interval"
    );

    Ok(Stage2Output { interval, samples })
}

/// Validates, loads and resamples with a generator seeded once from `seed`.
pub fn bootstrap_ci(
    candidates: &[SubjectId],
    store: &dyn PredictionStore,
    params: &BootstrapParams,
    seed: u64,
) -> Result<Stage2Output, BootstrapError> {
    params.validate()?;
    let subjects = load_subjects(candidates, store)?;
    let mut rng = StdRng::seed_from_u64(seed);
    run_stage2(&subjects, params, &mut rng)
}

fn sample_accuracy<R: Rng + ?Sized>(subjects: &[SubjectPredictions], rng: &mut R) -> f64 {
    let n = subjects.len();
    let drawn: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
    let total: f64 = drawn
        .iter()
        .map(|&idx| subjects[idx].resampled_accuracy(rng))
        .sum();
    total / n as f64
}

#[cfg(test)]
#[path = "../../tests/src_inline/pipeline/stage2_bootstrap.rs"]
mod tests;
