use thiserror::Error;

use crate::input::chunks::ChunkSet;
use crate::model::metrics::{mean, std_dev};

#[derive(Debug, Error, PartialEq)]
pub enum FeatureError {
    #[error("empty series")]
    EmptySeries,
    #[error("chunk {chunk} holds {found} values, expected {expected}")]
    ShapeMismatch {
        chunk: u64,
        found: usize,
        expected: usize,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
}

/// Least-squares line through `values` sampled at `t = linspace(0, 1, n)`.
pub fn slope_and_intercept(values: &[f64]) -> Result<LinearFit, FeatureError> {
    let n = values.len();
    if n == 0 {
        return Err(FeatureError::EmptySeries);
    }
    let x_mean = mean(values);
    if n == 1 {
        return Ok(LinearFit {
            slope: 0.0,
            intercept: x_mean,
        });
    }

    let step = 1.0 / (n - 1) as f64;
    let t_mean = 0.5;
    let mut num = 0.0;
    let mut den = 0.0;
    for (i, &x) in values.iter().enumerate() {
        let dt = i as f64 * step - t_mean;
        num += (x - x_mean) * dt;
        den += dt * dt;
    }
    let slope = num / den;
    Ok(LinearFit {
        slope,
        intercept: x_mean - slope * t_mean,
    })
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<f64>>,
    pub labels: Vec<u32>,
}

/// Per-chunk summary features: channel means, standard deviations, slopes and
/// intercepts, in that block order.
pub fn featurize(set: &ChunkSet) -> Result<FeatureMatrix, FeatureError> {
    let n_channels = set.n_channels();
    let expected = set.window_size * n_channels;

    let mut columns = Vec::with_capacity(4 * n_channels);
    for block in ["mean", "std", "slope", "intercept"] {
        for name in &set.channels {
            columns.push(format!("{name}_{block}"));
        }
    }

    let mut rows = Vec::with_capacity(set.len());
    for chunk in &set.chunks {
        if chunk.values.len() != expected {
            return Err(FeatureError::ShapeMismatch {
                chunk: chunk.id,
                found: chunk.values.len(),
                expected,
            });
        }
        let mut means = Vec::with_capacity(n_channels);
        let mut stds = Vec::with_capacity(n_channels);
        let mut slopes = Vec::with_capacity(n_channels);
        let mut intercepts = Vec::with_capacity(n_channels);
        for channel in 0..n_channels {
            let series = set.channel_series(chunk, channel);
            let fit = slope_and_intercept(&series)?;
            means.push(mean(&series));
            stds.push(std_dev(&series));
            slopes.push(fit.slope);
            intercepts.push(fit.intercept);
        }
        let mut row = means;
        row.extend(stds);
        row.extend(slopes);
        row.extend(intercepts);
        rows.push(row);
    }

    Ok(FeatureMatrix {
        columns,
        rows,
        labels: set.labels(),
    })
}

#[cfg(test)]
#[path = "../../tests/src_inline/model/features.rs"]
mod tests;
