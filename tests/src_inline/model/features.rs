use super::*;
use crate::input::chunks::{Chunk, ChunkSet};

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

fn two_channel_set() -> ChunkSet {
    ChunkSet {
        window_size: 3,
        channels: vec!["hbo_1".to_string(), "hbr_1".to_string()],
        chunks: vec![
            Chunk {
                id: 0,
                label: 1,
                values: vec![1.0, 5.0, 2.0, 5.0, 3.0, 5.0],
            },
            Chunk {
                id: 1,
                label: 0,
                values: vec![3.0, 0.0, 2.0, 1.0, 1.0, 2.0],
            },
        ],
    }
}

#[test]
fn test_slope_and_intercept_of_line() {
    // x = 3 + 2t sampled at t = 0, 0.25, ..., 1
    let values = [3.0, 3.5, 4.0, 4.5, 5.0];
    let fit = slope_and_intercept(&values).unwrap();
    assert!(approx(fit.slope, 2.0));
    assert!(approx(fit.intercept, 3.0));
}

#[test]
fn test_slope_of_constant_is_zero() {
    let fit = slope_and_intercept(&[4.0; 10]).unwrap();
    assert!(approx(fit.slope, 0.0));
    assert!(approx(fit.intercept, 4.0));
}

#[test]
fn test_single_sample_fit() {
    let fit = slope_and_intercept(&[7.5]).unwrap();
    assert_eq!(fit.slope, 0.0);
    assert_eq!(fit.intercept, 7.5);
}

#[test]
fn test_empty_series_rejected() {
    assert_eq!(slope_and_intercept(&[]), Err(FeatureError::EmptySeries));
}

#[test]
fn test_featurize_block_layout() {
    let set = two_channel_set();
    let m = featurize(&set).unwrap();

    assert_eq!(
        m.columns,
        vec![
            "hbo_1_mean",
            "hbr_1_mean",
            "hbo_1_std",
            "hbr_1_std",
            "hbo_1_slope",
            "hbr_1_slope",
            "hbo_1_intercept",
            "hbr_1_intercept",
        ]
    );
    assert_eq!(m.labels, vec![1, 0]);
    assert_eq!(m.rows.len(), 2);

    let row = &m.rows[0];
    assert!(approx(row[0], 2.0));
    assert!(approx(row[1], 5.0));
    assert!(approx(row[2], (2.0f64 / 3.0).sqrt()));
    assert!(approx(row[3], 0.0));
    assert!(approx(row[4], 2.0));
    assert!(approx(row[5], 0.0));
    assert!(approx(row[6], 1.0));
    assert!(approx(row[7], 5.0));

    let row = &m.rows[1];
    assert!(approx(row[4], -2.0));
    assert!(approx(row[5], 2.0));
    assert!(approx(row[6], 3.0));
    assert!(approx(row[7], 0.0));
}

#[test]
fn test_featurize_shape_mismatch() {
    let mut set = two_channel_set();
    set.chunks[1].values.pop();
    let err = featurize(&set).unwrap_err();
    assert_eq!(
        err,
        FeatureError::ShapeMismatch {
            chunk: 1,
            found: 5,
            expected: 6
        }
    );
}
