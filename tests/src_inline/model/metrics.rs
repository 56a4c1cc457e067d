use super::*;

#[test]
fn test_argmax_first_max_wins() {
    assert_eq!(argmax(&[0.1, 0.7, 0.7]), 1);
    assert_eq!(argmax(&[2.0, -1.0]), 0);
    assert_eq!(argmax(&[-3.0, -2.0, -5.0]), 1);
}

#[test]
fn test_argmax_skips_nan() {
    assert_eq!(argmax(&[f64::NAN, 0.2, 0.1]), 1);
    assert_eq!(argmax(&[f64::NAN, f64::NAN]), 0);
    assert_eq!(argmax(&[]), 0);
}

#[test]
fn test_predicted_classes() {
    let scores = vec![vec![0.9, 0.1], vec![0.2, 0.8], vec![0.5, 0.5]];
    assert_eq!(predicted_classes(&scores), vec![0, 1, 0]);
}

#[test]
fn test_confusion_matrix_length_mismatch() {
    let err = ConfusionMatrix::from_predictions(2, &[0], &[0, 1]).unwrap_err();
    assert_eq!(
        err,
        MetricsError::LengthMismatch {
            scores: 1,
            labels: 2
        }
    );
}

#[test]
fn test_confusion_matrix_counts() {
    let predicted = vec![0, 1, 1, 0, 1];
    let labels = vec![0, 1, 0, 0, 1];
    let cm = ConfusionMatrix::from_predictions(2, &predicted, &labels).unwrap();
    assert_eq!(cm.counts, vec![vec![2, 1], vec![0, 2]]);
    assert_eq!(cm.total(), 5);
    assert_eq!(cm.correct(), 4);
}

#[test]
fn test_confusion_matrix_rejects_out_of_range() {
    let err = ConfusionMatrix::from_predictions(2, &[0], &[3]).unwrap_err();
    assert_eq!(
        err,
        MetricsError::LabelOutOfRange {
            label: 3,
            n_classes: 2
        }
    );
}

#[test]
fn test_percentile_linear_interpolation() {
    let sorted = vec![1.0, 2.0, 3.0, 4.0];
    assert_eq!(percentile(&sorted, 0.0), 1.0);
    assert_eq!(percentile(&sorted, 100.0), 4.0);
    assert!((percentile(&sorted, 50.0) - 2.5).abs() < 1e-12);
    // pos = 0.25 * 3 = 0.75
    assert!((percentile(&sorted, 25.0) - 1.75).abs() < 1e-12);
    assert_eq!(percentile(&[7.0], 97.5), 7.0);
}

#[test]
fn test_mean_and_population_std() {
    let v = vec![2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
    assert_eq!(mean(&v), 5.0);
    assert_eq!(std_dev(&v), 2.0);
    assert_eq!(mean(&[]), 0.0);
}

#[test]
fn test_sort_ascending() {
    let mut v = vec![3.0, -1.0, 2.5];
    sort_ascending(&mut v);
    assert_eq!(v, vec![-1.0, 2.5, 3.0]);
}
