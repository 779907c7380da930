//! Synthetic emotion labels.
//!
//! ```text
//! standardized rows ──· w──▶ scores ──min-max──▶ continuous [0, 10]
//!                                                     │
//!                                     K+1 quantile edges, ε-nudged
//!                                                     │
//!                                                     ▼
//!                                           class index [0, K-1]
//! ```
use log::warn;

use crate::data::model::FeatureMatrix;
use crate::error::{Error, Result};

/// Upper end of the continuous label range.
pub const SCORE_RANGE: f64 = 10.0;

/// Continuous label per row: `row · weights`, min-max rescaled to `[0, 10]`
/// over the whole matrix.
///
/// When every score is equal the range is degenerate and all labels are `0.0`.
pub fn continuous_labels(x: &FeatureMatrix, weights: &[f64]) -> Result<Vec<f64>> {
    if weights.len() != x.n_cols() {
        return Err(Error::Shape(format!(
            "{} weights for {} channels",
            weights.len(),
            x.n_cols()
        )));
    }
    if x.n_rows() < 2 {
        return Err(Error::InsufficientRows {
            required: 2,
            actual: x.n_rows(),
        });
    }

    let scores: Vec<f64> = x
        .rows()
        .map(|row| row.iter().zip(weights).map(|(a, b)| a * b).sum())
        .collect();

    let min = scores.iter().copied().fold(f64::INFINITY, f64::min);
    let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;
    if range == 0.0 {
        warn!("all synthetic scores are equal ({min}); continuous labels set to 0");
        return Ok(vec![0.0; scores.len()]);
    }

    Ok(scores
        .iter()
        .map(|&s| (s - min) / range * SCORE_RANGE)
        .collect())
}

/// `n_classes + 1` edges at the evenly spaced quantiles `0, 1/K, …, 1`,
/// made strictly increasing by bumping ties up by `epsilon`.
pub fn quantile_edges(values: &[f64], n_classes: usize, epsilon: f64) -> Result<Vec<f64>> {
    if values.is_empty() {
        return Err(Error::EmptyDataset);
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let step = 1.0 / n_classes as f64;
    let mut edges: Vec<f64> = (0..=n_classes)
        .map(|i| {
            let q = if i == n_classes { 1.0 } else { i as f64 * step };
            linear_quantile(&sorted, q)
        })
        .collect();

    let mut nudged = 0;
    for i in 1..edges.len() {
        if edges[i] <= edges[i - 1] {
            edges[i] = edges[i - 1] + epsilon;
            nudged += 1;
        }
    }
    if nudged > 0 {
        warn!("{nudged} tied quantile edges nudged by {epsilon:e}");
    }
    Ok(edges)
}

/// Class per value: the number of inner edges strictly below it, so a value
/// equal to an edge falls in the lower bin.
pub fn digitize(values: &[f64], edges: &[f64]) -> Vec<usize> {
    let inner = match edges.len() {
        0..=2 => &[][..],
        n => &edges[1..n - 1],
    };
    values
        .iter()
        .map(|&v| inner.iter().filter(|&&e| e < v).count())
        .collect()
}

/// Quantile-bin continuous labels into `n_classes` roughly equal classes.
///
/// A dataset with fewer rows than classes cannot populate every bin and is
/// rejected.
pub fn categorical_labels(values: &[f64], n_classes: usize, epsilon: f64) -> Result<Vec<usize>> {
    if n_classes < 2 {
        return Err(Error::Config(format!(
            "need at least 2 classes, got {n_classes}"
        )));
    }
    if values.len() < n_classes {
        return Err(Error::InsufficientRows {
            required: n_classes,
            actual: values.len(),
        });
    }
    let edges = quantile_edges(values, n_classes, epsilon)?;
    Ok(digitize(values, &edges))
}

/// Linear-interpolation quantile of sorted data at `q ∈ [0, 1]`.
///
/// The lerp is evaluated from the nearer end so `q = 1` hits the maximum
/// exactly.
fn linear_quantile(sorted: &[f64], q: f64) -> f64 {
    let n = sorted.len();
    let pos = q * (n - 1) as f64;
    let lo = (pos.floor() as usize).min(n - 1);
    let hi = (lo + 1).min(n - 1);
    let t = pos - lo as f64;
    let (a, b) = (sorted[lo], sorted[hi]);
    let diff = b - a;
    if t >= 0.5 {
        b - diff * (1.0 - t)
    } else {
        a + diff * t
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn quantile_interpolates() {
        let sorted = [0.0, 2.0, 4.0, 10.0];
        assert_eq!(linear_quantile(&sorted, 0.0), 0.0);
        assert_eq!(linear_quantile(&sorted, 0.5), 3.0);
        assert_eq!(linear_quantile(&sorted, 0.25), 1.5);
        assert_eq!(linear_quantile(&sorted, 0.75), 5.5);
        assert_eq!(linear_quantile(&sorted, 1.0), 10.0);
    }

    #[test]
    fn tied_edges_become_strictly_increasing() {
        let edges = quantile_edges(&[0.0, 0.0, 0.0, 10.0], 4, 1e-6).unwrap();
        assert_eq!(edges[0], 0.0);
        assert_abs_diff_eq!(edges[1], 1e-6, epsilon = 1e-15);
        assert_abs_diff_eq!(edges[2], 2e-6, epsilon = 1e-15);
        assert_abs_diff_eq!(edges[3], 2.5, epsilon = 1e-12);
        assert_eq!(edges[4], 10.0);
        assert!(edges.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn digitize_is_right_closed() {
        let edges = [0.0, 3.0, 10.0];
        assert_eq!(digitize(&[0.0, 3.0, 3.0001, 10.0], &edges), vec![0, 0, 1, 1]);
    }

    #[test]
    fn ties_bin_into_lowest_class() {
        let classes = categorical_labels(&[0.0, 0.0, 0.0, 10.0], 4, 1e-6).unwrap();
        assert_eq!(classes, vec![0, 0, 0, 3]);
    }

    #[test]
    fn single_row_is_rejected() {
        let x = FeatureMatrix::from_rows(2, &[vec![1.0, 2.0]]).unwrap();
        assert!(matches!(
            continuous_labels(&x, &[1.0, 1.0]),
            Err(Error::InsufficientRows { required: 2, actual: 1 })
        ));
        assert!(matches!(
            categorical_labels(&[5.0], 6, 1e-6),
            Err(Error::InsufficientRows { required: 6, actual: 1 })
        ));
    }

    #[test]
    fn equal_scores_degrade_to_zero() {
        let x = FeatureMatrix::from_rows(1, &[vec![1.0], vec![1.0], vec![1.0]]).unwrap();
        assert_eq!(continuous_labels(&x, &[2.0]).unwrap(), vec![0.0; 3]);
    }

    #[test]
    fn weight_length_checked() {
        let x = FeatureMatrix::from_rows(2, &[vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
        assert!(matches!(continuous_labels(&x, &[1.0]), Err(Error::Shape(_))));
    }
}
