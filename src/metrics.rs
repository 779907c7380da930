//! Hold-out evaluation report.
//!
//! Purely informational: the report is logged and never feeds back into the
//! exported models.
use log::info;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::data::model::FeatureMatrix;

/// Shuffle `0..n` with a seeded RNG and split off `ceil(n · test_fraction)`
/// indices for testing.  Returns `(train, test)`.
pub fn train_test_split(n: usize, test_fraction: f64, seed: u64) -> (Vec<usize>, Vec<usize>) {
    let mut idx: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    idx.shuffle(&mut rng);
    let n_test = ((n as f64 * test_fraction).ceil() as usize).min(n);
    let train = idx.split_off(n_test);
    (train, idx)
}

pub fn mean_squared_error(y_true: &[f64], y_pred: &[f64]) -> f64 {
    let n = y_true.len() as f64;
    y_true
        .iter()
        .zip(y_pred)
        .map(|(t, p)| (t - p) * (t - p))
        .sum::<f64>()
        / n
}

/// Coefficient of determination.  A constant target scores 0 unless the
/// prediction is perfect.
pub fn r2_score(y_true: &[f64], y_pred: &[f64]) -> f64 {
    let mean = y_true.iter().sum::<f64>() / y_true.len() as f64;
    let ss_res: f64 = y_true.iter().zip(y_pred).map(|(t, p)| (t - p).powi(2)).sum();
    let ss_tot: f64 = y_true.iter().map(|t| (t - mean).powi(2)).sum();
    if ss_tot == 0.0 {
        return if ss_res == 0.0 { 1.0 } else { 0.0 };
    }
    1.0 - ss_res / ss_tot
}

pub fn accuracy(y_true: &[usize], y_pred: &[usize]) -> f64 {
    let correct = y_true.iter().zip(y_pred).filter(|(t, p)| t == p).count();
    correct as f64 / y_true.len() as f64
}

/// `m[true][predicted]` counts.
pub fn confusion_matrix(y_true: &[usize], y_pred: &[usize], n_classes: usize) -> Vec<Vec<usize>> {
    let mut m = vec![vec![0; n_classes]; n_classes];
    for (&t, &p) in y_true.iter().zip(y_pred) {
        if t < n_classes && p < n_classes {
            m[t][p] += 1;
        }
    }
    m
}

/// Precision, recall and F1 for one class.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassScores {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    /// Number of true members in the test split.
    pub support: usize,
}

/// Per-class scores from a `[true][predicted]` confusion matrix.  A ratio
/// with a zero denominator scores 0.
pub fn classification_report(confusion: &[Vec<usize>]) -> Vec<ClassScores> {
    (0..confusion.len())
        .map(|k| {
            let tp = confusion[k][k] as f64;
            let support: usize = confusion[k].iter().sum();
            let predicted: usize = confusion.iter().map(|row| row[k]).sum();
            let precision = ratio(tp, predicted as f64);
            let recall = ratio(tp, support as f64);
            ClassScores {
                precision,
                recall,
                f1: ratio(2.0 * precision * recall, precision + recall),
                support,
            }
        })
        .collect()
}

fn ratio(num: f64, den: f64) -> f64 {
    if den == 0.0 {
        0.0
    } else {
        num / den
    }
}

/// Summary statistics of one channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelSummary {
    pub mean: f64,
    /// Sample standard deviation (n - 1); 0 for a single row.
    pub std: f64,
    pub min: f64,
    pub max: f64,
}

/// Per-column mean, std, min and max.
pub fn describe(x: &FeatureMatrix) -> Vec<ChannelSummary> {
    let n = x.n_rows() as f64;
    (0..x.n_cols())
        .map(|j| {
            let col = x.column(j);
            let mean = col.iter().sum::<f64>() / n;
            let ss: f64 = col.iter().map(|v| (v - mean).powi(2)).sum();
            ChannelSummary {
                mean,
                std: if col.len() > 1 { (ss / (n - 1.0)).sqrt() } else { 0.0 },
                min: col.iter().copied().fold(f64::INFINITY, f64::min),
                max: col.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            }
        })
        .collect()
}

pub fn log_summary(summary: &[ChannelSummary], channel_labels: &[String]) {
    info!("Channel statistics (mean, std, min, max):");
    for (j, s) in summary.iter().enumerate() {
        let name = channel_labels.get(j).map(String::as_str).unwrap_or("?");
        info!(
            "  {name:>4} {:>10.4} {:>10.4} {:>10.4} {:>10.4}",
            s.mean, s.std, s.min, s.max
        );
    }
}

/// The `k` largest coefficients by magnitude as `(channel, |coef|)`.
pub fn top_coefficients(coef: &[f64], k: usize) -> Vec<(usize, f64)> {
    let mut ranked: Vec<(usize, f64)> = coef.iter().map(|c| c.abs()).enumerate().collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
    ranked.truncate(k);
    ranked
}

/// Scores of models fitted on the training split and evaluated on the test
/// split.
#[derive(Debug, Clone)]
pub struct EvaluationReport {
    pub mse: f64,
    pub r2: f64,
    pub accuracy: f64,
    pub confusion: Vec<Vec<usize>>,
    pub per_class: Vec<ClassScores>,
    pub top_channels: Vec<(usize, f64)>,
}

impl EvaluationReport {
    pub fn log(&self, channel_labels: &[String], emotion_labels: &[String]) {
        info!("Linear regression: MSE {:.4}, R² {:.4}", self.mse, self.r2);
        info!("Top channels by |coefficient|:");
        for &(ch, c) in &self.top_channels {
            let name = channel_labels.get(ch).map(String::as_str).unwrap_or("?");
            info!("  {name}: {c:.4}");
        }
        info!("Logistic regression: accuracy {:.4}", self.accuracy);
        info!("Confusion matrix (rows = true, columns = predicted):");
        for (k, row) in self.confusion.iter().enumerate() {
            let name = emotion_labels.get(k).map(String::as_str).unwrap_or("?");
            info!("  {name:>10} {row:?}");
        }
        info!("Per-class scores (precision, recall, F1, support):");
        for (k, c) in self.per_class.iter().enumerate() {
            let name = emotion_labels.get(k).map(String::as_str).unwrap_or("?");
            info!(
                "  {name:>10} {:.3} {:.3} {:.3} {}",
                c.precision, c.recall, c.f1, c.support
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn split_partitions_indices() {
        let (train, test) = train_test_split(10, 0.2, 42);
        assert_eq!(test.len(), 2);
        assert_eq!(train.len(), 8);
        let mut all: Vec<usize> = train.iter().chain(&test).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..10).collect::<Vec<_>>());
        assert_eq!(train_test_split(10, 0.2, 42), (train, test));
    }

    #[test]
    fn regression_scores() {
        let t = [1.0, 2.0, 3.0];
        assert_eq!(mean_squared_error(&t, &[1.0, 2.0, 4.0]), 1.0 / 3.0);
        assert_abs_diff_eq!(r2_score(&t, &t), 1.0);
        assert_abs_diff_eq!(r2_score(&t, &[2.0, 2.0, 2.0]), 0.0);
    }

    #[test]
    fn classification_scores() {
        let t = [0, 1, 2, 2];
        let p = [0, 2, 2, 2];
        assert_eq!(accuracy(&t, &p), 0.75);
        assert_eq!(
            confusion_matrix(&t, &p, 3),
            vec![vec![1, 0, 0], vec![0, 0, 1], vec![0, 0, 2]]
        );
    }

    #[test]
    fn per_class_scores_from_confusion() {
        // true [0, 1, 2, 2], predicted [0, 2, 2, 2]
        let m = vec![vec![1, 0, 0], vec![0, 0, 1], vec![0, 0, 2]];
        let r = classification_report(&m);
        assert_eq!(r[0], ClassScores { precision: 1.0, recall: 1.0, f1: 1.0, support: 1 });
        assert_eq!(r[1], ClassScores { precision: 0.0, recall: 0.0, f1: 0.0, support: 1 });
        assert_abs_diff_eq!(r[2].precision, 2.0 / 3.0);
        assert_abs_diff_eq!(r[2].recall, 1.0);
        assert_abs_diff_eq!(r[2].f1, 0.8, epsilon = 1e-12);
        assert_eq!(r[2].support, 2);
    }

    #[test]
    fn describe_matches_sample_statistics() {
        let x = FeatureMatrix::from_rows(2, &[vec![1.0, 5.0], vec![2.0, 5.0], vec![3.0, 5.0]])
            .unwrap();
        let d = describe(&x);
        assert_abs_diff_eq!(d[0].mean, 2.0);
        assert_abs_diff_eq!(d[0].std, 1.0);
        assert_eq!((d[0].min, d[0].max), (1.0, 3.0));
        assert_eq!(d[1].std, 0.0);
    }

    #[test]
    fn top_coefficients_by_magnitude() {
        let top = top_coefficients(&[0.1, -3.0, 2.0, 0.5], 2);
        assert_eq!(top, vec![(1, 3.0), (2, 2.0)]);
    }
}
