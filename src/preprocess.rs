//! Missing-value imputation and per-channel standardization.
//!
//! `impute_column_means`: column-wise mean fill
//!   every missing cell takes the mean of the present cells of its column.
//!
//! `StandardScaler`: per-column z-score
//!   μ = column mean,  σ = column std (ddof=0)
//!   x' = (x - μ) / σ,  with σ := 1 for constant columns
use log::warn;

use crate::data::model::{Dataset, FeatureMatrix};
use crate::error::{Error, Result};

/// Replace every missing cell with its column mean.
///
/// A column with no values at all is filled with `0.0`.
pub fn impute_column_means(dataset: &Dataset) -> Result<FeatureMatrix> {
    if dataset.is_empty() {
        return Err(Error::EmptyDataset);
    }
    let n_cols = dataset.n_channels();

    let mut sums = vec![0.0_f64; n_cols];
    let mut counts = vec![0_usize; n_cols];
    for row in dataset.rows() {
        for (j, cell) in row.iter().enumerate() {
            if let Some(v) = cell {
                sums[j] += v;
                counts[j] += 1;
            }
        }
    }

    let means: Vec<f64> = sums
        .iter()
        .zip(&counts)
        .enumerate()
        .map(|(j, (&s, &c))| {
            if c == 0 {
                warn!("column {j} has no values; filling with 0.0");
                0.0
            } else {
                s / c as f64
            }
        })
        .collect();

    let mut data = Vec::with_capacity(dataset.len() * n_cols);
    for row in dataset.rows() {
        data.extend(row.iter().zip(&means).map(|(cell, &m)| cell.unwrap_or(m)));
    }
    FeatureMatrix::from_vec(dataset.len(), n_cols, data)
}

/// Per-column mean and scale learned from the training matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct StandardScaler {
    mean: Vec<f64>,
    scale: Vec<f64>,
}

impl StandardScaler {
    /// Compute column means and population standard deviations.
    pub fn fit(x: &FeatureMatrix) -> Result<Self> {
        let (n_rows, n_cols) = x.shape();
        if n_rows == 0 {
            return Err(Error::EmptyDataset);
        }
        let n = n_rows as f64;

        let mut mean = vec![0.0_f64; n_cols];
        for row in x.rows() {
            for (m, &v) in mean.iter_mut().zip(row) {
                *m += v;
            }
        }
        for m in &mut mean {
            *m /= n;
        }

        let mut var = vec![0.0_f64; n_cols];
        for row in x.rows() {
            for ((s, &v), &m) in var.iter_mut().zip(row).zip(&mean) {
                let d = v - m;
                *s += d * d;
            }
        }

        let scale = var
            .iter()
            .zip(&mean)
            .enumerate()
            .map(|(j, (&s, &m))| {
                let std = (s / n).sqrt();
                if is_constant(std, m) {
                    warn!("column {j} has zero variance; using scale 1.0");
                    1.0
                } else {
                    std
                }
            })
            .collect();

        Ok(Self { mean, scale })
    }

    /// Rebuild a scaler from exported parameters.
    pub fn from_params(mean: Vec<f64>, scale: Vec<f64>) -> Result<Self> {
        if mean.len() != scale.len() {
            return Err(Error::Shape(format!(
                "{} means but {} scales",
                mean.len(),
                scale.len()
            )));
        }
        if scale.iter().any(|&s| s == 0.0 || !s.is_finite()) {
            return Err(Error::Shape("scale values must be finite and non-zero".into()));
        }
        Ok(Self { mean, scale })
    }

    pub fn mean(&self) -> &[f64] {
        &self.mean
    }

    pub fn scale(&self) -> &[f64] {
        &self.scale
    }

    pub fn n_features(&self) -> usize {
        self.mean.len()
    }

    /// Standardize one raw row.
    pub fn transform_row(&self, row: &[f64]) -> Result<Vec<f64>> {
        if row.len() != self.n_features() {
            return Err(Error::Shape(format!(
                "row has {} values, scaler expects {}",
                row.len(),
                self.n_features()
            )));
        }
        Ok(row
            .iter()
            .zip(&self.mean)
            .zip(&self.scale)
            .map(|((&v, &m), &s)| (v - m) / s)
            .collect())
    }

    /// Standardize every row of `x`.
    pub fn transform(&self, x: &FeatureMatrix) -> Result<FeatureMatrix> {
        if x.n_cols() != self.n_features() {
            return Err(Error::Shape(format!(
                "matrix has {} columns, scaler expects {}",
                x.n_cols(),
                self.n_features()
            )));
        }
        let mut out = x.clone();
        for i in 0..out.n_rows() {
            for ((v, &m), &s) in out.row_mut(i).iter_mut().zip(&self.mean).zip(&self.scale) {
                *v = (*v - m) / s;
            }
        }
        Ok(out)
    }

    pub fn fit_transform(x: &FeatureMatrix) -> Result<(Self, FeatureMatrix)> {
        let scaler = Self::fit(x)?;
        let scaled = scaler.transform(x)?;
        Ok((scaler, scaled))
    }
}

/// A std this small relative to the mean is rounding noise of a constant column.
fn is_constant(std: f64, mean: f64) -> bool {
    std <= 10.0 * f64::EPSILON * mean.abs().max(1.0)
}
