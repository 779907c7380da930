use super::dot;
use crate::data::model::FeatureMatrix;
use crate::error::{Error, Result};

/// Pivots smaller than this (relative to the largest diagonal entry) mark a
/// direction the data does not determine.
const RANK_TOL: f64 = 1e-10;

/// Ordinary least squares with intercept.
///
/// Fit on centered data by solving the normal equations
///
/// ```text
/// (Xcᵀ Xc) β = Xcᵀ yc,    intercept = ȳ − x̄ · β
/// ```
///
/// with Gaussian elimination and partial pivoting.  Coefficients of
/// rank-deficient directions (e.g. a constant column) are set to zero.
#[derive(Debug, Clone, Default)]
pub struct LinearRegression {
    coef: Vec<f64>,
    intercept: f64,
    fitted: bool,
}

impl LinearRegression {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fit(&mut self, x: &FeatureMatrix, y: &[f64]) -> Result<()> {
        let (n_samples, n_features) = x.shape();
        if n_samples != y.len() {
            return Err(Error::Shape(format!(
                "{n_samples} rows but {} targets",
                y.len()
            )));
        }
        if n_samples == 0 {
            return Err(Error::EmptyDataset);
        }
        let n = n_samples as f64;

        let mut x_mean = vec![0.0; n_features];
        for row in x.rows() {
            for (m, &v) in x_mean.iter_mut().zip(row) {
                *m += v;
            }
        }
        for m in &mut x_mean {
            *m /= n;
        }
        let y_mean = y.iter().sum::<f64>() / n;

        // Gram matrix and right-hand side of the centered problem.
        let mut gram = vec![vec![0.0; n_features]; n_features];
        let mut rhs = vec![0.0; n_features];
        let mut centered = vec![0.0; n_features];
        for (row, &target) in x.rows().zip(y) {
            for ((c, &v), &m) in centered.iter_mut().zip(row).zip(&x_mean) {
                *c = v - m;
            }
            let yc = target - y_mean;
            for i in 0..n_features {
                rhs[i] += centered[i] * yc;
                for j in i..n_features {
                    gram[i][j] += centered[i] * centered[j];
                }
            }
        }
        for i in 0..n_features {
            for j in 0..i {
                gram[i][j] = gram[j][i];
            }
        }

        self.coef = solve_symmetric(gram, rhs);
        self.intercept = y_mean - dot(&x_mean, &self.coef);
        self.fitted = true;
        Ok(())
    }

    pub fn coefficients(&self) -> &[f64] {
        &self.coef
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    pub fn is_fitted(&self) -> bool {
        self.fitted
    }

    /// Score one standardized row.
    pub fn predict_row(&self, row: &[f64]) -> f64 {
        dot(&self.coef, row) + self.intercept
    }

    pub fn predict(&self, x: &FeatureMatrix) -> Vec<f64> {
        x.rows().map(|r| self.predict_row(r)).collect()
    }
}

/// Solve `A x = b` by elimination with partial pivoting.  Columns without a
/// usable pivot are free variables and get `0`.
fn solve_symmetric(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Vec<f64> {
    let n = b.len();
    let max_diag = (0..n).map(|i| a[i][i].abs()).fold(0.0, f64::max);
    let threshold = RANK_TOL * max_diag.max(f64::MIN_POSITIVE);

    let mut pivots: Vec<(usize, usize)> = Vec::with_capacity(n);
    let mut row = 0;
    for col in 0..n {
        if row == n {
            break;
        }
        let (best, best_abs) = (row..n)
            .map(|r| (r, a[r][col].abs()))
            .fold((row, -1.0), |acc, cur| if cur.1 > acc.1 { cur } else { acc });
        if best_abs <= threshold {
            continue;
        }
        a.swap(row, best);
        b.swap(row, best);

        for r in row + 1..n {
            let factor = a[r][col] / a[row][col];
            if factor == 0.0 {
                continue;
            }
            for c in col..n {
                a[r][c] -= factor * a[row][c];
            }
            b[r] -= factor * b[row];
        }
        pivots.push((row, col));
        row += 1;
    }

    let mut x = vec![0.0; n];
    for &(r, col) in pivots.iter().rev() {
        let tail: f64 = (col + 1..n).map(|c| a[r][c] * x[c]).sum();
        x[col] = (b[r] - tail) / a[r][col];
    }
    x
}
