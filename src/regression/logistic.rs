use log::{info, warn};

use super::dot;
use super::lbfgs::{ConvergenceStatus, Lbfgs};
use crate::data::model::FeatureMatrix;
use crate::error::{Error, Result};

/// L-BFGS history length.
const HISTORY: usize = 10;

/// Multinomial logistic regression with L2 penalty on the coefficients.
///
/// Minimizes
///
/// ```text
/// (1/n) Σᵢ CE(softmax(W xᵢ + b), yᵢ) + ‖W‖² / (2·C·n)
/// ```
///
/// With exactly two classes the model reduces to a single sigmoid row:
/// one coefficient vector and one intercept scoring class 1.
#[derive(Debug, Clone)]
pub struct LogisticRegression {
    c: f64,
    max_iter: usize,
    tol: f64,
    n_classes: usize,
    coef: Vec<Vec<f64>>,
    intercept: Vec<f64>,
    converged: bool,
    iterations: usize,
}

impl LogisticRegression {
    pub fn new(c: f64, max_iter: usize, tol: f64) -> Self {
        Self {
            c,
            max_iter,
            tol,
            n_classes: 0,
            coef: Vec::new(),
            intercept: Vec::new(),
            converged: false,
            iterations: 0,
        }
    }

    /// Fit on class indices `y ∈ [0, n_classes)`.
    ///
    /// Running out of iterations is not an error: the last iterate is kept,
    /// `converged()` reports `false` and a warning is logged.
    pub fn fit(&mut self, x: &FeatureMatrix, y: &[usize], n_classes: usize) -> Result<()> {
        let (n_samples, n_features) = x.shape();
        if n_samples != y.len() {
            return Err(Error::Shape(format!(
                "{n_samples} rows but {} labels",
                y.len()
            )));
        }
        if n_samples == 0 {
            return Err(Error::EmptyDataset);
        }
        if n_classes < 2 {
            return Err(Error::Config(format!(
                "need at least 2 classes, got {n_classes}"
            )));
        }
        if let Some(&bad) = y.iter().find(|&&k| k >= n_classes) {
            return Err(Error::Shape(format!(
                "label {bad} out of range for {n_classes} classes"
            )));
        }

        // Two classes collapse to one score row.
        let rows = if n_classes == 2 { 1 } else { n_classes };
        let penalty = 1.0 / (self.c * n_samples as f64);
        let objective = |params: &[f64]| {
            if rows == 1 {
                binary_loss(params, x, y, penalty)
            } else {
                multinomial_loss(params, x, y, rows, penalty)
            }
        };

        let solver = Lbfgs::new(self.max_iter, self.tol, HISTORY);
        let min = solver.minimize(objective, vec![0.0; rows * (n_features + 1)]);

        match min.status {
            ConvergenceStatus::Converged => info!(
                "logistic regression converged in {} iterations (loss {:.6})",
                min.iterations, min.objective
            ),
            status => warn!(
                "logistic regression did not converge ({status:?} after {} iterations, \
                 max |grad| = {:.3e}); keeping the last iterate",
                min.iterations, min.gradient_max
            ),
        }

        let (w, b) = min.solution.split_at(rows * n_features);
        self.coef = w.chunks_exact(n_features.max(1)).map(<[f64]>::to_vec).collect();
        self.intercept = b.to_vec();
        self.n_classes = n_classes;
        self.converged = min.converged();
        self.iterations = min.iterations;
        Ok(())
    }

    /// `K × C` coefficients (`1 × C` for two classes).
    pub fn coefficients(&self) -> &[Vec<f64>] {
        &self.coef
    }

    pub fn intercepts(&self) -> &[f64] {
        &self.intercept
    }

    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    pub fn converged(&self) -> bool {
        self.converged
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Class probabilities for one standardized row.
    pub fn predict_proba_row(&self, row: &[f64]) -> Vec<f64> {
        let scores: Vec<f64> = self
            .coef
            .iter()
            .zip(&self.intercept)
            .map(|(w, b)| dot(w, row) + b)
            .collect();
        if scores.len() == 1 {
            let p = sigmoid(scores[0]);
            vec![1.0 - p, p]
        } else {
            softmax(&scores)
        }
    }

    /// Most probable class for one standardized row.
    pub fn predict_row(&self, row: &[f64]) -> usize {
        argmax(&self.predict_proba_row(row))
    }

    pub fn predict(&self, x: &FeatureMatrix) -> Vec<usize> {
        x.rows().map(|r| self.predict_row(r)).collect()
    }
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

fn softmax(z: &[f64]) -> Vec<f64> {
    let max = z.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = z.iter().map(|v| (v - max).exp()).collect();
    let sum: f64 = exps.iter().sum();
    exps.iter().map(|e| e / sum).collect()
}

/// First index of the largest value.
fn argmax(v: &[f64]) -> usize {
    let mut best = 0;
    for (i, &p) in v.iter().enumerate() {
        if p > v[best] {
            best = i;
        }
    }
    best
}

/// `log(1 + e^z)` without overflow.
fn softplus(z: f64) -> f64 {
    if z > 0.0 {
        z + (-z).exp().ln_1p()
    } else {
        z.exp().ln_1p()
    }
}

/// Parameter layout: `[w (C), b]`.
fn binary_loss(params: &[f64], x: &FeatureMatrix, y: &[usize], penalty: f64) -> (f64, Vec<f64>) {
    let n_features = x.n_cols();
    let n = x.n_rows() as f64;
    let (w, b) = (&params[..n_features], params[n_features]);

    let mut loss = 0.0;
    let mut grad = vec![0.0; n_features + 1];
    for (row, &label) in x.rows().zip(y) {
        let z = dot(w, row) + b;
        let target = label as f64;
        loss += softplus(z) - target * z;
        let err = sigmoid(z) - target;
        for (g, &v) in grad[..n_features].iter_mut().zip(row) {
            *g += err * v;
        }
        grad[n_features] += err;
    }

    for g in &mut grad {
        *g /= n;
    }
    loss /= n;
    loss += 0.5 * penalty * dot(w, w);
    for (g, &wj) in grad[..n_features].iter_mut().zip(w) {
        *g += penalty * wj;
    }
    (loss, grad)
}

/// Parameter layout: `[W (K×C, row-major), b (K)]`.
fn multinomial_loss(
    params: &[f64],
    x: &FeatureMatrix,
    y: &[usize],
    n_classes: usize,
    penalty: f64,
) -> (f64, Vec<f64>) {
    let n_features = x.n_cols();
    let n = x.n_rows() as f64;
    let (w, b) = params.split_at(n_classes * n_features);

    let mut loss = 0.0;
    let mut grad = vec![0.0; params.len()];
    let mut z = vec![0.0; n_classes];
    for (row, &label) in x.rows().zip(y) {
        for k in 0..n_classes {
            z[k] = dot(&w[k * n_features..(k + 1) * n_features], row) + b[k];
        }
        let max = z.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let sum_exp: f64 = z.iter().map(|v| (v - max).exp()).sum();
        loss += max + sum_exp.ln() - z[label];

        for k in 0..n_classes {
            let p = (z[k] - max).exp() / sum_exp;
            let err = p - if k == label { 1.0 } else { 0.0 };
            let gk = &mut grad[k * n_features..(k + 1) * n_features];
            for (g, &v) in gk.iter_mut().zip(row) {
                *g += err * v;
            }
            grad[n_classes * n_features + k] += err;
        }
    }

    for g in &mut grad {
        *g /= n;
    }
    loss /= n;
    loss += 0.5 * penalty * dot(w, w);
    for (g, &wj) in grad[..n_classes * n_features].iter_mut().zip(w) {
        *g += penalty * wj;
    }
    (loss, grad)
}
