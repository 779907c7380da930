//! Inference from an exported artifact alone.
//!
//! This is the Rust twin of `web/app.js`: it reads nothing but the
//! [`ExportedArtifact`] and applies plain scalar arithmetic, in the same
//! order as the training side, so both produce the same numbers.
//!
//! ```text
//! raw row ─(x - mean) / scale─▶ z ─┬─ linearCoef · z + linearIntercept ─▶ score
//!                                  └─ logisticCoef[k] · z + b[k] ─softmax─▶ probabilities
//! ```
use serde::Serialize;

use crate::error::{Error, Result};
use crate::export::ExportedArtifact;

/// Output of [`predict`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Prediction {
    /// Continuous emotion intensity (nominally 0-10, not clamped).
    pub score: f64,
    pub class_index: usize,
    pub label: String,
    /// One probability per emotion label.
    pub probabilities: Vec<f64>,
}

/// Score one raw (unstandardized) row.
pub fn predict(artifact: &ExportedArtifact, row: &[f64]) -> Result<Prediction> {
    let model = &artifact.model;
    if row.len() != model.scaler_mean.len() {
        return Err(Error::Shape(format!(
            "row has {} values, model expects {}",
            row.len(),
            model.scaler_mean.len()
        )));
    }

    let z: Vec<f64> = row
        .iter()
        .zip(&model.scaler_mean)
        .zip(&model.scaler_scale)
        .map(|((&v, &m), &s)| (v - m) / s)
        .collect();

    let score = dot(&model.linear_coef, &z) + model.linear_intercept;

    let logits: Vec<f64> = model
        .logistic_coef
        .iter()
        .zip(&model.logistic_intercept)
        .map(|(w, b)| dot(w, &z) + b)
        .collect();
    let probabilities = match logits.as_slice() {
        [single] => {
            let p = 1.0 / (1.0 + (-single).exp());
            vec![1.0 - p, p]
        }
        _ => {
            let max = logits.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let exps: Vec<f64> = logits.iter().map(|v| (v - max).exp()).collect();
            let sum: f64 = exps.iter().sum();
            exps.iter().map(|e| e / sum).collect()
        }
    };

    let mut class_index = 0;
    for (i, &p) in probabilities.iter().enumerate() {
        if p > probabilities[class_index] {
            class_index = i;
        }
    }
    let label = artifact
        .emotion_labels
        .get(class_index)
        .cloned()
        .ok_or_else(|| {
            Error::Artifact(format!("no emotion label for class {class_index}"))
        })?;

    Ok(Prediction {
        score,
        class_index,
        label,
        probabilities,
    })
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::ModelParams;
    use approx::assert_abs_diff_eq;

    fn artifact(logistic_coef: Vec<Vec<f64>>, logistic_intercept: Vec<f64>, labels: &[&str]) -> ExportedArtifact {
        ExportedArtifact {
            channel_labels: vec!["A".into(), "B".into()],
            example_values: vec![1.0, 2.0],
            sample_values: vec![vec![1.0, 2.0]],
            emotion_labels: labels.iter().map(|s| s.to_string()).collect(),
            model: ModelParams {
                scaler_mean: vec![1.0, 2.0],
                scaler_scale: vec![2.0, 4.0],
                linear_coef: vec![1.0, -1.0],
                linear_intercept: 5.0,
                logistic_coef,
                logistic_intercept,
                label_weights: vec![1.0, 1.0],
            },
        }
    }

    #[test]
    fn hand_computed_multiclass() {
        let a = artifact(
            vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![0.0, 0.0]],
            vec![0.0, 0.0, 0.0],
            &["Calm", "Sad", "Happy"],
        );
        // z = [(3-1)/2, (2-2)/4] = [1, 0]
        let p = predict(&a, &[3.0, 2.0]).unwrap();
        assert_abs_diff_eq!(p.score, 6.0);
        let e = 1.0_f64.exp();
        assert_abs_diff_eq!(p.probabilities[0], e / (e + 2.0), epsilon = 1e-15);
        assert_abs_diff_eq!(p.probabilities[1], 1.0 / (e + 2.0), epsilon = 1e-15);
        assert_eq!(p.class_index, 0);
        assert_eq!(p.label, "Calm");
    }

    #[test]
    fn single_row_uses_sigmoid() {
        let a = artifact(vec![vec![0.0, 2.0]], vec![0.0], &["Low", "High"]);
        // z = [0, 1]  →  logit 2
        let p = predict(&a, &[1.0, 6.0]).unwrap();
        let s = 1.0 / (1.0 + (-2.0_f64).exp());
        assert_abs_diff_eq!(p.probabilities[1], s, epsilon = 1e-15);
        assert_abs_diff_eq!(p.probabilities[0], 1.0 - s, epsilon = 1e-15);
        assert_eq!(p.label, "High");
    }

    #[test]
    fn wrong_row_length() {
        let a = artifact(vec![vec![0.0, 0.0]], vec![0.0], &["Low", "High"]);
        assert!(matches!(predict(&a, &[1.0]), Err(Error::Shape(_))));
    }
}
