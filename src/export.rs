//! The browser artifact: `window.<GLOBAL> = { ... };`
//!
//! JSON layout (camelCase keys, consumed by `web/app.js`):
//!
//! ```json
//! {
//!   "channelLabels": ["Fp1", ...],
//!   "exampleValues": [12.3456, ...],
//!   "sampleValues": [[...], ...],
//!   "emotionLabels": ["Calm", ...],
//!   "model": {
//!     "scalerMean": [...], "scalerScale": [...],
//!     "linearCoef": [...], "linearIntercept": 4.2,
//!     "logisticCoef": [[...], ...], "logisticIntercept": [...],
//!     "labelWeights": [...]
//!   }
//! }
//! ```
use std::path::Path;

use log::{info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::config::PipelineConfig;
use crate::data::model::FeatureMatrix;
use crate::error::{Error, Result};
use crate::preprocess::StandardScaler;
use crate::regression::{LinearRegression, LogisticRegression};

/// Everything the browser needs to reproduce inference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportedArtifact {
    pub channel_labels: Vec<String>,
    /// First raw row of the dataset, rounded to 4 decimals.
    pub example_values: Vec<f64>,
    /// Seeded random pool of raw rows, rounded to 4 decimals.
    pub sample_values: Vec<Vec<f64>>,
    pub emotion_labels: Vec<String>,
    pub model: ModelParams,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelParams {
    pub scaler_mean: Vec<f64>,
    pub scaler_scale: Vec<f64>,
    pub linear_coef: Vec<f64>,
    pub linear_intercept: f64,
    /// `K × C`, or `1 × C` when there are two classes.
    pub logistic_coef: Vec<Vec<f64>>,
    pub logistic_intercept: Vec<f64>,
    /// Effective synthetic-label weights (after channel emphasis).
    pub label_weights: Vec<f64>,
}

impl ExportedArtifact {
    /// Collect the trained parameters and the raw-row samples.
    ///
    /// `raw` is the imputed, *unstandardized* matrix.
    pub fn assemble(
        cfg: &PipelineConfig,
        raw: &FeatureMatrix,
        scaler: &StandardScaler,
        linear: &LinearRegression,
        logistic: &LogisticRegression,
        label_weights: &[f64],
    ) -> Result<Self> {
        if raw.n_rows() == 0 {
            return Err(Error::EmptyDataset);
        }
        let artifact = Self {
            channel_labels: cfg.channel_labels.clone(),
            example_values: round_row(raw.row(0)),
            sample_values: sample_pool(raw, cfg.sample_pool_size, cfg.sample_seed),
            emotion_labels: cfg.emotion_labels.clone(),
            model: ModelParams {
                scaler_mean: scaler.mean().to_vec(),
                scaler_scale: scaler.scale().to_vec(),
                linear_coef: linear.coefficients().to_vec(),
                linear_intercept: linear.intercept(),
                logistic_coef: logistic.coefficients().to_vec(),
                logistic_intercept: logistic.intercepts().to_vec(),
                label_weights: label_weights.to_vec(),
            },
        };
        artifact.validate()?;
        Ok(artifact)
    }

    /// Reject an artifact the browser could not use: any field of the wrong
    /// length or any non-finite number.
    pub fn validate(&self) -> Result<()> {
        let n = self.channel_labels.len();
        if n == 0 {
            return Err(Error::Artifact("channelLabels is empty".into()));
        }
        let k = self.emotion_labels.len();
        if k < 2 {
            return Err(Error::Artifact(format!(
                "emotionLabels needs at least 2 entries, has {k}"
            )));
        }

        let m = &self.model;
        check_len("exampleValues", &self.example_values, n)?;
        if self.sample_values.is_empty() {
            return Err(Error::Artifact("sampleValues is empty".into()));
        }
        for (i, row) in self.sample_values.iter().enumerate() {
            check_len(&format!("sampleValues[{i}]"), row, n)?;
        }
        check_len("model.scalerMean", &m.scaler_mean, n)?;
        check_len("model.scalerScale", &m.scaler_scale, n)?;
        check_len("model.linearCoef", &m.linear_coef, n)?;
        check_len("model.labelWeights", &m.label_weights, n)?;

        let rows = if k == 2 { 1 } else { k };
        if m.logistic_coef.len() != rows {
            return Err(Error::Artifact(format!(
                "model.logisticCoef has {} rows, expected {rows} for {k} classes",
                m.logistic_coef.len()
            )));
        }
        for (i, row) in m.logistic_coef.iter().enumerate() {
            check_len(&format!("model.logisticCoef[{i}]"), row, n)?;
        }
        check_len("model.logisticIntercept", &m.logistic_intercept, rows)?;

        if !m.linear_intercept.is_finite() {
            return Err(Error::Artifact("model.linearIntercept is not finite".into()));
        }
        if m.scaler_scale.iter().any(|&s| s == 0.0) {
            return Err(Error::Artifact("model.scalerScale contains 0".into()));
        }
        Ok(())
    }

    /// Render as a script assigning the artifact to `window.<global_name>`.
    pub fn to_js(&self, global_name: &str) -> Result<String> {
        let json = serde_json::to_string_pretty(self)?;
        Ok(format!("window.{global_name} = {json};\n"))
    }

    /// Parse the output of [`ExportedArtifact::to_js`].
    pub fn from_js(text: &str) -> Result<Self> {
        let body = text
            .trim()
            .strip_prefix("window.")
            .and_then(|rest| rest.split_once('='))
            .map(|(_, json)| json.trim().trim_end_matches(';'))
            .ok_or_else(|| Error::Artifact("expected `window.<NAME> = {...};`".into()))?;
        let artifact: Self = serde_json::from_str(body)?;
        artifact.validate()?;
        Ok(artifact)
    }

    /// Validate and write to `path`.  The parent directory must exist; the
    /// file is replaced atomically so a failed run leaves no partial output.
    pub fn write(&self, path: &Path, global_name: &str) -> Result<()> {
        self.validate()?;

        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        if !parent.is_dir() {
            return Err(Error::NotFound {
                what: "artifact output directory".into(),
                path: parent.to_path_buf(),
            });
        }

        let js = self.to_js(global_name)?;
        let tmp = path.with_extension("js.tmp");
        let written = std::fs::write(&tmp, js)
            .map_err(|source| Error::Io {
                path: tmp.clone(),
                source,
            })
            .and_then(|()| {
                std::fs::rename(&tmp, path).map_err(|source| Error::Io {
                    path: path.to_path_buf(),
                    source,
                })
            });
        if let Err(e) = written {
            if tmp.is_file() {
                let _ = std::fs::remove_file(&tmp);
            }
            return Err(e);
        }

        info!("Model file written to {}", path.display());
        Ok(())
    }

    /// Read an artifact file written by [`ExportedArtifact::write`].
    pub fn read(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(Error::NotFound {
                what: "artifact".into(),
                path: path.to_path_buf(),
            });
        }
        let text = std::fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_js(&text)
    }
}

/// `size` distinct rows drawn with a seeded RNG, in draw order.
pub fn sample_pool(raw: &FeatureMatrix, size: usize, seed: u64) -> Vec<Vec<f64>> {
    let n = raw.n_rows();
    let amount = if size > n {
        warn!("sample pool of {size} requested but only {n} rows exist; using all rows");
        n
    } else {
        size
    };
    let mut rng = StdRng::seed_from_u64(seed);
    rand::seq::index::sample(&mut rng, n, amount)
        .into_iter()
        .map(|i| round_row(raw.row(i)))
        .collect()
}

/// Round to 4 decimals, ties to even.
fn round_row(row: &[f64]) -> Vec<f64> {
    row.iter()
        .map(|v| (v * 1e4).round_ties_even() / 1e4)
        .collect()
}

fn check_len(field: &str, values: &[f64], expected: usize) -> Result<()> {
    if values.len() != expected {
        return Err(Error::Artifact(format!(
            "{field} has {} values, expected {expected}",
            values.len()
        )));
    }
    if let Some(pos) = values.iter().position(|v| !v.is_finite()) {
        return Err(Error::Artifact(format!("{field}[{pos}] is not finite")));
    }
    Ok(())
}
