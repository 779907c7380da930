//! Pipeline configuration.
//!
//! [`PipelineConfig`] holds every tunable parameter of a training run.  All
//! fields have defaults that reproduce the published artifact, so
//! `PipelineConfig::default()` is the normal starting point.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Error, Result};

/// 10–20 montage electrode names, in column order of the subject files.
pub const CHANNEL_LABELS: [&str; 19] = [
    "Fp1", "Fp2", "F7", "F3", "Fz", "F4", "F8", "T7", "C3", "Cz", "C4", "T8", "P7", "P3", "Pz",
    "P4", "P8", "O1", "O2",
];

/// Emotion class names, lowest continuous score first.
pub const EMOTION_LABELS: [&str; 6] = ["Calm", "Sad", "Fearful", "Angry", "Surprised", "Happy"];

/// Fixed standard-normal weights (19 draws from a PCG64 stream seeded with
/// 42), before channel emphasis.
///
/// Stored as data so the labels do not depend on any PRNG implementation.
/// The effective vector is exported with the model.
pub const DEFAULT_LABEL_WEIGHTS: [f64; 19] = [
    0.30471708,
    -1.03998411,
    0.75045120,
    0.94056472,
    -1.95103519,
    -1.30217951,
    0.12784040,
    -0.31624259,
    -0.01680116,
    -0.85304393,
    0.87939797,
    0.77779194,
    0.06603070,
    1.12724121,
    0.46750934,
    -0.85929246,
    0.36875078,
    -0.95888260,
    0.87845030,
];

/// Configuration for a full training + export run.
///
/// Construct with struct-update syntax to change a few fields:
///
/// ```
/// use eeg_emotion::PipelineConfig;
///
/// let cfg = PipelineConfig {
///     max_subjects: 2,
///     sample_pool_size: 50,
///     ..PipelineConfig::default()
/// };
/// assert!(cfg.validate().is_ok());
/// ```
///
/// or load overrides from JSON with [`PipelineConfig::from_json_file`]; keys
/// missing from the file keep their defaults.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Directory scanned for subject files.
    ///
    /// Default: `dataset`.
    pub dataset_dir: PathBuf,

    /// Where the artifact is written.  The parent directory must exist.
    ///
    /// Default: `web/model.js`.
    pub output_path: PathBuf,

    /// Global the artifact assigns to (`window.<global_name> = {...};`).
    ///
    /// Default: `APP_CONFIG`.
    pub global_name: String,

    /// Subject files are those whose name starts with this prefix.
    ///
    /// Default: `s`.
    pub file_prefix: String,

    /// ...and whose extension is exactly this (no dot).
    ///
    /// Default: `csv`.
    pub file_extension: String,

    /// At most this many subject files (after sorting by name) are loaded.
    ///
    /// Default: `5`.
    pub max_subjects: usize,

    /// One label per column.  Its length *is* the channel count.
    pub channel_labels: Vec<String>,

    /// One label per class.  Its length *is* the class count K.
    pub emotion_labels: Vec<String>,

    /// Base weight vector for the synthetic score, one per channel.
    ///
    /// Default: [`DEFAULT_LABEL_WEIGHTS`].
    pub label_weights: Vec<f64>,

    /// Channel indices whose weight is multiplied by `emphasis_factor`.
    ///
    /// Default: `[0, 4, 9, 14]` (Fp1, Fz, Cz, Pz).
    pub emphasized_channels: Vec<usize>,

    /// Default: `2.0`.
    pub emphasis_factor: f64,

    /// Nudge applied to tied quantile edges so they become strictly
    /// increasing.
    ///
    /// Default: `1e-6`.
    pub quantile_epsilon: f64,

    /// Number of raw rows shipped to the UI for the "random sample" button.
    ///
    /// Default: `200`.
    pub sample_pool_size: usize,

    /// Seed of the sample-pool draw.
    ///
    /// Default: `42`.
    pub sample_seed: u64,

    /// Inverse L2 regularization strength of the logistic model.
    ///
    /// Default: `1.0`.
    pub logistic_c: f64,

    /// L-BFGS iteration budget.  Running out is a warning, not an error.
    ///
    /// Default: `1000`.
    pub logistic_max_iter: usize,

    /// Convergence threshold on the largest absolute gradient component.
    ///
    /// Default: `1e-4`.
    pub logistic_tol: f64,

    /// Log a hold-out evaluation report before the final fit.
    ///
    /// Default: `true`.
    pub evaluate: bool,

    /// Fraction of rows held out by the evaluation report.
    ///
    /// Default: `0.2`.
    pub test_fraction: f64,

    /// Seed of the evaluation split shuffle.
    ///
    /// Default: `42`.
    pub split_seed: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            dataset_dir: PathBuf::from("dataset"),
            output_path: PathBuf::from("web").join("model.js"),
            global_name: "APP_CONFIG".to_string(),
            file_prefix: "s".to_string(),
            file_extension: "csv".to_string(),
            max_subjects: 5,
            channel_labels: CHANNEL_LABELS.iter().map(|s| s.to_string()).collect(),
            emotion_labels: EMOTION_LABELS.iter().map(|s| s.to_string()).collect(),
            label_weights: DEFAULT_LABEL_WEIGHTS.to_vec(),
            emphasized_channels: vec![0, 4, 9, 14],
            emphasis_factor: 2.0,
            quantile_epsilon: 1e-6,
            sample_pool_size: 200,
            sample_seed: 42,
            logistic_c: 1.0,
            logistic_max_iter: 1000,
            logistic_tol: 1e-4,
            evaluate: true,
            test_fraction: 0.2,
            split_seed: 42,
        }
    }
}

impl PipelineConfig {
    /// Load a config from a JSON file.  Unspecified keys take their defaults.
    /// The result is validated before it is returned.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let cfg: Self = serde_json::from_str(&text)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Number of channels (columns) every row must have.
    pub fn n_channels(&self) -> usize {
        self.channel_labels.len()
    }

    /// Number of emotion classes K.
    pub fn n_classes(&self) -> usize {
        self.emotion_labels.len()
    }

    /// Base weights with the emphasized channels scaled.
    pub fn effective_label_weights(&self) -> Vec<f64> {
        let mut w = self.label_weights.clone();
        for &i in &self.emphasized_channels {
            w[i] *= self.emphasis_factor;
        }
        w
    }

    /// Check cross-field consistency.
    pub fn validate(&self) -> Result<()> {
        let n = self.n_channels();
        if n == 0 {
            return Err(Error::Config("channel_labels must not be empty".into()));
        }
        if self.n_classes() < 2 {
            return Err(Error::Config(format!(
                "need at least 2 emotion labels, got {}",
                self.n_classes()
            )));
        }
        if self.label_weights.len() != n {
            return Err(Error::Config(format!(
                "label_weights has {} entries but there are {n} channels",
                self.label_weights.len()
            )));
        }
        if let Some(&bad) = self.emphasized_channels.iter().find(|&&i| i >= n) {
            return Err(Error::Config(format!(
                "emphasized channel {bad} is out of range for {n} channels"
            )));
        }
        if self.max_subjects == 0 {
            return Err(Error::Config("max_subjects must be at least 1".into()));
        }
        if self.sample_pool_size == 0 {
            return Err(Error::Config("sample_pool_size must be at least 1".into()));
        }
        if self.file_prefix.is_empty() || self.file_extension.is_empty() {
            return Err(Error::Config(
                "file_prefix and file_extension must not be empty".into(),
            ));
        }
        if self.global_name.is_empty()
            || !self
                .global_name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
        {
            return Err(Error::Config(format!(
                "global_name '{}' is not a valid identifier",
                self.global_name
            )));
        }
        if !(self.quantile_epsilon > 0.0) {
            return Err(Error::Config("quantile_epsilon must be positive".into()));
        }
        if !(self.logistic_c > 0.0) || !(self.logistic_tol > 0.0) || self.logistic_max_iter == 0 {
            return Err(Error::Config(
                "logistic_c, logistic_tol and logistic_max_iter must be positive".into(),
            ));
        }
        if !(self.test_fraction > 0.0 && self.test_fraction < 1.0) {
            return Err(Error::Config(format!(
                "test_fraction must be in (0, 1), got {}",
                self.test_fraction
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = PipelineConfig::default();
        cfg.validate().unwrap();
        assert_eq!(cfg.n_channels(), 19);
        assert_eq!(cfg.n_classes(), 6);
    }

    #[test]
    fn emphasis_doubles_designated_channels() {
        let cfg = PipelineConfig::default();
        let w = cfg.effective_label_weights();
        for i in 0..19 {
            let expected = if [0, 4, 9, 14].contains(&i) {
                DEFAULT_LABEL_WEIGHTS[i] * 2.0
            } else {
                DEFAULT_LABEL_WEIGHTS[i]
            };
            assert_eq!(w[i], expected, "channel {i}");
        }
    }

    #[test]
    fn mismatched_weights_rejected() {
        let cfg = PipelineConfig {
            label_weights: vec![1.0; 3],
            ..PipelineConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn out_of_range_emphasis_rejected() {
        let cfg = PipelineConfig {
            emphasized_channels: vec![19],
            ..PipelineConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn single_class_rejected() {
        let cfg = PipelineConfig {
            emotion_labels: vec!["Calm".into()],
            ..PipelineConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn json_overrides_keep_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cfg.json");
        std::fs::write(&path, r#"{ "max_subjects": 2, "sample_pool_size": 10 }"#).unwrap();

        let cfg = PipelineConfig::from_json_file(&path).unwrap();
        assert_eq!(cfg.max_subjects, 2);
        assert_eq!(cfg.sample_pool_size, 10);
        assert_eq!(cfg.global_name, "APP_CONFIG");
        assert_eq!(cfg.n_channels(), 19);
    }

    #[test]
    fn unknown_json_key_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cfg.json");
        std::fs::write(&path, r#"{ "max_subject": 2 }"#).unwrap();
        assert!(matches!(
            PipelineConfig::from_json_file(&path),
            Err(Error::Json(_))
        ));
    }
}
