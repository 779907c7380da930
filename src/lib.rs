//! # eeg-emotion: synthetic emotion models over EEG channel tables
//!
//! Reads per-subject CSV tables of 19-channel EEG readings, derives a
//! continuous and a categorical emotion label for every row, fits a linear
//! and a multinomial logistic model, and exports everything a browser needs
//! to score new rows without a server round-trip.
//!
//! ## Pipeline overview
//!
//! ```text
//! dataset/s01.csv … s05.csv
//!   │
//!   ├─ data::loader          headerless CSV → Dataset (blank cells = missing)
//!   ├─ preprocess            column-mean imputation, z-score (StandardScaler)
//!   ├─ labels                weighted sum → min-max [0, 10] → quantile bins
//!   ├─ regression            OLS + L2 logistic regression (L-BFGS)
//!   ├─ metrics               seeded 80/20 hold-out report (logged only)
//!   └─ export                window.APP_CONFIG = {…};  → web/model.js
//!        │
//!        └─→ inference::predict / web/app.js   (artifact-only scoring)
//! ```
//!
//! ## Quick start
//!
//! ```no_run
//! use eeg_emotion::{pipeline, PipelineConfig};
//!
//! let cfg = PipelineConfig::default();
//! let run = pipeline::run(&cfg).unwrap();
//! let p = eeg_emotion::inference::predict(&run.artifact, &run.artifact.example_values).unwrap();
//! println!("{} ({:.2})", p.label, p.score);
//! ```
//!
//! ## Running individual steps
//!
//! ```
//! use eeg_emotion::data::model::FeatureMatrix;
//! use eeg_emotion::labels::{categorical_labels, continuous_labels};
//!
//! let x = FeatureMatrix::from_rows(3, &[
//!     vec![1.0, 0.0, 0.0],
//!     vec![0.0, 1.0, 0.0],
//!     vec![0.0, 0.0, 1.0],
//!     vec![1.0, 1.0, 1.0],
//! ]).unwrap();
//! let scores = continuous_labels(&x, &[1.0, 2.0, 3.0]).unwrap();
//! assert_eq!(scores, vec![0.0, 2.0, 4.0, 10.0]);
//! assert_eq!(categorical_labels(&scores, 2, 1e-6).unwrap(), vec![0, 0, 1, 1]);
//! ```
pub mod config;
pub mod data;
pub mod error;
pub mod export;
pub mod inference;
pub mod labels;
pub mod metrics;
pub mod pipeline;
pub mod preprocess;
pub mod regression;
pub mod server;

pub use config::PipelineConfig;
pub use error::{Error, Result};
pub use export::ExportedArtifact;
pub use pipeline::TrainingRun;
