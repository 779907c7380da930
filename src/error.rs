use std::path::PathBuf;

use thiserror::Error;

/// Every failure the training pipeline, exporter and replica can report.
#[derive(Debug, Error)]
pub enum Error {
    /// A required directory or file is missing.
    /// `what` names the missing thing, e.g. "dataset folder".
    #[error("{what} not found: {}", path.display())]
    NotFound { what: String, path: PathBuf },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error in {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("{}: row {row}, column {column}: '{value}' is not a number", path.display())]
    Parse {
        path: PathBuf,
        row: usize,
        column: usize,
        value: String,
    },

    #[error("shape mismatch: {0}")]
    Shape(String),

    #[error("dataset is empty")]
    EmptyDataset,

    #[error("need at least {required} rows, got {actual}")]
    InsufficientRows { required: usize, actual: usize },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("invalid artifact: {0}")]
    Artifact(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
