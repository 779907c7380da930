//! End-to-end training run.
//!
//! ```text
//! load_dataset ─▶ impute ─▶ StandardScaler ─▶ labels ─┬─▶ LinearRegression
//!                                                      └─▶ LogisticRegression
//!                                                              │
//!                                        ExportedArtifact ◀────┘
//! ```
//!
//! The dataset is an owned value handed from stage to stage; nothing is kept
//! in global state, so [`train`] can be called on in-memory data in tests.
use log::{info, warn};

use crate::config::PipelineConfig;
use crate::data::loader::load_dataset;
use crate::data::model::{Dataset, FeatureMatrix};
use crate::error::{Error, Result};
use crate::export::ExportedArtifact;
use crate::labels::{categorical_labels, continuous_labels};
use crate::metrics::{self, EvaluationReport};
use crate::preprocess::{impute_column_means, StandardScaler};
use crate::regression::{LinearRegression, LogisticRegression};

/// Every intermediate product of one run.
#[derive(Debug, Clone)]
pub struct TrainingRun {
    /// Imputed, unstandardized rows.
    pub raw: FeatureMatrix,
    pub scaler: StandardScaler,
    pub standardized: FeatureMatrix,
    pub label_weights: Vec<f64>,
    pub continuous: Vec<f64>,
    pub classes: Vec<usize>,
    pub linear: LinearRegression,
    pub logistic: LogisticRegression,
    pub artifact: ExportedArtifact,
    pub evaluation: Option<EvaluationReport>,
}

/// Load from `cfg.dataset_dir`, train, and write the artifact to
/// `cfg.output_path`.
pub fn run(cfg: &PipelineConfig) -> Result<TrainingRun> {
    cfg.validate()?;
    let dataset = load_dataset(cfg)?;
    let run = train(cfg, dataset)?;
    run.artifact.write(&cfg.output_path, &cfg.global_name)?;
    Ok(run)
}

/// Train both models on an in-memory dataset.  No file I/O.
pub fn train(cfg: &PipelineConfig, dataset: Dataset) -> Result<TrainingRun> {
    cfg.validate()?;
    if dataset.n_channels() != cfg.n_channels() {
        return Err(Error::Shape(format!(
            "dataset has {} channels but {} channel labels are configured",
            dataset.n_channels(),
            cfg.n_channels()
        )));
    }

    let raw = impute_column_means(&dataset)?;
    drop(dataset);
    info!("Missing values handled with channel means");
    metrics::log_summary(&metrics::describe(&raw), &cfg.channel_labels);

    let (scaler, standardized) = StandardScaler::fit_transform(&raw)?;
    info!("Features standardized ({} rows)", standardized.n_rows());

    let label_weights = cfg.effective_label_weights();
    let continuous = continuous_labels(&standardized, &label_weights)?;
    let classes = categorical_labels(&continuous, cfg.n_classes(), cfg.quantile_epsilon)?;
    info!("Synthetic emotion labels created ({} classes)", cfg.n_classes());

    // The report is informational; a split too small to fit on only skips it.
    let evaluation = if cfg.evaluate {
        match evaluate(cfg, &standardized, &continuous, &classes) {
            Ok(report) => {
                report.log(&cfg.channel_labels, &cfg.emotion_labels);
                Some(report)
            }
            Err(e) => {
                warn!("Skipping evaluation report: {e}");
                None
            }
        }
    } else {
        None
    };

    let mut linear = LinearRegression::new();
    linear.fit(&standardized, &continuous)?;

    let mut logistic =
        LogisticRegression::new(cfg.logistic_c, cfg.logistic_max_iter, cfg.logistic_tol);
    logistic.fit(&standardized, &classes, cfg.n_classes())?;
    info!("Models trained on all {} rows", standardized.n_rows());

    let artifact =
        ExportedArtifact::assemble(cfg, &raw, &scaler, &linear, &logistic, &label_weights)?;

    Ok(TrainingRun {
        raw,
        scaler,
        standardized,
        label_weights,
        continuous,
        classes,
        linear,
        logistic,
        artifact,
        evaluation,
    })
}

/// Fit on a seeded training split and score on the held-out rows.
fn evaluate(
    cfg: &PipelineConfig,
    x: &FeatureMatrix,
    continuous: &[f64],
    classes: &[usize],
) -> Result<EvaluationReport> {
    let (train_idx, test_idx) =
        metrics::train_test_split(x.n_rows(), cfg.test_fraction, cfg.split_seed);
    if train_idx.len() < 2 || test_idx.is_empty() {
        return Err(Error::InsufficientRows {
            required: 3,
            actual: x.n_rows(),
        });
    }
    let x_train = x.select_rows(&train_idx);
    let x_test = x.select_rows(&test_idx);
    let pick_f = |idx: &[usize]| idx.iter().map(|&i| continuous[i]).collect::<Vec<_>>();
    let pick_c = |idx: &[usize]| idx.iter().map(|&i| classes[i]).collect::<Vec<_>>();

    let mut linear = LinearRegression::new();
    linear.fit(&x_train, &pick_f(&train_idx))?;
    let y_test = pick_f(&test_idx);
    let y_pred = linear.predict(&x_test);

    let mut logistic =
        LogisticRegression::new(cfg.logistic_c, cfg.logistic_max_iter, cfg.logistic_tol);
    logistic.fit(&x_train, &pick_c(&train_idx), cfg.n_classes())?;
    let c_test = pick_c(&test_idx);
    let c_pred = logistic.predict(&x_test);

    let confusion = metrics::confusion_matrix(&c_test, &c_pred, cfg.n_classes());
    Ok(EvaluationReport {
        mse: metrics::mean_squared_error(&y_test, &y_pred),
        r2: metrics::r2_score(&y_test, &y_pred),
        accuracy: metrics::accuracy(&c_test, &c_pred),
        per_class: metrics::classification_report(&confusion),
        confusion,
        top_channels: metrics::top_coefficients(linear.coefficients(), 5),
    })
}
