/// Data layer: raw table types and subject-file loading.
///
/// Architecture:
/// ```text
///  dataset/s01.csv, s02.csv, ...
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  discover + parse headerless CSV → Dataset
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  Dataset  │  Vec<Vec<Option<f64>>>, one row per sample
///   └──────────┘
///        │
///        ▼
///   preprocess::impute_column_means → FeatureMatrix
/// ```

pub mod loader;
pub mod model;
