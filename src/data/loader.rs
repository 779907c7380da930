use std::path::{Path, PathBuf};

use log::info;

use super::model::Dataset;
use crate::config::PipelineConfig;
use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load and concatenate the subject tables found in `cfg.dataset_dir`.
///
/// Files are taken in name order, at most `cfg.max_subjects` of them, and
/// their rows are appended in that order.
pub fn load_dataset(cfg: &PipelineConfig) -> Result<Dataset> {
    let files = discover_subject_files(
        &cfg.dataset_dir,
        &cfg.file_prefix,
        &cfg.file_extension,
        cfg.max_subjects,
    )?;

    info!("Found {} subject files:", files.len());
    for file in &files {
        info!(
            "  - {}",
            file.file_name().and_then(|n| n.to_str()).unwrap_or("?")
        );
    }

    let mut combined = Dataset::new(cfg.n_channels());
    for file in &files {
        combined.extend(load_subject_file(file, cfg.n_channels())?)?;
    }

    info!(
        "Combined shape: ({}, {}), {} missing cells",
        combined.len(),
        combined.n_channels(),
        combined.missing_count()
    );
    Ok(combined)
}

// ---------------------------------------------------------------------------
// File discovery
// ---------------------------------------------------------------------------

/// Subject files in `dir`: regular files named `<prefix>*.<extension>`,
/// sorted by file name and truncated to `max_subjects`.
pub fn discover_subject_files(
    dir: &Path,
    prefix: &str,
    extension: &str,
    max_subjects: usize,
) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(Error::NotFound {
            what: "dataset folder".into(),
            path: dir.to_path_buf(),
        });
    }

    let entries = std::fs::read_dir(dir).map_err(|source| Error::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| Error::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let name_ok = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with(prefix));
        let ext_ok = path.extension().and_then(|e| e.to_str()) == Some(extension);
        if name_ok && ext_ok {
            files.push(path);
        }
    }

    if files.is_empty() {
        return Err(Error::NotFound {
            what: format!("EEG files matching '{prefix}*.{extension}'"),
            path: dir.to_path_buf(),
        });
    }

    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    files.truncate(max_subjects);
    Ok(files)
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// CSV layout: no header row, exactly `n_channels` numeric fields per line.
///
/// Empty fields and the usual missing-value markers ([`MISSING_TOKENS`]:
/// `NA`, `N/A`, `NULL`, `NaN`, `#N/A`, ...) are read as missing.  Infinite
/// values are rejected with [`Error::Parse`].
pub fn load_subject_file(path: &Path, n_channels: usize) -> Result<Dataset> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|source| Error::Csv {
            path: path.to_path_buf(),
            source,
        })?;

    let mut table = Dataset::new(n_channels);

    for (row_no, result) in reader.records().enumerate() {
        let record = result.map_err(|source| Error::Csv {
            path: path.to_path_buf(),
            source,
        })?;

        if record.len() != n_channels {
            return Err(Error::Shape(format!(
                "{}: row {row_no} has {} columns, expected {n_channels}",
                path.display(),
                record.len()
            )));
        }

        let row = record
            .iter()
            .enumerate()
            .map(|(col, cell)| parse_cell(cell, path, row_no, col))
            .collect::<Result<Vec<_>>>()?;
        table.push_row(row)?;
    }

    Ok(table)
}

/// Cell contents that mark a missing value (matched exactly, after trimming).
pub const MISSING_TOKENS: [&str; 19] = [
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND",
    "1.#QNAN", "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

fn parse_cell(s: &str, path: &Path, row: usize, column: usize) -> Result<Option<f64>> {
    if MISSING_TOKENS.contains(&s) {
        return Ok(None);
    }
    match s.parse::<f64>() {
        Ok(v) if v.is_nan() => Ok(None),
        Ok(v) if v.is_finite() => Ok(Some(v)),
        _ => Err(Error::Parse {
            path: path.to_path_buf(),
            row,
            column,
            value: s.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, name: &str, body: &str) {
        std::fs::write(dir.join(name), body).unwrap();
    }

    #[test]
    fn discovery_filters_sorts_and_truncates() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["s03.csv", "s01.csv", "s02.csv", "x01.csv", "s04.txt"] {
            write(dir.path(), name, "1,2\n");
        }
        std::fs::create_dir(dir.path().join("s05.csv")).unwrap();

        let files = discover_subject_files(dir.path(), "s", "csv", 2).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["s01.csv", "s02.csv"]);
    }

    #[test]
    fn missing_directory_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        let err = discover_subject_files(&missing, "s", "csv", 5).unwrap_err();
        match err {
            Error::NotFound { path, .. } => assert_eq!(path, missing),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn no_matching_files_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "readme.md", "hi");
        assert!(matches!(
            discover_subject_files(dir.path(), "s", "csv", 5),
            Err(Error::NotFound { .. })
        ));
    }

    #[test]
    fn blank_and_nan_cells_are_missing() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "s01.csv", "1.5,,3\nNaN, 2 ,-4e1\n");
        let table = load_subject_file(&dir.path().join("s01.csv"), 3).unwrap();
        assert_eq!(
            table.rows(),
            &[
                vec![Some(1.5), None, Some(3.0)],
                vec![None, Some(2.0), Some(-40.0)],
            ]
        );
    }

    #[test]
    fn missing_markers_are_missing() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "s01.csv", "1,NA,3\nN/A,NULL,null\n#N/A,n/a,None\n4,5,6\n");
        let table = load_subject_file(&dir.path().join("s01.csv"), 3).unwrap();
        assert_eq!(table.rows()[0], vec![Some(1.0), None, Some(3.0)]);
        assert_eq!(table.missing_count(), 7);
        assert_eq!(table.rows()[3], vec![Some(4.0), Some(5.0), Some(6.0)]);
    }

    #[test]
    fn infinite_cells_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        for (i, cell) in ["inf", "-infinity", "1e999"].iter().enumerate() {
            let name = format!("s0{i}.csv");
            write(dir.path(), &name, &format!("1,{cell},3\n"));
            match load_subject_file(&dir.path().join(&name), 3) {
                Err(Error::Parse { row, column, value, .. }) => {
                    assert_eq!((row, column), (0, 1));
                    assert_eq!(value, *cell);
                }
                other => panic!("expected parse error for {cell}, got {other:?}"),
            }
        }
    }

    #[test]
    fn wrong_column_count_is_shape_error() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "s01.csv", "1,2,3\n1,2\n");
        assert!(matches!(
            load_subject_file(&dir.path().join("s01.csv"), 3),
            Err(Error::Shape(_))
        ));
    }

    #[test]
    fn garbage_cell_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "s01.csv", "1,abc\n");
        match load_subject_file(&dir.path().join("s01.csv"), 2) {
            Err(Error::Parse { row, column, value, .. }) => {
                assert_eq!((row, column), (0, 1));
                assert_eq!(value, "abc");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn load_dataset_concatenates_in_file_order() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "s02.csv", "3,3\n4,4\n");
        write(dir.path(), "s01.csv", "1,1\n2,2\n");
        let cfg = PipelineConfig {
            dataset_dir: dir.path().to_path_buf(),
            channel_labels: vec!["A".into(), "B".into()],
            ..PipelineConfig::default()
        };
        let ds = load_dataset(&cfg).unwrap();
        let firsts: Vec<_> = ds.rows().iter().map(|r| r[0].unwrap()).collect();
        assert_eq!(firsts, vec![1.0, 2.0, 3.0, 4.0]);
    }
}
