/// Shared fixtures: synthetic subject files and small configs.
use std::fmt::Write as _;
use std::path::Path;

use eeg_emotion::data::model::Dataset;
use eeg_emotion::PipelineConfig;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub const N_CHANNELS: usize = 19;

/// Write `s01.csv` ... `sNN.csv` into `dir`, `rows` lines each, with roughly
/// one blank cell in fifty.
#[allow(unused)]
pub fn write_subjects(dir: &Path, n_subjects: usize, rows: usize, seed: u64) {
    let mut rng = StdRng::seed_from_u64(seed);
    for s in 1..=n_subjects {
        let offset: f64 = rng.gen_range(-5.0..5.0);
        let mut text = String::new();
        for _ in 0..rows {
            let cells: Vec<String> = (0..N_CHANNELS)
                .map(|ch| {
                    if rng.gen_ratio(1, 50) {
                        String::new()
                    } else {
                        let v = offset + ch as f64 + rng.gen_range(-20.0..20.0);
                        format!("{v:.3}")
                    }
                })
                .collect();
            writeln!(text, "{}", cells.join(",")).unwrap();
        }
        std::fs::write(dir.join(format!("s{s:02}.csv")), text).unwrap();
    }
}

/// Default 19-channel, 6-class config pointed at `dataset_dir`, writing to
/// `output`.
#[allow(unused)]
pub fn config(dataset_dir: &Path, output: &Path) -> PipelineConfig {
    PipelineConfig {
        dataset_dir: dataset_dir.to_path_buf(),
        output_path: output.to_path_buf(),
        sample_pool_size: 50,
        ..PipelineConfig::default()
    }
}

/// Three channels weighted `[1, 2, 3]`, no emphasis, `n_classes` classes.
#[allow(unused)]
pub fn tiny_config(n_classes: usize) -> PipelineConfig {
    PipelineConfig {
        channel_labels: vec!["A".into(), "B".into(), "C".into()],
        emotion_labels: (0..n_classes).map(|k| format!("E{k}")).collect(),
        label_weights: vec![1.0, 2.0, 3.0],
        emphasized_channels: vec![],
        evaluate: false,
        ..PipelineConfig::default()
    }
}

/// Rows `[1,0,0] [0,1,0] [0,0,1] [1,1,1]`.
#[allow(unused)]
pub fn unit_rows() -> Dataset {
    Dataset::from_dense(
        3,
        vec![
            vec![1.0, 0.0, 0.0],
            vec![0.0, 1.0, 0.0],
            vec![0.0, 0.0, 1.0],
            vec![1.0, 1.0, 1.0],
        ],
    )
    .unwrap()
}
