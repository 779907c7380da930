use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use eeg_emotion::config::CHANNEL_LABELS;

/// Write synthetic subject files (`s01.csv`, `s02.csv`, ...) for the trainer.
#[derive(Parser)]
#[command(name = "generate_sample", about)]
struct Args {
    /// Output directory (created if missing)
    #[arg(short, long, default_value = "dataset")]
    out: PathBuf,

    /// Number of subject files
    #[arg(long, default_value_t = 5)]
    subjects: usize,

    /// Rows per subject
    #[arg(long, default_value_t = 200)]
    rows: usize,

    /// Fraction of cells left blank
    #[arg(long, default_value_t = 0.01)]
    missing: f64,

    #[arg(long, default_value_t = 42)]
    seed: u64,
}

/// Box-Muller transform for normal distribution
fn gauss(rng: &mut StdRng, mean: f64, std_dev: f64) -> f64 {
    let u1 = rng.gen::<f64>().max(1e-15);
    let u2 = rng.gen::<f64>();
    let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
    mean + std_dev * z
}

/// One reading per channel: a subject-level offset, a shared "arousal"
/// component weighted per channel, and independent noise.
fn generate_row(
    rng: &mut StdRng,
    baseline: &[f64],
    loading: &[f64],
    missing: f64,
) -> Vec<String> {
    let arousal = gauss(rng, 0.0, 1.0);
    baseline
        .iter()
        .zip(loading)
        .map(|(&b, &l)| {
            if rng.gen::<f64>() < missing {
                String::new()
            } else {
                format!("{:.4}", b + l * arousal + gauss(rng, 0.0, 2.0))
            }
        })
        .collect()
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    std::fs::create_dir_all(&args.out)
        .with_context(|| format!("Failed to create {}", args.out.display()))?;

    let mut rng = StdRng::seed_from_u64(args.seed);
    let n_channels = CHANNEL_LABELS.len();
    let loading: Vec<f64> = (0..n_channels).map(|_| gauss(&mut rng, 0.0, 3.0)).collect();

    for subject in 1..=args.subjects {
        let baseline: Vec<f64> = (0..n_channels)
            .map(|_| gauss(&mut rng, 10.0, 4.0))
            .collect();

        let path = args.out.join(format!("s{subject:02}.csv"));
        let mut writer = csv::Writer::from_path(&path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        for _ in 0..args.rows {
            let row = generate_row(&mut rng, &baseline, &loading, args.missing);
            writer
                .write_record(&row)
                .with_context(|| format!("Failed to write {}", path.display()))?;
        }
        writer
            .flush()
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!("Wrote {} ({} rows x {n_channels} channels)", path.display(), args.rows);
    }

    Ok(())
}
