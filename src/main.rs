use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use log::info;

use eeg_emotion::server::{self, ServerConfig};
use eeg_emotion::{inference, pipeline, ExportedArtifact, PipelineConfig};

/// Train emotion models on EEG channel tables and serve the browser demo.
#[derive(Parser)]
#[command(name = "eeg-emotion", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load subject files, train both models and write the browser artifact
    Train {
        /// JSON file with pipeline overrides
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Directory holding the subject CSV files
        #[arg(short, long)]
        dataset: Option<PathBuf>,

        /// Artifact path (its directory must exist)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Load at most this many subject files
        #[arg(long)]
        max_subjects: Option<usize>,

        /// Skip the hold-out evaluation report
        #[arg(long)]
        no_eval: bool,
    },

    /// Score one row against an exported artifact and print the result as JSON
    Predict {
        /// Artifact written by `train`
        #[arg(short, long, default_value = "web/model.js")]
        artifact: PathBuf,

        /// Comma-separated raw channel values
        #[arg(long, value_delimiter = ',', allow_hyphen_values = true, conflicts_with = "sample")]
        values: Option<Vec<f64>>,

        /// Use row N of the artifact's sample pool instead of the example row
        #[arg(long)]
        sample: Option<usize>,
    },

    /// Serve the web UI read-only on localhost
    Serve {
        /// Directory to serve (must contain index.html)
        #[arg(short, long, default_value = "web")]
        dir: PathBuf,

        /// Port to listen on
        #[arg(short, long, env = "PORT", default_value_t = 5500)]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Train {
            config,
            dataset,
            output,
            max_subjects,
            no_eval,
        } => train(config, dataset, output, max_subjects, no_eval),
        Commands::Predict {
            artifact,
            values,
            sample,
        } => predict(artifact, values, sample),
        Commands::Serve { dir, port, host } => serve(ServerConfig {
            root: dir,
            host,
            port,
        }),
    }
}

fn train(
    config: Option<PathBuf>,
    dataset: Option<PathBuf>,
    output: Option<PathBuf>,
    max_subjects: Option<usize>,
    no_eval: bool,
) -> Result<()> {
    let mut cfg = match &config {
        Some(path) => PipelineConfig::from_json_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    if let Some(dir) = dataset {
        cfg.dataset_dir = dir;
    }
    if let Some(path) = output {
        cfg.output_path = path;
    }
    if let Some(n) = max_subjects {
        cfg.max_subjects = n;
    }
    if no_eval {
        cfg.evaluate = false;
    }

    let run = pipeline::run(&cfg).context("Training failed")?;
    info!(
        "Wrote {} ({} channels, {} classes, {} sample rows)",
        cfg.output_path.display(),
        run.artifact.channel_labels.len(),
        run.artifact.emotion_labels.len(),
        run.artifact.sample_values.len()
    );
    Ok(())
}

fn predict(artifact: PathBuf, values: Option<Vec<f64>>, sample: Option<usize>) -> Result<()> {
    let artifact = ExportedArtifact::read(&artifact)
        .with_context(|| format!("Failed to read artifact {}", artifact.display()))?;

    let row = match (values, sample) {
        (Some(values), _) => values,
        (None, Some(i)) => match artifact.sample_values.get(i) {
            Some(row) => row.clone(),
            None => bail!(
                "sample {i} out of range ({} rows in pool)",
                artifact.sample_values.len()
            ),
        },
        (None, None) => artifact.example_values.clone(),
    };

    let prediction = inference::predict(&artifact, &row)?;
    println!("{}", serde_json::to_string_pretty(&prediction)?);
    Ok(())
}

fn serve(config: ServerConfig) -> Result<()> {
    config.check_root()?;
    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
    runtime
        .block_on(server::serve(config.clone()))
        .with_context(|| format!("Server on {} failed", config.bind_addr()))
}
