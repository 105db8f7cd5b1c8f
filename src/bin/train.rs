use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use spam_detector::{
    config,
    infrastructure::{directories, logging},
    ml::FitOptions,
    training::{self, TrainingOptions},
};

/// Trains the spam classifier on a TREC-layout corpus and writes the model
/// file the API server loads at startup.
#[derive(Debug, Parser)]
#[command(name = "train", version, about)]
struct Args {
    /// Corpus root containing `full/index` and the referenced emails.
    #[arg(long, default_value = "scripts/trec")]
    dataset: PathBuf,

    /// Where to write the model. Defaults to MODEL_PATH.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Maximum number of index lines to read.
    #[arg(long, default_value_t = 15_000)]
    limit: usize,

    /// Held-out fraction used for evaluation.
    #[arg(long, default_value_t = 0.2)]
    test_size: f64,

    #[arg(long, default_value_t = 42)]
    seed: u64,

    #[arg(long, default_value_t = 2_000)]
    max_iter: usize,

    /// Inverse regularization strength.
    #[arg(long, default_value_t = 1.0)]
    c: f64,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let config = config::load_config()?;
    let logs_dir = directories::ensure_logs_dir(&config.directories)?;
    logging::init_tracing(&config.logging, &logs_dir, "train.log")?;

    let output = args.output.unwrap_or_else(|| config.model_path.clone());
    let options = TrainingOptions {
        dataset: args.dataset,
        limit: args.limit,
        test_fraction: args.test_size,
        seed: args.seed,
        fit: FitOptions {
            c: args.c,
            max_iter: args.max_iter,
            ..FitOptions::default()
        },
    };

    tracing::info!(
        target: "train",
        dataset = %options.dataset.display(),
        output = %output.display(),
        "starting training"
    );

    let outcome = training::train(&options)?;
    println!("Accuracy: {:.4}", outcome.report.accuracy);
    println!();
    println!("{}", outcome.report);

    training::save_model(&outcome.model, &output)?;
    println!("Model saved to {}", output.display());
    Ok(())
}
