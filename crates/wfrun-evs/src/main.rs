//! `evs-learn`: train an empirical variant scoring model from labeled feature tables.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use wfrun_evs::{
    TrainConfig,
    features::FeatureSet,
    model::MODEL_NAMES,
    train,
};
use wfrun_observe::{LoggerConfig, logger_init};

#[derive(Debug, Parser)]
#[command(name = "evs-learn")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Labeled feature CSV files (column `tag` holds TP/FP/FN).
    #[arg(value_name = "INPUT", required = true)]
    inputs: Vec<PathBuf>,

    /// Model to train.
    #[arg(short, long, value_parser = clap::builder::PossibleValuesParser::new(MODEL_NAMES.iter().copied()))]
    model: String,

    #[arg(long, value_name = "SET|COLUMNS", help = feature_help())]
    features: String,

    /// JSON object of learning parameters.
    #[arg(short, long = "parameter-file", value_name = "FILE")]
    parameter_file: Option<PathBuf>,

    /// Where to write the trained model.
    #[arg(short, long, value_name = "FILE")]
    output: PathBuf,

    /// Downsample the larger of TP/FP across all inputs.
    #[arg(long = "balance_overall")]
    balance_overall: bool,

    /// Downsample the larger of TP/FP within each input.
    #[arg(long = "balance_per_sample")]
    balance_per_sample: bool,

    /// Rows to keep from each input (0 keeps all).
    #[arg(long = "sample-input", value_name = "N", default_value_t = 0)]
    sample_input: usize,

    /// Write diagnostic output next to the model.
    #[arg(long)]
    plots: bool,

    #[arg(long, hide = true)]
    seed: Option<u64>,
}

fn feature_help() -> String {
    format!(
        "Training features: one of {} or a comma-separated column list",
        FeatureSet::names().collect::<Vec<_>>().join(", ")
    )
}

impl From<Cli> for TrainConfig {
    fn from(cli: Cli) -> Self {
        TrainConfig {
            inputs: cli.inputs,
            model: cli.model,
            features: cli.features,
            parameters: cli.parameter_file,
            output: cli.output,
            balance_overall: cli.balance_overall,
            balance_per_sample: cli.balance_per_sample,
            sample_input: cli.sample_input,
            plots: cli.plots,
            seed: cli.seed,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = LoggerConfig::from_env().context("invalid logging configuration")?;
    logger_init(&cfg).context("failed to initialise logging")?;

    let cfg = TrainConfig::from(cli);
    let report = train::run(&cfg)?;
    info!(target: "wfrun.evs", tp = report.tp, fp = report.fp, output = %report.output.display(), "training finished");
    if cfg.plots && report.plots_dir.is_none() {
        println!("No plots created, this is not supported by {}", cfg.model);
    }
    Ok(())
}
