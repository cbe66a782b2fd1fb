//! The `evs-learn` pipeline: check inputs, load, balance, train, save.

use std::{
    fs,
    path::{Path, PathBuf},
};

use rand::{SeedableRng, rngs::StdRng};
use serde_json::{Map, Value as Json};
use tracing::{info, instrument, warn};

use crate::{
    dataset::{Dataset, LoadOptions},
    error::EvsError,
    features::resolve_features,
    model::{self, TrainingSet},
};

/// One training run.
#[derive(Debug, Clone, Default)]
pub struct TrainConfig {
    pub inputs: Vec<PathBuf>,
    pub model: String,
    /// Feature set name or comma-separated feature list.
    pub features: String,
    pub parameters: Option<PathBuf>,
    pub output: PathBuf,
    pub balance_overall: bool,
    pub balance_per_sample: bool,
    /// Rows to subsample from each input; 0 keeps all.
    pub sample_input: usize,
    pub plots: bool,
    /// Fixed random seed for reproducible sampling.
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainReport {
    pub tp: usize,
    pub fp: usize,
    pub output: PathBuf,
    /// Set when diagnostic plots were written.
    pub plots_dir: Option<PathBuf>,
}

/// Every input and the parameter file must exist before anything is read.
pub fn check_inputs(cfg: &TrainConfig) -> Result<(), EvsError> {
    if cfg.inputs.is_empty() {
        return Err(EvsError::NoInputs);
    }
    for input in &cfg.inputs {
        check_file(input, "features CSV")?;
    }
    if let Some(p) = &cfg.parameters {
        check_file(p, "training model parameter")?;
    }
    Ok(())
}

fn check_file(path: &Path, label: &'static str) -> Result<(), EvsError> {
    if path.is_file() {
        Ok(())
    } else {
        Err(EvsError::MissingInput {
            label,
            path: path.to_path_buf(),
        })
    }
}

fn load_parameters(path: Option<&Path>) -> Result<Map<String, Json>, EvsError> {
    let Some(path) = path else {
        info!(target: "wfrun.evs.train", "using default learning parameters");
        return Ok(Map::new());
    };
    let raw = fs::read(path).map_err(|e| EvsError::io(path, e))?;
    match serde_json::from_slice(&raw) {
        Ok(Json::Object(map)) => {
            info!(target: "wfrun.evs.train", parameters = %Json::Object(map.clone()), "using custom learning parameters");
            Ok(map)
        }
        Ok(other) => Err(EvsError::InvalidParameters(format!(
            "'{}' must hold a JSON object, found {other}",
            path.display()
        ))),
        Err(e) => Err(EvsError::InvalidParameters(format!(
            "'{}': {e}",
            path.display()
        ))),
    }
}

/// Run the whole training pipeline for `cfg`.
#[instrument(level = "info", skip_all, fields(model = %cfg.model, inputs = cfg.inputs.len()))]
pub fn run(cfg: &TrainConfig) -> Result<TrainReport, EvsError> {
    check_inputs(cfg)?;

    let features = resolve_features(&cfg.features);
    let params = load_parameters(cfg.parameters.as_deref())?;
    let mut model = model::create(&cfg.model)?;

    let mut rng = match cfg.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let opts = LoadOptions {
        sample_input: (cfg.sample_input > 0).then_some(cfg.sample_input),
        balance_per_sample: cfg.balance_per_sample,
    };
    let dataset = Dataset::load_all(&cfg.inputs, &features, &opts, &mut rng)?;

    let (tp, fp) = if cfg.balance_overall && !cfg.balance_per_sample {
        dataset.split_balanced(&mut rng)
    } else {
        dataset.split()
    };
    info!(target: "wfrun.evs.train", tp = tp.len(), fp = fp.len(), "training set ready");

    let data = TrainingSet { features, tp, fp };
    model.train(&data, &params)?;
    model.save(&cfg.output)?;
    info!(target: "wfrun.evs.train", output = %cfg.output.display(), "model written");

    let mut plots_dir = None;
    if cfg.plots {
        let mut dir = cfg.output.clone().into_os_string();
        dir.push(".plots");
        let dir = PathBuf::from(dir);
        if model.plots(&dir)? {
            plots_dir = Some(dir);
        } else {
            warn!(target: "wfrun.evs.train", model = model.name(), "No plots created, this is not supported by the model");
        }
    }

    Ok(TrainReport {
        tp: data.tp.len(),
        fp: data.fp.len(),
        output: cfg.output.clone(),
        plots_dir,
    })
}
