//! Scoring model registry.

mod logit;
pub use logit::{LogitModel, LogitParams};

use std::path::Path;

use serde_json::{Map, Value};

use crate::{dataset::Row, error::EvsError};

/// Labeled rows handed to a model for training.
#[derive(Debug, Clone)]
pub struct TrainingSet {
    pub features: Vec<String>,
    pub tp: Vec<Row>,
    pub fp: Vec<Row>,
}

pub trait EvsModel {
    fn name(&self) -> &'static str;

    /// Fit the model; `params` is the parsed parameter file (empty without one).
    fn train(&mut self, data: &TrainingSet, params: &Map<String, Value>) -> Result<(), EvsError>;

    /// Write the trained model as JSON.
    fn save(&self, path: &Path) -> Result<(), EvsError>;

    /// Write diagnostic output into `dir`; `Ok(false)` when the model has none.
    fn plots(&self, _dir: &Path) -> Result<bool, EvsError> {
        Ok(false)
    }
}

/// Names of all registered models.
pub const MODEL_NAMES: &[&str] = &[LogitModel::NAME];

/// A fresh, untrained model registered as `name`.
pub fn create(name: &str) -> Result<Box<dyn EvsModel>, EvsError> {
    match name {
        LogitModel::NAME => Ok(Box::new(LogitModel::default())),
        _ => Err(EvsError::UnknownModel {
            name: name.to_string(),
            available: MODEL_NAMES.join(", "),
        }),
    }
}
