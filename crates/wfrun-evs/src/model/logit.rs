use std::{fs, path::Path};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info};

use super::{EvsModel, TrainingSet};
use crate::{dataset::Row, error::EvsError};

const COEFFICIENTS_FILE: &str = "coefficients.csv";

/// Learning parameters accepted in the parameter file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogitParams {
    pub learning_rate: f64,
    pub epochs: usize,
    /// L2 penalty on the coefficients (not the intercept).
    pub l2: f64,
}

impl Default for LogitParams {
    fn default() -> Self {
        Self {
            learning_rate: 0.5,
            epochs: 500,
            l2: 0.0,
        }
    }
}

impl LogitParams {
    fn from_map(params: &Map<String, Value>) -> Result<Self, EvsError> {
        let p: LogitParams = serde_json::from_value(Value::Object(params.clone()))
            .map_err(|e| EvsError::InvalidParameters(e.to_string()))?;
        if !(p.learning_rate > 0.0) || p.epochs == 0 || p.l2 < 0.0 {
            return Err(EvsError::InvalidParameters(format!(
                "learning_rate and epochs must be positive, l2 non-negative: {p:?}"
            )));
        }
        Ok(p)
    }
}

/// Weighted logistic regression on standardized features, fit by batch gradient descent.
///
/// TP rows are the positive class.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogitModel {
    pub features: Vec<String>,
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
    pub coefficients: Vec<f64>,
    pub intercept: f64,
    pub parameters: Option<LogitParams>,
    pub tp_count: usize,
    pub fp_count: usize,
}

#[derive(Serialize)]
struct SavedModel<'a> {
    model: &'static str,
    #[serde(flatten)]
    inner: &'a LogitModel,
}

impl LogitModel {
    pub const NAME: &'static str = "logit";

    /// Probability that `values` (in feature order) is a true positive.
    pub fn score(&self, values: &[f64]) -> f64 {
        sigmoid(self.linear(values))
    }

    fn linear(&self, values: &[f64]) -> f64 {
        self.coefficients
            .iter()
            .zip(values)
            .zip(self.mean.iter().zip(&self.scale))
            .fold(self.intercept, |acc, ((b, x), (m, s))| acc + b * (x - m) / s)
    }
}

impl EvsModel for LogitModel {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn train(&mut self, data: &TrainingSet, params: &Map<String, Value>) -> Result<(), EvsError> {
        let p = LogitParams::from_map(params)?;
        if data.tp.is_empty() || data.fp.is_empty() {
            return Err(EvsError::NoTrainingData(format!(
                "need both TP and FP rows (TP: {}, FP: {})",
                data.tp.len(),
                data.fp.len()
            )));
        }

        let samples: Vec<(&Row, f64)> = data
            .tp
            .iter()
            .map(|r| (r, 1.0))
            .chain(data.fp.iter().map(|r| (r, 0.0)))
            .collect();
        let total_weight: f64 = samples.iter().map(|(r, _)| r.weight).sum();
        if total_weight <= 0.0 {
            return Err(EvsError::NoTrainingData("total row weight is zero".into()));
        }

        let n = data.features.len();
        let (mean, scale) = standardization(&samples, n, total_weight);
        let x: Vec<Vec<f64>> = samples
            .iter()
            .map(|(r, _)| {
                (0..n)
                    .map(|j| (r.values[j] - mean[j]) / scale[j])
                    .collect()
            })
            .collect();

        let mut beta = vec![0.0; n];
        let mut intercept = 0.0;
        for epoch in 0..p.epochs {
            let mut grad = vec![0.0; n];
            let mut grad_b = 0.0;
            for ((row, y), xi) in samples.iter().zip(&x) {
                let z = intercept + beta.iter().zip(xi).map(|(b, v)| b * v).sum::<f64>();
                let err = row.weight * (sigmoid(z) - y);
                grad_b += err;
                for (g, v) in grad.iter_mut().zip(xi) {
                    *g += err * v;
                }
            }
            for (b, g) in beta.iter_mut().zip(&grad) {
                *b -= p.learning_rate * (g / total_weight + p.l2 * *b);
            }
            intercept -= p.learning_rate * grad_b / total_weight;
            if epoch % 100 == 0 {
                debug!(target: "wfrun.evs.logit", epoch, intercept, "gradient step");
            }
        }

        info!(target: "wfrun.evs.logit", tp = data.tp.len(), fp = data.fp.len(), features = n, "model trained");
        *self = LogitModel {
            features: data.features.clone(),
            mean,
            scale,
            coefficients: beta,
            intercept,
            parameters: Some(p),
            tp_count: data.tp.len(),
            fp_count: data.fp.len(),
        };
        Ok(())
    }

    fn save(&self, path: &Path) -> Result<(), EvsError> {
        let json = serde_json::to_vec_pretty(&SavedModel {
            model: Self::NAME,
            inner: self,
        })
        .map_err(|e| EvsError::io(path, e.into()))?;
        fs::write(path, json).map_err(|e| EvsError::io(path, e))
    }

    fn plots(&self, dir: &Path) -> Result<bool, EvsError> {
        fs::create_dir_all(dir).map_err(|e| EvsError::io(dir, e))?;
        let path = dir.join(COEFFICIENTS_FILE);
        let mut w = csv::Writer::from_path(&path).map_err(|e| EvsError::csv(&path, e))?;
        w.write_record(["feature", "coefficient", "mean", "scale"])
            .map_err(|e| EvsError::csv(&path, e))?;
        w.write_record(["(intercept)", self.intercept.to_string().as_str(), "", ""])
            .map_err(|e| EvsError::csv(&path, e))?;
        for (i, f) in self.features.iter().enumerate() {
            w.write_record([
                f.clone(),
                self.coefficients[i].to_string(),
                self.mean[i].to_string(),
                self.scale[i].to_string(),
            ])
            .map_err(|e| EvsError::csv(&path, e))?;
        }
        w.flush().map_err(|e| EvsError::io(&path, e))?;
        Ok(true)
    }
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

/// Weighted mean and standard deviation per feature; constant features get scale 1.
fn standardization(samples: &[(&Row, f64)], n: usize, total_weight: f64) -> (Vec<f64>, Vec<f64>) {
    let mut mean = vec![0.0; n];
    for (row, _) in samples {
        for (m, v) in mean.iter_mut().zip(&row.values) {
            *m += row.weight * v;
        }
    }
    mean.iter_mut().for_each(|m| *m /= total_weight);

    let mut var = vec![0.0; n];
    for (row, _) in samples {
        for ((s, v), m) in var.iter_mut().zip(&row.values).zip(&mean) {
            *s += row.weight * (v - m).powi(2);
        }
    }
    let scale = var
        .into_iter()
        .map(|s| {
            let sd = (s / total_weight).sqrt();
            if sd > f64::EPSILON { sd } else { 1.0 }
        })
        .collect();
    (mean, scale)
}
