//! Labeled feature tables: loading, subsampling and label balancing.

use std::path::{Path, PathBuf};

use rand::{Rng, seq::index};
use tracing::info;

use crate::error::EvsError;

/// Column holding the truth label of each row.
pub const TAG_COLUMN: &str = "tag";
/// Row weight for admixture inputs (file path contains `Admix`).
pub const ADMIX_WEIGHT: f64 = 1.0;
/// Row weight for normal-normal inputs (file path contains `NN`).
pub const NN_WEIGHT: f64 = 1.0;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Label {
    Tp,
    Fp,
    Other(String),
}

impl Label {
    fn parse(tag: &str) -> Self {
        match tag {
            "TP" => Label::Tp,
            "FP" => Label::Fp,
            other => Label::Other(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub label: Label,
    /// Feature values, in [`Dataset::features`] order.
    pub values: Vec<f64>,
    pub weight: f64,
}

#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Keep at most this many rows per input file.
    pub sample_input: Option<usize>,
    /// Downsample the larger of TP/FP in each input file.
    pub balance_per_sample: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub features: Vec<String>,
    pub rows: Vec<Row>,
}

impl Dataset {
    pub fn new(features: Vec<String>) -> Self {
        Self {
            features,
            rows: Vec::new(),
        }
    }

    pub fn count(&self, label: &Label) -> usize {
        self.rows.iter().filter(|r| &r.label == label).count()
    }

    /// Load and combine all `inputs`.
    pub fn load_all<R: Rng + ?Sized>(
        inputs: &[PathBuf],
        features: &[String],
        opts: &LoadOptions,
        rng: &mut R,
    ) -> Result<Self, EvsError> {
        let mut all = Dataset::new(features.to_vec());
        for input in inputs {
            let ds = Self::load(input, features, opts, rng)?;
            all.rows.extend(ds.rows);
        }
        Ok(all)
    }

    /// Load one CSV file; `FN` rows are dropped before any sampling.
    pub fn load<R: Rng + ?Sized>(
        path: &Path,
        features: &[String],
        opts: &LoadOptions,
        rng: &mut R,
    ) -> Result<Self, EvsError> {
        info!(target: "wfrun.evs.dataset", path = %path.display(), "reading");
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_path(path)
            .map_err(|e| EvsError::csv(path, e))?;

        let headers = reader.headers().map_err(|e| EvsError::csv(path, e))?.clone();
        let column = |name: &str| {
            headers
                .iter()
                .position(|h| h == name)
                .ok_or_else(|| EvsError::MissingColumn {
                    path: path.to_path_buf(),
                    column: name.to_string(),
                })
        };
        let tag_idx = column(TAG_COLUMN)?;
        let feature_idx = features
            .iter()
            .map(|f| column(f.as_str()))
            .collect::<Result<Vec<_>, _>>()?;

        let weight = input_weight(path);
        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|e| EvsError::csv(path, e))?;
            let tag = record.get(tag_idx).unwrap_or_default();
            if tag == "FN" {
                continue;
            }
            let line = record.position().map(|p| p.line()).unwrap_or_default();
            let values = feature_idx
                .iter()
                .zip(features)
                .map(|(&i, name)| parse_value(record.get(i).unwrap_or_default(), path, line, name))
                .collect::<Result<Vec<_>, _>>()?;
            rows.push(Row {
                label: Label::parse(tag),
                values,
                weight,
            });
        }

        if let Some(n) = opts.sample_input.filter(|n| *n > 0) {
            rows = subsample(rows, n, rng);
        }

        if opts.balance_per_sample {
            let (tps, fps): (Vec<Row>, Vec<Row>) = rows
                .into_iter()
                .filter(|r| !matches!(r.label, Label::Other(_)))
                .partition(|r| r.label == Label::Tp);
            info!(target: "wfrun.evs.dataset", tp = tps.len(), fp = fps.len(), "before per-sample balancing");
            let n = tps.len().min(fps.len());
            let tps = subsample(tps, n, rng);
            let fps = subsample(fps, n, rng);
            info!(target: "wfrun.evs.dataset", tp = tps.len(), fp = fps.len(), "downsampled");
            rows = tps.into_iter().chain(fps).collect();
        }

        Ok(Dataset {
            features: features.to_vec(),
            rows,
        })
    }

    /// Split into TP and FP rows; other labels are not trained on.
    pub fn split(self) -> (Vec<Row>, Vec<Row>) {
        let mut tp = Vec::new();
        let mut fp = Vec::new();
        for row in self.rows {
            match row.label {
                Label::Tp => tp.push(row),
                Label::Fp => fp.push(row),
                Label::Other(_) => {}
            }
        }
        (tp, fp)
    }

    /// Like [`Dataset::split`], downsampling both labels to the same count.
    pub fn split_balanced<R: Rng + ?Sized>(self, rng: &mut R) -> (Vec<Row>, Vec<Row>) {
        let (tp, fp) = self.split();
        let n = tp.len().min(fp.len());
        (subsample(tp, n, rng), subsample(fp, n, rng))
    }
}

/// Keep a random subset of at most `n` rows, preserving input order.
pub fn subsample<T, R: Rng + ?Sized>(items: Vec<T>, n: usize, rng: &mut R) -> Vec<T> {
    if items.len() <= n {
        return items;
    }
    let mut keep = vec![false; items.len()];
    for i in index::sample(rng, items.len(), n).iter() {
        keep[i] = true;
    }
    items
        .into_iter()
        .zip(keep)
        .filter_map(|(item, k)| k.then_some(item))
        .collect()
}

/// Path used to recognise Admix/NN inputs: absolute, so a relative name matches on its directories too.
fn weight_key(path: &Path) -> String {
    std::path::absolute(path)
        .unwrap_or_else(|_| path.to_path_buf())
        .to_string_lossy()
        .into_owned()
}

fn input_weight(path: &Path) -> f64 {
    let key = weight_key(path);
    let mut weight = 1.0;
    if key.contains("Admix") {
        info!(target: "wfrun.evs.dataset", weight = ADMIX_WEIGHT, "admixture input");
        weight = ADMIX_WEIGHT;
    }
    if key.contains("NN") {
        info!(target: "wfrun.evs.dataset", weight = NN_WEIGHT, "normal-normal input");
        weight = NN_WEIGHT;
    }
    weight
}

fn parse_value(raw: &str, path: &Path, line: u64, column: &str) -> Result<f64, EvsError> {
    if raw.is_empty() {
        return Ok(0.0);
    }
    raw.parse().map_err(|_| EvsError::NonNumeric {
        path: path.to_path_buf(),
        line,
        column: column.to_string(),
        value: raw.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use std::fs;

    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    fn write(dir: &Path, name: &str, body: &str) -> PathBuf {
        let p = dir.join(name);
        fs::write(&p, body).unwrap();
        p
    }

    fn feats(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    const TABLE: &str = "CHROM,POS,tag,QSS_NT,MQ\n\
        chr1,1,TP,30,60\n\
        chr1,2,TP,25,\n\
        chr1,3,FP,3,20\n\
        chr1,4,FN,0,0\n\
        chr1,5,TP,40,55\n\
        chr1,6,UNK,1,1\n";

    #[test]
    fn drops_false_negatives_and_fills_empty_values() {
        let dir = tempfile::tempdir().unwrap();
        let p = write(dir.path(), "sample.csv", TABLE);
        let mut rng = StdRng::seed_from_u64(7);
        let ds = Dataset::load(&p, &feats(&["QSS_NT", "MQ"]), &LoadOptions::default(), &mut rng).unwrap();

        assert_eq!(ds.rows.len(), 5);
        assert_eq!(ds.count(&Label::Tp), 3);
        assert_eq!(ds.count(&Label::Fp), 1);
        assert_eq!(ds.rows[1].values, vec![25.0, 0.0]);
        assert!(ds.rows.iter().all(|r| r.weight == 1.0));
    }

    #[test]
    fn per_sample_balancing_equalises_labels() {
        let dir = tempfile::tempdir().unwrap();
        let p = write(dir.path(), "sample.csv", TABLE);
        let mut rng = StdRng::seed_from_u64(7);
        let opts = LoadOptions {
            balance_per_sample: true,
            ..Default::default()
        };
        let ds = Dataset::load(&p, &feats(&["QSS_NT"]), &opts, &mut rng).unwrap();
        assert_eq!(ds.count(&Label::Tp), 1);
        assert_eq!(ds.count(&Label::Fp), 1);
        assert_eq!(ds.rows.len(), 2);
    }

    #[test]
    fn sample_input_caps_rows_per_file() {
        let dir = tempfile::tempdir().unwrap();
        let a = write(dir.path(), "a.csv", TABLE);
        let b = write(dir.path(), "b.csv", TABLE);
        let mut rng = StdRng::seed_from_u64(1);
        let opts = LoadOptions {
            sample_input: Some(2),
            ..Default::default()
        };
        let ds = Dataset::load_all(&[a, b], &feats(&["QSS_NT"]), &opts, &mut rng).unwrap();
        assert_eq!(ds.rows.len(), 4);
    }

    #[test]
    fn overall_balancing_splits_evenly() {
        let dir = tempfile::tempdir().unwrap();
        let p = write(dir.path(), "NN_sample.csv", TABLE);
        let mut rng = StdRng::seed_from_u64(3);
        let ds = Dataset::load(&p, &feats(&["QSS_NT"]), &LoadOptions::default(), &mut rng).unwrap();
        let (tp, fp) = ds.split_balanced(&mut rng);
        assert_eq!((tp.len(), fp.len()), (1, 1));
        assert!(tp.iter().all(|r| r.label == Label::Tp));
    }

    #[test]
    fn missing_columns_and_bad_values_are_errors() {
        let dir = tempfile::tempdir().unwrap();
        let mut rng = StdRng::seed_from_u64(0);
        let p = write(dir.path(), "notag.csv", "QSS_NT\n1\n");
        assert!(matches!(
            Dataset::load(&p, &feats(&["QSS_NT"]), &LoadOptions::default(), &mut rng),
            Err(EvsError::MissingColumn { column, .. }) if column == "tag"
        ));

        let p = write(dir.path(), "bad.csv", "tag,QSS_NT\nTP,high\n");
        assert!(matches!(
            Dataset::load(&p, &feats(&["QSS_NT"]), &LoadOptions::default(), &mut rng),
            Err(EvsError::NonNumeric { line: 2, .. })
        ));

        let p = write(dir.path(), "ok.csv", "tag,QSS_NT\nTP,1\n");
        assert!(matches!(
            Dataset::load(&p, &feats(&["MQ"]), &LoadOptions::default(), &mut rng),
            Err(EvsError::MissingColumn { column, .. }) if column == "MQ"
        ));
    }

    #[cfg(unix)]
    #[test]
    fn weight_key_is_absolute() {
        let cwd = std::env::current_dir().unwrap();
        let key = weight_key(Path::new("NN/sample.csv"));
        assert!(key.starts_with(&*cwd.to_string_lossy()), "{key}");
        assert!(key.ends_with("NN/sample.csv"));
        assert_eq!(weight_key(Path::new("/data/Admix/a.csv")), "/data/Admix/a.csv");
        assert_eq!(input_weight(Path::new("Admix_1.csv")), ADMIX_WEIGHT);
    }

    #[test]
    fn subsample_keeps_order_and_size() {
        let mut rng = StdRng::seed_from_u64(11);
        let out = subsample((0..100).collect(), 10, &mut rng);
        assert_eq!(out.len(), 10);
        assert!(out.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(subsample(vec![1, 2], 5, &mut rng), vec![1, 2]);
    }
}
