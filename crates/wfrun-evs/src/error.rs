use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EvsError {
    #[error("No input file(s) given")]
    NoInputs,

    #[error("Can't find input {label} file: '{}'", path.display())]
    MissingInput { label: &'static str, path: PathBuf },

    #[error("cannot read '{}': {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("'{}' has no column '{column}'", path.display())]
    MissingColumn { path: PathBuf, column: String },

    #[error("'{}' line {line}: column '{column}' is not numeric: '{value}'", path.display())]
    NonNumeric {
        path: PathBuf,
        line: u64,
        column: String,
        value: String,
    },

    #[error("unknown model '{name}' (options are: {available})")]
    UnknownModel { name: String, available: String },

    #[error("invalid learning parameters: {0}")]
    InvalidParameters(String),

    #[error("nothing to train on: {0}")]
    NoTrainingData(String),

    #[error("io error on '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl EvsError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        EvsError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn csv(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        EvsError::Csv {
            path: path.into(),
            source,
        }
    }
}
