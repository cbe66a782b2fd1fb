use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("invalid run mode: '{0}' (expected: local|sge)")]
    InvalidMode(String),
    #[error("invalid limit: '{0}' (expected an integer or 'unlimited')")]
    InvalidLimit(String),
    #[error("limit must be 'unlimited' or an integer greater than 0, got {0}")]
    NonPositive(i64),
    #[error("duplicate config section: '{0}'")]
    DuplicateSection(String),
    #[error("config section '{section}' is missing required key '{key}'")]
    MissingKey { section: String, key: String },
}
