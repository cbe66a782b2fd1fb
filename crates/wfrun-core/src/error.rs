use std::path::PathBuf;

use thiserror::Error;

/// Exit status for command-line usage errors.
pub const USAGE_EXIT_CODE: i32 = 2;
/// Exit status for any other fatal driver error.
pub const FAILURE_EXIT_CODE: i32 = 1;

/// A hardware probe could not produce a usable value.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EstimationError {
    #[error("core count probe failed: {0}")]
    Cores(String),
    #[error("memory probe failed: {0}")]
    Memory(String),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("cannot write config artifact '{}': {reason}", path.display())]
    Write { path: PathBuf, reason: String },
    #[error("cannot read config artifact '{}': {reason}", path.display())]
    Read { path: PathBuf, reason: String },
    #[error("config artifact '{}' has no section '{section}'", path.display())]
    MissingSection { path: PathBuf, section: String },
}

/// Invalid or unresolvable run options. Always reported with help text and exit status 2.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("unexpected positional arguments: {}", .0.join(" "))]
    UnexpectedArguments(Vec<String>),
    #[error("run mode is required (-m/--mode)")]
    MissingMode,
    #[error("Invalid mode. Available modes are: local, sge")]
    InvalidMode(String),
    #[error("Failed to estimate cores on this node. Please provide job count argument (-j).")]
    CoreEstimate(#[source] EstimationError),
    #[error("Jobs must be 'unlimited' or an integer greater than 0 (got '{0}')")]
    InvalidJobs(String),
    #[error(
        "Failed to estimate available memory on this node. Please provide available gigabyte argument (-g)."
    )]
    MemoryEstimate(#[source] EstimationError),
    #[error("memGb must be 'unlimited' or an integer greater than 0 (got '{0}')")]
    InvalidMemory(String),
}

impl ResolveError {
    /// Errors reported with the full help text rather than a one-line usage hint.
    pub fn wants_full_help(&self) -> bool {
        matches!(
            self,
            ResolveError::UnexpectedArguments(_) | ResolveError::MissingMode
        )
    }
}

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("usage error: {0}")]
    Usage(#[from] ResolveError),

    #[error("precondition failed: {0}")]
    Precondition(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("{0}")]
    IncompatibleDriver(String),

    #[error("Unexpected filesystem item: '{}'", .0.display())]
    UnexpectedFsEntry(PathBuf),

    #[error("io error on '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CoreError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CoreError::Io {
            path: path.into(),
            source,
        }
    }

    /// Process exit status used when this error ends the driver.
    pub fn exit_code(&self) -> i32 {
        match self {
            CoreError::Usage(_) => USAGE_EXIT_CODE,
            _ => FAILURE_EXIT_CODE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usage_errors_exit_with_two() {
        let err = CoreError::from(ResolveError::MissingMode);
        assert_eq!(err.exit_code(), USAGE_EXIT_CODE);
        assert_eq!(
            CoreError::Precondition("x".into()).exit_code(),
            FAILURE_EXIT_CODE
        );
    }

    #[test]
    fn estimate_errors_ask_for_explicit_values() {
        let e = ResolveError::CoreEstimate(EstimationError::Cores("boom".into()));
        assert!(e.to_string().contains("(-j)"));
        let e = ResolveError::MemoryEstimate(EstimationError::Memory("boom".into()));
        assert!(e.to_string().contains("(-g)"));
        assert!(!e.wants_full_help());
    }

    #[test]
    fn unexpected_fs_entry_names_the_path() {
        let e = CoreError::UnexpectedFsEntry(PathBuf::from("/r/workflow.exitcode.txt"));
        assert_eq!(
            e.to_string(),
            "Unexpected filesystem item: '/r/workflow.exitcode.txt'"
        );
    }
}
