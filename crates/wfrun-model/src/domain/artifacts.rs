use std::path::{Path, PathBuf};

pub const WARNING_LOG_FILENAME: &str = "workflow.warning.log.txt";
pub const ERROR_LOG_FILENAME: &str = "workflow.error.log.txt";
pub const EXIT_CODE_FILENAME: &str = "workflow.exitcode.txt";

/// File-backed run status signals for external monitoring.
///
/// The exit-code marker exists only once an attempt has reached a terminal state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunStatusArtifacts {
    pub warning_log: PathBuf,
    pub error_log: PathBuf,
    pub exit_code: PathBuf,
}

impl RunStatusArtifacts {
    /// Artifact locations under `run_dir`.
    pub fn under(run_dir: &Path) -> Self {
        Self {
            warning_log: run_dir.join(WARNING_LOG_FILENAME),
            error_log: run_dir.join(ERROR_LOG_FILENAME),
            exit_code: run_dir.join(EXIT_CODE_FILENAME),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_are_under_run_dir() {
        let a = RunStatusArtifacts::under(Path::new("/runs/x"));
        assert_eq!(a.warning_log, PathBuf::from("/runs/x/workflow.warning.log.txt"));
        assert_eq!(a.error_log, PathBuf::from("/runs/x/workflow.error.log.txt"));
        assert_eq!(a.exit_code, PathBuf::from("/runs/x/workflow.exitcode.txt"));
    }
}
