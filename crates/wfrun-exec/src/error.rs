use thiserror::Error;
use wfrun_core::WorkflowError;

#[derive(Error, Debug)]
pub enum ExecError {
    #[error("spawn failed: {0}")]
    Spawn(String),
    #[error("killed by signal {0}")]
    KilledBySignal(i32),
    #[error("terminated without exit status")]
    NoStatus,
    #[error("missing program")]
    MissingProgram,
    #[error("cannot encode run request: {0}")]
    Encode(String),
    #[error("io error: {0}")]
    Io(String),
}

pub type ExecResult<T> = Result<T, ExecError>;

impl From<std::io::Error> for ExecError {
    fn from(e: std::io::Error) -> Self {
        ExecError::Io(e.to_string())
    }
}

impl From<ExecError> for WorkflowError {
    fn from(e: ExecError) -> Self {
        match e {
            ExecError::Spawn(s) => WorkflowError::Spawn(s),
            ExecError::MissingProgram => WorkflowError::Spawn("missing program".into()),
            ExecError::KilledBySignal(sig) => WorkflowError::Signal(sig),
            ExecError::NoStatus => WorkflowError::Protocol("no exit status".into()),
            ExecError::Encode(s) => WorkflowError::Protocol(s),
            ExecError::Io(s) => WorkflowError::Io(s),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_into_workflow_error() {
        assert!(matches!(
            WorkflowError::from(ExecError::KilledBySignal(9)),
            WorkflowError::Signal(9)
        ));
        assert!(matches!(
            WorkflowError::from(ExecError::MissingProgram),
            WorkflowError::Spawn(_)
        ));
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe");
        assert!(matches!(
            WorkflowError::from(ExecError::from(io)),
            WorkflowError::Io(_)
        ));
    }
}
