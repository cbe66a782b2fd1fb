mod error;
pub use error::{ExecError, ExecResult};

mod util;

pub mod engine;
pub use engine::{DEFAULT_SCHEDULER_CORES, EngineConfig, EngineWorkflow, EngineWorkflowClass};

pub mod prelude {
    pub use crate::engine::{EngineConfig, EngineWorkflow, EngineWorkflowClass};
    pub use crate::error::{ExecError, ExecResult};
}
