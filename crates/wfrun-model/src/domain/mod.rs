mod kv;
pub use kv::KeyValue;

mod section;
pub use section::ConfigSection;

mod bundle;
pub use bundle::ConfigSectionBundle;

mod run_mode;
pub use run_mode::RunMode;

mod limit;
pub use limit::Limit;

mod primary;
pub use primary::{
    DEFAULT_WORK_SUBDIR, PrimaryOptions, RUN_DIR_KEY, SUCCESS_MESSAGE_KEY, WORK_DIR_KEY,
};

mod run_options;
pub use run_options::{ContinueMode, RunOptions};

mod artifacts;
pub use artifacts::{
    ERROR_LOG_FILENAME, EXIT_CODE_FILENAME, RunStatusArtifacts, WARNING_LOG_FILENAME,
};

/// Name of a workflow task inside the engine's task graph.
pub type TaskName = String;

/// Memory amount in megabytes.
pub type MemMb = u64;
