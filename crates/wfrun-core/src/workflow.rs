//! Boundary between the run controller and the Workflow Engine.

use std::path::PathBuf;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use wfrun_model::{ContinueMode, Limit, PrimaryOptions, RunMode, RunOptions, RunStatusArtifacts, TaskName};

/// Failure to invoke the engine or to obtain its result.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("failed to start workflow engine: {0}")]
    Spawn(String),
    #[error("workflow engine terminated by signal {0}")]
    Signal(i32),
    #[error("workflow engine io error: {0}")]
    Io(String),
    #[error("workflow engine protocol error: {0}")]
    Protocol(String),
    #[error("cannot instantiate workflow '{class}': {reason}")]
    Instantiate { class: String, reason: String },
}

/// Everything the engine needs for one run attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineRunRequest {
    pub workflow_class: String,
    pub options: PrimaryOptions,
    pub mode: RunMode,
    pub n_cores: Limit,
    pub mem_mb: Limit,
    pub data_dir_root: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mail_to: Option<Vec<String>>,
    pub is_continue: ContinueMode,
    pub is_force_continue: bool,
    pub dry_run: bool,
    pub quiet: bool,
    pub scheduler_arg_list: Vec<String>,
    pub reset_tasks: Vec<TaskName>,
    pub success_msg: String,
    pub warning_log_file: PathBuf,
    pub error_log_file: PathBuf,
    pub attempt_id: String,
}

impl EngineRunRequest {
    /// Build a request with the fixed continuation policy: resume if possible, never ask.
    pub fn new(
        workflow_class: impl Into<String>,
        options: PrimaryOptions,
        run: &RunOptions,
        artifacts: &RunStatusArtifacts,
        success_msg: String,
        attempt_id: impl Into<String>,
    ) -> Self {
        Self {
            workflow_class: workflow_class.into(),
            data_dir_root: options.work_dir.clone(),
            options,
            mode: run.mode,
            n_cores: run.jobs,
            mem_mb: run.mem_mb,
            mail_to: run.mail_to.clone(),
            is_continue: ContinueMode::Auto,
            is_force_continue: true,
            dry_run: run.dry_run,
            quiet: run.quiet,
            scheduler_arg_list: run.scheduler_args.clone(),
            reset_tasks: run.reset_tasks.clone(),
            success_msg,
            warning_log_file: artifacts.warning_log.clone(),
            error_log_file: artifacts.error_log.clone(),
            attempt_id: attempt_id.into(),
        }
    }
}

/// A workflow instance bound to its primary options.
#[async_trait]
pub trait Workflow: Send + Sync {
    /// Message printed by the engine on successful completion.
    fn success_message(&self) -> String;

    /// Run one attempt and return the engine's exit code.
    async fn run(&self, request: EngineRunRequest) -> Result<i32, WorkflowError>;
}

/// The workflow type named by a generated script.
pub trait WorkflowClass: Send + Sync {
    fn name(&self) -> &str;

    /// Job count used when `-j` is not given for `mode`.
    fn run_mode_default_cores(&self, mode: RunMode) -> Limit;

    fn instantiate(&self, options: PrimaryOptions) -> Result<Box<dyn Workflow>, WorkflowError>;
}
