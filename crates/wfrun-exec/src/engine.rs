//! Workflow Engine invoked as a child process.
//!
//! The engine is the workflow module file itself, executed as `<module> <class>`.
//! The run request is written to its stdin as one JSON document; stdout and stderr are inherited.
//! The engine's exit status is the run's exit code.

use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
    process::Stdio,
};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, instrument, trace};
use wfrun_core::{EngineRunRequest, Workflow, WorkflowClass, WorkflowError};
use wfrun_model::{Limit, PrimaryOptions, RunMode};

use crate::{
    error::{ExecError, ExecResult},
    util::{cmd_program, exit_code, prepend_path},
};

/// Job count used in scheduler mode when none is given.
pub const DEFAULT_SCHEDULER_CORES: u64 = 128;
/// Environment variable carrying the workflow module path.
pub const MODULE_ENV: &str = "WFRUN_WORKFLOW_MODULE";
/// Environment variable carrying the workflow class name.
pub const CLASS_ENV: &str = "WFRUN_WORKFLOW_CLASS";

/// Engine process settings shared by all workflows of a class.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    pub scheduler_default_cores: Limit,
    /// Extra environment for the engine process.
    pub env: Vec<(String, String)>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            scheduler_default_cores: Limit::Count(DEFAULT_SCHEDULER_CORES),
            env: Vec::new(),
        }
    }
}

/// Workflow class implemented by an external engine executable.
#[derive(Clone, Debug)]
pub struct EngineWorkflowClass {
    module_path: PathBuf,
    class_name: String,
    cfg: EngineConfig,
}

impl EngineWorkflowClass {
    pub fn new(module_path: impl Into<PathBuf>, class_name: impl Into<String>) -> Self {
        Self {
            module_path: module_path.into(),
            class_name: class_name.into(),
            cfg: EngineConfig::default(),
        }
    }

    pub fn with_config(mut self, cfg: EngineConfig) -> Self {
        self.cfg = cfg;
        self
    }

    pub fn module_path(&self) -> &Path {
        &self.module_path
    }
}

impl WorkflowClass for EngineWorkflowClass {
    fn name(&self) -> &str {
        &self.class_name
    }

    /// Local runs are bounded by the host estimate instead.
    fn run_mode_default_cores(&self, mode: RunMode) -> Limit {
        match mode {
            RunMode::Sge => self.cfg.scheduler_default_cores,
            RunMode::Local => Limit::Unlimited,
        }
    }

    fn instantiate(&self, options: PrimaryOptions) -> Result<Box<dyn Workflow>, WorkflowError> {
        if !self.module_path.is_file() {
            return Err(WorkflowError::Instantiate {
                class: self.class_name.clone(),
                reason: format!("module '{}' is not a file", self.module_path.display()),
            });
        }
        Ok(Box::new(EngineWorkflow {
            module_path: self.module_path.clone(),
            class_name: self.class_name.clone(),
            env: self.cfg.env.clone(),
            options,
        }))
    }
}

/// One workflow instance; each [`Workflow::run`] spawns a fresh engine process.
#[derive(Debug)]
pub struct EngineWorkflow {
    module_path: PathBuf,
    class_name: String,
    env: Vec<(String, String)>,
    options: PrimaryOptions,
}

impl EngineWorkflow {
    async fn spawn_and_wait(&self, request: &EngineRunRequest) -> ExecResult<i32> {
        let payload =
            serde_json::to_vec(request).map_err(|e| ExecError::Encode(e.to_string()))?;

        let mut cmd = cmd_program(&self.module_path, &[self.class_name.as_str()]);
        if let Some(dir) = self.module_path.parent() {
            cmd.env("PATH", prepend_path(dir));
        }
        cmd.env(MODULE_ENV, &self.module_path);
        cmd.env(CLASS_ENV, &self.class_name);
        for (k, v) in &self.env {
            cmd.env(k, v);
        }
        cmd.stdin(Stdio::piped());
        cmd.stdout(Stdio::inherit());
        cmd.stderr(Stdio::inherit());
        cmd.kill_on_drop(true);

        trace!(target: "wfrun.exec.engine", program = %self.module_path.display(), class = %self.class_name, "spawn");
        let mut child = cmd.spawn().map_err(|e| match e.kind() {
            ErrorKind::NotFound => ExecError::MissingProgram,
            _ => ExecError::Spawn(e.to_string()),
        })?;
        debug!(target: "wfrun.exec.engine", pid = child.id(), "engine started");

        if let Some(mut stdin) = child.stdin.take() {
            match stdin.write_all(&payload).await {
                Ok(()) => {}
                // The engine may exit without reading its request.
                Err(e) if e.kind() == ErrorKind::BrokenPipe => {
                    debug!(target: "wfrun.exec.engine", "engine closed stdin early");
                }
                Err(e) => return Err(e.into()),
            }
            drop(stdin);
        }

        let status = child.wait().await?;
        exit_code(status)
    }
}

#[async_trait]
impl Workflow for EngineWorkflow {
    fn success_message(&self) -> String {
        match self.options.success_message() {
            Some(msg) => msg.to_string(),
            None => format!(
                "{} workflow successfully completed.\n\n\tWorkflow output can be found in: {}",
                self.class_name,
                self.options.run_dir().display()
            ),
        }
    }

    #[instrument(level = "debug", skip_all, fields(class = %self.class_name))]
    async fn run(&self, request: EngineRunRequest) -> Result<i32, WorkflowError> {
        let code = self.spawn_and_wait(&request).await?;
        info!(target: "wfrun.exec.engine", code, "engine exited");
        Ok(code)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::{fs, os::unix::fs::PermissionsExt};

    use wfrun_model::{ConfigSection, RunOptions, RunStatusArtifacts};

    use super::*;

    fn engine(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("fakeEngine.py");
        fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    fn primary(run_dir: &Path, extra: Option<(&str, &str)>) -> PrimaryOptions {
        let mut s = ConfigSection::new("Fake").with("runDir", run_dir.to_string_lossy().into_owned());
        if let Some((k, v)) = extra {
            s.set(k, v);
        }
        PrimaryOptions::from_section(&s).unwrap()
    }

    fn request(p: &PrimaryOptions) -> EngineRunRequest {
        let run = RunOptions {
            mode: RunMode::Local,
            jobs: Limit::Count(2),
            mem_mb: Limit::Count(2048),
            dry_run: false,
            quiet: true,
            mail_to: None,
            scheduler_args: vec![],
            reset_tasks: vec![],
        };
        EngineRunRequest::new(
            "FakeWorkflow",
            p.clone(),
            &run,
            &RunStatusArtifacts::under(p.run_dir()),
            "done".into(),
            "attempt-1",
        )
    }

    #[tokio::test]
    async fn passes_request_on_stdin_and_returns_exit_code() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("stdin.json");
        let env_out = dir.path().join("env.txt");
        let module = engine(
            dir.path(),
            &format!(
                "cat > '{}'\necho \"$1 $WFRUN_WORKFLOW_CLASS\" > '{}'\nexit 7",
                out.display(),
                env_out.display()
            ),
        );
        let p = primary(dir.path(), None);
        let wf = EngineWorkflowClass::new(&module, "FakeWorkflow")
            .instantiate(p.clone())
            .unwrap();

        assert_eq!(wf.run(request(&p)).await.unwrap(), 7);

        let sent: serde_json::Value =
            serde_json::from_slice(&fs::read(&out).unwrap()).unwrap();
        assert_eq!(sent["workflowClass"], "FakeWorkflow");
        assert_eq!(sent["nCores"], 2);
        assert_eq!(sent["isForceContinue"], true);
        assert_eq!(
            fs::read_to_string(&env_out).unwrap().trim(),
            "FakeWorkflow FakeWorkflow"
        );
    }

    #[tokio::test]
    async fn engine_ignoring_stdin_still_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        let module = engine(dir.path(), "exit 0");
        let p = primary(dir.path(), None);
        let wf = EngineWorkflowClass::new(&module, "FakeWorkflow")
            .instantiate(p.clone())
            .unwrap();
        assert_eq!(wf.run(request(&p)).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn signal_termination_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let module = engine(dir.path(), "kill -9 $$");
        let p = primary(dir.path(), None);
        let wf = EngineWorkflowClass::new(&module, "FakeWorkflow")
            .instantiate(p.clone())
            .unwrap();
        assert!(matches!(
            wf.run(request(&p)).await,
            Err(WorkflowError::Signal(9))
        ));
    }

    #[tokio::test]
    async fn non_executable_module_fails_to_spawn() {
        let dir = tempfile::tempdir().unwrap();
        let module = dir.path().join("plain.py");
        fs::write(&module, "").unwrap();
        fs::set_permissions(&module, fs::Permissions::from_mode(0o644)).unwrap();
        let p = primary(dir.path(), None);
        let wf = EngineWorkflowClass::new(&module, "FakeWorkflow")
            .instantiate(p.clone())
            .unwrap();
        assert!(matches!(
            wf.run(request(&p)).await,
            Err(WorkflowError::Spawn(_))
        ));
    }

    #[tokio::test]
    async fn abandoned_engine_is_killed() {
        let dir = tempfile::tempdir().unwrap();
        let started = dir.path().join("started");
        let finished = dir.path().join("finished");
        let module = engine(
            dir.path(),
            &format!(
                "touch '{}'\nsleep 2\ntouch '{}'",
                started.display(),
                finished.display()
            ),
        );
        let p = primary(dir.path(), None);
        let wf = EngineWorkflowClass::new(&module, "FakeWorkflow")
            .instantiate(p.clone())
            .unwrap();

        let wait_started = async {
            while !started.exists() {
                tokio::task::yield_now().await;
            }
        };
        tokio::select! {
            res = wf.run(request(&p)) => panic!("engine finished early: {res:?}"),
            () = wait_started => {}
        }

        std::thread::sleep(std::time::Duration::from_secs(3));
        assert!(!finished.exists());
    }

    #[test]
    fn missing_module_cannot_be_instantiated() {
        let dir = tempfile::tempdir().unwrap();
        let class = EngineWorkflowClass::new(dir.path().join("absent.py"), "FakeWorkflow");
        assert!(matches!(
            class.instantiate(primary(dir.path(), None)),
            Err(WorkflowError::Instantiate { .. })
        ));
    }

    #[test]
    fn success_message_default_and_override() {
        let dir = tempfile::tempdir().unwrap();
        let module = engine(dir.path(), "exit 0");
        let class = EngineWorkflowClass::new(&module, "StrelkaGermline");

        let wf = class.instantiate(primary(dir.path(), None)).unwrap();
        assert_eq!(
            wf.success_message(),
            format!(
                "StrelkaGermline workflow successfully completed.\n\n\tWorkflow output can be found in: {}",
                dir.path().display()
            )
        );

        let wf = class
            .instantiate(primary(dir.path(), Some(("successMessage", "all good"))))
            .unwrap();
        assert_eq!(wf.success_message(), "all good");
    }

    #[test]
    fn scheduler_default_is_configurable() {
        let class = EngineWorkflowClass::new("/x", "C");
        assert_eq!(class.run_mode_default_cores(RunMode::Sge), Limit::Count(128));
        let class = class.with_config(EngineConfig {
            scheduler_default_cores: Limit::Count(16),
            ..Default::default()
        });
        assert_eq!(class.run_mode_default_cores(RunMode::Sge), Limit::Count(16));
    }
}
