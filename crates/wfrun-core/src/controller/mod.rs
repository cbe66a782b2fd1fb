//! Run controller: the sequence executed each time a generated script is launched.

mod marker;
pub use marker::{DEFAULT_EXIT_CODE, ExitMarkerGuard, clear_stale_marker};

use std::{
    fmt,
    future::Future,
    path::{Path, PathBuf},
    pin::Pin,
    sync::Arc,
};

use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;
use wfrun_model::{ConfigSectionBundle, PrimaryOptions, RunMode, RunOptions, RunStatusArtifacts};

use crate::{
    error::CoreError,
    host::{HostEstimator, ResourceEstimator},
    mail::{MailRelay, SmtpProbe},
    resolve::{RawRunArgs, ResolveContext, resolve},
    store,
    workflow::{EngineRunRequest, WorkflowClass},
};

/// Lifecycle of one controller invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Idle,
    Resolving,
    Preparing,
    Invoking,
    Terminated,
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RunPhase::Idle => "idle",
            RunPhase::Resolving => "resolving",
            RunPhase::Preparing => "preparing",
            RunPhase::Invoking => "invoking",
            RunPhase::Terminated => "terminated",
        };
        f.write_str(s)
    }
}

/// Produces a future that completes when the operator interrupts the run.
pub type Interrupt = Arc<dyn Fn() -> InterruptFuture + Send + Sync>;
pub type InterruptFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Interrupt on SIGINT / Ctrl-C. Never fires if the handler cannot be installed.
pub fn ctrl_c_interrupt() -> Interrupt {
    Arc::new(|| -> InterruptFuture {
        Box::pin(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                debug!(target: "wfrun.core.controller", error = %e, "cannot listen for ctrl-c");
                std::future::pending::<()>().await;
            }
        })
    })
}

/// Loaded configuration and artifact locations of a prepared run.
#[derive(Debug, Clone)]
pub struct PreparedRun {
    pub primary: PrimaryOptions,
    pub bundle: ConfigSectionBundle,
    pub artifacts: RunStatusArtifacts,
}

pub struct RunController {
    config_path: PathBuf,
    primary_section: String,
    class: Arc<dyn WorkflowClass>,
    estimator: Arc<dyn ResourceEstimator>,
    mail_relay: Arc<dyn MailRelay>,
    interrupt: Interrupt,
    attempt_id: Uuid,
    phase: RunPhase,
}

impl RunController {
    /// Controller for the artifact at `config_path`, probing the current host.
    pub fn new(
        config_path: impl Into<PathBuf>,
        primary_section: impl Into<String>,
        class: Arc<dyn WorkflowClass>,
    ) -> Self {
        Self {
            config_path: config_path.into(),
            primary_section: primary_section.into(),
            class,
            estimator: Arc::new(HostEstimator),
            mail_relay: Arc::new(SmtpProbe::default()),
            interrupt: ctrl_c_interrupt(),
            attempt_id: Uuid::new_v4(),
            phase: RunPhase::Idle,
        }
    }

    pub fn with_estimator(mut self, estimator: Arc<dyn ResourceEstimator>) -> Self {
        self.estimator = estimator;
        self
    }

    pub fn with_mail_relay(mut self, relay: Arc<dyn MailRelay>) -> Self {
        self.mail_relay = relay;
        self
    }

    pub fn with_interrupt(mut self, interrupt: Interrupt) -> Self {
        self.interrupt = interrupt;
        self
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    pub fn attempt_id(&self) -> Uuid {
        self.attempt_id
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Resolve, prepare and invoke; returns the code that was written to the exit marker.
    ///
    /// Errors before invocation leave the marker untouched.
    #[instrument(level = "info", skip_all, fields(attempt = %self.attempt_id, workflow = self.class.name()))]
    pub async fn execute(&mut self, raw: &RawRunArgs) -> Result<i32, CoreError> {
        let result = self.drive(raw).await;
        self.enter(RunPhase::Terminated);
        result
    }

    async fn drive(&mut self, raw: &RawRunArgs) -> Result<i32, CoreError> {
        self.enter(RunPhase::Resolving);
        let run = self.resolve(raw)?;

        self.enter(RunPhase::Preparing);
        let prepared = self.prepare()?;

        self.enter(RunPhase::Invoking);
        self.invoke(&run, prepared).await
    }

    /// Resolve run options against the host and the workflow's scheduler default.
    pub fn resolve(&self, raw: &RawRunArgs) -> Result<RunOptions, CoreError> {
        let ctx = ResolveContext::new(
            self.class.run_mode_default_cores(RunMode::Sge),
            self.estimator.as_ref(),
            self.mail_relay.as_ref(),
        );
        Ok(resolve(raw, &ctx)?)
    }

    /// Load the config artifact, check the run directory and clear a stale exit marker.
    pub fn prepare(&self) -> Result<PreparedRun, CoreError> {
        let (primary, bundle) = store::load(&self.config_path, &self.primary_section)?;

        let run_dir = primary.run_dir();
        if !run_dir.is_dir() {
            return Err(CoreError::Precondition(format!(
                "Run directory '{}' does not exist or is not a directory",
                run_dir.display()
            )));
        }

        let artifacts = RunStatusArtifacts::under(run_dir);
        clear_stale_marker(&artifacts.exit_code)?;
        debug!(target: "wfrun.core.controller", run_dir = %run_dir.display(), sections = bundle.len(), "run prepared");

        Ok(PreparedRun {
            primary,
            bundle,
            artifacts,
        })
    }

    async fn invoke(&self, run: &RunOptions, prepared: PreparedRun) -> Result<i32, CoreError> {
        let PreparedRun {
            primary, artifacts, ..
        } = prepared;
        let mut marker = ExitMarkerGuard::arm(&artifacts.exit_code);

        let workflow = match self.class.instantiate(primary.clone()) {
            Ok(w) => w,
            Err(e) => {
                error!(target: "wfrun.core.controller", error = %e, "workflow instantiation failed");
                return marker.finish();
            }
        };

        let request = EngineRunRequest::new(
            self.class.name(),
            primary,
            run,
            &artifacts,
            workflow.success_message(),
            self.attempt_id.to_string(),
        );

        let outcome = tokio::select! {
            res = workflow.run(request) => Some(res),
            () = (self.interrupt)() => None,
        };
        match outcome {
            Some(Ok(code)) => {
                info!(target: "wfrun.core.controller", code, "workflow engine finished");
                marker.set(code);
            }
            Some(Err(e)) => {
                error!(target: "wfrun.core.controller", error = %e, "workflow engine failed");
            }
            None => {
                warn!(target: "wfrun.core.controller", "interrupted; abandoning workflow engine");
            }
        }
        marker.finish()
    }

    fn enter(&mut self, next: RunPhase) {
        debug!(target: "wfrun.core.controller", from = %self.phase, to = %next, "phase");
        self.phase = next;
    }
}

#[cfg(test)]
mod tests {
    use std::{
        fs,
        sync::{
            Mutex,
            atomic::{AtomicUsize, Ordering},
        },
    };

    use async_trait::async_trait;
    use wfrun_model::{ConfigSection, Limit};

    use super::*;
    use crate::{
        host::StaticEstimator,
        mail::StaticRelay,
        workflow::{Workflow, WorkflowError},
    };

    #[derive(Clone, Copy)]
    enum Outcome {
        Code(i32),
        Fail,
        Panic,
        Hang,
    }

    struct MockClass {
        outcome: Outcome,
        calls: Arc<AtomicUsize>,
        last: Arc<Mutex<Option<EngineRunRequest>>>,
    }

    struct MockWorkflow {
        outcome: Outcome,
        calls: Arc<AtomicUsize>,
        last: Arc<Mutex<Option<EngineRunRequest>>>,
    }

    impl WorkflowClass for MockClass {
        fn name(&self) -> &str {
            "MockWorkflow"
        }

        fn run_mode_default_cores(&self, _mode: RunMode) -> Limit {
            Limit::Count(128)
        }

        fn instantiate(&self, _options: PrimaryOptions) -> Result<Box<dyn Workflow>, WorkflowError> {
            Ok(Box::new(MockWorkflow {
                outcome: self.outcome,
                calls: self.calls.clone(),
                last: self.last.clone(),
            }))
        }
    }

    #[async_trait]
    impl Workflow for MockWorkflow {
        fn success_message(&self) -> String {
            "mock done".into()
        }

        async fn run(&self, request: EngineRunRequest) -> Result<i32, WorkflowError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last.lock().unwrap() = Some(request);
            match self.outcome {
                Outcome::Code(c) => Ok(c),
                Outcome::Fail => Err(WorkflowError::Protocol("boom".into())),
                Outcome::Panic => panic!("engine panicked"),
                Outcome::Hang => std::future::pending().await,
            }
        }
    }

    struct Fixture {
        _dir: tempfile::TempDir,
        run_dir: PathBuf,
        config: PathBuf,
        calls: Arc<AtomicUsize>,
        last: Arc<Mutex<Option<EngineRunRequest>>>,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            let run_dir = dir.path().join("run");
            fs::create_dir(&run_dir).unwrap();
            let config = dir.path().join("runWorkflow.sh.config.json");
            let bundle = ConfigSectionBundle::new()
                .with(
                    ConfigSection::new("Mock").with("runDir", run_dir.to_string_lossy().into_owned()),
                )
                .unwrap();
            store::persist(&bundle, &config).unwrap();
            Self {
                _dir: dir,
                run_dir,
                config,
                calls: Arc::new(AtomicUsize::new(0)),
                last: Arc::new(Mutex::new(None)),
            }
        }

        fn controller(&self, outcome: Outcome) -> RunController {
            let class = MockClass {
                outcome,
                calls: self.calls.clone(),
                last: self.last.clone(),
            };
            RunController::new(&self.config, "Mock", Arc::new(class))
                .with_estimator(Arc::new(StaticEstimator::new(8, 16384)))
                .with_mail_relay(Arc::new(StaticRelay(false)))
        }

        fn marker(&self) -> PathBuf {
            self.run_dir.join("workflow.exitcode.txt")
        }
    }

    fn local() -> RawRunArgs {
        RawRunArgs {
            mode: Some("local".into()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn success_writes_zero_and_passes_resolved_options() {
        let fx = Fixture::new();
        let mut ctl = fx.controller(Outcome::Code(0));

        assert_eq!(ctl.phase(), RunPhase::Idle);
        assert_eq!(ctl.execute(&local()).await.unwrap(), 0);
        assert_eq!(ctl.phase(), RunPhase::Terminated);
        assert_eq!(fs::read_to_string(fx.marker()).unwrap(), "0\n");

        let req = fx.last.lock().unwrap().take().unwrap();
        assert_eq!(req.n_cores, Limit::Count(8));
        assert_eq!(req.mem_mb, Limit::Count(16384));
        assert!(req.is_force_continue);
        assert_eq!(req.success_msg, "mock done");
        assert_eq!(req.attempt_id, ctl.attempt_id().to_string());
        assert_eq!(req.error_log_file, fx.run_dir.join("workflow.error.log.txt"));
    }

    #[tokio::test]
    async fn engine_code_is_recorded() {
        let fx = Fixture::new();
        let code = fx.controller(Outcome::Code(3)).execute(&local()).await.unwrap();
        assert_eq!(code, 3);
        assert_eq!(fs::read_to_string(fx.marker()).unwrap(), "3\n");
    }

    #[tokio::test]
    async fn engine_error_leaves_code_one() {
        let fx = Fixture::new();
        let code = fx.controller(Outcome::Fail).execute(&local()).await.unwrap();
        assert_eq!(code, 1);
        assert_eq!(fs::read_to_string(fx.marker()).unwrap(), "1\n");
    }

    #[tokio::test]
    async fn engine_panic_still_writes_marker() {
        let fx = Fixture::new();
        let mut ctl = fx.controller(Outcome::Panic);
        let res = tokio::spawn(async move { ctl.execute(&local()).await }).await;
        assert!(res.unwrap_err().is_panic());
        assert_eq!(fs::read_to_string(fx.marker()).unwrap(), "1\n");
    }

    #[tokio::test]
    async fn interrupt_during_invocation_writes_code_one() {
        let fx = Fixture::new();
        let interrupt: Interrupt = Arc::new(|| -> InterruptFuture { Box::pin(async {}) });
        let mut ctl = fx.controller(Outcome::Hang).with_interrupt(interrupt);
        let code = ctl.execute(&local()).await.unwrap();
        assert_eq!(code, 1);
        assert_eq!(fs::read_to_string(fx.marker()).unwrap(), "1\n");
        assert_eq!(fx.calls.load(Ordering::SeqCst), 1);
        assert_eq!(ctl.phase(), RunPhase::Terminated);
    }

    #[tokio::test]
    async fn stale_marker_is_replaced_on_rerun() {
        let fx = Fixture::new();
        fs::write(fx.marker(), "1\n").unwrap();
        fx.controller(Outcome::Code(0)).execute(&local()).await.unwrap();
        fx.controller(Outcome::Code(0)).execute(&local()).await.unwrap();
        assert_eq!(fs::read_to_string(fx.marker()).unwrap(), "0\n");
        assert_eq!(fx.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn non_file_marker_aborts_before_invocation() {
        let fx = Fixture::new();
        fs::create_dir(fx.marker()).unwrap();
        let err = fx.controller(Outcome::Code(0)).execute(&local()).await.unwrap_err();
        assert!(matches!(err, CoreError::UnexpectedFsEntry(_)));
        assert_eq!(fx.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn missing_run_dir_is_a_precondition_failure() {
        let fx = Fixture::new();
        fs::remove_dir(&fx.run_dir).unwrap();
        let err = fx.controller(Outcome::Code(0)).execute(&local()).await.unwrap_err();
        assert!(matches!(err, CoreError::Precondition(_)));
        assert!(!fx.marker().exists());
    }

    #[tokio::test]
    async fn usage_errors_touch_nothing() {
        let fx = Fixture::new();
        fs::write(fx.marker(), "0\n").unwrap();
        let mut ctl = fx.controller(Outcome::Code(0));
        let err = ctl.execute(&RawRunArgs::default()).await.unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert_eq!(ctl.phase(), RunPhase::Terminated);
        assert_eq!(fs::read_to_string(fx.marker()).unwrap(), "0\n");
        assert_eq!(fx.calls.load(Ordering::SeqCst), 0);
    }
}
