//! Run-option resolver: turns raw command-line values into a complete [`RunOptions`].

use tracing::{debug, info, warn};
use wfrun_model::{Limit, MemMb, RunMode, RunOptions, TaskName};

use crate::{error::ResolveError, host::ResourceEstimator, mail::MailRelay};

/// Task reset by `--rescore` so that variant scoring is recomputed on resume.
pub const RESCORE_RESET_TASK: &str = "makeHyGenDir";
/// `-g` is given in gigabytes; resolved memory is in megabytes.
pub const MB_PER_GB: MemMb = 1024;

/// Command-line values as given by the operator; nothing validated yet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRunArgs {
    pub mode: Option<String>,
    pub queue: Option<String>,
    pub jobs: Option<String>,
    pub mem_gb: Option<String>,
    pub dry_run: bool,
    pub quiet: bool,
    pub mail_to: Vec<String>,
    pub rescore: bool,
    pub max_task_runtime: Option<String>,
    /// Anything left over after option parsing.
    pub positional: Vec<String>,
}

/// Host facts and workflow defaults consulted for unspecified options.
pub struct ResolveContext<'a> {
    /// Job count used in scheduler mode when `-j` is not given.
    pub scheduler_default_cores: Limit,
    pub estimator: &'a dyn ResourceEstimator,
    pub mail_relay: &'a dyn MailRelay,
}

impl<'a> ResolveContext<'a> {
    pub fn new(
        scheduler_default_cores: Limit,
        estimator: &'a dyn ResourceEstimator,
        mail_relay: &'a dyn MailRelay,
    ) -> Self {
        Self {
            scheduler_default_cores,
            estimator,
            mail_relay,
        }
    }
}

/// Validate `raw` and fill in every unspecified value.
///
/// Each failure is a usage error; nothing is retried.
pub fn resolve(raw: &RawRunArgs, ctx: &ResolveContext<'_>) -> Result<RunOptions, ResolveError> {
    if !raw.positional.is_empty() {
        return Err(ResolveError::UnexpectedArguments(raw.positional.clone()));
    }

    let mode = match raw.mode.as_deref() {
        None => return Err(ResolveError::MissingMode),
        Some(m) => m
            .parse::<RunMode>()
            .map_err(|_| ResolveError::InvalidMode(m.to_string()))?,
    };

    let jobs = resolve_jobs(raw.jobs.as_deref(), mode, ctx)?;
    let mem_mb = resolve_memory(raw.mem_gb.as_deref(), mode, ctx)?;

    let mut scheduler_args = Vec::new();
    if let Some(queue) = &raw.queue {
        scheduler_args.extend(["-q".to_string(), queue.clone()]);
    }
    if let Some(runtime) = &raw.max_task_runtime {
        scheduler_args.extend(["-l".to_string(), format!("h_rt={runtime}")]);
    }
    if !scheduler_args.is_empty() && !mode.is_scheduler() {
        debug!(target: "wfrun.core.resolve", ?scheduler_args, "scheduler arguments are ignored in local mode");
    }

    let reset_tasks: Vec<TaskName> = if raw.rescore {
        vec![RESCORE_RESET_TASK.to_string()]
    } else {
        Vec::new()
    };

    let mail_to = if raw.mail_to.is_empty() {
        None
    } else if ctx.mail_relay.is_available() {
        Some(raw.mail_to.clone())
    } else {
        warn!(target: "wfrun.core.resolve", "no mail relay available; completion e-mail disabled");
        None
    };

    let opts = RunOptions {
        mode,
        jobs,
        mem_mb,
        dry_run: raw.dry_run,
        quiet: raw.quiet,
        mail_to,
        scheduler_args,
        reset_tasks,
    };
    info!(target: "wfrun.core.resolve", mode = %opts.mode, jobs = %opts.jobs, mem_mb = %opts.mem_mb, dry_run = opts.dry_run, "run options resolved");
    Ok(opts)
}

fn resolve_jobs(
    given: Option<&str>,
    mode: RunMode,
    ctx: &ResolveContext<'_>,
) -> Result<Limit, ResolveError> {
    match given {
        Some(s) => s
            .parse::<Limit>()
            .map_err(|_| ResolveError::InvalidJobs(s.to_string())),
        None if mode.is_scheduler() => Ok(ctx.scheduler_default_cores),
        None => {
            let cores = ctx
                .estimator
                .core_count()
                .map_err(ResolveError::CoreEstimate)?;
            Limit::count(u64::from(cores)).map_err(|_| {
                ResolveError::CoreEstimate(crate::EstimationError::Cores(
                    "zero cores reported".into(),
                ))
            })
        }
    }
}

fn resolve_memory(
    given: Option<&str>,
    mode: RunMode,
    ctx: &ResolveContext<'_>,
) -> Result<Limit, ResolveError> {
    match given {
        Some(s) => s
            .parse::<Limit>()
            .map(|gb| gb.scaled(MB_PER_GB))
            .map_err(|_| ResolveError::InvalidMemory(s.to_string())),
        None if mode.is_scheduler() => Ok(Limit::Unlimited),
        None => {
            let mb = ctx
                .estimator
                .memory_mb()
                .map_err(ResolveError::MemoryEstimate)?;
            Limit::count(mb).map_err(|_| {
                ResolveError::MemoryEstimate(crate::EstimationError::Memory(
                    "zero memory reported".into(),
                ))
            })
        }
    }
}
