use std::{
    future::Future,
    panic::{self, AssertUnwindSafe},
    path::PathBuf,
    sync::Arc,
};

use clap::{Args, error::ErrorKind};
use tracing::{error, info};
use wfrun_core::{
    CoreError, MailRelay, RawRunArgs, ResolveError, RunController, SmtpProbe,
    controller::DEFAULT_EXIT_CODE,
    error::{FAILURE_EXIT_CODE, USAGE_EXIT_CODE},
    host,
    version::{DRIVER_VERSION, check_driver_version},
};
use wfrun_exec::EngineWorkflowClass;
use wfrun_observe::{LoggerConfig, logger_init};

use super::run_args::RunCli;

/// Arguments for the `exec` command, as written by a generated script.
#[derive(Debug, Args)]
pub struct ExecArgs {
    /// Driver version required by the script (`major.minor`).
    #[arg(long, value_name = "MAJOR.MINOR")]
    pub requires: String,

    /// Config artifact of the script.
    #[arg(long, value_name = "FILE")]
    pub config: PathBuf,

    #[arg(long, value_name = "NAME")]
    pub primary_section: String,

    #[arg(long, value_name = "FILE")]
    pub workflow_module: PathBuf,

    #[arg(long, value_name = "NAME")]
    pub workflow_class: String,

    /// Program name used in help and error output.
    #[arg(long, value_name = "NAME", default_value = "runWorkflow")]
    pub prog: String,

    /// Arguments given to the run script.
    #[arg(last = true, value_name = "RUN_ARGS")]
    pub run_args: Vec<String>,
}

pub fn execute(args: ExecArgs) -> i32 {
    if let Err(e) = check_driver_version(&args.requires, DRIVER_VERSION) {
        eprintln!("{}: {e}", args.prog);
        return e.exit_code();
    }

    let relay = Arc::new(SmtpProbe::default());
    let cli = match RunCli::try_parse_for(&args.prog, true, &args.run_args) {
        Ok(cli) => cli,
        Err(e) if e.kind() == ErrorKind::DisplayHelp => {
            let mut cmd = RunCli::command_for(&args.prog, relay.is_available());
            let _ = cmd.print_help();
            return 0;
        }
        Err(e) => {
            let _ = e.print();
            return e.exit_code();
        }
    };

    let logging = match init_logging(cli.quiet) {
        Ok(()) => true,
        Err(e) => {
            eprintln!("{}: logging disabled: {e}", args.prog);
            false
        }
    };
    let raw = RawRunArgs::from(cli);

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("{}: cannot start runtime: {e}", args.prog);
            return FAILURE_EXIT_CODE;
        }
    };

    let class = Arc::new(EngineWorkflowClass::new(
        &args.workflow_module,
        &args.workflow_class,
    ));
    let mut controller = RunController::new(&args.config, &args.primary_section, class)
        .with_mail_relay(relay.clone());

    info!(
        target: "wfrun.driver",
        host = %host::hostname(),
        platform = host::platform(),
        arch = host::arch(),
        attempt = %controller.attempt_id(),
        version = DRIVER_VERSION,
        config = %args.config.display(),
        "driver started"
    );

    let Some(outcome) = block_on_guarded(&runtime, controller.execute(&raw)) else {
        return DEFAULT_EXIT_CODE;
    };
    match outcome {
        Ok(code) => code,
        Err(CoreError::Usage(e)) => {
            report_usage(&args.prog, relay.as_ref(), &e);
            USAGE_EXIT_CODE
        }
        Err(e) => {
            if logging {
                error!(target: "wfrun.driver", error = %e, "run aborted");
            } else {
                eprintln!("{}: {e}", args.prog);
            }
            e.exit_code()
        }
    }
}

/// Drive `fut` to completion; `None` if it panicked.
///
/// The exit marker guard has already recorded the default code by then.
fn block_on_guarded<F: Future>(runtime: &tokio::runtime::Runtime, fut: F) -> Option<F::Output> {
    panic::catch_unwind(AssertUnwindSafe(|| runtime.block_on(fut))).ok()
}

fn init_logging(quiet: bool) -> Result<(), wfrun_observe::LoggerError> {
    let mut cfg = LoggerConfig::from_env()?;
    if quiet {
        cfg = cfg.quiet();
    }
    logger_init(&cfg)
}

fn report_usage(prog: &str, relay: &dyn MailRelay, e: &ResolveError) {
    let mut cmd = RunCli::command_for(prog, relay.is_available());
    if e.wants_full_help() {
        eprintln!("{}", cmd.render_help());
    } else {
        eprintln!("{}", cmd.render_usage());
    }
    eprintln!("{prog}: error: {e}");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn runtime() -> tokio::runtime::Runtime {
        tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap()
    }

    #[test]
    fn guarded_block_on_returns_output() {
        assert_eq!(block_on_guarded(&runtime(), async { 7 }), Some(7));
    }

    #[test]
    fn guarded_block_on_absorbs_panics() {
        let out: Option<i32> = block_on_guarded(&runtime(), async { panic!("engine task panicked") });
        assert_eq!(out, None);
    }
}
