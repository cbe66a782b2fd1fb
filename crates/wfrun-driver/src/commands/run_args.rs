//! Command line of a generated run script.

use clap::{ArgAction, CommandFactory, FromArgMatches, Parser};
use wfrun_core::RawRunArgs;

const DEBUG_HEADING: &str = "Debugging options";
const EXTENDED_HEADING: &str = "Extended portability options";

/// Run the configured workflow. Re-running resumes an interrupted run.
#[derive(Debug, Parser)]
#[command(disable_version_flag = true)]
pub struct RunCli {
    /// Select run mode (local|sge).
    #[arg(short = 'm', long = "mode", value_name = "MODE")]
    pub mode: Option<String>,

    /// Specify scheduler queue name.
    #[arg(short = 'q', long = "queue", value_name = "NAME")]
    pub queue: Option<String>,

    /// Number of jobs, must be an integer or 'unlimited'. Default: estimate total cores in local mode, 128 in sge mode.
    #[arg(short = 'j', long = "jobs", value_name = "N")]
    pub jobs: Option<String>,

    /// Gigabytes of memory available to run workflow, must be an integer or 'unlimited'.
    /// Default: estimate total memory in local mode, unlimited in sge mode.
    #[arg(short = 'g', long = "memGb", value_name = "N")]
    pub mem_gb: Option<String>,

    /// Dry run: go through the workflow but do not execute any command tasks.
    #[arg(short = 'd', long = "dryRun")]
    pub dry_run: bool,

    /// Don't write any log output to stderr (but still write to the workspace log).
    #[arg(long = "quiet")]
    pub quiet: bool,

    /// Send email notification of job completion status to this address (may be provided multiple times).
    #[arg(short = 'e', long = "mailTo", value_name = "ADDRESS", action = ArgAction::Append)]
    pub mail_to: Vec<String>,

    /// Reset task list to re-run hypothesis generation and scoring without resetting graph generation.
    #[arg(long = "rescore", help_heading = DEBUG_HEADING)]
    pub rescore: bool,

    /// Maximum runtime of any single task (hh:mm:ss), passed to the scheduler as h_rt.
    #[arg(long = "maxTaskRuntime", value_name = "HH:MM:SS", help_heading = EXTENDED_HEADING)]
    pub max_task_runtime: Option<String>,

    #[arg(hide = true)]
    pub positional: Vec<String>,
}

impl RunCli {
    /// Clap command for `prog`, with `--mailTo` hidden when mail cannot be delivered.
    pub fn command_for(prog: &str, mail_available: bool) -> clap::Command {
        let cmd = Self::command().name(prog.to_string()).bin_name(prog.to_string());
        if mail_available {
            cmd
        } else {
            cmd.mut_arg("mail_to", |a| a.hide(true))
        }
    }

    /// Parse `args` (without the program name).
    pub fn try_parse_for(
        prog: &str,
        mail_available: bool,
        args: &[String],
    ) -> Result<Self, clap::Error> {
        let argv = std::iter::once(prog.to_string()).chain(args.iter().cloned());
        let matches = Self::command_for(prog, mail_available).try_get_matches_from(argv)?;
        Self::from_arg_matches(&matches)
    }
}

impl From<RunCli> for RawRunArgs {
    fn from(cli: RunCli) -> Self {
        RawRunArgs {
            mode: cli.mode,
            queue: cli.queue,
            jobs: cli.jobs,
            mem_gb: cli.mem_gb,
            dry_run: cli.dry_run,
            quiet: cli.quiet,
            mail_to: cli.mail_to,
            rescore: cli.rescore,
            max_task_runtime: cli.max_task_runtime,
            positional: cli.positional,
        }
    }
}
