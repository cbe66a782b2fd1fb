use std::{fs, path::PathBuf};

use anyhow::Context;
use clap::Args;
use tracing::error;
use wfrun_core::{
    GenerateRequest,
    error::FAILURE_EXIT_CODE,
    script::{self, shell_quote},
};
use wfrun_model::ConfigSectionBundle;
use wfrun_observe::{LoggerConfig, logger_init};

/// Arguments for the `generate` command.
#[derive(Debug, Args)]
pub struct GenerateArgs {
    /// Path of the run script to write; its directory must exist.
    #[arg(long, value_name = "FILE")]
    pub script: PathBuf,

    /// Workflow module (engine executable) the script runs.
    #[arg(long, value_name = "FILE")]
    pub workflow_module: PathBuf,

    /// Workflow class name passed to the engine.
    #[arg(long, value_name = "NAME")]
    pub workflow_class: String,

    /// Name of the configuration section holding `runDir`.
    #[arg(long, value_name = "NAME")]
    pub primary_section: String,

    /// Configuration sections as a JSON object of objects.
    #[arg(long, value_name = "FILE")]
    pub sections: PathBuf,

    /// Driver binary the script execs (defaults to this executable).
    #[arg(long, value_name = "FILE")]
    pub interpreter: Option<PathBuf>,
}

pub fn execute(args: GenerateArgs) -> i32 {
    if let Err(e) = LoggerConfig::from_env().and_then(|cfg| logger_init(&cfg)) {
        eprintln!("wfrun: logger disabled: {e}");
    }

    match generate(args) {
        Ok(out) => {
            println!("Run script: {}", out.script_path.display());
            println!("Config:     {}", out.config_path.display());
            0
        }
        Err(e) => {
            error!(target: "wfrun.driver", error = %format!("{e:#}"), "generation failed");
            eprintln!("wfrun generate: {e:#}");
            FAILURE_EXIT_CODE
        }
    }
}

fn generate(args: GenerateArgs) -> anyhow::Result<wfrun_core::GeneratedScript> {
    let raw = fs::read(&args.sections)
        .with_context(|| format!("cannot read sections file '{}'", args.sections.display()))?;
    let bundle: ConfigSectionBundle = serde_json::from_slice(&raw)
        .with_context(|| format!("invalid sections file '{}'", args.sections.display()))?;

    let request = GenerateRequest {
        script_path: args.script,
        workflow_module: args.workflow_module,
        workflow_class: args.workflow_class,
        primary_section: args.primary_section,
        bundle,
        interpreter: args.interpreter,
        command_line: command_line(),
    };
    Ok(script::generate(&request)?)
}

fn command_line() -> String {
    std::env::args()
        .map(|a| {
            if a.chars().all(|c| c.is_ascii_alphanumeric() || "-_./=:,".contains(c)) && !a.is_empty() {
                a
            } else {
                shell_quote(&a)
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
