//! `wfrun`: generates workflow run scripts and executes them.

use clap::{Parser, Subcommand};

mod commands;

/// Workflow run-driver.
#[derive(Debug, Parser)]
#[command(name = "wfrun")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Write a run script and its config artifact for a configured workflow.
    Generate(commands::GenerateArgs),

    /// Run a workflow on behalf of a generated script.
    #[command(hide = true)]
    Exec(commands::ExecArgs),
}

fn main() {
    let cli = Cli::parse();

    let code = match cli.command {
        Command::Generate(args) => commands::generate::execute(args),
        Command::Exec(args) => commands::exec::execute(args),
    };
    std::process::exit(code);
}
