//! CLI definition and command handling

pub mod commands;

use clap::{Parser, Subcommand};

use commands::{GraphCommand, PlanCommand, RunCommand};

/// Gantry - polyglot monorepo build orchestrator
#[derive(Debug, Parser)]
#[command(name = "gantry")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Stream task output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format
    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Working directory
    #[arg(short = 'C', long, global = true)]
    pub directory: Option<std::path::PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Output format for CLI
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output
    #[default]
    Text,
    /// JSON output
    Json,
}

/// Available commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run a target across the workspace
    Run(RunCommand),

    /// Show the project graph
    Graph(GraphCommand),

    /// Show the execution plan for a target without running it
    Plan(PlanCommand),
}

impl Cli {
    /// Dispatch the selected command; returns the process exit code
    pub fn execute(&self) -> anyhow::Result<i32> {
        let cwd = match &self.directory {
            Some(dir) => dir.clone(),
            None => std::env::current_dir()?,
        };

        let result = match &self.command {
            Commands::Run(cmd) => cmd.execute(self, &cwd),
            Commands::Graph(cmd) => cmd.execute(self, &cwd),
            Commands::Plan(cmd) => cmd.execute(self, &cwd),
        };

        match result {
            Ok(code) => Ok(code),
            Err(error) => match error.downcast_ref::<gantry_core::GantryError>() {
                Some(gantry_error) => {
                    eprintln!("{} {}", console::style("error:").red(), gantry_error);
                    Ok(exit_code_for(gantry_error))
                }
                None => Err(error),
            },
        }
    }
}

fn exit_code_for(error: &gantry_core::GantryError) -> i32 {
    use crate::exit_codes;
    use gantry_core::GantryError;

    match error {
        GantryError::Config(_) => exit_codes::CONFIG_ERROR,
        GantryError::Graph(_) => exit_codes::GRAPH_ERROR,
        _ => exit_codes::TASK_FAILED,
    }
}
