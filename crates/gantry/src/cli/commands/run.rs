//! Run command — execute a target across the workspace

use std::path::Path;

use clap::Args;
use console::style;

use gantry_exec::TaskStatus;

use crate::cli::{Cli, OutputFormat};
use crate::engine::{Engine, ExecuteOptions};
use crate::exit_codes;

use super::SelectionArgs;

/// Run a target across the workspace
#[derive(Debug, Args)]
pub struct RunCommand {
    /// Target to run (e.g. build, test, docker-build)
    pub target: String,

    #[command(flatten)]
    pub selection: SelectionArgs,

    /// Maximum concurrent tasks
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Keep running tasks whose own dependencies are intact after a failure
    #[arg(long)]
    pub keep_going: bool,

    /// Execute on the configured remote endpoint
    #[arg(long)]
    pub remote: bool,

    /// Show the execution plan without running anything
    #[arg(long)]
    pub dry_run: bool,
}

impl RunCommand {
    pub fn execute(&self, cli: &Cli, cwd: &Path) -> anyhow::Result<i32> {
        let runtime = tokio::runtime::Runtime::new()?;
        runtime.block_on(self.execute_async(cli, cwd))
    }

    async fn execute_async(&self, cli: &Cli, cwd: &Path) -> anyhow::Result<i32> {
        let engine = Engine::load(cwd)?;

        let build = engine.build_project_graph()?;
        for warning in &build.warnings {
            eprintln!("{} {}", style("warning:").yellow(), warning);
        }

        let selection = self.selection.to_selection();
        let task_graph = engine.build_task_graph(&build.graph, &self.target, &selection)?;

        if task_graph.is_empty() {
            println!(
                "{} No projects define target '{}'",
                style("✓").green(),
                style(&self.target).cyan()
            );
            return Ok(exit_codes::SUCCESS);
        }

        let plan = engine.plan(&task_graph)?;

        if self.dry_run {
            print!("{}", plan.render());
            return Ok(exit_codes::SUCCESS);
        }

        let results = engine
            .execute(
                &task_graph,
                &plan,
                ExecuteOptions {
                    concurrency: self.concurrency,
                    keep_going: self.keep_going,
                    remote: self.remote,
                    verbose: cli.verbose,
                },
            )
            .await;

        match cli.format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(&results)?);
            }
            OutputFormat::Text => {
                for result in &results.results {
                    let glyph = match result.status {
                        TaskStatus::Completed => style("✓").green(),
                        TaskStatus::Cached => style("≡").green(),
                        TaskStatus::Failed => style("✗").red(),
                        TaskStatus::Skipped => style("-").dim(),
                        _ => style("?").dim(),
                    };
                    let mut line = format!("{} {}", glyph, result.id);
                    if result.from_cache {
                        line.push_str(" (cached)");
                    }
                    if let Some(reason) = &result.failure {
                        line.push_str(&format!(" — {}", reason));
                    }
                    println!("{}", line);
                }
                println!(
                    "\n{} completed, {} cached, {} failed, {} skipped",
                    results.completed, results.cached, results.failed, results.skipped
                );
            }
        }

        Ok(results.exit_code())
    }
}
