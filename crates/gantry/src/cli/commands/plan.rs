//! Plan command — show the execution plan for a target

use std::path::Path;

use clap::Args;
use console::style;

use crate::cli::{Cli, OutputFormat};
use crate::engine::Engine;
use crate::exit_codes;

use super::SelectionArgs;

/// Show the layered execution plan for a target
#[derive(Debug, Args)]
pub struct PlanCommand {
    /// Target to plan (e.g. build, test)
    pub target: String,

    #[command(flatten)]
    pub selection: SelectionArgs,
}

impl PlanCommand {
    pub fn execute(&self, cli: &Cli, cwd: &Path) -> anyhow::Result<i32> {
        let engine = Engine::load(cwd)?;
        let build = engine.build_project_graph()?;

        for warning in &build.warnings {
            eprintln!("{} {}", style("warning:").yellow(), warning);
        }

        let selection = self.selection.to_selection();
        let task_graph = engine.build_task_graph(&build.graph, &self.target, &selection)?;
        let plan = engine.plan(&task_graph)?;

        match cli.format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(&plan)?);
            }
            OutputFormat::Text => {
                if plan.is_empty() {
                    println!(
                        "No projects define target '{}'",
                        style(&self.target).cyan()
                    );
                } else {
                    print!("{}", plan.render());
                    println!("max parallelism: {}", plan.max_parallelism());
                }
            }
        }

        Ok(exit_codes::SUCCESS)
    }
}
