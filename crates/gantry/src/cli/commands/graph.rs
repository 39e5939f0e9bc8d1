//! Graph command — show the project graph

use std::path::Path;

use clap::Args;
use console::style;

use crate::cli::{Cli, OutputFormat};
use crate::engine::Engine;
use crate::exit_codes;

/// Show the discovered project graph
#[derive(Debug, Args)]
pub struct GraphCommand {}

impl GraphCommand {
    pub fn execute(&self, cli: &Cli, cwd: &Path) -> anyhow::Result<i32> {
        let engine = Engine::load(cwd)?;
        let build = engine.build_project_graph()?;

        for warning in &build.warnings {
            eprintln!("{} {}", style("warning:").yellow(), warning);
        }

        match cli.format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(&build.graph.summary())?);
            }
            OutputFormat::Text => {
                if build.graph.is_empty() {
                    println!("No projects discovered.");
                    return Ok(exit_codes::SUCCESS);
                }
                for (name, project) in build.graph.projects() {
                    println!(
                        "{} ({}) [{}]",
                        style(name).bold(),
                        project.project_type.as_str(),
                        project.root.display()
                    );
                    for target in project.targets.keys() {
                        println!("  target: {}", target);
                    }
                    for dep in build.graph.dependencies(name) {
                        println!("  -> {}", dep);
                    }
                }
                let cycles = build.graph.cycles();
                if !cycles.is_empty() {
                    for cycle in cycles {
                        eprintln!(
                            "{} cycle: {}",
                            style("warning:").yellow(),
                            cycle.join(" -> ")
                        );
                    }
                }
            }
        }

        Ok(exit_codes::SUCCESS)
    }
}
