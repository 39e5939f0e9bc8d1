//! Invocation-scoped engine facade
//!
//! The three-stage pipeline behind the CLI commands: build the project
//! graph, expand a target request into a task graph and plan, execute the
//! plan. A long-lived holder (a daemon) would call the same three methods.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;

use gantry_core::config::{find_config, load_config, WorkspaceConfig};
use gantry_core::error::Result;
use gantry_exec::{
    ExecutionResults, ExecutorOptions, LocalExecutor, RemoteExecutor, TaskExecutor,
    TaskReporter, TracingReporter,
};
use gantry_graph::{GraphBuild, ProjectGraph, ProjectGraphBuilder};
use gantry_inference::InferenceRegistry;
use gantry_tasks::{ExecutionPlan, ProjectSelection, TaskGraph};

/// Execution knobs resolved from CLI flags
#[derive(Debug, Clone, Default)]
pub struct ExecuteOptions {
    /// Concurrency cap (None = host parallelism)
    pub concurrency: Option<usize>,
    /// Keep running tasks whose own dependencies are intact
    pub keep_going: bool,
    /// Use the configured remote executor
    pub remote: bool,
    /// Stream task output
    pub verbose: bool,
}

/// The invocation-scoped composition root
pub struct Engine {
    workspace_root: PathBuf,
    config: WorkspaceConfig,
}

impl Engine {
    /// Load the engine for a workspace root. A missing config file means
    /// defaults; a present but invalid one is a configuration error.
    pub fn load(workspace_root: impl Into<PathBuf>) -> Result<Self> {
        let workspace_root = workspace_root.into();
        let config = match find_config(&workspace_root) {
            Some(path) => {
                info!(config = %path.display(), "loading workspace config");
                load_config(&path)?
            }
            None => WorkspaceConfig::default(),
        };
        Ok(Self {
            workspace_root,
            config,
        })
    }

    /// The loaded workspace configuration
    pub fn config(&self) -> &WorkspaceConfig {
        &self.config
    }

    /// Stage 1: discovery and project graph construction
    pub fn build_project_graph(&self) -> Result<GraphBuild> {
        let registry = InferenceRegistry::from_config(&self.config)?;
        ProjectGraphBuilder::new(&self.workspace_root, self.config.clone(), registry).build()
    }

    /// Stage 2: target expansion into an acyclic task graph
    pub fn build_task_graph(
        &self,
        graph: &ProjectGraph,
        target: &str,
        selection: &ProjectSelection,
    ) -> Result<TaskGraph> {
        TaskGraph::build(graph, target, selection)
    }

    /// Stage 2b: layered plan
    pub fn plan(&self, task_graph: &TaskGraph) -> Result<ExecutionPlan> {
        ExecutionPlan::compute(task_graph)
    }

    /// Stage 3: run the plan with the local or remote executor
    pub async fn execute(
        &self,
        task_graph: &TaskGraph,
        plan: &ExecutionPlan,
        options: ExecuteOptions,
    ) -> ExecutionResults {
        let reporter: Arc<dyn TaskReporter> = Arc::new(TracingReporter);
        let mut executor_options = ExecutorOptions {
            workspace_root: self.workspace_root.clone(),
            keep_going: options.keep_going,
            ..Default::default()
        };
        if let Some(concurrency) = options.concurrency {
            executor_options.concurrency = concurrency.max(1);
        }

        let use_remote = options.remote
            && self
                .config
                .remote_execution
                .as_ref()
                .map(|r| r.enabled)
                .unwrap_or(false);

        if use_remote {
            let remote_config = self.config.remote_execution.clone().unwrap_or_default();
            // The connection pool cap bounds concurrent remote executions
            executor_options.concurrency = executor_options
                .concurrency
                .min(remote_config.max_connections.max(1) as usize);
            let executor = RemoteExecutor::new(executor_options, remote_config, reporter);
            executor.execute(task_graph, plan, options.verbose).await
        } else {
            let executor = LocalExecutor::new(executor_options, reporter);
            executor.execute(task_graph, plan, options.verbose).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(root: &std::path::Path, relative: &str, content: &str) {
        let path = root.join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    #[tokio::test]
    async fn test_full_pipeline() {
        let temp = TempDir::new().unwrap();
        write(
            temp.path(),
            "packages/utils/package.json",
            r#"{"name": "utils", "version": "1.0.0", "scripts": {"build": "true"}}"#,
        );
        write(
            temp.path(),
            "packages/utils/project.json",
            r#"{"targets": {"build": {"executor": "gantry:run-commands",
                "options": {"commands": ["echo utils done"]}}}}"#,
        );

        let engine = Engine::load(temp.path()).unwrap();
        let build = engine.build_project_graph().unwrap();
        let task_graph = engine
            .build_task_graph(&build.graph, "build", &ProjectSelection::All)
            .unwrap();
        let plan = engine.plan(&task_graph).unwrap();
        let results = engine
            .execute(&task_graph, &plan, ExecuteOptions::default())
            .await;

        assert!(results.success());
        assert!(results.get("utils:build").unwrap().stdout.contains("utils done"));
    }

    #[test]
    fn test_invalid_config_is_fatal() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "gantry.json", "{ not json");
        assert!(Engine::load(temp.path()).is_err());
    }

    #[tokio::test]
    async fn test_empty_workspace_pipeline() {
        let temp = TempDir::new().unwrap();
        let engine = Engine::load(temp.path()).unwrap();

        let build = engine.build_project_graph().unwrap();
        assert!(build.graph.is_empty());

        let task_graph = engine
            .build_task_graph(&build.graph, "build", &ProjectSelection::All)
            .unwrap();
        assert!(task_graph.is_empty());

        let plan = engine.plan(&task_graph).unwrap();
        let results = engine
            .execute(&task_graph, &plan, ExecuteOptions::default())
            .await;
        assert!(results.is_empty());
        assert_eq!(results.exit_code(), 0);
    }
}
