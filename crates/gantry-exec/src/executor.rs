//! Executor trait and the shared layered driver

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;

use gantry_tasks::{ExecutionPlan, Task, TaskGraph};

use crate::reporter::{TaskEvent, TaskReporter};
use crate::result::{ExecutionResults, TaskResult, TaskStatus};

/// Default per-task timeout
pub const DEFAULT_TASK_TIMEOUT: Duration = Duration::from_secs(300);

/// Options shared by executors
#[derive(Debug, Clone)]
pub struct ExecutorOptions {
    /// Absolute workspace root
    pub workspace_root: PathBuf,
    /// Maximum concurrently running tasks
    pub concurrency: usize,
    /// Keep running tasks whose own dependencies are intact after a failure
    pub keep_going: bool,
    /// Per-task timeout unless the target overrides it
    pub default_timeout: Duration,
    /// Global cancellation token
    pub cancellation: CancellationToken,
}

impl Default for ExecutorOptions {
    fn default() -> Self {
        Self {
            workspace_root: std::env::current_dir().unwrap_or_default(),
            concurrency: available_parallelism(),
            keep_going: false,
            default_timeout: DEFAULT_TASK_TIMEOUT,
            cancellation: CancellationToken::new(),
        }
    }
}

fn available_parallelism() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

/// A pluggable plan executor
#[async_trait]
pub trait TaskExecutor: Send + Sync {
    /// Execute the plan, returning a record for every planned task
    async fn execute(
        &self,
        graph: &TaskGraph,
        plan: &ExecutionPlan,
        verbose: bool,
    ) -> ExecutionResults;
}

/// How an executor runs one task; the layered driver handles ordering,
/// concurrency, and failure propagation.
#[async_trait]
pub(crate) trait TaskRunner: Send + Sync {
    async fn run_task(&self, task: &Task, verbose: bool) -> TaskResult;
}

/// Drive a plan layer by layer. Layers are strict barriers: the next layer
/// starts only after the previous one drains. On failure the default policy
/// skips everything downstream; `keep_going` skips only tasks whose own
/// transitive dependencies failed.
pub(crate) async fn execute_layered(
    runner: &dyn TaskRunner,
    graph: &TaskGraph,
    plan: &ExecutionPlan,
    options: &ExecutorOptions,
    reporter: &dyn TaskReporter,
    verbose: bool,
) -> ExecutionResults {
    let started = Instant::now();
    let mut records: HashMap<String, TaskResult> = HashMap::new();
    let mut poisoned: HashSet<String> = HashSet::new();
    let mut halted = false;

    for (layer_idx, layer) in plan.layers().iter().enumerate() {
        let mut to_run: Vec<&Task> = Vec::new();

        for id in layer {
            let skip_reason = if options.cancellation.is_cancelled() {
                Some("cancelled")
            } else if halted {
                Some("an earlier task failed")
            } else if graph.dependencies(id).iter().any(|d| poisoned.contains(d)) {
                Some("a dependency failed")
            } else {
                None
            };

            if let Some(reason) = skip_reason {
                reporter.report(&TaskEvent::TaskSkipped {
                    id: id.clone(),
                    reason: reason.to_string(),
                });
                poisoned.insert(id.clone());
                records.insert(id.clone(), TaskResult::skipped(id, reason));
                continue;
            }

            if let Some(task) = graph.get(id) {
                to_run.push(task);
            }
        }

        if to_run.is_empty() {
            continue;
        }

        reporter.report(&TaskEvent::LayerStarted {
            layer: layer_idx,
            task_count: to_run.len(),
        });

        let futures: Vec<std::pin::Pin<Box<dyn std::future::Future<Output = TaskResult> + Send + '_>>> =
            to_run
                .into_iter()
                .map(|task| {
                    Box::pin(runner.run_task(task, verbose))
                        as std::pin::Pin<
                            Box<dyn std::future::Future<Output = TaskResult> + Send + '_>,
                        >
                })
                .collect();

        let layer_results: Vec<TaskResult> = stream::iter(futures)
            .buffer_unordered(options.concurrency.max(1))
            .collect()
            .await;

        for result in layer_results {
            if result.status == TaskStatus::Failed {
                poisoned.insert(result.id.clone());
                if !options.keep_going {
                    halted = true;
                }
            }
            records.insert(result.id.clone(), result);
        }
    }

    let ordered: Vec<TaskResult> = plan
        .layers()
        .iter()
        .flatten()
        .filter_map(|id| records.remove(id))
        .collect();

    let results = ExecutionResults::new(ordered);
    reporter.report(&TaskEvent::Finished {
        total: results.len(),
        completed: results.completed,
        cached: results.cached,
        failed: results.failed,
        skipped: results.skipped,
        duration: started.elapsed(),
    });
    results
}
