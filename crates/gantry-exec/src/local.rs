//! Local subprocess executor
//!
//! Runs the plan layer by layer, dispatching tasks concurrently up to the
//! configured parallelism cap. Commands run under `sh -c` with streamed
//! output; a per-task timeout terminates the process (SIGTERM, then SIGKILL
//! after a grace period) and reports exit code 124.

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use gantry_tasks::{ExecutionPlan, Task, TaskGraph};

use crate::executor::{execute_layered, ExecutorOptions, TaskExecutor, TaskRunner};
use crate::reporter::{TaskEvent, TaskReporter, TracingReporter};
use crate::result::{ExecutionResults, TaskResult, TIMEOUT_EXIT_CODE};

/// Grace period between terminate and force-kill
const KILL_GRACE: Duration = Duration::from_secs(5);

/// Local subprocess executor
pub struct LocalExecutor {
    options: ExecutorOptions,
    reporter: Arc<dyn TaskReporter>,
    /// In-flight executions keyed by task hash. A request for a hash that
    /// is already running coalesces onto the existing execution.
    inflight: Mutex<HashMap<String, Arc<OnceCell<TaskResult>>>>,
}

impl LocalExecutor {
    /// Create an executor with options and a reporter
    pub fn new(options: ExecutorOptions, reporter: Arc<dyn TaskReporter>) -> Self {
        Self {
            options,
            reporter,
            inflight: Mutex::new(HashMap::new()),
        }
    }

    /// Executor with default options logging through tracing
    pub fn with_defaults(workspace_root: impl Into<PathBuf>) -> Self {
        Self::new(
            ExecutorOptions {
                workspace_root: workspace_root.into(),
                ..Default::default()
            },
            Arc::new(TracingReporter),
        )
    }

    /// The options this executor runs with
    pub fn options(&self) -> &ExecutorOptions {
        &self.options
    }

    async fn run_coalesced(&self, task: &Task, verbose: bool) -> TaskResult {
        let cell = {
            let mut inflight = self.inflight.lock().unwrap();
            inflight
                .entry(task.hash.clone())
                .or_insert_with(|| Arc::new(OnceCell::new()))
                .clone()
        };

        let result = cell
            .get_or_init(|| self.run_uncoalesced(task, verbose))
            .await
            .clone();

        // Drop the finished entry so a later invocation executes afresh;
        // only the cell we actually awaited may be removed.
        let mut inflight = self.inflight.lock().unwrap();
        if let Some(existing) = inflight.get(&task.hash) {
            if Arc::ptr_eq(existing, &cell) {
                inflight.remove(&task.hash);
            }
        }
        result
    }

    async fn run_uncoalesced(&self, task: &Task, verbose: bool) -> TaskResult {
        let id = task.id.to_string();
        let builder = TaskResult::start(&id);
        let commands = &task.target.options.commands;

        self.reporter.report(&TaskEvent::TaskStarted {
            id: id.clone(),
            command: commands.join(" && "),
        });

        if commands.is_empty() {
            let result = builder.completed(0, String::new(), String::new());
            self.report_outcome(&result);
            return result;
        }

        let timeout = task
            .target
            .options
            .timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(self.options.default_timeout);
        let deadline = Instant::now() + timeout;

        let cwd = match &task.target.options.cwd {
            Some(cwd) => self.options.workspace_root.join(cwd),
            None => self.options.workspace_root.join(&task.project_root),
        };

        let mut stdout_all: Vec<String> = Vec::new();
        let mut stderr_all: Vec<String> = Vec::new();

        let outcome = if task.target.options.parallel {
            let runs = commands.iter().map(|cmd| {
                self.run_command(&id, cmd, &cwd, &task.target.options.env, deadline, verbose)
            });
            let outcomes = futures::future::join_all(runs).await;

            let mut combined = CommandOutcome::success();
            for outcome in outcomes {
                stdout_all.push(outcome.stdout().to_string());
                stderr_all.push(outcome.stderr().to_string());
                combined = combined.worst(outcome);
            }
            combined
        } else {
            let mut last = CommandOutcome::success();
            for cmd in commands {
                let outcome = self
                    .run_command(&id, cmd, &cwd, &task.target.options.env, deadline, verbose)
                    .await;
                stdout_all.push(outcome.stdout().to_string());
                stderr_all.push(outcome.stderr().to_string());
                let stop = !outcome.is_success();
                last = outcome;
                if stop {
                    break;
                }
            }
            last
        };

        let stdout = stdout_all.join("\n");
        let stderr = stderr_all.join("\n");

        let result = match outcome {
            CommandOutcome::Exited { code: 0, .. } => builder.completed(0, stdout, stderr),
            CommandOutcome::Exited { code, .. } => builder.failed(
                Some(code),
                format!("command exited with code {}", code),
                stdout,
                stderr,
            ),
            CommandOutcome::TimedOut { .. } => builder.failed(
                Some(TIMEOUT_EXIT_CODE),
                format!("timed out after {}s", timeout.as_secs()),
                stdout,
                stderr,
            ),
            CommandOutcome::Cancelled { .. } => {
                builder.failed(None, "cancelled", stdout, stderr)
            }
            CommandOutcome::SpawnFailed(ref reason) => {
                builder.failed(None, format!("failed to spawn: {}", reason), stdout, stderr)
            }
        };

        self.report_outcome(&result);
        result
    }

    async fn run_command(
        &self,
        id: &str,
        cmd: &str,
        cwd: &PathBuf,
        env: &std::collections::BTreeMap<String, String>,
        deadline: Instant,
        verbose: bool,
    ) -> CommandOutcome {
        debug!(task = id, command = cmd, cwd = %cwd.display(), "spawning command");

        let mut child = match Command::new("sh")
            .arg("-c")
            .arg(cmd)
            .current_dir(cwd)
            .envs(env)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
        {
            Ok(child) => child,
            Err(e) => return CommandOutcome::SpawnFailed(e.to_string()),
        };

        // Drain both pipes continuously so neither can fill and deadlock
        // the child.
        let stdout_task = spawn_drain(
            child.stdout.take(),
            id.to_string(),
            false,
            self.reporter.clone(),
            verbose,
        );
        let stderr_task = spawn_drain(
            child.stderr.take(),
            id.to_string(),
            true,
            self.reporter.clone(),
            verbose,
        );

        let remaining = deadline.saturating_duration_since(Instant::now());
        let cancel = self.options.cancellation.clone();

        let exit = tokio::select! {
            status = child.wait() => match status {
                Ok(status) => Some(status.code().unwrap_or(-1)),
                Err(e) => {
                    warn!(task = id, error = %e, "wait failed");
                    Some(-1)
                }
            },
            _ = tokio::time::sleep(remaining) => None,
            _ = cancel.cancelled() => {
                terminate_then_kill(&mut child).await;
                let stdout = stdout_task.await.unwrap_or_default();
                let stderr = stderr_task.await.unwrap_or_default();
                return CommandOutcome::Cancelled { stdout, stderr };
            }
        };

        match exit {
            Some(code) => {
                let stdout = stdout_task.await.unwrap_or_default();
                let stderr = stderr_task.await.unwrap_or_default();
                CommandOutcome::Exited { code, stdout, stderr }
            }
            None => {
                terminate_then_kill(&mut child).await;
                let stdout = stdout_task.await.unwrap_or_default();
                let stderr = stderr_task.await.unwrap_or_default();
                CommandOutcome::TimedOut { stdout, stderr }
            }
        }
    }

    fn report_outcome(&self, result: &TaskResult) {
        match result.status {
            crate::result::TaskStatus::Completed | crate::result::TaskStatus::Cached => {
                self.reporter.report(&TaskEvent::TaskCompleted {
                    id: result.id.clone(),
                    duration: result.duration,
                    from_cache: result.from_cache,
                });
            }
            crate::result::TaskStatus::Failed => {
                self.reporter.report(&TaskEvent::TaskFailed {
                    id: result.id.clone(),
                    duration: result.duration,
                    reason: result.failure.clone().unwrap_or_default(),
                });
            }
            _ => {}
        }
    }
}

#[async_trait]
impl TaskRunner for LocalExecutor {
    async fn run_task(&self, task: &Task, verbose: bool) -> TaskResult {
        self.run_coalesced(task, verbose).await
    }
}

#[async_trait]
impl TaskExecutor for LocalExecutor {
    async fn execute(
        &self,
        graph: &TaskGraph,
        plan: &ExecutionPlan,
        verbose: bool,
    ) -> ExecutionResults {
        execute_layered(
            self,
            graph,
            plan,
            &self.options,
            self.reporter.as_ref(),
            verbose,
        )
        .await
    }
}

/// Outcome of one command
enum CommandOutcome {
    Exited {
        code: i32,
        stdout: String,
        stderr: String,
    },
    TimedOut {
        stdout: String,
        stderr: String,
    },
    Cancelled {
        stdout: String,
        stderr: String,
    },
    SpawnFailed(String),
}

impl CommandOutcome {
    fn success() -> Self {
        Self::Exited {
            code: 0,
            stdout: String::new(),
            stderr: String::new(),
        }
    }

    fn is_success(&self) -> bool {
        matches!(self, Self::Exited { code: 0, .. })
    }

    fn stdout(&self) -> &str {
        match self {
            Self::Exited { stdout, .. }
            | Self::TimedOut { stdout, .. }
            | Self::Cancelled { stdout, .. } => stdout,
            Self::SpawnFailed(_) => "",
        }
    }

    fn stderr(&self) -> &str {
        match self {
            Self::Exited { stderr, .. }
            | Self::TimedOut { stderr, .. }
            | Self::Cancelled { stderr, .. } => stderr,
            Self::SpawnFailed(_) => "",
        }
    }

    /// Severity order for combining parallel commands: timeout beats a
    /// plain failure beats success.
    fn worst(self, other: Self) -> Self {
        let rank = |o: &Self| match o {
            Self::Exited { code: 0, .. } => 0,
            Self::Exited { .. } => 1,
            Self::SpawnFailed(_) => 2,
            Self::Cancelled { .. } => 3,
            Self::TimedOut { .. } => 4,
        };
        if rank(&other) >= rank(&self) {
            other
        } else {
            self
        }
    }
}

fn spawn_drain<R>(
    reader: Option<R>,
    id: String,
    is_stderr: bool,
    reporter: Arc<dyn TaskReporter>,
    verbose: bool,
) -> tokio::task::JoinHandle<String>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let Some(reader) = reader else {
            return String::new();
        };
        let mut lines = BufReader::new(reader).lines();
        let mut collected = Vec::new();
        while let Ok(Some(line)) = lines.next_line().await {
            if verbose {
                reporter.report(&TaskEvent::Output {
                    id: id.clone(),
                    line: line.clone(),
                    is_stderr,
                });
            }
            collected.push(line);
        }
        collected.join("\n")
    })
}

/// Terminate gracefully, then force-kill after the grace period
async fn terminate_then_kill(child: &mut Child) {
    #[cfg(unix)]
    if let Some(pid) = child.id() {
        // SAFETY: signaling a pid we own
        unsafe {
            libc::kill(pid as i32, libc::SIGTERM);
        }
        if tokio::time::timeout(KILL_GRACE, child.wait()).await.is_ok() {
            return;
        }
    }
    let _ = child.kill().await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap as Map;

    use gantry_core::model::{DependencyEdge, ProjectConfiguration, TargetConfiguration};
    use gantry_graph::ProjectGraph;
    use gantry_tasks::ProjectSelection;

    use crate::reporter::CollectingReporter;
    use crate::result::TaskStatus;

    fn target(commands: &[&str]) -> TargetConfiguration {
        TargetConfiguration::new("gantry:run-commands")
            .with_commands(commands.iter().map(|c| c.to_string()).collect())
    }

    fn workspace(
        temp: &tempfile::TempDir,
        projects: Vec<ProjectConfiguration>,
        edges: Vec<DependencyEdge>,
    ) -> ProjectGraph {
        let mut map = Map::new();
        for p in projects {
            std::fs::create_dir_all(temp.path().join(&p.root)).unwrap();
            map.insert(p.name.clone(), p);
        }
        ProjectGraph::new(map, edges)
    }

    fn executor(temp: &tempfile::TempDir) -> (LocalExecutor, Arc<CollectingReporter>) {
        let reporter = Arc::new(CollectingReporter::default());
        let options = ExecutorOptions {
            workspace_root: temp.path().to_path_buf(),
            ..Default::default()
        };
        (LocalExecutor::new(options, reporter.clone()), reporter)
    }

    async fn run(
        graph: &ProjectGraph,
        target_name: &str,
        executor: &LocalExecutor,
    ) -> ExecutionResults {
        let tasks = TaskGraph::build(graph, target_name, &ProjectSelection::All).unwrap();
        let plan = ExecutionPlan::compute(&tasks).unwrap();
        executor.execute(&tasks, &plan, false).await
    }

    #[tokio::test]
    async fn test_successful_chain() {
        let temp = tempfile::TempDir::new().unwrap();
        let graph = workspace(
            &temp,
            vec![
                ProjectConfiguration::new("utils", "utils")
                    .with_target("build", target(&["echo built utils"])),
                ProjectConfiguration::new("web", "web").with_target(
                    "build",
                    target(&["echo built web"]).with_depends_on("^build"),
                ),
            ],
            vec![DependencyEdge::stat("web", "utils")],
        );

        let (executor, _) = executor(&temp);
        let results = run(&graph, "build", &executor).await;

        assert!(results.success());
        assert_eq!(results.completed, 2);
        assert_eq!(results.exit_code(), 0);

        let utils = results.get("utils:build").unwrap();
        assert_eq!(utils.status, TaskStatus::Completed);
        assert_eq!(utils.exit_code, Some(0));
        assert!(utils.stdout.contains("built utils"));
        assert!(!utils.from_cache);
    }

    #[tokio::test]
    async fn test_failure_skips_dependents() {
        let temp = tempfile::TempDir::new().unwrap();
        let graph = workspace(
            &temp,
            vec![
                ProjectConfiguration::new("utils", "utils")
                    .with_target("build", target(&["exit 3"])),
                ProjectConfiguration::new("web", "web").with_target(
                    "build",
                    target(&["echo never"]).with_depends_on("^build"),
                ),
            ],
            vec![DependencyEdge::stat("web", "utils")],
        );

        let (executor, _) = executor(&temp);
        let results = run(&graph, "build", &executor).await;

        assert_eq!(results.failed, 1);
        assert_eq!(results.skipped, 1);
        assert_eq!(results.exit_code(), 1);

        let utils = results.get("utils:build").unwrap();
        assert_eq!(utils.status, TaskStatus::Failed);
        assert_eq!(utils.exit_code, Some(3));

        let web = results.get("web:build").unwrap();
        assert_eq!(web.status, TaskStatus::Skipped);
    }

    #[tokio::test]
    async fn test_keep_going_runs_unrelated_tasks() {
        let temp = tempfile::TempDir::new().unwrap();
        let graph = workspace(
            &temp,
            vec![
                ProjectConfiguration::new("bad", "bad").with_target("build", target(&["exit 1"])),
                ProjectConfiguration::new("dependent", "dependent").with_target(
                    "build",
                    target(&["echo never"]).with_depends_on("bad:build"),
                ),
                ProjectConfiguration::new("solo", "solo")
                    .with_target("build", target(&["sleep 0.2 && echo fine"])),
            ],
            Vec::new(),
        );

        let reporter = Arc::new(CollectingReporter::default());
        let options = ExecutorOptions {
            workspace_root: temp.path().to_path_buf(),
            keep_going: true,
            ..Default::default()
        };
        let executor = LocalExecutor::new(options, reporter);
        let results = run(&graph, "build", &executor).await;

        assert_eq!(results.get("bad:build").unwrap().status, TaskStatus::Failed);
        assert_eq!(
            results.get("dependent:build").unwrap().status,
            TaskStatus::Skipped
        );
        assert_eq!(
            results.get("solo:build").unwrap().status,
            TaskStatus::Completed
        );
    }

    #[tokio::test]
    async fn test_timeout_reports_124() {
        let temp = tempfile::TempDir::new().unwrap();
        let mut slow = target(&["sleep 30"]);
        slow.options.timeout_secs = Some(1);

        let graph = workspace(
            &temp,
            vec![
                ProjectConfiguration::new("slow", "slow").with_target("build", slow),
                ProjectConfiguration::new("waiter", "waiter").with_target(
                    "build",
                    target(&["echo never"]).with_depends_on("slow:build"),
                ),
            ],
            Vec::new(),
        );

        let (executor, _) = executor(&temp);
        let results = run(&graph, "build", &executor).await;

        let slow = results.get("slow:build").unwrap();
        assert_eq!(slow.status, TaskStatus::Failed);
        assert_eq!(slow.exit_code, Some(TIMEOUT_EXIT_CODE));
        assert!(slow.failure.as_deref().unwrap_or("").contains("timed out"));

        assert_eq!(
            results.get("waiter:build").unwrap().status,
            TaskStatus::Skipped
        );
        assert_eq!(results.exit_code(), TIMEOUT_EXIT_CODE);
    }

    #[tokio::test]
    async fn test_sequential_commands_short_circuit() {
        let temp = tempfile::TempDir::new().unwrap();
        let marker = temp.path().join("marker");
        let graph = workspace(
            &temp,
            vec![ProjectConfiguration::new("multi", "multi").with_target(
                "build",
                target(&["exit 7", &format!("touch {}", marker.display())]),
            )],
            Vec::new(),
        );

        let (executor, _) = executor(&temp);
        let results = run(&graph, "build", &executor).await;

        let multi = results.get("multi:build").unwrap();
        assert_eq!(multi.status, TaskStatus::Failed);
        assert_eq!(multi.exit_code, Some(7));
        assert!(!marker.exists());
    }

    #[tokio::test]
    async fn test_parallel_commands_all_run() {
        let temp = tempfile::TempDir::new().unwrap();
        let mut parallel = target(&["echo one", "echo two"]);
        parallel.options.parallel = true;

        let graph = workspace(
            &temp,
            vec![ProjectConfiguration::new("par", "par").with_target("build", parallel)],
            Vec::new(),
        );

        let (executor, _) = executor(&temp);
        let results = run(&graph, "build", &executor).await;

        let par = results.get("par:build").unwrap();
        assert_eq!(par.status, TaskStatus::Completed);
        assert!(par.stdout.contains("one"));
        assert!(par.stdout.contains("two"));
    }

    #[tokio::test]
    async fn test_env_and_cwd() {
        let temp = tempfile::TempDir::new().unwrap();
        let mut t = target(&["echo $GREETING from $(basename $(pwd))"]);
        t.options.env.insert("GREETING".into(), "hello".into());

        let graph = workspace(
            &temp,
            vec![ProjectConfiguration::new("svc", "svc").with_target("build", t)],
            Vec::new(),
        );

        let (executor, _) = executor(&temp);
        let results = run(&graph, "build", &executor).await;

        let svc = results.get("svc:build").unwrap();
        assert_eq!(svc.status, TaskStatus::Completed);
        assert!(svc.stdout.contains("hello from svc"));
    }

    #[tokio::test]
    async fn test_rerun_executes_again() {
        let temp = tempfile::TempDir::new().unwrap();
        let log = temp.path().join("runs.log");
        let graph = workspace(
            &temp,
            vec![ProjectConfiguration::new("counter", "counter").with_target(
                "build",
                target(&[&format!("echo run >> {}", log.display())]),
            )],
            Vec::new(),
        );

        let (executor, _) = executor(&temp);
        let first = run(&graph, "build", &executor).await;
        let second = run(&graph, "build", &executor).await;
        assert!(first.success() && second.success());

        let contents = std::fs::read_to_string(&log).unwrap();
        assert_eq!(contents.lines().count(), 2);
    }

    #[tokio::test]
    async fn test_cancellation_marks_failed() {
        let temp = tempfile::TempDir::new().unwrap();
        let graph = workspace(
            &temp,
            vec![ProjectConfiguration::new("slow", "slow")
                .with_target("build", target(&["sleep 30"]))],
            Vec::new(),
        );

        let reporter = Arc::new(CollectingReporter::default());
        let cancellation = tokio_util::sync::CancellationToken::new();
        let options = ExecutorOptions {
            workspace_root: temp.path().to_path_buf(),
            cancellation: cancellation.clone(),
            ..Default::default()
        };
        let executor = LocalExecutor::new(options, reporter);

        let cancel_task = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(300)).await;
            cancellation.cancel();
        });

        let results = run(&graph, "build", &executor).await;
        cancel_task.await.unwrap();

        let slow = results.get("slow:build").unwrap();
        assert_eq!(slow.status, TaskStatus::Failed);
        assert_eq!(slow.failure.as_deref(), Some("cancelled"));
    }

    #[tokio::test]
    async fn test_empty_plan() {
        let temp = tempfile::TempDir::new().unwrap();
        let graph = workspace(&temp, Vec::new(), Vec::new());
        let (executor, _) = executor(&temp);
        let results = run(&graph, "build", &executor).await;
        assert!(results.is_empty());
        assert_eq!(results.exit_code(), 0);
    }
}
