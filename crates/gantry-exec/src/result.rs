//! Execution results

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Exit code reported when a task was killed for exceeding its timeout
pub const TIMEOUT_EXIT_CODE: i32 = 124;

/// Task execution status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// Not yet dispatched
    Pending,
    /// Currently executing
    Running,
    /// Finished with exit code 0
    Completed,
    /// Result served from the action cache
    Cached,
    /// Non-zero exit, timeout, or infrastructure failure
    Failed,
    /// Not run because a dependency failed
    Skipped,
}

impl TaskStatus {
    /// Whether this status counts as success
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed | Self::Cached)
    }
}

/// Per-task execution record
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskResult {
    /// Task id ("project:target")
    pub id: String,
    /// Final status
    pub status: TaskStatus,
    /// When the task was dispatched
    pub started_at: DateTime<Utc>,
    /// When the task finished
    pub finished_at: DateTime<Utc>,
    /// Wall-clock duration
    pub duration: Duration,
    /// Exit code when a process ran (124 on timeout)
    pub exit_code: Option<i32>,
    /// Captured stdout (may be a summary for remote runs)
    pub stdout: String,
    /// Captured stderr
    pub stderr: String,
    /// Whether the result came from a cache
    pub from_cache: bool,
    /// Failure reason, when failed or skipped
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
}

impl TaskResult {
    /// Start a result record for a task
    pub fn start(id: impl Into<String>) -> TaskResultBuilder {
        TaskResultBuilder {
            id: id.into(),
            started_at: Utc::now(),
        }
    }

    /// A SKIPPED record (never dispatched)
    pub fn skipped(id: impl Into<String>, reason: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            status: TaskStatus::Skipped,
            started_at: now,
            finished_at: now,
            duration: Duration::ZERO,
            exit_code: None,
            stdout: String::new(),
            stderr: String::new(),
            from_cache: false,
            failure: Some(reason.into()),
        }
    }
}

/// In-flight result builder holding the start timestamp
#[derive(Debug, Clone)]
pub struct TaskResultBuilder {
    id: String,
    started_at: DateTime<Utc>,
}

impl TaskResultBuilder {
    /// Finish with a status
    pub fn finish(self, status: TaskStatus) -> TaskResult {
        let finished_at = Utc::now();
        let duration = (finished_at - self.started_at)
            .to_std()
            .unwrap_or(Duration::ZERO);
        TaskResult {
            id: self.id,
            status,
            started_at: self.started_at,
            finished_at,
            duration,
            exit_code: None,
            stdout: String::new(),
            stderr: String::new(),
            from_cache: false,
            failure: None,
        }
    }

    /// Finish as COMPLETED with captured output
    pub fn completed(self, exit_code: i32, stdout: String, stderr: String) -> TaskResult {
        let mut result = self.finish(TaskStatus::Completed);
        result.exit_code = Some(exit_code);
        result.stdout = stdout;
        result.stderr = stderr;
        result
    }

    /// Finish as CACHED
    pub fn cached(self, exit_code: i32, stdout: String, stderr: String) -> TaskResult {
        let mut result = self.finish(TaskStatus::Cached);
        result.exit_code = Some(exit_code);
        result.stdout = stdout;
        result.stderr = stderr;
        result.from_cache = true;
        result
    }

    /// Finish as FAILED
    pub fn failed(
        self,
        exit_code: Option<i32>,
        reason: impl Into<String>,
        stdout: String,
        stderr: String,
    ) -> TaskResult {
        let mut result = self.finish(TaskStatus::Failed);
        result.exit_code = exit_code;
        result.failure = Some(reason.into());
        result.stdout = stdout;
        result.stderr = stderr;
        result
    }

    /// The task id
    pub fn id(&self) -> &str {
        &self.id
    }
}

/// Aggregate outcome of an executed plan
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResults {
    /// Per-task records in topological order
    pub results: Vec<TaskResult>,
    /// Tasks that completed (fresh)
    pub completed: usize,
    /// Tasks served from cache
    pub cached: usize,
    /// Tasks that failed
    pub failed: usize,
    /// Tasks skipped
    pub skipped: usize,
}

impl ExecutionResults {
    /// Aggregate a list of per-task records
    pub fn new(results: Vec<TaskResult>) -> Self {
        let mut aggregated = Self {
            results,
            ..Default::default()
        };
        for result in &aggregated.results {
            match result.status {
                TaskStatus::Completed => aggregated.completed += 1,
                TaskStatus::Cached => aggregated.cached += 1,
                TaskStatus::Failed => aggregated.failed += 1,
                TaskStatus::Skipped => aggregated.skipped += 1,
                TaskStatus::Pending | TaskStatus::Running => {}
            }
        }
        aggregated
    }

    /// Whether every task succeeded
    pub fn success(&self) -> bool {
        self.failed == 0 && self.skipped == 0
    }

    /// Find a task's record
    pub fn get(&self, id: &str) -> Option<&TaskResult> {
        self.results.iter().find(|r| r.id == id)
    }

    /// Process exit code: 0 on success, 124 when the primary (first)
    /// failure was a timeout, otherwise 1.
    pub fn exit_code(&self) -> i32 {
        if self.failed == 0 {
            return 0;
        }
        let primary = self
            .results
            .iter()
            .find(|r| r.status == TaskStatus::Failed);
        match primary.and_then(|r| r.exit_code) {
            Some(TIMEOUT_EXIT_CODE) => TIMEOUT_EXIT_CODE,
            _ => 1,
        }
    }

    /// Total number of task records
    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// Whether there are no records
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_is_success() {
        assert!(TaskStatus::Completed.is_success());
        assert!(TaskStatus::Cached.is_success());
        assert!(!TaskStatus::Failed.is_success());
        assert!(!TaskStatus::Skipped.is_success());
    }

    #[test]
    fn test_aggregation_counts() {
        let results = ExecutionResults::new(vec![
            TaskResult::start("a:build").completed(0, String::new(), String::new()),
            TaskResult::start("b:build").cached(0, String::new(), String::new()),
            TaskResult::start("c:build").failed(Some(2), "exit 2", String::new(), String::new()),
            TaskResult::skipped("d:build", "dependency failed"),
        ]);

        assert_eq!(results.completed, 1);
        assert_eq!(results.cached, 1);
        assert_eq!(results.failed, 1);
        assert_eq!(results.skipped, 1);
        assert!(!results.success());
        assert_eq!(results.exit_code(), 1);
    }

    #[test]
    fn test_exit_code_success() {
        let results = ExecutionResults::new(vec![
            TaskResult::start("a:build").completed(0, String::new(), String::new())
        ]);
        assert!(results.success());
        assert_eq!(results.exit_code(), 0);
    }

    #[test]
    fn test_exit_code_timeout_primary() {
        let results = ExecutionResults::new(vec![
            TaskResult::start("a:build").failed(
                Some(TIMEOUT_EXIT_CODE),
                "timed out",
                String::new(),
                String::new(),
            ),
            TaskResult::start("b:build").failed(Some(1), "exit 1", String::new(), String::new()),
        ]);
        assert_eq!(results.exit_code(), TIMEOUT_EXIT_CODE);
    }

    #[test]
    fn test_empty_plan_is_success() {
        let results = ExecutionResults::new(Vec::new());
        assert!(results.success());
        assert_eq!(results.exit_code(), 0);
    }
}
