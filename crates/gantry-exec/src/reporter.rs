//! Task execution reporting

use std::time::Duration;

/// Events emitted during plan execution
#[derive(Debug, Clone)]
pub enum TaskEvent {
    /// An execution layer is starting
    LayerStarted { layer: usize, task_count: usize },
    /// A task is starting execution
    TaskStarted { id: String, command: String },
    /// A task produced a line of output
    Output {
        id: String,
        line: String,
        is_stderr: bool,
    },
    /// A task finished successfully
    TaskCompleted {
        id: String,
        duration: Duration,
        from_cache: bool,
    },
    /// A task failed
    TaskFailed {
        id: String,
        duration: Duration,
        reason: String,
    },
    /// A task was skipped
    TaskSkipped { id: String, reason: String },
    /// The whole plan finished
    Finished {
        total: usize,
        completed: usize,
        cached: usize,
        failed: usize,
        skipped: usize,
        duration: Duration,
    },
}

/// Trait for reporting task execution progress
pub trait TaskReporter: Send + Sync {
    /// Handle a task event
    fn report(&self, event: &TaskEvent);
}

/// Reporter that logs to tracing
#[derive(Debug, Default)]
pub struct TracingReporter;

impl TaskReporter for TracingReporter {
    fn report(&self, event: &TaskEvent) {
        match event {
            TaskEvent::LayerStarted { layer, task_count } => {
                tracing::info!("Starting layer {} ({} tasks)", layer, task_count);
            }
            TaskEvent::TaskStarted { id, command } => {
                tracing::info!("Starting {}: {}", id, command);
            }
            TaskEvent::Output { id, line, is_stderr } => {
                if *is_stderr {
                    tracing::warn!("[{}] {}", id, line);
                } else {
                    tracing::debug!("[{}] {}", id, line);
                }
            }
            TaskEvent::TaskCompleted {
                id,
                duration,
                from_cache,
            } => {
                if *from_cache {
                    tracing::info!("{} completed (cached) in {:.1}s", id, duration.as_secs_f64());
                } else {
                    tracing::info!("{} completed in {:.1}s", id, duration.as_secs_f64());
                }
            }
            TaskEvent::TaskFailed { id, duration, reason } => {
                tracing::error!("{} failed after {:.1}s: {}", id, duration.as_secs_f64(), reason);
            }
            TaskEvent::TaskSkipped { id, reason } => {
                tracing::info!("{} skipped: {}", id, reason);
            }
            TaskEvent::Finished {
                total,
                completed,
                cached,
                failed,
                skipped,
                duration,
            } => {
                tracing::info!(
                    "Done: {}/{} completed, {} cached, {} failed, {} skipped ({:.1}s)",
                    completed,
                    total,
                    cached,
                    failed,
                    skipped,
                    duration.as_secs_f64()
                );
            }
        }
    }
}

/// Reporter that collects events for later inspection (used in tests)
#[derive(Debug, Default)]
pub struct CollectingReporter {
    events: std::sync::Mutex<Vec<TaskEvent>>,
}

impl CollectingReporter {
    /// All collected events
    pub fn events(&self) -> Vec<TaskEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl TaskReporter for CollectingReporter {
    fn report(&self, event: &TaskEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}
