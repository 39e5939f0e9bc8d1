//! Error types for Gantry

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using GantryError
pub type Result<T> = std::result::Result<T, GantryError>;

/// Main error type for Gantry operations
#[derive(Debug, Error)]
pub enum GantryError {
    /// Configuration-related errors
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Manifest inference errors
    #[error(transparent)]
    Inference(#[from] InferenceError),

    /// Project/task graph errors
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// Task execution errors
    #[error(transparent)]
    Execution(#[from] ExecutionError),

    /// Remote infrastructure errors
    #[error(transparent)]
    Infrastructure(#[from] InfrastructureError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

/// Configuration-related errors. Fatal; surfaced to the caller.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration file not found
    #[error("Configuration file not found at {0}")]
    NotFound(PathBuf),

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// Invalid configuration value
    #[error("Invalid configuration: {field} - {message}")]
    InvalidValue { field: String, message: String },

    /// Malformed plugin specifier
    #[error("Malformed plugin spec '{spec}': {reason}")]
    InvalidPluginSpec { spec: String, reason: String },

    /// Plugin could not be resolved to an implementation
    #[error("Unresolvable plugin: {0}")]
    UnresolvablePlugin(String),

    /// Executor options failed the executor's schema
    #[error("Invalid options for executor '{executor}' on {target}: {message}")]
    InvalidExecutorOptions {
        executor: String,
        target: String,
        message: String,
    },

    /// Two plugins produced the same project name with different roots
    #[error("Project '{name}' declared at both '{existing}' and '{conflicting}'")]
    DuplicateProject {
        name: String,
        existing: PathBuf,
        conflicting: PathBuf,
    },

    /// IO error
    #[error("IO error reading config: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Per-plugin/per-file inference failures. Recovered locally; the affected
/// file is skipped and a warning is surfaced.
#[derive(Debug, Error)]
pub enum InferenceError {
    /// A manifest file could not be read or parsed
    #[error("Failed to parse manifest {path}: {reason}")]
    ManifestParse { path: PathBuf, reason: String },

    /// A plugin failed wholesale
    #[error("Plugin '{plugin}' failed: {reason}")]
    PluginFailed { plugin: String, reason: String },

    /// An external plugin subprocess misbehaved
    #[error("External plugin '{plugin}' protocol error: {reason}")]
    ProtocolError { plugin: String, reason: String },

    /// IO error
    #[error("IO error during inference: {0}")]
    Io(#[from] std::io::Error),
}

/// Graph construction errors
#[derive(Debug, Error)]
pub enum GraphError {
    /// Cycle among projects that the requested tasks traverse
    #[error("Circular dependency among projects: {0}")]
    ProjectCycle(String),

    /// Cycle produced by dependsOn resolution
    #[error("Circular dependency among tasks: {0}")]
    TaskCycle(String),

    /// A requested project does not exist in the graph
    #[error("Unknown project: {0}")]
    UnknownProject(String),
}

/// Task execution errors. Attached to the offending task's result rather
/// than raised out of the executor.
#[derive(Debug, Error)]
pub enum ExecutionError {
    /// A task command exited non-zero
    #[error("Task '{task}' failed with exit code {code}")]
    NonZeroExit { task: String, code: i32 },

    /// A task exceeded its timeout
    #[error("Task '{task}' timed out after {seconds}s")]
    Timeout { task: String, seconds: u64 },

    /// Execution was cancelled
    #[error("Task '{task}' was cancelled")]
    Cancelled { task: String },

    /// Failed to spawn a task command
    #[error("Failed to spawn command for '{task}': {reason}")]
    SpawnFailed { task: String, reason: String },

    /// Remote transport failed beyond the retry budget
    #[error("Remote execution of '{task}' failed: {reason}")]
    RemoteFailed { task: String, reason: String },
}

/// Remote infrastructure errors. Retried; may degrade to local execution
/// when the configuration permits.
#[derive(Debug, Error)]
pub enum InfrastructureError {
    /// gRPC channel could not be established
    #[error("Cannot connect to remote endpoint '{endpoint}': {reason}")]
    ConnectFailed { endpoint: String, reason: String },

    /// CAS or ActionCache unavailable after retries
    #[error("Remote cache unavailable: {0}")]
    CacheUnavailable(String),

    /// The execution service rejected or lost the operation
    #[error("Execution service error: {0}")]
    ExecutionService(String),
}

impl GantryError {
    /// Create a new "other" error with a message
    pub fn other<S: Into<String>>(msg: S) -> Self {
        Self::Other(msg.into())
    }
}
