//! Exit codes for the CLI

#![allow(dead_code)]

/// Success
pub const SUCCESS: i32 = 0;

/// One or more tasks failed
pub const TASK_FAILED: i32 = 1;

/// Configuration error
pub const CONFIG_ERROR: i32 = 2;

/// Graph error (cycles, unknown projects)
pub const GRAPH_ERROR: i32 = 3;

/// The primary failure was a task timeout
pub const TIMEOUT: i32 = 124;

/// User cancelled
pub const CANCELLED: i32 = 130;
