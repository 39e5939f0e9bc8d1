//! Gantry Exec - Task execution
//!
//! Runs an execution plan layer by layer: a local subprocess executor and a
//! Remote Execution API v2 client with ActionCache lookup and CAS upload.

pub mod executor;
pub mod local;
pub mod remote;
pub mod reporter;
pub mod result;

pub use executor::{ExecutorOptions, TaskExecutor};
pub use local::LocalExecutor;
pub use remote::RemoteExecutor;
pub use reporter::{CollectingReporter, TaskEvent, TaskReporter, TracingReporter};
pub use result::{ExecutionResults, TaskResult, TaskStatus};
