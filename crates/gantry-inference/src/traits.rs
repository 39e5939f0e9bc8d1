//! Inference plugin trait

use std::collections::BTreeMap;
use std::path::PathBuf;

use gantry_core::error::{ConfigError, InferenceError};
use gantry_core::model::{DependencyEdge, ProjectConfiguration};

use crate::context::{DependencyContext, NodeContext};

/// Outcome of a `create_nodes` pass.
///
/// Per-file failures do not abort inference: the plugin skips the file,
/// records a warning here, and keeps going.
#[derive(Debug, Default)]
pub struct CreateNodesResult {
    /// Contributed projects keyed by name
    pub projects: BTreeMap<String, ProjectConfiguration>,
    /// Warnings for skipped files
    pub warnings: Vec<String>,
}

impl CreateNodesResult {
    /// Record a skipped file
    pub fn skip(&mut self, path: &std::path::Path, reason: impl std::fmt::Display) {
        self.warnings
            .push(format!("skipped {}: {}", path.display(), reason));
    }
}

/// Trait for manifest inference plugins.
///
/// Implementations are pure over the manifest content plus an options bag;
/// they must not perform network I/O.
pub trait InferencePlugin: Send + Sync {
    /// Stable plugin identifier (e.g. "maven")
    fn name(&self) -> &str;

    /// Glob pattern for the manifest files this plugin claims
    fn file_pattern(&self) -> &str;

    /// Default options merged underneath configured options
    fn default_options(&self) -> serde_json::Value {
        serde_json::Value::Null
    }

    /// Validate the options bag against this plugin's schema
    fn validate_options(&self, _options: &serde_json::Value) -> Result<(), ConfigError> {
        Ok(())
    }

    /// Infer projects from the claimed manifest files
    fn create_nodes(
        &self,
        files: &[PathBuf],
        options: &serde_json::Value,
        ctx: &NodeContext,
    ) -> Result<CreateNodesResult, InferenceError>;

    /// Infer cross-project edges against the merged project snapshot.
    ///
    /// A plugin emits an edge only when both endpoints are projects known
    /// in the snapshot.
    fn create_dependencies(
        &self,
        options: &serde_json::Value,
        ctx: &DependencyContext,
    ) -> Result<Vec<DependencyEdge>, InferenceError>;
}
