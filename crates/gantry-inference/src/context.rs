//! Inference contexts

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use gantry_core::config::WorkspaceConfig;
use gantry_core::model::ProjectConfiguration;

/// Context handed to `create_nodes`
#[derive(Debug, Clone)]
pub struct NodeContext {
    /// Absolute workspace root
    pub workspace_root: PathBuf,
    /// Workspace configuration
    pub config: WorkspaceConfig,
}

impl NodeContext {
    /// Create a context for a workspace root with default configuration
    pub fn new(workspace_root: impl Into<PathBuf>) -> Self {
        Self {
            workspace_root: workspace_root.into(),
            config: WorkspaceConfig::default(),
        }
    }

    /// Attach a workspace configuration
    pub fn with_config(mut self, config: WorkspaceConfig) -> Self {
        self.config = config;
        self
    }

    /// Workspace-relative form of a manifest path
    pub fn relative(&self, path: &Path) -> PathBuf {
        path.strip_prefix(&self.workspace_root)
            .unwrap_or(path)
            .to_path_buf()
    }
}

/// Context handed to `create_dependencies`: the merged project snapshot
/// plus the plugin's claimed files.
#[derive(Debug)]
pub struct DependencyContext<'a> {
    /// Absolute workspace root
    pub workspace_root: &'a Path,
    /// Manifest files this plugin claimed during node creation
    pub files: &'a [PathBuf],
    /// Merged workspace project snapshot keyed by name
    pub projects: &'a BTreeMap<String, ProjectConfiguration>,
}

impl<'a> DependencyContext<'a> {
    /// Look up the project owning a workspace-relative root, if any
    pub fn project_at_root(&self, root: &Path) -> Option<&'a ProjectConfiguration> {
        self.projects.values().find(|p| p.root == root)
    }

    /// Find the project carrying a given tag
    pub fn project_with_tag(&self, tag: &str) -> Option<&'a ProjectConfiguration> {
        self.projects.values().find(|p| p.tags.contains(tag))
    }
}
