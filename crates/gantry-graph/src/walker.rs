//! Workspace file walking

use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use tracing::debug;
use walkdir::WalkDir;

use gantry_core::config::{default_excluded_dirs, WorkspaceConfig};
use gantry_core::error::{ConfigError, Result};

/// Walks the workspace once and answers per-plugin file claims.
pub struct WorkspaceWalker {
    root: PathBuf,
    excluded: Vec<String>,
}

impl WorkspaceWalker {
    /// Create a walker for a workspace root
    pub fn new(root: impl Into<PathBuf>, config: &WorkspaceConfig) -> Self {
        let mut excluded: Vec<String> = default_excluded_dirs()
            .iter()
            .map(|s| s.to_string())
            .collect();
        excluded.extend(config.exclude.iter().cloned());
        Self {
            root: root.into(),
            excluded,
        }
    }

    /// Collect every file in the workspace, pruning excluded directories
    /// before descent. Paths are absolute and sorted.
    pub fn collect_files(&self) -> Vec<PathBuf> {
        let excluded = &self.excluded;
        let mut files: Vec<PathBuf> = WalkDir::new(&self.root)
            .follow_links(false)
            .into_iter()
            .filter_entry(|entry| {
                if entry.depth() == 0 || !entry.file_type().is_dir() {
                    return true;
                }
                let name = entry.file_name().to_string_lossy();
                !excluded.iter().any(|ex| ex.as_str() == name)
            })
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .collect();
        files.sort();
        debug!(count = files.len(), root = %self.root.display(), "collected workspace files");
        files
    }

    /// Files from a collected set matching a plugin's claim pattern
    pub fn claim(&self, files: &[PathBuf], pattern: &str) -> Result<Vec<PathBuf>> {
        let set = compile_pattern(pattern)?;
        Ok(files
            .iter()
            .filter(|path| {
                let relative = path.strip_prefix(&self.root).unwrap_or(path);
                set.is_match(relative)
            })
            .cloned()
            .collect())
    }

    /// The workspace root
    pub fn root(&self) -> &Path {
        &self.root
    }
}

fn compile_pattern(pattern: &str) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    let glob = Glob::new(pattern).map_err(|e| ConfigError::InvalidValue {
        field: "plugin.filePattern".to_string(),
        message: e.to_string(),
    })?;
    builder.add(glob);
    // `**/x` should also claim a top-level `x`
    if let Some(basename) = pattern.strip_prefix("**/") {
        let top = Glob::new(basename).map_err(|e| ConfigError::InvalidValue {
            field: "plugin.filePattern".to_string(),
            message: e.to_string(),
        })?;
        builder.add(top);
    }
    builder.build().map_err(|e| {
        ConfigError::InvalidValue {
            field: "plugin.filePattern".to_string(),
            message: e.to_string(),
        }
        .into()
    })
}
