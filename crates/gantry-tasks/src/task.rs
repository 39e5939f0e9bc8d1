//! Task types

use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use gantry_core::model::{DependsOnRef, ProjectConfiguration, TargetConfiguration};

use crate::hash::structural_hash;

/// Unique identifier for a task within the workspace
#[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TaskId {
    /// Project name
    pub project: String,
    /// Target name (e.g. "build", "test", "docker-build")
    pub target: String,
}

impl TaskId {
    /// Create a new task ID
    pub fn new(project: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            target: target.into(),
        }
    }

    /// Parse a task ID from "project:target" format
    pub fn parse(s: &str) -> Option<Self> {
        let (project, target) = s.split_once(':')?;
        if project.is_empty() || target.is_empty() {
            return None;
        }
        Some(Self::new(project, target))
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.project, self.target)
    }
}

/// A (project, target) pair with a resolved target configuration and a
/// deterministic structural hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Task identifier
    pub id: TaskId,
    /// Resolved target configuration
    pub target: TargetConfiguration,
    /// dependsOn references, parsed once
    pub depends_on: Vec<DependsOnRef>,
    /// Workspace-relative project root
    pub project_root: PathBuf,
    /// Project tags at materialization time
    pub project_tags: BTreeSet<String>,
    /// Structural content hash (stable across machines and invocations)
    pub hash: String,
}

impl Task {
    /// Materialize a task for a project's target
    pub fn new(project: &ProjectConfiguration, target_name: &str, target: &TargetConfiguration) -> Self {
        let id = TaskId::new(&project.name, target_name);
        let depends_on = target
            .depends_on
            .iter()
            .map(|raw| DependsOnRef::parse(raw, &project.name))
            .collect();
        let hash = structural_hash(&id, target, project);

        Self {
            id,
            target: target.clone(),
            depends_on,
            project_root: project.root.clone(),
            project_tags: project.tags.clone(),
            hash,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gantry_core::model::TargetConfiguration;

    #[test]
    fn test_task_id_display() {
        let id = TaskId::new("utils", "build");
        assert_eq!(id.to_string(), "utils:build");
    }

    #[test]
    fn test_task_id_parse() {
        let id = TaskId::parse("utils:build").unwrap();
        assert_eq!(id.project, "utils");
        assert_eq!(id.target, "build");
    }

    #[test]
    fn test_task_id_parse_invalid() {
        assert!(TaskId::parse("nobuild").is_none());
        assert!(TaskId::parse(":build").is_none());
        assert!(TaskId::parse("utils:").is_none());
    }

    #[test]
    fn test_task_parses_depends_on_once() {
        let target = TargetConfiguration::new("gantry:run-commands")
            .with_commands(vec!["npm run test".to_string()])
            .with_depends_on("^build")
            .with_depends_on("self:lint");
        let project = ProjectConfiguration::new("web", "packages/web");

        let task = Task::new(&project, "test", &target);
        assert_eq!(task.depends_on.len(), 2);
        assert_eq!(task.depends_on[0], DependsOnRef::Upstream("build".to_string()));
        assert_eq!(
            task.depends_on[1],
            DependsOnRef::Qualified {
                project: "web".to_string(),
                target: "lint".to_string(),
            }
        );
        assert!(!task.hash.is_empty());
    }
}
