//! Core data model: projects, targets, and dependency edges

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Kind of project discovered in the workspace
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectType {
    /// Deployable application
    Application,
    /// Shared library
    #[default]
    Library,
}

impl ProjectType {
    /// Get type as string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Application => "application",
            Self::Library => "library",
        }
    }
}

/// A project contributed by an inference plugin
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectConfiguration {
    /// Globally unique project name
    pub name: String,

    /// Workspace-relative root directory
    pub root: PathBuf,

    /// Source root, defaults to the project root
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_root: Option<PathBuf>,

    /// Application or library
    #[serde(default)]
    pub project_type: ProjectType,

    /// Opaque classification tags
    #[serde(default)]
    pub tags: BTreeSet<String>,

    /// Targets keyed by name
    #[serde(default)]
    pub targets: BTreeMap<String, TargetConfiguration>,
}

impl ProjectConfiguration {
    /// Create a project with a name and root
    pub fn new(name: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            root: root.into(),
            ..Default::default()
        }
    }

    /// Set the project type
    pub fn with_type(mut self, project_type: ProjectType) -> Self {
        self.project_type = project_type;
        self
    }

    /// Add a tag
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    /// Add a target
    pub fn with_target(mut self, name: impl Into<String>, target: TargetConfiguration) -> Self {
        self.targets.insert(name.into(), target);
        self
    }

    /// Effective source root
    pub fn source_root(&self) -> &PathBuf {
        self.source_root.as_ref().unwrap_or(&self.root)
    }
}

/// Declarative description of a runnable unit within a project
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TargetConfiguration {
    /// Executor identifier (opaque; names the plugin that runs this target)
    pub executor: String,

    /// Executor options
    pub options: TargetOptions,

    /// Ordered dependsOn references (raw form; parsed once at task build)
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,

    /// Input glob patterns
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub inputs: Vec<String>,

    /// Output glob patterns
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub outputs: Vec<String>,

    /// Whether results of this target are cacheable
    #[serde(default = "default_cache")]
    pub cache: bool,

    /// Per-target remote execution override
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_execution: Option<TargetRemoteOverride>,
}

fn default_cache() -> bool {
    true
}

impl TargetConfiguration {
    /// Create a target for an executor
    pub fn new(executor: impl Into<String>) -> Self {
        Self {
            executor: executor.into(),
            cache: true,
            ..Default::default()
        }
    }

    /// Set the command list
    pub fn with_commands(mut self, commands: Vec<String>) -> Self {
        self.options.commands = commands;
        self
    }

    /// Add a dependsOn reference
    pub fn with_depends_on(mut self, dep: impl Into<String>) -> Self {
        self.depends_on.push(dep.into());
        self
    }

    /// Set output globs
    pub fn with_outputs(mut self, outputs: Vec<String>) -> Self {
        self.outputs = outputs;
        self
    }

    /// Set the cache flag
    pub fn with_cache(mut self, cache: bool) -> Self {
        self.cache = cache;
        self
    }

    /// Merge another target underneath this one: fields already set here
    /// win; unset fields fill from `base`.
    pub fn merged_over(&self, base: &TargetConfiguration) -> TargetConfiguration {
        let mut merged = self.clone();
        if merged.executor.is_empty() {
            merged.executor = base.executor.clone();
        }
        if merged.options.commands.is_empty() {
            merged.options.commands = base.options.commands.clone();
        }
        if merged.options.cwd.is_none() {
            merged.options.cwd = base.options.cwd.clone();
        }
        for (k, v) in &base.options.env {
            merged.options.env.entry(k.clone()).or_insert_with(|| v.clone());
        }
        if !merged.options.parallel {
            merged.options.parallel = base.options.parallel;
        }
        if merged.options.timeout_secs.is_none() {
            merged.options.timeout_secs = base.options.timeout_secs;
        }
        for (k, v) in &base.options.extra {
            merged.options.extra.entry(k.clone()).or_insert_with(|| v.clone());
        }
        if merged.depends_on.is_empty() {
            merged.depends_on = base.depends_on.clone();
        }
        if merged.inputs.is_empty() {
            merged.inputs = base.inputs.clone();
        }
        if merged.outputs.is_empty() {
            merged.outputs = base.outputs.clone();
        }
        if merged.remote_execution.is_none() {
            merged.remote_execution = base.remote_execution.clone();
        }
        merged
    }
}

/// Typed narrowing of the dynamic target options map. Unrecognized keys are
/// preserved for executor-specific schemas.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TargetOptions {
    /// Commands to run, in declared order
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub commands: Vec<String>,

    /// Working directory relative to the workspace root
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cwd: Option<String>,

    /// Environment variables added to the parent environment
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,

    /// Run commands concurrently instead of sequentially
    pub parallel: bool,

    /// Per-task timeout override in seconds
    #[serde(rename = "timeoutSeconds", skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,

    /// Passthrough for executor-specific keys
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// Per-target remote execution override
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TargetRemoteOverride {
    /// Opt this target out of remote execution when false
    pub enabled: Option<bool>,

    /// Named endpoint override
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// Platform property overrides
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub platform: BTreeMap<String, String>,
}

/// Origin of a dependency edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyType {
    /// Derived from manifest parsing
    Static,
    /// Discovered at runtime (reserved; never emitted by the pure layer)
    Dynamic,
    /// Declared in workspace configuration
    Implicit,
}

/// A directed edge between two projects
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyEdge {
    /// Depending project
    pub source: String,
    /// Depended-on project
    pub target: String,
    /// Edge origin
    pub dep_type: DependencyType,
    /// Manifest file the edge was derived from, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_file: Option<PathBuf>,
}

impl DependencyEdge {
    /// Create a STATIC edge
    pub fn stat(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            dep_type: DependencyType::Static,
            source_file: None,
        }
    }

    /// Create an IMPLICIT edge
    pub fn implicit(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            dep_type: DependencyType::Implicit,
            source_file: None,
        }
    }

    /// Attach the originating manifest path
    pub fn with_source_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.source_file = Some(path.into());
        self
    }
}

/// One parsed `dependsOn` reference.
///
/// The three syntactic shapes are parsed exactly once; resolution code works
/// on this enum and never re-parses strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DependsOnRef {
    /// `^target`: the same target in every direct project-graph dependency
    Upstream(String),
    /// `project:target` (with `self` already rewritten to the owner)
    Qualified { project: String, target: String },
    /// Bare `target`: another target of the same project
    Target(String),
}

impl DependsOnRef {
    /// Parse a dependsOn entry. `owner` is the project the entry belongs
    /// to; it resolves the `self:` shorthand.
    pub fn parse(raw: &str, owner: &str) -> Self {
        if let Some(target) = raw.strip_prefix('^') {
            return Self::Upstream(target.to_string());
        }
        if let Some((project, target)) = raw.split_once(':') {
            let project = if project == "self" { owner } else { project };
            return Self::Qualified {
                project: project.to_string(),
                target: target.to_string(),
            };
        }
        Self::Target(raw.to_string())
    }
}

impl fmt::Display for DependsOnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Upstream(t) => write!(f, "^{}", t),
            Self::Qualified { project, target } => write!(f, "{}:{}", project, target),
            Self::Target(t) => write!(f, "{}", t),
        }
    }
}
