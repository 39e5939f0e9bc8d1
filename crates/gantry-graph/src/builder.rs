//! Project graph builder
//!
//! Orchestrates discovery: walks the workspace, invokes each plugin's
//! `create_nodes` and `create_dependencies`, merges and validates the
//! results, and overlays explicit workspace-configured dependencies.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, info, warn};

use gantry_core::config::WorkspaceConfig;
use gantry_core::error::{ConfigError, Result};
use gantry_core::model::{
    DependencyEdge, ProjectConfiguration, ProjectType, TargetConfiguration,
};
use gantry_inference::{DependencyContext, InferenceRegistry, NodeContext, RegisteredPlugin};

use crate::graph::ProjectGraph;
use crate::walker::WorkspaceWalker;

/// Executors the runtime knows how to drive
const KNOWN_EXECUTORS: &[&str] = &["gantry:run-commands"];

/// Result of a graph build: the graph plus recovered-from warnings
#[derive(Debug)]
pub struct GraphBuild {
    /// The immutable project graph
    pub graph: ProjectGraph,
    /// Non-fatal problems encountered during discovery
    pub warnings: Vec<String>,
}

/// Optional per-project override file (`project.json` in the project root)
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ProjectOverride {
    project_type: Option<ProjectType>,
    source_root: Option<PathBuf>,
    tags: BTreeSet<String>,
    targets: BTreeMap<String, TargetConfiguration>,
}

/// Builds a [`ProjectGraph`] for a workspace
pub struct ProjectGraphBuilder {
    workspace_root: PathBuf,
    config: WorkspaceConfig,
    registry: InferenceRegistry,
}

impl ProjectGraphBuilder {
    /// Create a builder for a workspace root
    pub fn new(
        workspace_root: impl Into<PathBuf>,
        config: WorkspaceConfig,
        registry: InferenceRegistry,
    ) -> Self {
        Self {
            workspace_root: workspace_root.into(),
            config,
            registry,
        }
    }

    /// Run discovery and produce the graph.
    ///
    /// A crashing plugin loses only its own contribution; a zero-project
    /// workspace is a valid empty graph. Name collisions across different
    /// roots are configuration errors.
    pub fn build(&self) -> Result<GraphBuild> {
        let walker = WorkspaceWalker::new(&self.workspace_root, &self.config);
        let files = walker.collect_files();

        let mut warnings = Vec::new();
        let mut projects: BTreeMap<String, ProjectConfiguration> = BTreeMap::new();
        let mut claims: Vec<(RegisteredPlugin, Vec<PathBuf>)> = Vec::new();

        let node_ctx =
            NodeContext::new(&self.workspace_root).with_config(self.config.clone());

        for registered in self.registry.all() {
            let claimed = walker.claim(&files, registered.plugin.file_pattern())?;
            debug!(
                plugin = registered.plugin.name(),
                files = claimed.len(),
                "running create_nodes"
            );

            match registered
                .plugin
                .create_nodes(&claimed, &registered.options, &node_ctx)
            {
                Ok(result) => {
                    for warning in result.warnings {
                        warnings.push(format!("[{}] {}", registered.plugin.name(), warning));
                    }
                    for (name, project) in result.projects {
                        self.merge_project(&mut projects, name, project, &mut warnings)?;
                    }
                }
                Err(e) => {
                    warn!(plugin = registered.plugin.name(), error = %e, "plugin failed");
                    warnings.push(format!(
                        "plugin '{}' contributed nothing: {}",
                        registered.plugin.name(),
                        e
                    ));
                }
            }
            claims.push((registered.clone(), claimed));
        }

        self.apply_target_layers(&mut projects, &mut warnings);
        self.validate_executors(&mut projects, &mut warnings);

        let mut edges: Vec<DependencyEdge> = Vec::new();
        for (registered, claimed) in &claims {
            let dep_ctx = DependencyContext {
                workspace_root: &self.workspace_root,
                files: claimed,
                projects: &projects,
            };
            match registered
                .plugin
                .create_dependencies(&registered.options, &dep_ctx)
            {
                Ok(plugin_edges) => edges.extend(plugin_edges),
                Err(e) => {
                    warn!(plugin = registered.plugin.name(), error = %e, "dependency inference failed");
                    warnings.push(format!(
                        "plugin '{}' contributed no dependencies: {}",
                        registered.plugin.name(),
                        e
                    ));
                }
            }
        }

        for (source, targets) in &self.config.implicit_dependencies {
            for target in targets {
                edges.push(DependencyEdge::implicit(source, target));
            }
        }

        let edges = Self::clean_edges(edges, &projects, &mut warnings);

        info!(
            projects = projects.len(),
            edges = edges.len(),
            warnings = warnings.len(),
            "project graph built"
        );

        Ok(GraphBuild {
            graph: ProjectGraph::new(projects, edges),
            warnings,
        })
    }

    /// Merge a plugin-contributed project into the map. The first plugin to
    /// claim a root owns the metadata; later contributions for the same
    /// name+root add targets (last writer wins per target name, warned).
    /// The same name at a different root is rejected.
    fn merge_project(
        &self,
        projects: &mut BTreeMap<String, ProjectConfiguration>,
        name: String,
        incoming: ProjectConfiguration,
        warnings: &mut Vec<String>,
    ) -> Result<()> {
        if let Some(existing) = projects.get_mut(&name) {
            if existing.root != incoming.root {
                return Err(ConfigError::DuplicateProject {
                    name,
                    existing: existing.root.clone(),
                    conflicting: incoming.root,
                }
                .into());
            }
            for (target_name, target) in incoming.targets {
                if existing.targets.contains_key(&target_name) {
                    warnings.push(format!(
                        "target '{}:{}' defined by multiple plugins; keeping the last definition",
                        name, target_name
                    ));
                }
                existing.targets.insert(target_name, target);
            }
            return Ok(());
        }
        projects.insert(name, incoming);
        Ok(())
    }

    /// Layer target configuration: workspace `targetDefaults` underneath
    /// the plugin-inferred targets, `project.json` overrides on top.
    /// Input entries naming a `namedInputs` set expand into its globs.
    fn apply_target_layers(
        &self,
        projects: &mut BTreeMap<String, ProjectConfiguration>,
        warnings: &mut Vec<String>,
    ) {
        for project in projects.values_mut() {
            for (target_name, target) in project.targets.iter_mut() {
                if let Some(default) = self.config.target_defaults.get(target_name) {
                    *target = target.merged_over(default);
                }
            }

            self.apply_project_override(project, warnings);

            for target in project.targets.values_mut() {
                target.inputs = self.expand_named_inputs(&target.inputs);
            }
        }
    }

    fn apply_project_override(
        &self,
        project: &mut ProjectConfiguration,
        warnings: &mut Vec<String>,
    ) {
        let override_path = self.workspace_root.join(&project.root).join("project.json");
        if !override_path.exists() {
            return;
        }
        let overrides = match std::fs::read_to_string(&override_path)
            .map_err(|e| e.to_string())
            .and_then(|c| serde_json::from_str::<ProjectOverride>(&c).map_err(|e| e.to_string()))
        {
            Ok(overrides) => overrides,
            Err(e) => {
                warnings.push(format!(
                    "ignored invalid override file {}: {}",
                    override_path.display(),
                    e
                ));
                return;
            }
        };

        if let Some(project_type) = overrides.project_type {
            project.project_type = project_type;
        }
        if let Some(source_root) = overrides.source_root {
            project.source_root = Some(source_root);
        }
        project.tags.extend(overrides.tags);
        for (target_name, override_target) in overrides.targets {
            let merged = match project.targets.get(&target_name) {
                Some(inferred) => override_target.merged_over(inferred),
                None => override_target,
            };
            project.targets.insert(target_name, merged);
        }
    }

    /// Replace input entries that exactly name a `namedInputs` set with
    /// that set's globs
    fn expand_named_inputs(&self, inputs: &[String]) -> Vec<String> {
        let mut expanded = Vec::with_capacity(inputs.len());
        for input in inputs {
            match self.config.named_inputs.get(input) {
                Some(globs) => expanded.extend(globs.iter().cloned()),
                None => expanded.push(input.clone()),
            }
        }
        expanded
    }

    /// Drop projects whose targets fail their executor's schema
    fn validate_executors(
        &self,
        projects: &mut BTreeMap<String, ProjectConfiguration>,
        warnings: &mut Vec<String>,
    ) {
        let mut rejected: Vec<String> = Vec::new();
        for (name, project) in projects.iter() {
            for (target_name, target) in &project.targets {
                if !KNOWN_EXECUTORS.contains(&target.executor.as_str()) {
                    warnings.push(format!(
                        "project '{}' rejected: target '{}' uses unknown executor '{}'",
                        name, target_name, target.executor
                    ));
                    rejected.push(name.clone());
                    break;
                }
                if target.executor == "gantry:run-commands" && target.options.commands.is_empty() {
                    warnings.push(format!(
                        "project '{}' rejected: target '{}' has no commands",
                        name, target_name
                    ));
                    rejected.push(name.clone());
                    break;
                }
            }
        }
        for name in rejected {
            projects.remove(&name);
        }
    }

    /// Deduplicate edges and drop self-loops and dangling endpoints
    fn clean_edges(
        edges: Vec<DependencyEdge>,
        projects: &BTreeMap<String, ProjectConfiguration>,
        warnings: &mut Vec<String>,
    ) -> Vec<DependencyEdge> {
        let mut seen: HashSet<(String, String, gantry_core::model::DependencyType)> =
            HashSet::new();
        let mut kept = Vec::new();

        for edge in edges {
            if edge.source == edge.target {
                warnings.push(format!("dropped self-loop on '{}'", edge.source));
                continue;
            }
            if !projects.contains_key(&edge.source) || !projects.contains_key(&edge.target) {
                warnings.push(format!(
                    "dropped dangling edge {} -> {}",
                    edge.source, edge.target
                ));
                continue;
            }
            if seen.insert((edge.source.clone(), edge.target.clone(), edge.dep_type)) {
                kept.push(edge);
            }
        }
        kept
    }

    /// The workspace root this builder walks
    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(root: &Path, relative: &str, content: &str) {
        let path = root.join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    fn js_workspace(temp: &TempDir) {
        write(
            temp.path(),
            "packages/utils/package.json",
            r#"{"name": "utils", "version": "1.0.0", "scripts": {"build": "tsc"}}"#,
        );
        write(
            temp.path(),
            "packages/ui/package.json",
            r#"{"name": "ui", "version": "1.0.0", "scripts": {"build": "tsc"},
                "dependencies": {"utils": "workspace:*"}}"#,
        );
        write(
            temp.path(),
            "packages/web/package.json",
            r#"{"name": "web", "version": "1.0.0", "scripts": {"build": "vite build"},
                "dependencies": {"ui": "workspace:*"}}"#,
        );
    }

    fn build(temp: &TempDir, config: WorkspaceConfig) -> GraphBuild {
        let registry = InferenceRegistry::from_config(&config).unwrap();
        ProjectGraphBuilder::new(temp.path(), config, registry)
            .build()
            .unwrap()
    }

    #[test]
    fn test_build_js_workspace() {
        let temp = TempDir::new().unwrap();
        js_workspace(&temp);

        let result = build(&temp, WorkspaceConfig::default());
        let graph = &result.graph;

        assert_eq!(graph.len(), 3);
        assert_eq!(graph.dependencies("web"), &["ui"]);
        assert_eq!(graph.dependencies("ui"), &["utils"]);
        assert!(graph.project("web").unwrap().targets.contains_key("build"));
    }

    #[test]
    fn test_empty_workspace_is_not_an_error() {
        let temp = TempDir::new().unwrap();
        let result = build(&temp, WorkspaceConfig::default());
        assert!(result.graph.is_empty());
    }

    #[test]
    fn test_broken_manifest_surfaces_warning() {
        let temp = TempDir::new().unwrap();
        js_workspace(&temp);
        write(temp.path(), "packages/broken/package.json", "{ nope");

        let result = build(&temp, WorkspaceConfig::default());
        assert_eq!(result.graph.len(), 3);
        assert!(result.warnings.iter().any(|w| w.contains("broken")));
    }

    #[test]
    fn test_duplicate_name_different_root_rejected() {
        let temp = TempDir::new().unwrap();
        write(
            temp.path(),
            "a/package.json",
            r#"{"name": "dup", "version": "1.0.0", "scripts": {"build": "tsc"}}"#,
        );
        write(
            temp.path(),
            "b/package.json",
            r#"{"name": "dup", "version": "1.0.0", "scripts": {"build": "tsc"}}"#,
        );

        let config = WorkspaceConfig::default();
        let registry = InferenceRegistry::from_config(&config).unwrap();
        let err = ProjectGraphBuilder::new(temp.path(), config, registry)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("dup"));
    }

    #[test]
    fn test_multiple_plugins_contribute_targets_to_one_root() {
        let temp = TempDir::new().unwrap();
        // A Go module and a Dockerfile sharing the svc/ root: whoever runs
        // first owns metadata, the other adds targets.
        write(temp.path(), "svc/go.mod", "module example.com/svc\n");
        write(temp.path(), "svc/Dockerfile", "FROM alpine\n");

        let result = build(&temp, WorkspaceConfig::default());
        let svc = result.graph.project("svc").unwrap();

        assert!(svc.targets.contains_key("build"));
        assert!(svc.targets.contains_key("docker-build"));
        assert!(svc.tags.contains("go"));
    }

    #[test]
    fn test_target_defaults_fill_unset_fields() {
        let temp = TempDir::new().unwrap();
        js_workspace(&temp);

        let mut config = WorkspaceConfig::default();
        config.target_defaults.insert(
            "build".to_string(),
            TargetConfiguration {
                inputs: vec!["src/**/*".to_string()],
                ..Default::default()
            },
        );

        let result = build(&temp, config);
        let build_target = &result.graph.project("web").unwrap().targets["build"];
        assert_eq!(build_target.inputs, vec!["src/**/*"]);
        // Plugin-inferred command survives above the default
        assert_eq!(build_target.options.commands, vec!["npm run build"]);
    }

    #[test]
    fn test_named_inputs_expand_in_targets() {
        let temp = TempDir::new().unwrap();
        js_workspace(&temp);

        let mut config = WorkspaceConfig::default();
        config.named_inputs.insert(
            "production".to_string(),
            vec!["src/**/*".to_string(), "!src/**/*.spec.ts".to_string()],
        );
        config.target_defaults.insert(
            "build".to_string(),
            TargetConfiguration {
                inputs: vec!["production".to_string()],
                ..Default::default()
            },
        );

        let result = build(&temp, config);
        let build_target = &result.graph.project("ui").unwrap().targets["build"];
        assert_eq!(
            build_target.inputs,
            vec!["src/**/*", "!src/**/*.spec.ts"]
        );
    }

    #[test]
    fn test_project_override_wins_over_inferred() {
        let temp = TempDir::new().unwrap();
        js_workspace(&temp);
        write(
            temp.path(),
            "packages/web/project.json",
            r#"{
                "tags": ["frontend"],
                "targets": {
                    "build": { "executor": "gantry:run-commands",
                               "options": { "commands": ["vite build --mode prod"] } }
                }
            }"#,
        );

        let result = build(&temp, WorkspaceConfig::default());
        let web = result.graph.project("web").unwrap();
        assert!(web.tags.contains("frontend"));
        assert_eq!(
            web.targets["build"].options.commands,
            vec!["vite build --mode prod"]
        );
        // Inferred dependsOn survives underneath the override
        assert_eq!(web.targets["build"].depends_on, vec!["^build"]);
    }

    #[test]
    fn test_unknown_executor_rejects_project() {
        let temp = TempDir::new().unwrap();
        js_workspace(&temp);
        write(
            temp.path(),
            "packages/web/project.json",
            r#"{"targets": {"deploy": {"executor": "acme:deploy", "options": {"commands": ["x"]}}}}"#,
        );

        let result = build(&temp, WorkspaceConfig::default());
        assert!(result.graph.project("web").is_none());
        assert!(result
            .warnings
            .iter()
            .any(|w| w.contains("unknown executor")));
        // Edges to the rejected project are dropped, not dangling
        for edge in result.graph.edges() {
            assert_ne!(edge.source, "web");
        }
    }

    #[test]
    fn test_implicit_dependencies_overlay() {
        let temp = TempDir::new().unwrap();
        js_workspace(&temp);

        let mut config = WorkspaceConfig::default();
        config
            .implicit_dependencies
            .insert("utils".to_string(), vec!["web".to_string()]);

        let result = build(&temp, config);
        assert!(result
            .graph
            .edges()
            .iter()
            .any(|e| e.source == "utils"
                && e.target == "web"
                && e.dep_type == gantry_core::model::DependencyType::Implicit));
    }

    #[test]
    fn test_dangling_implicit_dependency_dropped() {
        let temp = TempDir::new().unwrap();
        js_workspace(&temp);

        let mut config = WorkspaceConfig::default();
        config
            .implicit_dependencies
            .insert("web".to_string(), vec!["ghost".to_string()]);

        let result = build(&temp, config);
        assert!(result.warnings.iter().any(|w| w.contains("dangling")));
        assert!(!result.graph.edges().iter().any(|e| e.target == "ghost"));
    }

    #[test]
    fn test_rebuild_is_structurally_equal() {
        let temp = TempDir::new().unwrap();
        js_workspace(&temp);

        let first = build(&temp, WorkspaceConfig::default());
        let second = build(&temp, WorkspaceConfig::default());

        let names_a: Vec<_> = first.graph.names().collect();
        let names_b: Vec<_> = second.graph.names().collect();
        assert_eq!(names_a, names_b);

        let mut edges_a: Vec<_> = first
            .graph
            .edges()
            .iter()
            .map(|e| (e.source.clone(), e.target.clone(), e.dep_type))
            .collect();
        let mut edges_b: Vec<_> = second
            .graph
            .edges()
            .iter()
            .map(|e| (e.source.clone(), e.target.clone(), e.dep_type))
            .collect();
        edges_a.sort();
        edges_b.sort();
        assert_eq!(edges_a, edges_b);
    }
}
