//! Go inference plugin
//!
//! Claims `go.mod` files. Projects are named after the module basename and
//! carry the full module path as a tag; edges come from `require` paths
//! matching other workspace modules.

mod gomod;

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;
use tracing::debug;

use gantry_core::error::{ConfigError, InferenceError};
use gantry_core::model::{
    DependencyEdge, ProjectConfiguration, ProjectType, TargetConfiguration,
};

use crate::context::{DependencyContext, NodeContext};
use crate::traits::{CreateNodesResult, InferencePlugin};

pub use gomod::{GoMod, GoReplace, GoRequire};

/// Options for the Go plugin
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GoOptions {
    /// Only module paths starting with one of these prefixes are
    /// considered workspace-internal. Empty means any match counts.
    pub internal_module_prefixes: Vec<String>,
}

impl GoOptions {
    fn narrow(options: &serde_json::Value) -> Result<Self, String> {
        if options.is_null() {
            return Ok(Self::default());
        }
        serde_json::from_value(options.clone()).map_err(|e| e.to_string())
    }

    fn is_internal(&self, module_path: &str) -> bool {
        self.internal_module_prefixes.is_empty()
            || self
                .internal_module_prefixes
                .iter()
                .any(|prefix| module_path.starts_with(prefix.as_str()))
    }
}

fn module_tag(module_path: &str) -> String {
    format!("go:{}", module_path)
}

/// Go inference plugin
pub struct GoPlugin;

impl GoPlugin {
    /// Create a new Go plugin
    pub fn new() -> Self {
        Self
    }

    fn infer_project(
        &self,
        manifest_path: &std::path::Path,
        ctx: &NodeContext,
    ) -> Result<ProjectConfiguration, InferenceError> {
        let gomod = GoMod::load(manifest_path)?;
        let root = ctx.relative(manifest_path.parent().unwrap_or(manifest_path));

        // cmd/ layout marks a binary module
        let has_main = manifest_path
            .parent()
            .map(|dir| dir.join("main.go").exists() || dir.join("cmd").is_dir())
            .unwrap_or(false);
        let project_type = if has_main {
            ProjectType::Application
        } else {
            ProjectType::Library
        };

        let build = TargetConfiguration::new("gantry:run-commands")
            .with_commands(vec!["go build ./...".to_string()])
            .with_depends_on("^build");
        let test = TargetConfiguration::new("gantry:run-commands")
            .with_commands(vec!["go test ./...".to_string()]);

        Ok(
            ProjectConfiguration::new(gomod.module_basename(), root)
                .with_type(project_type)
                .with_tag("go")
                .with_tag(module_tag(&gomod.module))
                .with_target("build", build)
                .with_target("test", test),
        )
    }
}

impl Default for GoPlugin {
    fn default() -> Self {
        Self::new()
    }
}

impl InferencePlugin for GoPlugin {
    fn name(&self) -> &str {
        "go"
    }

    fn file_pattern(&self) -> &str {
        "**/go.mod"
    }

    fn validate_options(&self, options: &serde_json::Value) -> Result<(), ConfigError> {
        GoOptions::narrow(options).map(|_| ()).map_err(|message| {
            ConfigError::InvalidValue {
                field: "plugins.go.options".to_string(),
                message,
            }
        })
    }

    fn create_nodes(
        &self,
        files: &[PathBuf],
        _options: &serde_json::Value,
        ctx: &NodeContext,
    ) -> Result<CreateNodesResult, InferenceError> {
        let mut result = CreateNodesResult::default();
        for file in files {
            match self.infer_project(file, ctx) {
                Ok(project) => {
                    debug!(plugin = "go", project = %project.name, "inferred project");
                    result.projects.insert(project.name.clone(), project);
                }
                Err(e) => result.skip(file, e),
            }
        }
        Ok(result)
    }

    fn create_dependencies(
        &self,
        options: &serde_json::Value,
        ctx: &DependencyContext,
    ) -> Result<Vec<DependencyEdge>, InferenceError> {
        let options = GoOptions::narrow(options).map_err(|reason| {
            InferenceError::PluginFailed {
                plugin: self.name().to_string(),
                reason,
            }
        })?;

        // Index workspace modules by their full module paths.
        let mut by_module: BTreeMap<String, &str> = BTreeMap::new();
        for project in ctx.projects.values() {
            for tag in &project.tags {
                if let Some(path) = tag.strip_prefix("go:") {
                    by_module.insert(path.to_string(), project.name.as_str());
                }
            }
        }

        let mut edges = Vec::new();
        for file in ctx.files {
            let Ok(gomod) = GoMod::load(file) else {
                continue;
            };
            let source = gomod.module_basename().to_string();
            if !ctx.projects.contains_key(&source) {
                continue;
            }

            for req in &gomod.require {
                if req.indirect || !options.is_internal(&req.path) {
                    continue;
                }
                if let Some(target) = by_module.get(&req.path) {
                    if *target != source {
                        edges.push(
                            DependencyEdge::stat(&source, *target).with_source_file(file.clone()),
                        );
                    }
                }
            }
        }
        Ok(edges)
    }
}
