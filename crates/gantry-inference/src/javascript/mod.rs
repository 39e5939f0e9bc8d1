//! JavaScript inference plugin
//!
//! Claims `package.json` files. Targets are inferred from manifest scripts
//! through a configurable script-to-target mapping; dependency edges come
//! from package names matching other workspace projects.

mod package_json;

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

pub use package_json::PackageJson;

/// Frameworks recognized for tag extraction
const FRAMEWORK_DEPS: &[(&str, &str)] = &[
    ("react", "framework:react"),
    ("vue", "framework:vue"),
    ("express", "framework:express"),
    ("next", "framework:next"),
];

/// Options for the JavaScript plugin
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JavaScriptOptions {
    /// Map from manifest script name to inferred target name
    pub script_targets: BTreeMap<String, String>,
    /// When set, only dependency names with this prefix resolve to
    /// workspace projects
    pub workspace_prefix: Option<String>,
}

impl Default for JavaScriptOptions {
    fn default() -> Self {
        let mut script_targets = BTreeMap::new();
        for (script, target) in [
            ("build", "build"),
            ("test", "test"),
            ("lint", "lint"),
            ("dev", "serve"),
        ] {
            script_targets.insert(script.to_string(), target.to_string());
        }
        Self {
            script_targets,
            workspace_prefix: None,
        }
    }
}

impl JavaScriptOptions {
    fn narrow(options: &serde_json::Value) -> Result<Self, String> {
        if options.is_null() {
            return Ok(Self::default());
        }
        serde_json::from_value(options.clone()).map_err(|e| e.to_string())
    }
}

/// JavaScript inference plugin
pub struct JavaScriptPlugin;

impl JavaScriptPlugin {
    /// Create a new JavaScript plugin
    pub fn new() -> Self {
        Self
    }

    fn infer_project(
        &self,
        manifest_path: &std::path::Path,
        options: &JavaScriptOptions,
        ctx: &NodeContext,
    ) -> Result<ProjectConfiguration, InferenceError> {
        let pkg = PackageJson::load(manifest_path)?;
        let root = ctx.relative(manifest_path.parent().unwrap_or(manifest_path));

        let project_type = if pkg.scripts.contains_key("start") || pkg.scripts.contains_key("dev")
        {
            ProjectType::Application
        } else {
            ProjectType::Library
        };

        let mut project = ProjectConfiguration::new(&pkg.name, root)
            .with_type(project_type)
            .with_tag("npm");

        if pkg.private {
            project = project.with_tag("private");
        }
        for (dep, tag) in FRAMEWORK_DEPS {
            if pkg.depends_on(dep) {
                project = project.with_tag(*tag);
            }
        }

        for (script, target_name) in &options.script_targets {
            if !pkg.scripts.contains_key(script) {
                continue;
            }

            let mut target = TargetConfiguration::new("gantry:run-commands")
                .with_commands(vec![format!("npm run {}", script)]);

            match target_name.as_str() {
                "build" => {
                    target = target
                        .with_depends_on("^build")
                        .with_outputs(vec!["dist/**".to_string(), "build/**".to_string()]);
                }
                // Dev servers are persistent; never cache them.
                "serve" => {
                    target = target.with_cache(false).with_depends_on("build");
                }
                _ => {}
            }

            project = project.with_target(target_name.clone(), target);
        }

        Ok(project)
    }
}

impl Default for JavaScriptPlugin {
    fn default() -> Self {
        Self::new()
    }
}

impl InferencePlugin for JavaScriptPlugin {
    fn name(&self) -> &str {
        "javascript"
    }

    fn file_pattern(&self) -> &str {
        "**/package.json"
    }

    fn default_options(&self) -> serde_json::Value {
        serde_json::json!({
            "scriptTargets": { "build": "build", "test": "test", "lint": "lint", "dev": "serve" }
        })
    }

    fn validate_options(&self, options: &serde_json::Value) -> Result<(), ConfigError> {
        JavaScriptOptions::narrow(options).map(|_| ()).map_err(|message| {
            ConfigError::InvalidValue {
                field: "plugins.javascript.options".to_string(),
                message,
            }
        })
    }

    fn create_nodes(
        &self,
        files: &[PathBuf],
        options: &serde_json::Value,
        ctx: &NodeContext,
    ) -> Result<CreateNodesResult, InferenceError> {
        let options = JavaScriptOptions::narrow(options).map_err(|reason| {
            InferenceError::PluginFailed {
                plugin: self.name().to_string(),
                reason,
            }
        })?;

        let mut result = CreateNodesResult::default();
        for file in files {
            match self.infer_project(file, &options, ctx) {
                Ok(project) => {
                    debug!(plugin = "javascript", project = %project.name, "inferred project");
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
        let options = JavaScriptOptions::narrow(options).map_err(|reason| {
            InferenceError::PluginFailed {
                plugin: self.name().to_string(),
                reason,
            }
        })?;

        let mut edges = Vec::new();
        for file in ctx.files {
            let Ok(pkg) = PackageJson::load(file) else {
                continue;
            };
            if !ctx.projects.contains_key(&pkg.name) {
                continue;
            }

            for dep in pkg.all_dependency_names() {
                if let Some(prefix) = &options.workspace_prefix {
                    if !dep.starts_with(prefix.as_str()) {
                        continue;
                    }
                }
                if dep != pkg.name && ctx.projects.contains_key(dep) {
                    edges.push(
                        DependencyEdge::stat(&pkg.name, dep).with_source_file(file.clone()),
                    );
                }
            }
        }
        Ok(edges)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_manifest(dir: &std::path::Path, name: &str, content: &str) -> PathBuf {
        let pkg_dir = dir.join(name);
        std::fs::create_dir_all(&pkg_dir).unwrap();
        let path = pkg_dir.join("package.json");
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_create_nodes_targets_from_scripts() {
        let temp = TempDir::new().unwrap();
        let manifest = write_manifest(
            temp.path(),
            "web",
            r#"{
                "name": "web",
                "version": "1.0.0",
                "scripts": { "build": "vite build", "dev": "vite", "lint": "eslint ." }
            }"#,
        );

        let plugin = JavaScriptPlugin::new();
        let ctx = NodeContext::new(temp.path());
        let result = plugin
            .create_nodes(&[manifest], &serde_json::Value::Null, &ctx)
            .unwrap();

        let web = &result.projects["web"];
        assert_eq!(web.project_type, ProjectType::Application);
        assert!(web.targets.contains_key("build"));
        assert!(web.targets.contains_key("serve"));
        assert!(web.targets.contains_key("lint"));
        assert!(!web.targets.contains_key("dev"));

        let build = &web.targets["build"];
        assert_eq!(build.options.commands, vec!["npm run build"]);
        assert_eq!(build.depends_on, vec!["^build"]);
        assert!(build.cache);

        let serve = &web.targets["serve"];
        assert!(!serve.cache);
    }

    #[test]
    fn test_create_nodes_skips_broken_manifest() {
        let temp = TempDir::new().unwrap();
        let good = write_manifest(temp.path(), "ui", r#"{"name": "ui", "version": "1.0.0"}"#);
        let bad = write_manifest(temp.path(), "broken", "{ not json");

        let plugin = JavaScriptPlugin::new();
        let ctx = NodeContext::new(temp.path());
        let result = plugin
            .create_nodes(&[good, bad], &serde_json::Value::Null, &ctx)
            .unwrap();

        assert_eq!(result.projects.len(), 1);
        assert_eq!(result.warnings.len(), 1);
        assert!(result.warnings[0].contains("broken"));
    }

    #[test]
    fn test_create_dependencies_matches_workspace_names() {
        let temp = TempDir::new().unwrap();
        let web = write_manifest(
            temp.path(),
            "web",
            r#"{
                "name": "web", "version": "1.0.0",
                "dependencies": { "ui": "workspace:*", "react": "^18.0.0" }
            }"#,
        );
        let ui = write_manifest(temp.path(), "ui", r#"{"name": "ui", "version": "1.0.0"}"#);

        let plugin = JavaScriptPlugin::new();
        let ctx = NodeContext::new(temp.path());
        let files = vec![web, ui];
        let nodes = plugin
            .create_nodes(&files, &serde_json::Value::Null, &ctx)
            .unwrap();

        let dep_ctx = DependencyContext {
            workspace_root: temp.path(),
            files: &files,
            projects: &nodes.projects,
        };
        let edges = plugin
            .create_dependencies(&serde_json::Value::Null, &dep_ctx)
            .unwrap();

        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].source, "web");
        assert_eq!(edges[0].target, "ui");
    }

    #[test]
    fn test_workspace_prefix_filters_edges() {
        let temp = TempDir::new().unwrap();
        let app = write_manifest(
            temp.path(),
            "app",
            r#"{
                "name": "@acme/app", "version": "1.0.0",
                "dependencies": { "@acme/ui": "workspace:*", "lodash": "^4.0.0" }
            }"#,
        );
        let ui = write_manifest(
            temp.path(),
            "ui",
            r#"{"name": "@acme/ui", "version": "1.0.0"}"#,
        );
        let lodash = write_manifest(
            temp.path(),
            "lodash",
            r#"{"name": "lodash", "version": "4.0.0"}"#,
        );

        let plugin = JavaScriptPlugin::new();
        let ctx = NodeContext::new(temp.path());
        let files = vec![app, ui, lodash];
        let nodes = plugin
            .create_nodes(&files, &serde_json::Value::Null, &ctx)
            .unwrap();

        let options = serde_json::json!({ "workspacePrefix": "@acme/" });
        let dep_ctx = DependencyContext {
            workspace_root: temp.path(),
            files: &files,
            projects: &nodes.projects,
        };
        let edges = plugin.create_dependencies(&options, &dep_ctx).unwrap();

        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].target, "@acme/ui");
    }

    #[test]
    fn test_validate_options() {
        let plugin = JavaScriptPlugin::new();
        assert!(plugin.validate_options(&serde_json::Value::Null).is_ok());
        assert!(plugin
            .validate_options(&serde_json::json!({ "scriptTargets": { "build": "compile" } }))
            .is_ok());
        assert!(plugin
            .validate_options(&serde_json::json!({ "scriptTargets": 42 }))
            .is_err());
    }
}
