//! Maven inference plugin
//!
//! Claims `pom.xml` files. Projects are named by artifactId; the full
//! coordinates are recorded as a tag so dependency resolution can match
//! `groupId:artifactId` pairs against the workspace.

mod pom;

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

pub use pom::{MavenCoordinate, PomXml};

/// Options for the Maven plugin
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MavenOptions {
    /// Inferred target names, in lifecycle order
    pub compile_target: String,
    /// Test target name
    pub test_target: String,
    /// Package target name
    pub package_target: String,
    /// Only dependencies whose groupId starts with one of these prefixes
    /// are considered workspace-internal. Empty means any match counts.
    pub internal_group_ids: Vec<String>,
}

impl Default for MavenOptions {
    fn default() -> Self {
        Self {
            compile_target: "compile".to_string(),
            test_target: "test".to_string(),
            package_target: "package".to_string(),
            internal_group_ids: Vec::new(),
        }
    }
}

impl MavenOptions {
    fn narrow(options: &serde_json::Value) -> Result<Self, String> {
        if options.is_null() {
            return Ok(Self::default());
        }
        serde_json::from_value(options.clone()).map_err(|e| e.to_string())
    }

    fn is_internal(&self, coordinate: &MavenCoordinate) -> bool {
        self.internal_group_ids.is_empty()
            || self
                .internal_group_ids
                .iter()
                .any(|prefix| coordinate.group_id.starts_with(prefix.as_str()))
    }
}

/// Tag prefix carrying the module coordinates
fn coordinate_tag(coordinate: &MavenCoordinate) -> String {
    format!("maven:{}", coordinate.to_key())
}

/// Maven inference plugin
pub struct MavenPlugin;

impl MavenPlugin {
    /// Create a new Maven plugin
    pub fn new() -> Self {
        Self
    }

    fn infer_project(
        &self,
        manifest_path: &std::path::Path,
        options: &MavenOptions,
        ctx: &NodeContext,
    ) -> Result<ProjectConfiguration, InferenceError> {
        let pom = PomXml::load(manifest_path)?;
        let root = ctx.relative(manifest_path.parent().unwrap_or(manifest_path));

        let artifact_id = pom.artifact_id.clone().unwrap_or_default();
        let packaging = pom.packaging.as_deref().unwrap_or("jar");

        let project_type = match packaging {
            "war" | "ear" => ProjectType::Application,
            _ => ProjectType::Library,
        };

        let mut project = ProjectConfiguration::new(&artifact_id, root)
            .with_type(project_type)
            .with_tag("maven")
            .with_tag(format!("packaging:{}", packaging));

        if let Some(coordinate) = pom.coordinate() {
            project = project.with_tag(coordinate_tag(&coordinate));
        }

        let compile = TargetConfiguration::new("gantry:run-commands")
            .with_commands(vec!["mvn compile".to_string()])
            .with_depends_on(format!("^{}", options.compile_target))
            .with_outputs(vec!["target/classes/**".to_string()]);
        let test = TargetConfiguration::new("gantry:run-commands")
            .with_commands(vec!["mvn test".to_string()])
            .with_depends_on(options.compile_target.clone())
            .with_depends_on(format!("^{}", options.test_target));
        let package = TargetConfiguration::new("gantry:run-commands")
            .with_commands(vec!["mvn package".to_string()])
            .with_depends_on(options.compile_target.clone())
            .with_outputs(vec!["target/*.jar".to_string(), "target/*.war".to_string()]);

        Ok(project
            .with_target(options.compile_target.clone(), compile)
            .with_target(options.test_target.clone(), test)
            .with_target(options.package_target.clone(), package))
    }
}

impl Default for MavenPlugin {
    fn default() -> Self {
        Self::new()
    }
}

impl InferencePlugin for MavenPlugin {
    fn name(&self) -> &str {
        "maven"
    }

    fn file_pattern(&self) -> &str {
        "**/pom.xml"
    }

    fn default_options(&self) -> serde_json::Value {
        serde_json::json!({
            "compileTarget": "compile",
            "testTarget": "test",
            "packageTarget": "package"
        })
    }

    fn validate_options(&self, options: &serde_json::Value) -> Result<(), ConfigError> {
        MavenOptions::narrow(options).map(|_| ()).map_err(|message| {
            ConfigError::InvalidValue {
                field: "plugins.maven.options".to_string(),
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
        let options = MavenOptions::narrow(options).map_err(|reason| {
            InferenceError::PluginFailed {
                plugin: self.name().to_string(),
                reason,
            }
        })?;

        let mut result = CreateNodesResult::default();
        for file in files {
            match self.infer_project(file, &options, ctx) {
                Ok(project) => {
                    debug!(plugin = "maven", project = %project.name, "inferred project");
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
        let options = MavenOptions::narrow(options).map_err(|reason| {
            InferenceError::PluginFailed {
                plugin: self.name().to_string(),
                reason,
            }
        })?;

        // Index workspace Maven projects by their coordinate tags.
        let mut by_coordinate: BTreeMap<String, &str> = BTreeMap::new();
        for project in ctx.projects.values() {
            for tag in &project.tags {
                if let Some(key) = tag.strip_prefix("maven:") {
                    by_coordinate.insert(key.to_string(), project.name.as_str());
                }
            }
        }

        let mut edges = Vec::new();
        for file in ctx.files {
            let Ok(pom) = PomXml::load(file) else {
                continue;
            };
            let Some(source) = pom.artifact_id.as_deref() else {
                continue;
            };
            if !ctx.projects.contains_key(source) {
                continue;
            }

            for dep in &pom.dependencies {
                if !options.is_internal(dep) {
                    continue;
                }
                if let Some(target) = by_coordinate.get(&dep.to_key()) {
                    if *target != source {
                        edges.push(
                            DependencyEdge::stat(source, *target).with_source_file(file.clone()),
                        );
                    }
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

    fn write_pom(dir: &std::path::Path, module: &str, content: &str) -> PathBuf {
        let module_dir = dir.join(module);
        std::fs::create_dir_all(&module_dir).unwrap();
        let path = module_dir.join("pom.xml");
        std::fs::write(&path, content).unwrap();
        path
    }

    fn pom(group: &str, artifact: &str, deps: &[(&str, &str)]) -> String {
        let deps_xml: String = deps
            .iter()
            .map(|(g, a)| {
                format!(
                    "<dependency><groupId>{}</groupId><artifactId>{}</artifactId></dependency>",
                    g, a
                )
            })
            .collect();
        format!(
            "<project><groupId>{}</groupId><artifactId>{}</artifactId>\
             <version>1.0.0</version><dependencies>{}</dependencies></project>",
            group, artifact, deps_xml
        )
    }

    #[test]
    fn test_create_nodes_lifecycle_targets() {
        let temp = TempDir::new().unwrap();
        let manifest = write_pom(temp.path(), "billing", &pom("com.acme", "billing", &[]));

        let plugin = MavenPlugin::new();
        let ctx = NodeContext::new(temp.path());
        let result = plugin
            .create_nodes(&[manifest], &serde_json::Value::Null, &ctx)
            .unwrap();

        let billing = &result.projects["billing"];
        assert!(billing.tags.contains("maven:com.acme:billing"));

        let compile = &billing.targets["compile"];
        assert_eq!(compile.options.commands, vec!["mvn compile"]);
        assert_eq!(compile.depends_on, vec!["^compile"]);

        let test = &billing.targets["test"];
        assert_eq!(test.depends_on, vec!["compile", "^test"]);

        let package = &billing.targets["package"];
        assert_eq!(package.depends_on, vec!["compile"]);
    }

    #[test]
    fn test_create_dependencies_resolves_coordinates() {
        let temp = TempDir::new().unwrap();
        let billing = write_pom(
            temp.path(),
            "billing",
            &pom(
                "com.acme",
                "billing",
                &[("com.acme", "common"), ("org.springframework", "spring-core")],
            ),
        );
        let common = write_pom(temp.path(), "common", &pom("com.acme", "common", &[]));

        let plugin = MavenPlugin::new();
        let ctx = NodeContext::new(temp.path());
        let files = vec![billing, common];
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
        assert_eq!(edges[0].source, "billing");
        assert_eq!(edges[0].target, "common");
    }

    #[test]
    fn test_internal_group_filter() {
        let temp = TempDir::new().unwrap();
        let api = write_pom(
            temp.path(),
            "api",
            &pom("com.acme", "api", &[("com.other", "shared")]),
        );
        let shared = write_pom(temp.path(), "shared", &pom("com.other", "shared", &[]));

        let plugin = MavenPlugin::new();
        let ctx = NodeContext::new(temp.path());
        let files = vec![api, shared];
        let nodes = plugin
            .create_nodes(&files, &serde_json::Value::Null, &ctx)
            .unwrap();

        let options = serde_json::json!({ "internalGroupIds": ["com.acme"] });
        let dep_ctx = DependencyContext {
            workspace_root: temp.path(),
            files: &files,
            projects: &nodes.projects,
        };
        let edges = plugin.create_dependencies(&options, &dep_ctx).unwrap();
        assert!(edges.is_empty());
    }

    #[test]
    fn test_war_packaging_is_application() {
        let temp = TempDir::new().unwrap();
        let manifest = write_pom(
            temp.path(),
            "webapp",
            "<project><groupId>g</groupId><artifactId>webapp</artifactId>\
             <version>1.0.0</version><packaging>war</packaging></project>",
        );

        let plugin = MavenPlugin::new();
        let ctx = NodeContext::new(temp.path());
        let result = plugin
            .create_nodes(&[manifest], &serde_json::Value::Null, &ctx)
            .unwrap();

        assert_eq!(
            result.projects["webapp"].project_type,
            ProjectType::Application
        );
    }
}
