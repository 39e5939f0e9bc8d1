//! Docker inference plugin
//!
//! Claims `Dockerfile` and compose files. A Dockerfile yields a project
//! named after its directory with docker-build / docker-push / docker-run
//! targets (never cached). Compose files contribute dependency edges from
//! `depends_on` declarations between services that map onto workspace
//! projects.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use gantry_core::error::{ConfigError, InferenceError};
use gantry_core::model::{
    DependencyEdge, ProjectConfiguration, ProjectType, TargetConfiguration,
};

use crate::context::{DependencyContext, NodeContext};
use crate::traits::{CreateNodesResult, InferencePlugin};

/// Options for the Docker plugin
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DockerOptions {
    /// Registry prefix applied to image names (e.g. "registry.acme.dev/")
    pub registry: String,
}

impl Default for DockerOptions {
    fn default() -> Self {
        Self {
            registry: String::new(),
        }
    }
}

impl DockerOptions {
    fn narrow(options: &serde_json::Value) -> Result<Self, String> {
        if options.is_null() {
            return Ok(Self::default());
        }
        serde_json::from_value(options.clone()).map_err(|e| e.to_string())
    }
}

fn is_compose_file(path: &Path) -> bool {
    matches!(
        path.file_name().and_then(|f| f.to_str()),
        Some("docker-compose.yml")
            | Some("docker-compose.yaml")
            | Some("compose.yml")
            | Some("compose.yaml")
    )
}

/// Docker inference plugin
pub struct DockerPlugin;

impl DockerPlugin {
    /// Create a new Docker plugin
    pub fn new() -> Self {
        Self
    }

    fn infer_project(
        &self,
        dockerfile: &Path,
        options: &DockerOptions,
        ctx: &NodeContext,
    ) -> Result<ProjectConfiguration, InferenceError> {
        // Sanity-read so an unreadable Dockerfile is skipped with a warning
        // like any other manifest.
        std::fs::read_to_string(dockerfile).map_err(|e| InferenceError::ManifestParse {
            path: dockerfile.to_path_buf(),
            reason: e.to_string(),
        })?;

        let dir = dockerfile.parent().unwrap_or(dockerfile);
        let root = ctx.relative(dir);
        let name = dir
            .file_name()
            .map(|f| f.to_string_lossy().to_string())
            .unwrap_or_else(|| "root".to_string());
        let image = format!("{}{}", options.registry, name);

        let build = TargetConfiguration::new("gantry:run-commands")
            .with_commands(vec![format!("docker build -t {} .", image)])
            .with_cache(false);
        let push = TargetConfiguration::new("gantry:run-commands")
            .with_commands(vec![format!("docker push {}", image)])
            .with_cache(false)
            .with_depends_on("docker-build");
        let run = TargetConfiguration::new("gantry:run-commands")
            .with_commands(vec![format!("docker run --rm {}", image)])
            .with_cache(false)
            .with_depends_on("docker-build");

        Ok(ProjectConfiguration::new(name, root)
            .with_type(ProjectType::Application)
            .with_tag("docker")
            .with_target("docker-build", build)
            .with_target("docker-push", push)
            .with_target("docker-run", run))
    }

    /// Resolve a compose service to a workspace project name: by build
    /// context directory first, then by service name.
    fn resolve_service<'a>(
        service_name: &str,
        service: &ComposeService,
        compose_dir: &Path,
        ctx: &DependencyContext<'a>,
    ) -> Option<&'a str> {
        if let Some(context) = service.build_context() {
            let root = compose_dir.join(context);
            let relative = root
                .strip_prefix(ctx.workspace_root)
                .unwrap_or(&root)
                .to_path_buf();
            // Normalize away `./`
            let normalized: PathBuf = relative.components().collect();
            if let Some(project) = ctx.project_at_root(&normalized) {
                return Some(project.name.as_str());
            }
        }
        ctx.projects.get(service_name).map(|p| p.name.as_str())
    }
}

impl Default for DockerPlugin {
    fn default() -> Self {
        Self::new()
    }
}

impl InferencePlugin for DockerPlugin {
    fn name(&self) -> &str {
        "docker"
    }

    fn file_pattern(&self) -> &str {
        "**/{Dockerfile,docker-compose.yml,docker-compose.yaml,compose.yml,compose.yaml}"
    }

    fn validate_options(&self, options: &serde_json::Value) -> Result<(), ConfigError> {
        DockerOptions::narrow(options).map(|_| ()).map_err(|message| {
            ConfigError::InvalidValue {
                field: "plugins.docker.options".to_string(),
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
        let options = DockerOptions::narrow(options).map_err(|reason| {
            InferenceError::PluginFailed {
                plugin: self.name().to_string(),
                reason,
            }
        })?;

        let mut result = CreateNodesResult::default();
        for file in files {
            if is_compose_file(file) {
                continue;
            }
            match self.infer_project(file, &options, ctx) {
                Ok(project) => {
                    debug!(plugin = "docker", project = %project.name, "inferred project");
                    result.projects.insert(project.name.clone(), project);
                }
                Err(e) => result.skip(file, e),
            }
        }
        Ok(result)
    }

    fn create_dependencies(
        &self,
        _options: &serde_json::Value,
        ctx: &DependencyContext,
    ) -> Result<Vec<DependencyEdge>, InferenceError> {
        let mut edges = Vec::new();

        for file in ctx.files {
            if !is_compose_file(file) {
                continue;
            }
            let Ok(content) = std::fs::read_to_string(file) else {
                continue;
            };
            let Ok(compose) = serde_yaml::from_str::<ComposeFile>(&content) else {
                debug!(file = %file.display(), "unparseable compose file, skipping");
                continue;
            };
            let compose_dir = file.parent().unwrap_or(file);

            for (service_name, service) in &compose.services {
                let Some(source) =
                    Self::resolve_service(service_name, service, compose_dir, ctx)
                else {
                    continue;
                };
                for dep_name in service.dependency_names() {
                    let Some(dep_service) = compose.services.get(&dep_name) else {
                        continue;
                    };
                    let Some(target) =
                        Self::resolve_service(&dep_name, dep_service, compose_dir, ctx)
                    else {
                        continue;
                    };
                    if source != target {
                        edges.push(
                            DependencyEdge::stat(source, target).with_source_file(file.clone()),
                        );
                    }
                }
            }
        }
        Ok(edges)
    }
}

/// docker-compose file (the subset inference needs)
#[derive(Debug, Default, Deserialize)]
struct ComposeFile {
    #[serde(default)]
    services: std::collections::BTreeMap<String, ComposeService>,
}

/// One compose service
#[derive(Debug, Default, Deserialize)]
struct ComposeService {
    #[serde(default)]
    build: Option<ComposeBuild>,
    #[serde(default)]
    depends_on: Option<ComposeDependsOn>,
}

impl ComposeService {
    fn build_context(&self) -> Option<&str> {
        match self.build.as_ref()? {
            ComposeBuild::Context(path) => Some(path),
            ComposeBuild::Detailed { context } => context.as_deref(),
        }
    }

    fn dependency_names(&self) -> Vec<String> {
        match &self.depends_on {
            Some(ComposeDependsOn::List(names)) => names.clone(),
            Some(ComposeDependsOn::Map(map)) => map.keys().cloned().collect(),
            None => Vec::new(),
        }
    }
}

/// `build: ./dir` or `build: { context: ./dir, ... }`
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ComposeBuild {
    Context(String),
    Detailed {
        #[serde(default)]
        context: Option<String>,
    },
}

/// `depends_on: [a, b]` or `depends_on: { a: { condition: ... } }`
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ComposeDependsOn {
    List(Vec<String>),
    Map(std::collections::BTreeMap<String, serde_yaml::Value>),
}
