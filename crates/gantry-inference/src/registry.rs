//! Inference plugin registry
//!
//! A static inventory of built-in plugins populated at startup, plus
//! external executables loaded through `file:` plugin specs.

use std::sync::Arc;

use tracing::debug;

use gantry_core::config::{PluginSpec, WorkspaceConfig};
use gantry_core::error::{ConfigError, Result};

use crate::docker::DockerPlugin;
use crate::external::ExternalInferencePlugin;
use crate::golang::GoPlugin;
use crate::javascript::JavaScriptPlugin;
use crate::maven::MavenPlugin;
use crate::traits::InferencePlugin;

/// A registered plugin together with its effective options
#[derive(Clone)]
pub struct RegisteredPlugin {
    /// The plugin implementation
    pub plugin: Arc<dyn InferencePlugin>,
    /// Options bag (already validated)
    pub options: serde_json::Value,
}

/// Registry of inference plugins
pub struct InferenceRegistry {
    plugins: Vec<RegisteredPlugin>,
}

impl InferenceRegistry {
    /// Registry with all built-in plugins and their default options
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        registry.register(JavaScriptPlugin::new(), serde_json::Value::Null);
        registry.register(MavenPlugin::new(), serde_json::Value::Null);
        registry.register(GoPlugin::new(), serde_json::Value::Null);
        registry.register(DockerPlugin::new(), serde_json::Value::Null);
        registry
    }

    /// Empty registry
    pub fn empty() -> Self {
        Self {
            plugins: Vec::new(),
        }
    }

    /// Build a registry from workspace configuration. With no configured
    /// plugins, all built-ins are enabled.
    pub fn from_config(config: &WorkspaceConfig) -> Result<Self> {
        if config.plugins.is_empty() {
            return Ok(Self::builtin());
        }

        let mut registry = Self::empty();
        for entry in &config.plugins {
            let spec = PluginSpec::parse(entry.spec())?;
            let options = entry.options();

            let plugin: Arc<dyn InferencePlugin> = match &spec {
                PluginSpec::Registry { id, .. } => match id.as_str() {
                    "javascript" => Arc::new(JavaScriptPlugin::new()),
                    "maven" => Arc::new(MavenPlugin::new()),
                    "go" => Arc::new(GoPlugin::new()),
                    "docker" => Arc::new(DockerPlugin::new()),
                    other => {
                        return Err(ConfigError::UnresolvablePlugin(other.to_string()).into())
                    }
                },
                PluginSpec::File(path) => Arc::new(ExternalInferencePlugin::load(path)?),
                // Remote artifact resolution needs a fetch step that the
                // pure inference layer does not perform.
                PluginSpec::GitHub { .. } | PluginSpec::Npm { .. } => {
                    return Err(ConfigError::UnresolvablePlugin(format!(
                        "{} (remote plugin artifacts are not fetched at inference time)",
                        spec
                    ))
                    .into())
                }
            };

            let options = if options.is_null() {
                plugin.default_options()
            } else {
                options
            };
            plugin.validate_options(&options)?;

            debug!(plugin = plugin.name(), "registered plugin");
            registry.plugins.push(RegisteredPlugin { plugin, options });
        }
        Ok(registry)
    }

    /// Register a plugin with explicit options
    pub fn register<P: InferencePlugin + 'static>(&mut self, plugin: P, options: serde_json::Value) {
        self.plugins.push(RegisteredPlugin {
            plugin: Arc::new(plugin),
            options,
        });
    }

    /// Get a plugin by name
    pub fn get(&self, name: &str) -> Option<&RegisteredPlugin> {
        self.plugins.iter().find(|p| p.plugin.name() == name)
    }

    /// All registered plugins, in registration order
    pub fn all(&self) -> &[RegisteredPlugin] {
        &self.plugins
    }

    /// Registered plugin names
    pub fn names(&self) -> Vec<&str> {
        self.plugins.iter().map(|p| p.plugin.name()).collect()
    }
}

impl Default for InferenceRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
