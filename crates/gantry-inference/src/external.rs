//! External inference plugins
//!
//! External plugins run as subprocesses and speak a JSON protocol over
//! stdin/stdout: a request `{action, input, config}` answered by
//! `{output, error}`. Supported actions are `info`, `create-nodes`, and
//! `create-dependencies`.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use serde::{Deserialize, Serialize};
use tracing::debug;

use gantry_core::error::{ConfigError, InferenceError};
use gantry_core::model::{DependencyEdge, ProjectConfiguration};

use crate::context::{DependencyContext, NodeContext};
use crate::traits::{CreateNodesResult, InferencePlugin};

/// Plugin metadata returned by the `info` action
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalPluginInfo {
    /// Plugin name
    pub name: String,
    /// Plugin version
    pub version: String,
    /// Glob pattern the plugin claims
    pub file_pattern: String,
    /// Description
    #[serde(default)]
    pub description: Option<String>,
}

/// Request format (sent to the plugin via stdin)
#[derive(Debug, Serialize, Deserialize)]
pub struct PluginRequest {
    /// Action to perform
    pub action: String,
    /// Input data
    pub input: serde_json::Value,
    /// Plugin configuration
    pub config: serde_json::Value,
}

/// Response format (received from the plugin via stdout)
#[derive(Debug, Serialize, Deserialize)]
pub struct PluginResponse {
    /// Output data (on success)
    pub output: Option<serde_json::Value>,
    /// Error message (on failure)
    pub error: Option<String>,
}

/// An inference plugin implemented by an external executable
#[derive(Debug, Clone)]
pub struct ExternalInferencePlugin {
    info: ExternalPluginInfo,
    command: PathBuf,
}

impl ExternalInferencePlugin {
    /// Load an external plugin, querying it for its info
    pub fn load(command: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let command = command.into();
        if !command.exists() {
            return Err(ConfigError::UnresolvablePlugin(format!(
                "plugin executable not found: {}",
                command.display()
            )));
        }

        let output = invoke(&command, "info", serde_json::Value::Null, serde_json::Value::Null)
            .map_err(|e| ConfigError::UnresolvablePlugin(e.to_string()))?;

        let info: ExternalPluginInfo = serde_json::from_value(output).map_err(|e| {
            ConfigError::UnresolvablePlugin(format!(
                "invalid info from {}: {}",
                command.display(),
                e
            ))
        })?;

        debug!(plugin = %info.name, command = %command.display(), "loaded external plugin");
        Ok(Self { info, command })
    }

    /// Plugin metadata
    pub fn info(&self) -> &ExternalPluginInfo {
        &self.info
    }
}

/// Run one request/response exchange with the plugin executable
fn invoke(
    command: &PathBuf,
    action: &str,
    input: serde_json::Value,
    config: serde_json::Value,
) -> Result<serde_json::Value, InferenceError> {
    let plugin_name = command
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();

    let request = PluginRequest {
        action: action.to_string(),
        input,
        config,
    };
    let request_json =
        serde_json::to_string(&request).map_err(|e| InferenceError::ProtocolError {
            plugin: plugin_name.clone(),
            reason: e.to_string(),
        })?;

    let mut child = Command::new(command)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| InferenceError::PluginFailed {
            plugin: plugin_name.clone(),
            reason: format!("failed to spawn: {}", e),
        })?;

    if let Some(mut stdin) = child.stdin.take() {
        stdin
            .write_all(request_json.as_bytes())
            .map_err(|e| InferenceError::ProtocolError {
                plugin: plugin_name.clone(),
                reason: format!("failed to write request: {}", e),
            })?;
    }

    let output = child
        .wait_with_output()
        .map_err(|e| InferenceError::PluginFailed {
            plugin: plugin_name.clone(),
            reason: e.to_string(),
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(InferenceError::PluginFailed {
            plugin: plugin_name,
            reason: stderr.to_string(),
        });
    }

    let response: PluginResponse =
        serde_json::from_slice(&output.stdout).map_err(|e| InferenceError::ProtocolError {
            plugin: plugin_name.clone(),
            reason: format!("invalid response: {}", e),
        })?;

    if let Some(error) = response.error {
        return Err(InferenceError::PluginFailed {
            plugin: plugin_name,
            reason: error,
        });
    }

    Ok(response.output.unwrap_or(serde_json::Value::Null))
}

/// `create-nodes` output shape
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ExternalNodesOutput {
    projects: BTreeMap<String, ProjectConfiguration>,
    warnings: Vec<String>,
}

impl InferencePlugin for ExternalInferencePlugin {
    fn name(&self) -> &str {
        &self.info.name
    }

    fn file_pattern(&self) -> &str {
        &self.info.file_pattern
    }

    fn create_nodes(
        &self,
        files: &[PathBuf],
        options: &serde_json::Value,
        ctx: &NodeContext,
    ) -> Result<CreateNodesResult, InferenceError> {
        let input = serde_json::json!({
            "files": files,
            "workspaceRoot": ctx.workspace_root,
        });

        let output = invoke(&self.command, "create-nodes", input, options.clone())?;
        let parsed: ExternalNodesOutput =
            serde_json::from_value(output).map_err(|e| InferenceError::ProtocolError {
                plugin: self.info.name.clone(),
                reason: format!("invalid create-nodes output: {}", e),
            })?;

        Ok(CreateNodesResult {
            projects: parsed.projects,
            warnings: parsed.warnings,
        })
    }

    fn create_dependencies(
        &self,
        options: &serde_json::Value,
        ctx: &DependencyContext,
    ) -> Result<Vec<DependencyEdge>, InferenceError> {
        let input = serde_json::json!({
            "workspaceRoot": ctx.workspace_root,
            "files": ctx.files,
            "projects": ctx.projects,
        });

        let output = invoke(&self.command, "create-dependencies", input, options.clone())?;
        serde_json::from_value(output).map_err(|e| InferenceError::ProtocolError {
            plugin: self.info.name.clone(),
            reason: format!("invalid create-dependencies output: {}", e),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_rejects_missing_executable() {
        let err = ExternalInferencePlugin::load("/nonexistent/plugin").unwrap_err();
        assert!(matches!(err, ConfigError::UnresolvablePlugin(_)));
    }

    #[test]
    fn test_request_serialization() {
        let request = PluginRequest {
            action: "create-nodes".to_string(),
            input: serde_json::json!({ "files": ["a/pom.xml"] }),
            config: serde_json::Value::Null,
        };
        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains("create-nodes"));
        assert!(json.contains("a/pom.xml"));
    }

    #[cfg(unix)]
    #[test]
    fn test_round_trip_with_script_plugin() {
        use std::os::unix::fs::PermissionsExt;

        let temp = tempfile::TempDir::new().unwrap();
        let script = temp.path().join("fake-plugin");
        // Answers every action with a canned response keyed off the action
        // field; enough to exercise the protocol.
        std::fs::write(
            &script,
            r#"#!/bin/sh
read -r request
case "$request" in
  *'"info"'*)
    echo '{"output": {"name": "fake", "version": "0.1.0", "filePattern": "**/fake.json"}}'
    ;;
  *'"create-nodes"'*)
    echo '{"output": {"projects": {}, "warnings": ["skipped something"]}}'
    ;;
  *)
    echo '{"output": []}'
    ;;
esac
"#,
        )
        .unwrap();
        let mut perms = std::fs::metadata(&script).unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&script, perms).unwrap();

        let plugin = ExternalInferencePlugin::load(&script).unwrap();
        assert_eq!(plugin.name(), "fake");
        assert_eq!(plugin.file_pattern(), "**/fake.json");

        let ctx = NodeContext::new(temp.path());
        let result = plugin
            .create_nodes(&[], &serde_json::Value::Null, &ctx)
            .unwrap();
        assert!(result.projects.is_empty());
        assert_eq!(result.warnings, vec!["skipped something"]);
    }
}
