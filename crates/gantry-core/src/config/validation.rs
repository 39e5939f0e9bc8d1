//! Configuration validation

use crate::error::{ConfigError, Result};

use super::types::{PluginSpec, WorkspaceConfig};

/// Validate a loaded workspace configuration
pub fn validate_config(config: &WorkspaceConfig) -> Result<()> {
    for entry in &config.plugins {
        PluginSpec::parse(entry.spec())?;
    }

    if let Some(remote) = &config.remote_execution {
        if remote.enabled && remote.default_endpoint.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "remoteExecution.defaultEndpoint".to_string(),
                message: "required when remote execution is enabled".to_string(),
            }
            .into());
        }
        if remote.default_timeout_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "remoteExecution.defaultTimeoutSeconds".to_string(),
                message: "must be positive".to_string(),
            }
            .into());
        }
        if remote.max_connections == 0 {
            return Err(ConfigError::InvalidValue {
                field: "remoteExecution.maxConnections".to_string(),
                message: "must be positive".to_string(),
            }
            .into());
        }
        for (name, endpoint) in &remote.endpoints {
            if endpoint.endpoint.is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: format!("remoteExecution.endpoints.{}", name),
                    message: "endpoint must not be empty".to_string(),
                }
                .into());
            }
        }
    }

    for (source, targets) in &config.implicit_dependencies {
        if targets.iter().any(|t| t == source) {
            return Err(ConfigError::InvalidValue {
                field: format!("implicitDependencies.{}", source),
                message: "a project cannot depend on itself".to_string(),
            }
            .into());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::{PluginEntry, RemoteExecutionConfig};

    #[test]
    fn test_validate_default_config() {
        assert!(validate_config(&WorkspaceConfig::default()).is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_plugin_spec() {
        let config = WorkspaceConfig {
            plugins: vec![PluginEntry::Spec("github:broken".to_string())],
            ..Default::default()
        };
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_rejects_enabled_remote_without_endpoint() {
        let config = WorkspaceConfig {
            remote_execution: Some(RemoteExecutionConfig {
                enabled: true,
                ..Default::default()
            }),
            ..Default::default()
        };
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_rejects_self_implicit_dependency() {
        let mut config = WorkspaceConfig::default();
        config
            .implicit_dependencies
            .insert("web".to_string(), vec!["web".to_string()]);
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_accepts_remote_config() {
        let config = WorkspaceConfig {
            remote_execution: Some(RemoteExecutionConfig {
                enabled: true,
                default_endpoint: "remote.example.com:8980".to_string(),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert!(validate_config(&config).is_ok());
    }
}
