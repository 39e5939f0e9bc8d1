//! Configuration types

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::model::TargetConfiguration;

/// Workspace configuration (`gantry.json`)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WorkspaceConfig {
    /// Schema hint for editors
    #[serde(rename = "$schema", skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,

    /// Enabled inference plugins
    pub plugins: Vec<PluginEntry>,

    /// Reusable input glob sets
    pub named_inputs: BTreeMap<String, Vec<String>>,

    /// Per-target-name defaults merged underneath every matching target
    pub target_defaults: BTreeMap<String, TargetConfiguration>,

    /// Defaults for the externally supplied "affected" producer
    pub affected: AffectedConfig,

    /// Remote execution; absent means local-only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_execution: Option<RemoteExecutionConfig>,

    /// Extra directory names excluded from workspace walks
    pub exclude: Vec<String>,

    /// Explicit project-to-project edges (type IMPLICIT)
    pub implicit_dependencies: BTreeMap<String, Vec<String>>,
}

/// A plugin entry: either a bare spec string or a spec with options
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PluginEntry {
    /// `"maven"` or `"maven@1.2.0"` or `"file:./plugins/custom"`
    Spec(String),
    /// `{ "plugin": "maven", "options": { ... } }`
    WithOptions {
        plugin: String,
        #[serde(default)]
        options: serde_json::Value,
    },
}

impl PluginEntry {
    /// The raw spec string
    pub fn spec(&self) -> &str {
        match self {
            Self::Spec(s) => s,
            Self::WithOptions { plugin, .. } => plugin,
        }
    }

    /// Plugin options, `Null` when none were given
    pub fn options(&self) -> serde_json::Value {
        match self {
            Self::Spec(_) => serde_json::Value::Null,
            Self::WithOptions { options, .. } => options.clone(),
        }
    }
}

/// Parsed plugin specifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PluginSpec {
    /// `<id>` or `<id>@<version>` (registry form)
    Registry { id: String, version: Option<String> },
    /// `file:<path>`
    File(PathBuf),
    /// `github:<owner>/<repo>`
    GitHub { owner: String, repo: String },
    /// `npm:<name>@<version>`
    Npm { name: String, version: Option<String> },
}

impl PluginSpec {
    /// Parse a plugin spec string
    pub fn parse(spec: &str) -> Result<Self, ConfigError> {
        if spec.is_empty() {
            return Err(ConfigError::InvalidPluginSpec {
                spec: spec.to_string(),
                reason: "empty spec".to_string(),
            });
        }

        if let Some(path) = spec.strip_prefix("file:") {
            if path.is_empty() {
                return Err(ConfigError::InvalidPluginSpec {
                    spec: spec.to_string(),
                    reason: "file: requires a path".to_string(),
                });
            }
            return Ok(Self::File(PathBuf::from(path)));
        }

        if let Some(rest) = spec.strip_prefix("github:") {
            let (owner, repo) = rest.split_once('/').ok_or_else(|| ConfigError::InvalidPluginSpec {
                spec: spec.to_string(),
                reason: "github: requires <owner>/<repo>".to_string(),
            })?;
            if owner.is_empty() || repo.is_empty() {
                return Err(ConfigError::InvalidPluginSpec {
                    spec: spec.to_string(),
                    reason: "github: requires <owner>/<repo>".to_string(),
                });
            }
            return Ok(Self::GitHub {
                owner: owner.to_string(),
                repo: repo.to_string(),
            });
        }

        if let Some(rest) = spec.strip_prefix("npm:") {
            // npm package names may themselves start with `@scope/`, so the
            // version separator is the last `@` past position zero.
            let (name, version) = split_versioned(rest);
            if name.is_empty() {
                return Err(ConfigError::InvalidPluginSpec {
                    spec: spec.to_string(),
                    reason: "npm: requires a package name".to_string(),
                });
            }
            return Ok(Self::Npm {
                name: name.to_string(),
                version: version.map(String::from),
            });
        }

        let (id, version) = split_versioned(spec);
        if id.is_empty() {
            return Err(ConfigError::InvalidPluginSpec {
                spec: spec.to_string(),
                reason: "missing plugin id".to_string(),
            });
        }
        Ok(Self::Registry {
            id: id.to_string(),
            version: version.map(String::from),
        })
    }

    /// The identifier used for registry lookup
    pub fn id(&self) -> String {
        match self {
            Self::Registry { id, .. } => id.clone(),
            Self::File(path) => path
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_default(),
            Self::GitHub { owner, repo } => format!("{}/{}", owner, repo),
            Self::Npm { name, .. } => name.clone(),
        }
    }
}

impl fmt::Display for PluginSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Registry { id, version: Some(v) } => write!(f, "{}@{}", id, v),
            Self::Registry { id, version: None } => write!(f, "{}", id),
            Self::File(path) => write!(f, "file:{}", path.display()),
            Self::GitHub { owner, repo } => write!(f, "github:{}/{}", owner, repo),
            Self::Npm { name, version: Some(v) } => write!(f, "npm:{}@{}", name, v),
            Self::Npm { name, version: None } => write!(f, "npm:{}", name),
        }
    }
}

/// Split `name@version`, tolerating a leading `@scope/` in the name
fn split_versioned(s: &str) -> (&str, Option<&str>) {
    match s.rfind('@') {
        Some(0) | None => (s, None),
        Some(idx) => (&s[..idx], Some(&s[idx + 1..])),
    }
}

/// Defaults for affected-set computation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AffectedConfig {
    /// Default base reference handed to the external changed-set producer
    pub default_base: String,
}

impl Default for AffectedConfig {
    fn default() -> Self {
        Self {
            default_base: "main".to_string(),
        }
    }
}

/// Remote execution configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RemoteExecutionConfig {
    /// Master switch
    pub enabled: bool,

    /// Default endpoint, `host:port`
    pub default_endpoint: String,

    /// RE v2 instance name
    pub default_instance_name: String,

    /// Use TLS for the channel
    pub use_tls: bool,

    /// Connection pool cap
    pub max_connections: u32,

    /// Default per-action timeout
    pub default_timeout_seconds: u64,

    /// Default platform properties
    pub default_platform: BTreeMap<String, String>,

    /// Named endpoint overrides
    pub endpoints: BTreeMap<String, RemoteEndpointConfig>,

    /// Degrade to local execution when the channel cannot be established
    pub fallback_to_local: bool,
}

impl Default for RemoteExecutionConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            default_endpoint: String::new(),
            default_instance_name: String::new(),
            use_tls: false,
            max_connections: 4,
            default_timeout_seconds: 300,
            default_platform: BTreeMap::new(),
            endpoints: BTreeMap::new(),
            fallback_to_local: false,
        }
    }
}

/// A named remote endpoint override
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RemoteEndpointConfig {
    /// `host:port`
    pub endpoint: String,
    /// Instance name override
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance_name: Option<String>,
    /// TLS override
    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_tls: Option<bool>,
    /// Timeout override
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<u64>,
    /// Platform property overrides
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub platform: BTreeMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plugin_spec_registry() {
        assert_eq!(
            PluginSpec::parse("maven").unwrap(),
            PluginSpec::Registry {
                id: "maven".to_string(),
                version: None
            }
        );
        assert_eq!(
            PluginSpec::parse("maven@1.4.0").unwrap(),
            PluginSpec::Registry {
                id: "maven".to_string(),
                version: Some("1.4.0".to_string())
            }
        );
    }

    #[test]
    fn test_plugin_spec_file() {
        assert_eq!(
            PluginSpec::parse("file:./plugins/custom-infer").unwrap(),
            PluginSpec::File(PathBuf::from("./plugins/custom-infer"))
        );
        assert!(PluginSpec::parse("file:").is_err());
    }

    #[test]
    fn test_plugin_spec_github() {
        assert_eq!(
            PluginSpec::parse("github:acme/infer-gradle").unwrap(),
            PluginSpec::GitHub {
                owner: "acme".to_string(),
                repo: "infer-gradle".to_string()
            }
        );
        assert!(PluginSpec::parse("github:acme").is_err());
    }

    #[test]
    fn test_plugin_spec_npm_scoped() {
        assert_eq!(
            PluginSpec::parse("npm:@acme/infer@2.0.1").unwrap(),
            PluginSpec::Npm {
                name: "@acme/infer".to_string(),
                version: Some("2.0.1".to_string())
            }
        );
    }

    #[test]
    fn test_plugin_spec_empty() {
        assert!(PluginSpec::parse("").is_err());
    }

    #[test]
    fn test_plugin_spec_display_round_trip() {
        for raw in [
            "maven",
            "maven@1.4.0",
            "file:./plugins/x",
            "github:acme/infer",
            "npm:@acme/infer@2.0.1",
        ] {
            assert_eq!(PluginSpec::parse(raw).unwrap().to_string(), raw);
        }
    }

    #[test]
    fn test_workspace_config_deserialize() {
        let json = r#"{
            "plugins": ["javascript", { "plugin": "maven", "options": { "internalGroupIds": ["com.acme"] } }],
            "namedInputs": { "default": ["src/**/*"] },
            "targetDefaults": {
                "build": { "cache": true, "dependsOn": ["^build"] }
            },
            "affected": { "defaultBase": "origin/main" },
            "remoteExecution": {
                "enabled": true,
                "defaultEndpoint": "remote.example.com:8980",
                "defaultInstanceName": "main",
                "useTls": true
            },
            "implicitDependencies": { "web": ["infra"] }
        }"#;

        let config: WorkspaceConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.plugins.len(), 2);
        assert_eq!(config.plugins[0].spec(), "javascript");
        assert_eq!(config.plugins[1].spec(), "maven");
        assert!(config.plugins[1].options().get("internalGroupIds").is_some());
        assert_eq!(config.affected.default_base, "origin/main");

        let remote = config.remote_execution.unwrap();
        assert!(remote.enabled);
        assert_eq!(remote.default_endpoint, "remote.example.com:8980");
        assert!(remote.use_tls);
        assert_eq!(remote.default_timeout_seconds, 300);

        assert_eq!(config.implicit_dependencies["web"], vec!["infra"]);
    }

    #[test]
    fn test_workspace_config_defaults() {
        let config: WorkspaceConfig = serde_json::from_str("{}").unwrap();
        assert!(config.plugins.is_empty());
        assert!(config.remote_execution.is_none());
        assert_eq!(config.affected.default_base, "main");
    }
}
