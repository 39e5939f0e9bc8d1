//! Configuration loading

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::{ConfigError, Result};

use super::defaults::config_file_names;
use super::types::WorkspaceConfig;
use super::validation::validate_config;

/// Load configuration from a file
pub fn load_config(path: &Path) -> Result<WorkspaceConfig> {
    info!(path = %path.display(), "loading workspace config");

    let content = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
    let config: WorkspaceConfig =
        serde_json::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))?;

    validate_config(&config)?;
    debug!(path = %path.display(), "config loaded and validated");
    Ok(config)
}

/// Find a configuration file in the directory or its ancestors
pub fn find_config(start_dir: &Path) -> Option<PathBuf> {
    debug!(start_dir = %start_dir.display(), "searching for config file");
    let mut current = start_dir.to_path_buf();

    loop {
        for name in config_file_names() {
            let config_path = current.join(name);
            if config_path.exists() {
                info!(path = %config_path.display(), "found config file");
                return Some(config_path);
            }
        }

        if !current.pop() {
            break;
        }
    }

    debug!("no config file found");
    None
}

/// Load configuration from a directory (searching parent directories)
pub fn load_config_from_dir(dir: &Path) -> Result<(WorkspaceConfig, PathBuf)> {
    let config_path = find_config(dir).ok_or_else(|| ConfigError::NotFound(dir.to_path_buf()))?;
    let config = load_config(&config_path)?;
    Ok((config, config_path))
}

/// Load configuration or fall back to defaults
pub fn load_config_or_default(dir: &Path) -> (WorkspaceConfig, Option<PathBuf>) {
    match load_config_from_dir(dir) {
        Ok((config, path)) => (config, Some(path)),
        Err(_) => {
            warn!(dir = %dir.display(), "no config found, using defaults");
            (WorkspaceConfig::default(), None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_find_config() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join("gantry.json");
        std::fs::write(&config_path, "{}").unwrap();

        let found = find_config(temp.path());
        assert!(found.is_some());
        assert_eq!(found.unwrap(), config_path);
    }

    #[test]
    fn test_find_config_in_parent() {
        let temp = TempDir::new().unwrap();
        let nested = temp.path().join("packages").join("web");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(temp.path().join("gantry.json"), "{}").unwrap();

        let found = find_config(&nested);
        assert_eq!(found.unwrap(), temp.path().join("gantry.json"));
    }

    #[test]
    fn test_load_config_json() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join("gantry.json");
        std::fs::write(
            &config_path,
            r#"{ "plugins": ["javascript", "go"], "affected": { "defaultBase": "develop" } }"#,
        )
        .unwrap();

        let config = load_config(&config_path).unwrap();
        assert_eq!(config.plugins.len(), 2);
        assert_eq!(config.affected.default_base, "develop");
    }

    #[test]
    fn test_load_config_rejects_bad_json() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join("gantry.json");
        std::fs::write(&config_path, "plugins: [javascript]").unwrap();

        assert!(load_config(&config_path).is_err());
    }

    #[test]
    fn test_load_config_or_default_missing() {
        let temp = TempDir::new().unwrap();
        let (config, path) = load_config_or_default(temp.path());
        assert!(path.is_none());
        assert!(config.plugins.is_empty());
    }
}
