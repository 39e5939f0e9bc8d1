//! package.json handling

use std::collections::HashMap;
use std::path::Path;

use gantry_core::error::InferenceError;
use serde::{Deserialize, Serialize};

/// package.json structure (the subset inference needs)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PackageJson {
    /// Package name
    pub name: String,

    /// Package version
    pub version: String,

    /// Scripts
    pub scripts: HashMap<String, String>,

    /// Dependencies
    pub dependencies: HashMap<String, String>,

    /// Dev dependencies
    pub dev_dependencies: HashMap<String, String>,

    /// Peer dependencies
    pub peer_dependencies: HashMap<String, String>,

    /// Whether the package is private
    pub private: bool,

    /// Preserve other fields
    #[serde(flatten)]
    pub other: HashMap<String, serde_json::Value>,
}

impl PackageJson {
    /// Load package.json from a path
    pub fn load(path: &Path) -> Result<Self, InferenceError> {
        let content = std::fs::read_to_string(path).map_err(|e| InferenceError::ManifestParse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        Self::parse(&content).map_err(|reason| InferenceError::ManifestParse {
            path: path.to_path_buf(),
            reason,
        })
    }

    /// Parse package.json content
    pub fn parse(content: &str) -> Result<Self, String> {
        let pkg: PackageJson = serde_json::from_str(content).map_err(|e| e.to_string())?;
        if pkg.name.is_empty() {
            return Err("missing package name".to_string());
        }
        Ok(pkg)
    }

    /// All declared dependency names, production first
    pub fn all_dependency_names(&self) -> Vec<&str> {
        self.dependencies
            .keys()
            .chain(self.dev_dependencies.keys())
            .chain(self.peer_dependencies.keys())
            .map(String::as_str)
            .collect()
    }

    /// Whether a dependency on the given package is declared anywhere
    pub fn depends_on(&self, name: &str) -> bool {
        self.dependencies.contains_key(name)
            || self.dev_dependencies.contains_key(name)
            || self.peer_dependencies.contains_key(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_minimal() {
        let pkg = PackageJson::parse(r#"{"name": "ui", "version": "1.0.0"}"#).unwrap();
        assert_eq!(pkg.name, "ui");
        assert!(pkg.scripts.is_empty());
        assert!(!pkg.private);
    }

    #[test]
    fn test_parse_rejects_missing_name() {
        assert!(PackageJson::parse(r#"{"version": "1.0.0"}"#).is_err());
    }

    #[test]
    fn test_load_with_scripts_and_deps() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("package.json");
        std::fs::write(
            &path,
            r#"{
                "name": "web",
                "version": "0.1.0",
                "private": true,
                "scripts": { "build": "vite build", "dev": "vite" },
                "dependencies": { "ui": "workspace:*", "react": "^18.0.0" },
                "devDependencies": { "vitest": "^1.0.0" }
            }"#,
        )
        .unwrap();

        let pkg = PackageJson::load(&path).unwrap();
        assert!(pkg.private);
        assert_eq!(pkg.scripts.len(), 2);
        assert!(pkg.depends_on("ui"));
        assert!(pkg.depends_on("vitest"));
        assert!(!pkg.depends_on("vue"));
    }

    #[test]
    fn test_load_missing_file() {
        let temp = TempDir::new().unwrap();
        assert!(PackageJson::load(&temp.path().join("package.json")).is_err());
    }
}
