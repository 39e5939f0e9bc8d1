//! go.mod file parsing

use std::path::Path;

use gantry_core::error::InferenceError;

/// Parsed go.mod file
#[derive(Debug, Clone, Default)]
pub struct GoMod {
    /// Module path
    pub module: String,
    /// Go version
    pub go_version: Option<String>,
    /// Direct dependencies
    pub require: Vec<GoRequire>,
    /// Replace directives (local path replacements count as workspace links)
    pub replace: Vec<GoReplace>,
}

/// A dependency in go.mod
#[derive(Debug, Clone)]
pub struct GoRequire {
    /// Module path
    pub path: String,
    /// Version
    pub version: String,
    /// Whether this is an indirect dependency
    pub indirect: bool,
}

/// A replace directive
#[derive(Debug, Clone)]
pub struct GoReplace {
    /// Original module path
    pub old_path: String,
    /// Replacement path (may be a relative filesystem path)
    pub new_path: String,
}

impl GoMod {
    /// Load a go.mod file
    pub fn load(path: &Path) -> Result<Self, InferenceError> {
        let content = std::fs::read_to_string(path).map_err(|e| InferenceError::ManifestParse {
            path: path.to_path_buf(),
            reason: format!("failed to read go.mod: {}", e),
        })?;

        Self::parse(&content).map_err(|reason| InferenceError::ManifestParse {
            path: path.to_path_buf(),
            reason,
        })
    }

    /// Parse go.mod content
    pub fn parse(content: &str) -> Result<Self, String> {
        let mut module = String::new();
        let mut go_version = None;
        let mut require = Vec::new();
        let mut replace = Vec::new();

        let mut in_block: Option<&str> = None;

        for line in content.lines() {
            let line = line.trim();

            if line.is_empty() || line.starts_with("//") {
                continue;
            }

            if line.ends_with('(') {
                let directive = line.trim_end_matches('(').trim();
                in_block = match directive {
                    "require" => Some("require"),
                    "replace" => Some("replace"),
                    _ => None,
                };
                continue;
            }

            if line == ")" {
                in_block = None;
                continue;
            }

            if let Some(block) = in_block {
                match block {
                    "require" => {
                        if let Some(dep) = parse_require_line(line) {
                            require.push(dep);
                        }
                    }
                    "replace" => {
                        if let Some(rep) = parse_replace_line(line) {
                            replace.push(rep);
                        }
                    }
                    _ => {}
                }
                continue;
            }

            if let Some(rest) = line.strip_prefix("module ") {
                module = rest.trim().to_string();
            } else if let Some(rest) = line.strip_prefix("go ") {
                go_version = Some(rest.trim().to_string());
            } else if let Some(rest) = line.strip_prefix("require ") {
                if let Some(dep) = parse_require_line(rest) {
                    require.push(dep);
                }
            } else if let Some(rest) = line.strip_prefix("replace ") {
                if let Some(rep) = parse_replace_line(rest) {
                    replace.push(rep);
                }
            }
        }

        if module.is_empty() {
            return Err("missing module directive".to_string());
        }

        Ok(Self {
            module,
            go_version,
            require,
            replace,
        })
    }

    /// The last path segment of the module path
    pub fn module_basename(&self) -> &str {
        self.module.rsplit('/').next().unwrap_or(&self.module)
    }
}

fn parse_require_line(line: &str) -> Option<GoRequire> {
    let indirect = line.contains("// indirect");
    let line = line.split("//").next()?.trim();
    let mut parts = line.split_whitespace();
    let path = parts.next()?.to_string();
    let version = parts.next()?.to_string();
    Some(GoRequire {
        path,
        version,
        indirect,
    })
}

fn parse_replace_line(line: &str) -> Option<GoReplace> {
    let line = line.split("//").next()?.trim();
    let (old, new) = line.split_once("=>")?;
    let old_path = old.split_whitespace().next()?.to_string();
    let new_path = new.split_whitespace().next()?.to_string();
    Some(GoReplace { old_path, new_path })
}
