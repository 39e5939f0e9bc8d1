//! pom.xml parsing
//!
//! Lightweight element extraction over the manifest text. Handles the
//! common single-module layout; profiles and property interpolation are
//! out of scope.

use std::path::Path;

use gantry_core::error::InferenceError;

/// Parsed pom.xml
#[derive(Debug, Clone, Default)]
pub struct PomXml {
    /// Group ID (falls back to the parent's)
    pub group_id: Option<String>,
    /// Artifact ID
    pub artifact_id: Option<String>,
    /// Version (falls back to the parent's)
    pub version: Option<String>,
    /// Packaging type (jar, war, pom, ...)
    pub packaging: Option<String>,
    /// Parent coordinates
    pub parent: Option<Parent>,
    /// Declared dependencies
    pub dependencies: Vec<MavenCoordinate>,
}

/// Parent POM coordinates
#[derive(Debug, Clone)]
pub struct Parent {
    /// Group ID
    pub group_id: String,
    /// Artifact ID
    pub artifact_id: String,
    /// Version
    pub version: String,
}

/// groupId:artifactId pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MavenCoordinate {
    /// Group ID
    pub group_id: String,
    /// Artifact ID
    pub artifact_id: String,
}

impl MavenCoordinate {
    /// Canonical `groupId:artifactId` form
    pub fn to_key(&self) -> String {
        format!("{}:{}", self.group_id, self.artifact_id)
    }
}

impl PomXml {
    /// Load a pom.xml file
    pub fn load(path: &Path) -> Result<Self, InferenceError> {
        let content = std::fs::read_to_string(path).map_err(|e| InferenceError::ManifestParse {
            path: path.to_path_buf(),
            reason: format!("failed to read pom.xml: {}", e),
        })?;

        Self::parse(&content).map_err(|reason| InferenceError::ManifestParse {
            path: path.to_path_buf(),
            reason,
        })
    }

    /// Parse pom.xml content
    pub fn parse(content: &str) -> Result<Self, String> {
        if !content.contains("<project") {
            return Err("not a pom.xml (missing <project> element)".to_string());
        }

        // Parse <parent> first, then strip it so top-level lookups don't
        // pick up the parent's coordinates.
        let parent = extract_block(content, "parent").and_then(|block| {
            Some(Parent {
                group_id: extract_element(&block, "groupId")?,
                artifact_id: extract_element(&block, "artifactId")?,
                version: extract_element(&block, "version")?,
            })
        });

        let stripped = strip_blocks(content, &["parent", "dependencies", "build", "profiles"]);

        let mut group_id = extract_element(&stripped, "groupId");
        let artifact_id = extract_element(&stripped, "artifactId");
        let mut version = extract_element(&stripped, "version");
        let packaging = extract_element(&stripped, "packaging");

        if let Some(parent) = &parent {
            if group_id.is_none() {
                group_id = Some(parent.group_id.clone());
            }
            if version.is_none() {
                version = Some(parent.version.clone());
            }
        }

        if artifact_id.is_none() {
            return Err("no artifactId found".to_string());
        }

        let mut dependencies = Vec::new();
        if let Some(deps_block) = extract_block(content, "dependencies") {
            let mut rest = deps_block.as_str();
            while let Some(block) = extract_block(rest, "dependency") {
                if let (Some(g), Some(a)) = (
                    extract_element(&block, "groupId"),
                    extract_element(&block, "artifactId"),
                ) {
                    dependencies.push(MavenCoordinate {
                        group_id: g,
                        artifact_id: a,
                    });
                }
                let end = rest.find("</dependency>").map(|i| i + "</dependency>".len());
                match end {
                    Some(end) => rest = &rest[end..],
                    None => break,
                }
            }
        }

        Ok(Self {
            group_id,
            artifact_id,
            version,
            packaging,
            parent,
            dependencies,
        })
    }

    /// This module's own coordinate, when both parts are known
    pub fn coordinate(&self) -> Option<MavenCoordinate> {
        Some(MavenCoordinate {
            group_id: self.group_id.clone()?,
            artifact_id: self.artifact_id.clone()?,
        })
    }
}

/// Extract the text of the first `<tag>...</tag>` element
fn extract_element(content: &str, tag: &str) -> Option<String> {
    let open = format!("<{}>", tag);
    let close = format!("</{}>", tag);

    let start = content.find(&open)? + open.len();
    let end = content[start..].find(&close)? + start;
    let value = content[start..end].trim();

    if value.is_empty() || value.contains('<') {
        None
    } else {
        Some(value.to_string())
    }
}

/// Extract the inner content of the first `<tag>...</tag>` block
fn extract_block(content: &str, tag: &str) -> Option<String> {
    let open = format!("<{}>", tag);
    let close = format!("</{}>", tag);

    let start = content.find(&open)? + open.len();
    let end = content[start..].find(&close)? + start;
    Some(content[start..end].to_string())
}

/// Remove whole `<tag>...</tag>` blocks from the content
fn strip_blocks(content: &str, tags: &[&str]) -> String {
    let mut result = content.to_string();
    for tag in tags {
        let open = format!("<{}>", tag);
        let close = format!("</{}>", tag);
        while let Some(start) = result.find(&open) {
            match result[start..].find(&close) {
                Some(rel_end) => {
                    let end = start + rel_end + close.len();
                    result.replace_range(start..end, "");
                }
                None => break,
            }
        }
    }
    result
}
