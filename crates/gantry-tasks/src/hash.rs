//! Structural task hashing
//!
//! The hash is a purely structural fingerprint: it covers the task identity
//! and target shape but never source file contents (content hashing is the
//! executor's cache-key concern). Two tasks with identical structural state
//! hash identically across machines and invocations.

use std::collections::BTreeMap;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use sha2::{Digest, Sha256};

use gantry_core::model::{ProjectConfiguration, TargetConfiguration};

use crate::task::TaskId;

/// Field separator. U+001F (unit separator) cannot appear in project names,
/// target names, commands, or glob patterns read from manifests.
const SEP: char = '\u{1F}';

/// Compute the structural hash for a task
pub fn structural_hash(
    id: &TaskId,
    target: &TargetConfiguration,
    project: &ProjectConfiguration,
) -> String {
    let mut fields: Vec<String> = Vec::new();

    fields.push(id.to_string());
    fields.push(target.executor.clone());

    // Options as sorted key=value entries
    for (key, value) in canonical_options(target) {
        fields.push(format!("{}={}", key, value));
    }

    let mut depends_on = target.depends_on.clone();
    depends_on.sort();
    fields.extend(depends_on);

    let mut inputs = target.inputs.clone();
    inputs.sort();
    fields.extend(inputs);

    let mut outputs = target.outputs.clone();
    outputs.sort();
    fields.extend(outputs);

    fields.push(project.name.clone());
    fields.push(project.root.to_string_lossy().to_string());
    fields.extend(project.tags.iter().cloned());

    let mut hasher = Sha256::new();
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            hasher.update(SEP.to_string().as_bytes());
        }
        hasher.update(field.as_bytes());
    }

    STANDARD.encode(hasher.finalize())
}

/// Flatten the typed options into sorted (key, canonical-json) entries
fn canonical_options(target: &TargetConfiguration) -> Vec<(String, String)> {
    let value = serde_json::to_value(&target.options).unwrap_or(serde_json::Value::Null);
    let serde_json::Value::Object(map) = value else {
        return Vec::new();
    };

    // BTreeMap gives deterministic key order; nested maps in the options
    // type are already BTreeMaps.
    let sorted: BTreeMap<String, serde_json::Value> = map.into_iter().collect();
    sorted
        .into_iter()
        .map(|(k, v)| (k, v.to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use gantry_core::model::TargetConfiguration;

    fn project() -> ProjectConfiguration {
        ProjectConfiguration::new("utils", "packages/utils").with_tag("npm")
    }

    fn target() -> TargetConfiguration {
        TargetConfiguration::new("gantry:run-commands")
            .with_commands(vec!["npm run build".to_string()])
            .with_depends_on("^build")
            .with_outputs(vec!["dist/**".to_string()])
    }

    #[test]
    fn test_hash_deterministic() {
        let id = TaskId::new("utils", "build");
        let a = structural_hash(&id, &target(), &project());
        let b = structural_hash(&id, &target(), &project());
        assert_eq!(a, b);
    }

    #[test]
    fn test_hash_changes_with_executor() {
        let id = TaskId::new("utils", "build");
        let base = structural_hash(&id, &target(), &project());

        let mut changed = target();
        changed.executor = "acme:custom".to_string();
        assert_ne!(base, structural_hash(&id, &changed, &project()));
    }

    #[test]
    fn test_hash_changes_with_options() {
        let id = TaskId::new("utils", "build");
        let base = structural_hash(&id, &target(), &project());

        let mut changed = target();
        changed.options.commands = vec!["npm run build -- --prod".to_string()];
        assert_ne!(base, structural_hash(&id, &changed, &project()));

        let mut changed = target();
        changed.options.env.insert("CI".into(), "1".into());
        assert_ne!(base, structural_hash(&id, &changed, &project()));
    }

    #[test]
    fn test_hash_changes_with_depends_on_inputs_outputs() {
        let id = TaskId::new("utils", "build");
        let base = structural_hash(&id, &target(), &project());

        let mut changed = target();
        changed.depends_on.push("lint".to_string());
        assert_ne!(base, structural_hash(&id, &changed, &project()));

        let mut changed = target();
        changed.inputs = vec!["src/**/*".to_string()];
        assert_ne!(base, structural_hash(&id, &changed, &project()));

        let mut changed = target();
        changed.outputs = vec!["out/**".to_string()];
        assert_ne!(base, structural_hash(&id, &changed, &project()));
    }

    #[test]
    fn test_hash_changes_with_project_root_and_tags() {
        let id = TaskId::new("utils", "build");
        let base = structural_hash(&id, &target(), &project());

        let moved = ProjectConfiguration::new("utils", "libs/utils").with_tag("npm");
        assert_ne!(base, structural_hash(&id, &target(), &moved));

        let retagged = project().with_tag("shared");
        assert_ne!(base, structural_hash(&id, &target(), &retagged));
    }

    #[test]
    fn test_hash_insensitive_to_declaration_order() {
        let id = TaskId::new("utils", "build");

        let mut a = target();
        a.depends_on = vec!["lint".to_string(), "^build".to_string()];
        let mut b = target();
        b.depends_on = vec!["^build".to_string(), "lint".to_string()];

        assert_eq!(
            structural_hash(&id, &a, &project()),
            structural_hash(&id, &b, &project())
        );
    }

    #[test]
    fn test_hash_is_base64_of_sha256() {
        let id = TaskId::new("utils", "build");
        let hash = structural_hash(&id, &target(), &project());
        let decoded = STANDARD.decode(&hash).unwrap();
        assert_eq!(decoded.len(), 32);
    }
}
