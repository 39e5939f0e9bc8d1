//! RE v2 action construction

use std::collections::BTreeMap;
use std::time::Duration;

use gantry_tasks::Task;

use super::proto::rev2::{
    Action, Command, Digest, EnvironmentVariable, Platform, PlatformProperty,
};

/// Build the Command message for a task: the command list collapses into a
/// single `sh -c` invocation, environment variables are sorted by name, and
/// the declared outputs become output paths.
pub fn build_command(task: &Task, platform: &BTreeMap<String, String>) -> Command {
    let script = task.target.options.commands.join(" && ");

    // BTreeMap iteration yields names in sorted order
    let environment_variables = task
        .target
        .options
        .env
        .iter()
        .map(|(name, value)| EnvironmentVariable {
            name: name.clone(),
            value: value.clone(),
        })
        .collect();

    Command {
        arguments: vec!["sh".to_string(), "-c".to_string(), script],
        environment_variables,
        output_files: Vec::new(),
        output_directories: Vec::new(),
        platform: build_platform(platform),
        working_directory: String::new(),
        output_paths: task.target.outputs.clone(),
    }
}

/// Build the Action wrapping the command and input root
pub fn build_action(
    command_digest: Digest,
    input_root_digest: Digest,
    timeout: Duration,
    do_not_cache: bool,
    platform: &BTreeMap<String, String>,
) -> Action {
    Action {
        command_digest: Some(command_digest),
        input_root_digest: Some(input_root_digest),
        timeout: Some(prost_types::Duration {
            seconds: timeout.as_secs() as i64,
            nanos: timeout.subsec_nanos() as i32,
        }),
        do_not_cache,
        salt: Vec::new(),
        platform: build_platform(platform),
    }
}

/// Effective platform for a task: workspace defaults overlaid with the
/// target's own properties.
pub fn effective_platform(
    defaults: &BTreeMap<String, String>,
    task: &Task,
) -> BTreeMap<String, String> {
    let mut platform = defaults.clone();
    if let Some(remote) = &task.target.remote_execution {
        for (key, value) in &remote.platform {
            platform.insert(key.clone(), value.clone());
        }
    }
    platform
}

fn build_platform(properties: &BTreeMap<String, String>) -> Option<Platform> {
    if properties.is_empty() {
        return None;
    }
    Some(Platform {
        properties: properties
            .iter()
            .map(|(name, value)| PlatformProperty {
                name: name.clone(),
                value: value.clone(),
            })
            .collect(),
    })
}
