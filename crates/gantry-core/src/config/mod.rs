//! Workspace configuration

mod defaults;
mod loader;
mod types;
mod validation;

pub use defaults::{config_file_names, default_excluded_dirs};
pub use loader::{find_config, load_config, load_config_from_dir, load_config_or_default};
pub use types::{
    AffectedConfig, PluginEntry, PluginSpec, RemoteEndpointConfig, RemoteExecutionConfig,
    WorkspaceConfig,
};
pub use validation::validate_config;
