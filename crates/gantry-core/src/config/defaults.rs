//! Configuration defaults

/// Config file names searched, in priority order
pub fn config_file_names() -> &'static [&'static str] {
    &["gantry.json", ".gantry.json"]
}

/// Directories never descended into during workspace walks
pub fn default_excluded_dirs() -> &'static [&'static str] {
    &[
        "node_modules",
        "target",
        "build",
        "dist",
        ".git",
        ".gantry",
        ".idea",
        ".vscode",
    ]
}
