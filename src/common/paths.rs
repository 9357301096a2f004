//! Configuration and minion cache paths
//!
//! The config file lives in the platform config directory:
//! - Linux: `~/.config/saltcheck/config.toml`
//! - macOS: `~/Library/Application Support/saltcheck/config.toml`
//! - Windows: `%APPDATA%\saltcheck\config.toml`

use std::path::{Path, PathBuf};

/// Name used for the config directory
const APP_NAME: &str = "saltcheck";

/// Name of the fileserver cache below the minion cachedir
const FILES_DIR: &str = "files";

/// Environment that is always searched last
pub const BASE_ENVIRONMENT: &str = "base";

/// Get the configuration directory path
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", APP_NAME).map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the configuration file
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("config.toml"))
}

/// Ordered list of local fileserver cache roots to search for states
///
/// `<cachedir>/files/<environment>` comes first when an environment is set,
/// followed by `<cachedir>/files/base`.
pub fn state_search_roots(cachedir: &Path, environment: Option<&str>) -> Vec<PathBuf> {
    let files = cachedir.join(FILES_DIR);
    let mut roots = Vec::new();
    if let Some(env) = environment.filter(|e| !e.is_empty() && *e != BASE_ENVIRONMENT) {
        roots.push(files.join(env));
    }
    roots.push(files.join(BASE_ENVIRONMENT));
    roots
}

/// Convert a dotted state identifier into a relative path
///
/// `apache.config` becomes `apache/config`.
pub fn state_to_path(state: &str) -> PathBuf {
    state.split('.').collect()
}
