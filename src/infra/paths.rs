// src/infra/paths.rs — Config path resolution
//
// DEJAQ_HOME overrides everything. Otherwise config lives in ~/.dejaq/.

use std::path::PathBuf;

/// Returns the DEJAQ_HOME override, if set.
fn dejaq_home() -> Option<PathBuf> {
    std::env::var_os("DEJAQ_HOME").map(PathBuf::from)
}

/// Configuration directory: $DEJAQ_HOME/ or ~/.dejaq/
pub fn config_dir() -> Option<PathBuf> {
    if let Some(home) = dejaq_home() {
        return Some(home);
    }
    directories::BaseDirs::new().map(|dirs| dirs.home_dir().join(".dejaq"))
}

/// Config file path, if a home directory can be determined.
pub fn config_file_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("config.toml"))
}
