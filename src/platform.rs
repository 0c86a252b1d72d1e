//! Cross-platform path resolution.
//!
//! Default locations for the configuration file, audit workspaces and the
//! registry storage directory.

use std::path::PathBuf;

const APP_DIR: &str = "pkgmon";

/// Returns the path to the configuration file.
///
/// - Linux: `~/.config/pkgmon/config.toml`
/// - macOS: `~/Library/Application Support/pkgmon/config.toml`
/// - Windows: `%APPDATA%\pkgmon\config.toml`
pub fn config_file() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
        .join("config.toml")
}

/// Returns the directory audit workspaces are created in.
///
/// - Linux: `~/.cache/pkgmon/workspaces/`
/// - macOS: `~/Library/Caches/pkgmon/workspaces/`
/// - Windows: `%LOCALAPPDATA%\pkgmon\workspaces\`
///
/// Falls back to the system temp directory.
pub fn workspace_root() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(APP_DIR)
        .join("workspaces")
}

/// Returns the default storage directory of a locally hosted registry.
///
/// Location: `<data dir>/verdaccio/storage`, e.g.
/// `~/.local/share/verdaccio/storage/` on Linux.
pub fn registry_storage_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("verdaccio")
        .join("storage")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_are_namespaced() {
        assert!(config_file().ends_with("pkgmon/config.toml"));
        assert!(workspace_root().ends_with("pkgmon/workspaces"));
        assert!(registry_storage_dir().ends_with("verdaccio/storage"));
    }
}
