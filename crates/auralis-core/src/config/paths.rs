//! Standard locations for auralis configuration files

use std::path::PathBuf;

/// Per-user configuration directory
///
/// Returns: `<config dir>/auralis` (e.g. `~/.config/auralis` on Linux)
pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join("auralis")
}

/// Default path of a named config file inside [`config_dir`]
pub fn default_config_path(filename: &str) -> PathBuf {
    config_dir().join(filename)
}
