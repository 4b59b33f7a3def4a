//! Default paths for geoclock
//!
//! Paths are user-writable by default:
//! - Config: `$XDG_CONFIG_HOME/geoclock/config.toml` or `~/.config/geoclock/config.toml`
//! - Data: `$XDG_DATA_HOME/geoclock` or `~/.local/share/geoclock`
//!
//! `GEOCLOCK_DATA_DIR` is read by the CLI and overrides the data directory.

use std::path::PathBuf;

/// Application subdirectory name
const APP_DIR: &str = "geoclock";

/// Config filename within the config directory
const CONFIG_FILENAME: &str = "config.toml";

/// Database filename within the data directory
pub const DATABASE_FILENAME: &str = "geoclock.db";

fn xdg_dir(var: &str, home_suffix: &[&str], fallback: &str) -> PathBuf {
    if let Ok(dir) = std::env::var(var) {
        return PathBuf::from(dir).join(APP_DIR);
    }

    if let Ok(home) = std::env::var("HOME") {
        let mut path = PathBuf::from(home);
        path.extend(home_suffix);
        return path.join(APP_DIR);
    }

    PathBuf::from("/tmp").join(APP_DIR).join(fallback)
}

/// Get the default config file path.
pub fn default_config_path() -> PathBuf {
    xdg_dir("XDG_CONFIG_HOME", &[".config"], "config").join(CONFIG_FILENAME)
}

/// Default data directory, ignoring `GEOCLOCK_DATA_DIR`
pub fn data_dir_without_env() -> PathBuf {
    xdg_dir("XDG_DATA_HOME", &[".local", "share"], "data")
}
