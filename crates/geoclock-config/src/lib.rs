//! Configuration parsing and validation for geoclock
//!
//! Supports TOML configuration with:
//! - Versioned schema
//! - Location sampling policy (staleness bound, replay cadence)
//! - Seed job sites for `geoclock sites sync`
//! - Validation that reports every problem at once

mod schema;
mod settings;
mod validation;

pub use schema::*;
pub use settings::*;
pub use validation::*;

use std::path::Path;
use thiserror::Error;
use tracing::debug;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Validation failed: {errors:?}")]
    ValidationFailed { errors: Vec<ValidationError> },

    #[error("Unsupported config version: {0}")]
    UnsupportedVersion(u32),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Current supported config version
pub const CURRENT_CONFIG_VERSION: u32 = 1;

/// Load and validate configuration from a TOML file
pub fn load_config(path: impl AsRef<Path>) -> ConfigResult<Settings> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Like [`load_config`], but a missing file yields the defaults
pub fn load_config_or_default(path: impl AsRef<Path>) -> ConfigResult<Settings> {
    let path = path.as_ref();
    if !path.exists() {
        debug!(path = %path.display(), "No config file, using defaults");
        return Ok(Settings::default());
    }
    load_config(path)
}

/// Parse and validate configuration from a TOML string
pub fn parse_config(content: &str) -> ConfigResult<Settings> {
    let raw: RawConfig = toml::from_str(content)?;

    if raw.config_version != CURRENT_CONFIG_VERSION {
        return Err(ConfigError::UnsupportedVersion(raw.config_version));
    }

    let errors = validate_config(&raw);
    if !errors.is_empty() {
        return Err(ConfigError::ValidationFailed { errors });
    }

    Ok(Settings::from_raw(raw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn parse_minimal_config() {
        let settings = parse_config("config_version = 1").unwrap();
        assert!(settings.sites.is_empty());
        assert_eq!(settings.location.max_sample_age, Duration::from_secs(10));
    }

    #[test]
    fn parse_full_config() {
        let config = r#"
            config_version = 1

            [service]
            data_dir = "/var/lib/geoclock"

            [location]
            max_sample_age_seconds = 5
            replay_interval_ms = 250

            [[sites]]
            id = "westminster"
            name = "Westminster Yard"
            latitude = 51.5007
            longitude = -0.1246
            radius_meters = 150

            [[sites]]
            id = "old-depot"
            name = "Old Depot"
            latitude = 51.52
            longitude = -0.10
            active = false
        "#;

        let settings = parse_config(config).unwrap();
        assert_eq!(settings.location.max_sample_age, Duration::from_secs(5));
        assert_eq!(settings.location.replay_interval, Duration::from_millis(250));
        assert_eq!(settings.sites.len(), 2);
        assert_eq!(settings.sites[0].site.radius_meters, 150.0);
        assert!(settings.sites[0].active);
        assert_eq!(settings.sites[1].site.radius_meters, 100.0);
        assert!(!settings.sites[1].active);
        assert_eq!(
            settings.service.data_dir,
            std::path::PathBuf::from("/var/lib/geoclock")
        );
    }

    #[test]
    fn reject_wrong_version() {
        let result = parse_config("config_version = 99");
        assert!(matches!(result, Err(ConfigError::UnsupportedVersion(99))));
    }

    #[test]
    fn missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = load_config_or_default(dir.path().join("absent.toml")).unwrap();
        assert!(settings.sites.is_empty());
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "config_version = 1\n[location]\nmax_sample_age_seconds = 7\n")
            .unwrap();

        let settings = load_config(&path).unwrap();
        assert_eq!(settings.location.max_sample_age, Duration::from_secs(7));
    }
}
