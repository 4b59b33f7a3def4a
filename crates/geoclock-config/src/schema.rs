//! Raw configuration schema (as parsed from TOML)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Raw configuration as parsed from TOML
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawConfig {
    /// Config schema version
    pub config_version: u32,

    /// Storage and log locations
    #[serde(default)]
    pub service: RawServiceConfig,

    /// Position sampling policy
    #[serde(default)]
    pub location: RawLocationConfig,

    /// Job sites to import with `sites sync`
    #[serde(default)]
    pub sites: Vec<RawSite>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawServiceConfig {
    /// Data directory for the database
    pub data_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawLocationConfig {
    /// Oldest position fix (seconds) trusted for a clock-in
    pub max_sample_age_seconds: Option<u64>,

    /// Delay between points when replaying a recorded track
    pub replay_interval_ms: Option<u64>,

    /// Accuracy recorded for manually entered locations
    pub manual_accuracy_meters: Option<f64>,
}

/// Raw job site definition
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawSite {
    /// Stable ID, kept across syncs
    pub id: String,

    pub name: String,

    pub latitude: f64,

    pub longitude: f64,

    /// Geofence radius (default 100m)
    pub radius_meters: Option<f64>,

    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}
