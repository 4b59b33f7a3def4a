//! Validated settings (converted from raw config)

use crate::schema::{RawConfig, RawLocationConfig, RawServiceConfig, RawSite};
use geoclock_api::{Coordinate, DEFAULT_RADIUS_METERS, JobSite, NewJobSite};
use geoclock_position::DEFAULT_MAX_SAMPLE_AGE;
use geoclock_util::{SiteId, data_dir_without_env};
use std::path::PathBuf;
use std::time::Duration;

/// Default delay between replayed track points
pub const DEFAULT_REPLAY_INTERVAL: Duration = Duration::from_millis(1000);

/// Default accuracy recorded for manual locations
pub const DEFAULT_MANUAL_ACCURACY_METERS: f64 = 50.0;

/// Validated settings
#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub service: ServiceConfig,
    pub location: LocationPolicy,
    /// Sites to import with `sites sync`, in file order
    pub sites: Vec<SiteSeed>,
}

impl Settings {
    /// Convert a validated raw config
    pub fn from_raw(raw: RawConfig) -> Self {
        Self {
            service: ServiceConfig::from_raw(raw.service),
            location: LocationPolicy::from_raw(raw.location),
            sites: raw.sites.into_iter().filter_map(SiteSeed::from_raw).collect(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub data_dir: PathBuf,
}

impl ServiceConfig {
    fn from_raw(raw: RawServiceConfig) -> Self {
        Self {
            data_dir: raw.data_dir.unwrap_or_else(data_dir_without_env),
        }
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(geoclock_util::DATABASE_FILENAME)
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self::from_raw(RawServiceConfig::default())
    }
}

/// How position samples are judged and produced
#[derive(Debug, Clone, PartialEq)]
pub struct LocationPolicy {
    pub max_sample_age: Duration,
    pub replay_interval: Duration,
    pub manual_accuracy_meters: f64,
}

impl LocationPolicy {
    fn from_raw(raw: RawLocationConfig) -> Self {
        let defaults = Self::default();
        Self {
            max_sample_age: raw
                .max_sample_age_seconds
                .map(Duration::from_secs)
                .unwrap_or(defaults.max_sample_age),
            replay_interval: raw
                .replay_interval_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.replay_interval),
            manual_accuracy_meters: raw
                .manual_accuracy_meters
                .unwrap_or(defaults.manual_accuracy_meters),
        }
    }
}

impl Default for LocationPolicy {
    fn default() -> Self {
        Self {
            max_sample_age: DEFAULT_MAX_SAMPLE_AGE,
            replay_interval: DEFAULT_REPLAY_INTERVAL,
            manual_accuracy_meters: DEFAULT_MANUAL_ACCURACY_METERS,
        }
    }
}

/// A site declared in the config file
#[derive(Debug, Clone, PartialEq)]
pub struct SiteSeed {
    pub id: SiteId,
    pub site: NewJobSite,
    pub active: bool,
}

impl SiteSeed {
    fn from_raw(raw: RawSite) -> Option<Self> {
        let location = Coordinate::new(raw.latitude, raw.longitude).ok()?;
        Some(Self {
            id: SiteId::new(raw.id),
            site: NewJobSite::new(raw.name, location)
                .with_radius(raw.radius_meters.unwrap_or(DEFAULT_RADIUS_METERS)),
            active: raw.active,
        })
    }

    /// Materialize as a stored site created at `created_at`
    pub fn to_job_site(&self, created_at: chrono::DateTime<chrono::Local>) -> JobSite {
        JobSite {
            id: self.id.clone(),
            name: self.site.name.clone(),
            location: self.site.location,
            radius_meters: self.site.radius_meters,
            is_active: self.active,
            created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn seed_becomes_job_site() {
        let raw = RawSite {
            id: "yard".into(),
            name: "North Yard".into(),
            latitude: 51.5,
            longitude: -0.1,
            radius_meters: None,
            active: false,
        };
        let seed = SiteSeed::from_raw(raw).unwrap();
        let created = chrono::Local.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap();
        let site = seed.to_job_site(created);

        assert_eq!(site.id.as_str(), "yard");
        assert_eq!(site.radius_meters, DEFAULT_RADIUS_METERS);
        assert!(!site.is_active);
        assert_eq!(site.created_at, created);
    }

    #[test]
    fn default_policy_matches_sampler() {
        let policy = LocationPolicy::default();
        assert_eq!(
            policy.max_sample_age,
            geoclock_position::PositionSampler::default().max_sample_age()
        );
        assert_eq!(policy.replay_interval, DEFAULT_REPLAY_INTERVAL);
    }

    #[test]
    fn database_lives_in_data_dir() {
        let service = ServiceConfig {
            data_dir: PathBuf::from("/srv/geoclock"),
        };
        assert_eq!(
            service.database_path(),
            PathBuf::from("/srv/geoclock/geoclock.db")
        );
    }
}
