//! Configuration validation

use crate::schema::{RawConfig, RawLocationConfig, RawSite};
use geoclock_api::{Coordinate, validate_accuracy, validate_radius};
use std::collections::HashSet;
use thiserror::Error;

/// Accepted range for `max_sample_age_seconds`
pub const SAMPLE_AGE_RANGE_SECS: std::ops::RangeInclusive<u64> = 1..=300;

/// Validation error
#[derive(Debug, Clone, Error)]
pub enum ValidationError {
    #[error("Site '{site_id}': {message}")]
    SiteError { site_id: String, message: String },

    #[error("Duplicate site ID: {0}")]
    DuplicateSiteId(String),

    #[error("Location policy: {0}")]
    LocationError(String),
}

/// Validate a raw configuration
pub fn validate_config(config: &RawConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    let mut seen_ids = HashSet::new();
    for site in &config.sites {
        if !seen_ids.insert(&site.id) {
            errors.push(ValidationError::DuplicateSiteId(site.id.clone()));
        }
    }

    for site in &config.sites {
        errors.extend(validate_site(site));
    }

    errors.extend(validate_location(&config.location));

    errors
}

fn validate_site(site: &RawSite) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let mut fail = |message: String| {
        errors.push(ValidationError::SiteError {
            site_id: site.id.clone(),
            message,
        })
    };

    if site.id.trim().is_empty() {
        fail("id cannot be empty".into());
    }
    if site.name.trim().is_empty() {
        fail("name cannot be empty".into());
    }
    if let Err(e) = Coordinate::new(site.latitude, site.longitude) {
        fail(e.to_string());
    }
    if let Some(radius) = site.radius_meters
        && let Err(e) = validate_radius(radius)
    {
        fail(e.to_string());
    }

    errors
}

fn validate_location(location: &RawLocationConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if let Some(secs) = location.max_sample_age_seconds
        && !SAMPLE_AGE_RANGE_SECS.contains(&secs)
    {
        errors.push(ValidationError::LocationError(format!(
            "max_sample_age_seconds must be {}..={}, got {}",
            SAMPLE_AGE_RANGE_SECS.start(),
            SAMPLE_AGE_RANGE_SECS.end(),
            secs
        )));
    }

    if location.replay_interval_ms == Some(0) {
        errors.push(ValidationError::LocationError(
            "replay_interval_ms must be positive".into(),
        ));
    }

    if let Some(accuracy) = location.manual_accuracy_meters
        && let Err(e) = validate_accuracy(accuracy)
    {
        errors.push(ValidationError::LocationError(format!(
            "manual_accuracy_meters: {}",
            e
        )));
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;

    fn site(id: &str, lat: f64, radius: Option<f64>) -> RawSite {
        RawSite {
            id: id.into(),
            name: format!("Site {id}"),
            latitude: lat,
            longitude: 0.0,
            radius_meters: radius,
            active: true,
        }
    }

    fn config(sites: Vec<RawSite>) -> RawConfig {
        RawConfig {
            config_version: 1,
            service: Default::default(),
            location: Default::default(),
            sites,
        }
    }

    #[test]
    fn test_duplicate_id_detection() {
        let errors = validate_config(&config(vec![site("a", 1.0, None), site("a", 2.0, None)]));
        assert!(
            errors
                .iter()
                .any(|e| matches!(e, ValidationError::DuplicateSiteId(id) if id == "a"))
        );
    }

    #[test]
    fn test_collects_every_site_error() {
        let errors = validate_config(&config(vec![
            site("north", 91.0, None),
            site("flat", 0.0, Some(0.0)),
            site("ok", 0.0, Some(50.0)),
        ]));
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().all(|e| matches!(e, ValidationError::SiteError { .. })));
    }

    #[test]
    fn test_location_policy_bounds() {
        let mut cfg = config(vec![]);
        cfg.location.max_sample_age_seconds = Some(0);
        cfg.location.replay_interval_ms = Some(0);
        cfg.location.manual_accuracy_meters = Some(-1.0);
        assert_eq!(validate_config(&cfg).len(), 3);

        cfg.location.max_sample_age_seconds = Some(300);
        cfg.location.replay_interval_ms = Some(1);
        cfg.location.manual_accuracy_meters = Some(0.0);
        assert!(validate_config(&cfg).is_empty());
    }
}
