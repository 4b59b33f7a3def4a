//! Latest-fix tracking with a staleness bound

use chrono::{DateTime, Local};
use geoclock_api::{Coordinate, FALLBACK_LOCATION, JobSite, PositionSample};
use std::time::Duration;
use tracing::{debug, warn};

use crate::{PositionError, PositionEvent};

/// Default bound on sample age for clock-in decisions
pub const DEFAULT_MAX_SAMPLE_AGE: Duration = Duration::from_secs(10);

/// What a recorded event changed
#[derive(Debug, Clone, PartialEq)]
pub enum SamplerUpdate {
    /// A new fix replaced the previous one
    Fix(PositionSample),
    /// The provider failed; any previous fix is no longer trusted
    Lost(PositionError),
}

/// Tracks the most recent position fix
#[derive(Debug, Clone)]
pub struct PositionSampler {
    max_sample_age: Duration,
    latest: Option<PositionSample>,
    last_error: Option<PositionError>,
}

impl PositionSampler {
    pub fn new(max_sample_age: Duration) -> Self {
        Self {
            max_sample_age,
            latest: None,
            last_error: None,
        }
    }

    pub fn max_sample_age(&self) -> Duration {
        self.max_sample_age
    }

    /// Record one event from a subscription
    pub fn record(&mut self, event: PositionEvent) -> SamplerUpdate {
        match event {
            PositionEvent::Sample(sample) => {
                debug!(
                    location = %sample.location,
                    accuracy_m = sample.accuracy_meters,
                    source = ?sample.source,
                    "Position fix"
                );
                self.last_error = None;
                self.latest = Some(sample.clone());
                SamplerUpdate::Fix(sample)
            }
            PositionEvent::Error(error) => {
                warn!(error = %error, "Position provider error");
                self.latest = None;
                self.last_error = Some(error.clone());
                SamplerUpdate::Lost(error)
            }
        }
    }

    /// Substitute a user-supplied location for a device fix
    pub fn use_manual(
        &mut self,
        location: Coordinate,
        accuracy_meters: f64,
        now: DateTime<Local>,
    ) -> SamplerUpdate {
        self.record(PositionEvent::Sample(PositionSample::manual(
            location,
            accuracy_meters,
            now,
        )))
    }

    /// The latest fix regardless of age
    pub fn latest(&self) -> Option<&PositionSample> {
        self.latest.as_ref()
    }

    /// The latest fix, but only if it is young enough to act on
    ///
    /// Fixes stamped in the future (clock skew) count as fresh.
    pub fn fresh_sample(&self, now: DateTime<Local>) -> Option<&PositionSample> {
        let sample = self.latest.as_ref()?;
        let age = sample.age(now);
        match age.to_std() {
            Ok(age) if age > self.max_sample_age => {
                debug!(
                    age_ms = age.as_millis() as u64,
                    max_age_ms = self.max_sample_age.as_millis() as u64,
                    "Latest position fix is stale"
                );
                None
            }
            _ => Some(sample),
        }
    }

    pub fn last_error(&self) -> Option<&PositionError> {
        self.last_error.as_ref()
    }
}

impl Default for PositionSampler {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_SAMPLE_AGE)
    }
}

/// Location to offer when the user asks for a manual fallback:
/// the first active site, or a fixed default.
pub fn manual_fallback_location(sites: &[JobSite]) -> Coordinate {
    sites
        .iter()
        .find(|s| s.is_active)
        .map(|s| s.location)
        .unwrap_or(FALLBACK_LOCATION)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use geoclock_api::SampleSource;
    use geoclock_util::SiteId;

    fn at(secs: i64) -> DateTime<Local> {
        Local.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap() + chrono::Duration::seconds(secs)
    }

    fn fix(captured_at: DateTime<Local>) -> PositionEvent {
        PositionEvent::Sample(PositionSample::device(
            Coordinate::new(51.5007, -0.1246).unwrap(),
            12.0,
            captured_at,
        ))
    }

    #[test]
    fn fresh_within_bound() {
        let mut sampler = PositionSampler::new(Duration::from_secs(10));
        sampler.record(fix(at(0)));

        assert!(sampler.fresh_sample(at(5)).is_some());
        assert!(sampler.fresh_sample(at(10)).is_some());
        assert!(sampler.fresh_sample(at(11)).is_none());
        // Still retained for display
        assert!(sampler.latest().is_some());
    }

    #[test]
    fn future_samples_are_fresh() {
        let mut sampler = PositionSampler::new(Duration::from_secs(10));
        sampler.record(fix(at(30)));
        assert!(sampler.fresh_sample(at(0)).is_some());
    }

    #[test]
    fn error_drops_trusted_fix() {
        let mut sampler = PositionSampler::default();
        sampler.record(fix(at(0)));

        let update = sampler.record(PositionEvent::Error(PositionError::PermissionDenied));
        assert_eq!(update, SamplerUpdate::Lost(PositionError::PermissionDenied));
        assert!(sampler.latest().is_none());
        assert_eq!(sampler.last_error(), Some(&PositionError::PermissionDenied));

        sampler.record(fix(at(1)));
        assert!(sampler.last_error().is_none());
    }

    #[test]
    fn manual_fix_is_marked() {
        let mut sampler = PositionSampler::default();
        let loc = Coordinate::new(40.0, -74.0).unwrap();
        sampler.use_manual(loc, 50.0, at(0));

        let sample = sampler.fresh_sample(at(1)).unwrap();
        assert_eq!(sample.source, SampleSource::Manual);
        assert_eq!(sample.location, loc);
    }

    #[test]
    fn fallback_prefers_first_active_site() {
        let site = |id: &str, active: bool, lat: f64| JobSite {
            id: SiteId::new(id),
            name: id.into(),
            location: Coordinate::new(lat, 0.0).unwrap(),
            radius_meters: 100.0,
            is_active: active,
            created_at: at(0),
        };

        let sites = vec![site("a", false, 1.0), site("b", true, 2.0)];
        assert_eq!(manual_fallback_location(&sites).latitude(), 2.0);

        assert_eq!(manual_fallback_location(&[]), FALLBACK_LOCATION);
    }
}
