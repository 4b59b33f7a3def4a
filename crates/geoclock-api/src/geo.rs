//! Geographic value types: coordinates, job sites, position samples

use chrono::{DateTime, Local};
use geoclock_util::SiteId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Radius given to new sites when none is specified
pub const DEFAULT_RADIUS_METERS: f64 = 100.0;

/// Offered as a manual location when no active site exists to borrow from
pub const FALLBACK_LOCATION: Coordinate = Coordinate {
    latitude: 51.505,
    longitude: -0.09,
};

/// Errors from constructing geographic values
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeoValueError {
    #[error("latitude {0} is outside [-90, 90]")]
    LatitudeOutOfRange(f64),

    #[error("longitude {0} is outside [-180, 180]")]
    LongitudeOutOfRange(f64),

    #[error("radius must be a positive number of meters, got {0}")]
    InvalidRadius(f64),

    #[error("accuracy must be a non-negative number of meters, got {0}")]
    InvalidAccuracy(f64),

    #[error("site name cannot be empty")]
    EmptyName,
}

/// A latitude/longitude pair in signed degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCoordinate")]
pub struct Coordinate {
    latitude: f64,
    longitude: f64,
}

#[derive(Deserialize)]
struct RawCoordinate {
    latitude: f64,
    longitude: f64,
}

impl TryFrom<RawCoordinate> for Coordinate {
    type Error = GeoValueError;

    fn try_from(raw: RawCoordinate) -> Result<Self, Self::Error> {
        Coordinate::new(raw.latitude, raw.longitude)
    }
}

impl Coordinate {
    /// Create a coordinate, rejecting out-of-range or non-finite values
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, GeoValueError> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(GeoValueError::LatitudeOutOfRange(latitude));
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(GeoValueError::LongitudeOutOfRange(longitude));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.6}, {:.6}", self.latitude, self.longitude)
    }
}

/// A geofenced job site
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSite {
    pub id: SiteId,
    pub name: String,
    pub location: Coordinate,
    pub radius_meters: f64,
    /// Inactive sites are invisible to employees
    pub is_active: bool,
    pub created_at: DateTime<Local>,
}

/// Site fields editable by an administrator
#[derive(Debug, Clone, PartialEq)]
pub struct NewJobSite {
    pub name: String,
    pub location: Coordinate,
    pub radius_meters: f64,
}

impl NewJobSite {
    pub fn new(name: impl Into<String>, location: Coordinate) -> Self {
        Self {
            name: name.into(),
            location,
            radius_meters: DEFAULT_RADIUS_METERS,
        }
    }

    pub fn with_radius(mut self, radius_meters: f64) -> Self {
        self.radius_meters = radius_meters;
        self
    }

    pub fn validate(&self) -> Result<(), GeoValueError> {
        if self.name.trim().is_empty() {
            return Err(GeoValueError::EmptyName);
        }
        validate_radius(self.radius_meters)
    }
}

pub fn validate_radius(radius_meters: f64) -> Result<(), GeoValueError> {
    if radius_meters.is_finite() && radius_meters > 0.0 {
        Ok(())
    } else {
        Err(GeoValueError::InvalidRadius(radius_meters))
    }
}

pub fn validate_accuracy(accuracy_meters: f64) -> Result<(), GeoValueError> {
    if accuracy_meters.is_finite() && accuracy_meters >= 0.0 {
        Ok(())
    } else {
        Err(GeoValueError::InvalidAccuracy(accuracy_meters))
    }
}

/// Where a position sample came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleSource {
    /// Reported by the device's positioning hardware
    Device,
    /// Entered by the user after the device failed to produce a fix
    Manual,
}

/// A single position fix
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionSample {
    pub location: Coordinate,
    pub accuracy_meters: f64,
    pub captured_at: DateTime<Local>,
    pub source: SampleSource,
}

impl PositionSample {
    pub fn device(location: Coordinate, accuracy_meters: f64, captured_at: DateTime<Local>) -> Self {
        Self {
            location,
            accuracy_meters,
            captured_at,
            source: SampleSource::Device,
        }
    }

    pub fn manual(location: Coordinate, accuracy_meters: f64, captured_at: DateTime<Local>) -> Self {
        Self {
            location,
            accuracy_meters,
            captured_at,
            source: SampleSource::Manual,
        }
    }

    /// Age of the sample at `now`; negative if captured in the future
    pub fn age(&self, now: DateTime<Local>) -> chrono::Duration {
        now.signed_duration_since(self.captured_at)
    }
}

/// The active site closest to a position, and how far away it is
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NearestSite {
    pub site: JobSite,
    pub distance_meters: f64,
}

impl NearestSite {
    /// Whether the position lies inside the site's geofence (boundary inclusive)
    pub fn is_within_range(&self) -> bool {
        self.distance_meters <= self.site.radius_meters
    }
}
