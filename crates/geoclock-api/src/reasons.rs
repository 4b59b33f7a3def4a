//! Structured reasons for refusing a clock-in

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a clock-in was refused
///
/// Each variant has a different remedy, so callers surface them distinctly.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum ClockRejection {
    /// No current position sample, or the latest one is too old
    #[error("no current location signal; refresh your location or use a manual location")]
    NoLocationSignal,

    /// There are no active job sites to match against
    #[error("no active job sites are configured; contact an administrator")]
    NoActiveSites,

    /// The nearest active site is farther than its radius
    #[error(
        "too far from {site_name}: {distance_meters:.0}m away, must be within {radius_meters:.0}m"
    )]
    OutOfRange {
        site_name: String,
        distance_meters: f64,
        radius_meters: f64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_range_message_includes_distance_and_radius() {
        let reason = ClockRejection::OutOfRange {
            site_name: "Depot".into(),
            distance_meters: 150.4,
            radius_meters: 100.0,
        };
        assert_eq!(
            reason.to_string(),
            "too far from Depot: 150m away, must be within 100m"
        );
    }

    #[test]
    fn rejections_serialize_with_code_tag() {
        let json = serde_json::to_value(ClockRejection::NoActiveSites).unwrap();
        assert_eq!(json["code"], "no_active_sites");
    }
}
