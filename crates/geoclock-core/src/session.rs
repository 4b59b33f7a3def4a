//! Clock-in eligibility

use geoclock_api::{ClockRejection, Coordinate, NearestSite, PositionSample};
use geoclock_util::SiteId;

/// What a clock-in will record, computed once eligibility is established
#[derive(Debug, Clone, PartialEq)]
pub struct ClockInPlan {
    pub site_id: SiteId,
    pub site_name: String,
    pub location: Coordinate,
    pub distance_meters: f64,
    pub radius_meters: f64,
}

/// Decide whether a clock-out -> clock-in transition may happen
///
/// `sample` must already have passed the staleness check; `nearest` is the
/// matcher result for that sample. Checks run in order: location signal,
/// active sites, range.
pub fn evaluate_clock_in(
    sample: Option<&PositionSample>,
    nearest: Option<&NearestSite>,
) -> Result<ClockInPlan, ClockRejection> {
    let sample = sample.ok_or(ClockRejection::NoLocationSignal)?;
    let nearest = nearest.ok_or(ClockRejection::NoActiveSites)?;

    if !nearest.is_within_range() {
        return Err(ClockRejection::OutOfRange {
            site_name: nearest.site.name.clone(),
            distance_meters: nearest.distance_meters,
            radius_meters: nearest.site.radius_meters,
        });
    }

    Ok(ClockInPlan {
        site_id: nearest.site.id.clone(),
        site_name: nearest.site.name.clone(),
        location: sample.location,
        distance_meters: nearest.distance_meters,
        radius_meters: nearest.site.radius_meters,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use geoclock_api::JobSite;

    fn nearest(distance_meters: f64) -> NearestSite {
        NearestSite {
            site: JobSite {
                id: SiteId::new("depot"),
                name: "Depot".into(),
                location: Coordinate::new(51.5007, -0.1246).unwrap(),
                radius_meters: 100.0,
                is_active: true,
                created_at: geoclock_util::now(),
            },
            distance_meters,
        }
    }

    fn sample() -> PositionSample {
        PositionSample::device(
            Coordinate::new(51.5, -0.12).unwrap(),
            10.0,
            geoclock_util::now(),
        )
    }

    #[test]
    fn missing_sample_wins_over_everything() {
        assert_eq!(
            evaluate_clock_in(None, Some(&nearest(10.0))),
            Err(ClockRejection::NoLocationSignal)
        );
        assert_eq!(
            evaluate_clock_in(None, None),
            Err(ClockRejection::NoLocationSignal)
        );
    }

    #[test]
    fn no_sites_is_distinct_from_too_far() {
        assert_eq!(
            evaluate_clock_in(Some(&sample()), None),
            Err(ClockRejection::NoActiveSites)
        );
    }

    #[test]
    fn out_of_range_carries_distance_and_radius() {
        assert_eq!(
            evaluate_clock_in(Some(&sample()), Some(&nearest(150.0))),
            Err(ClockRejection::OutOfRange {
                site_name: "Depot".into(),
                distance_meters: 150.0,
                radius_meters: 100.0,
            })
        );
    }

    #[test]
    fn approved_plan_uses_sample_location() {
        let sample = sample();
        let plan = evaluate_clock_in(Some(&sample), Some(&nearest(80.0))).unwrap();
        assert_eq!(plan.site_id.as_str(), "depot");
        assert_eq!(plan.location, sample.location);
        assert_eq!(plan.distance_meters, 80.0);
    }
}
