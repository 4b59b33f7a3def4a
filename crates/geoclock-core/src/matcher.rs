//! Geofence matching

use geoclock_api::{Coordinate, JobSite, NearestSite};

use crate::distance_meters;

/// The active site closest to `point`
///
/// Inactive sites are ignored. Returns `None` when no site is active. On
/// equal distances the earlier site in `sites` wins.
pub fn find_nearest(point: Coordinate, sites: &[JobSite]) -> Option<NearestSite> {
    let mut best: Option<(&JobSite, f64)> = None;

    for site in sites.iter().filter(|s| s.is_active) {
        let distance = distance_meters(point, site.location);
        match best {
            Some((_, best_distance)) if distance >= best_distance => {}
            _ => best = Some((site, distance)),
        }
    }

    best.map(|(site, distance_meters)| NearestSite {
        site: site.clone(),
        distance_meters,
    })
}
