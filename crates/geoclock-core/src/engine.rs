//! Clock engine: position -> nearest site -> clock state

use chrono::{DateTime, Local};
use geoclock_api::{
    ClockRejection, ClockState, Coordinate, JobSite, NearestSite, TimesheetSession,
};
use geoclock_position::{
    PositionError, PositionEvent, PositionSampler, SamplerUpdate, manual_fallback_location,
};
use geoclock_store::{AuditEvent, AuditEventType, AuthProvider, Store, StoreError};
use geoclock_util::UserId;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{CoreEvent, evaluate_clock_in, find_nearest};

/// Errors from clock transitions
#[derive(Debug, Error)]
pub enum ClockError {
    #[error("not signed in")]
    Unauthenticated,

    #[error("already clocked in")]
    AlreadyClockedIn,

    #[error("clock-in refused: {0}")]
    Rejected(#[from] ClockRejection),

    #[error(transparent)]
    Storage(#[from] StoreError),
}

pub type ClockResult<T> = Result<T, ClockError>;

/// Snapshot of the engine for display
#[derive(Debug, Clone)]
pub struct ClockStatus {
    pub user_id: UserId,
    pub state: ClockState,
    pub active_session: Option<TimesheetSession>,
    /// Time on the clock for the active session
    pub elapsed: Option<chrono::Duration>,
    pub nearest: Option<NearestSite>,
    pub position_error: Option<PositionError>,
    pub can_clock_in: bool,
}

/// Per-user clock state machine
///
/// Transitions take `&mut self`, so a single engine never has two
/// transitions in flight. Sessions started by other clients are kept out
/// by the store's one-active-session constraint.
pub struct ClockEngine {
    store: Arc<dyn Store>,
    user_id: UserId,
    sites: Vec<JobSite>,
    sampler: PositionSampler,
    nearest: Option<NearestSite>,
    state: ClockState,
    active: Option<TimesheetSession>,
}

impl ClockEngine {
    /// Resolve the user, their active session, and the active sites
    pub fn load(
        auth: &dyn AuthProvider,
        store: Arc<dyn Store>,
        max_sample_age: Duration,
    ) -> ClockResult<Self> {
        let user_id = auth.current_user_id().ok_or(ClockError::Unauthenticated)?;
        let active = store.find_active_session(&user_id)?;
        let sites = store.list_active_sites()?;

        let state = if active.is_some() {
            ClockState::ClockedIn
        } else {
            ClockState::ClockedOut
        };

        info!(
            user_id = %user_id,
            state = ?state,
            site_count = sites.len(),
            "Clock engine loaded"
        );

        Ok(Self {
            store,
            user_id,
            sites,
            sampler: PositionSampler::new(max_sample_age),
            nearest: None,
            state,
            active,
        })
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn state(&self) -> ClockState {
        self.state
    }

    pub fn active_session(&self) -> Option<&TimesheetSession> {
        self.active.as_ref()
    }

    pub fn nearest(&self) -> Option<&NearestSite> {
        self.nearest.as_ref()
    }

    pub fn sites(&self) -> &[JobSite] {
        &self.sites
    }

    pub fn sampler(&self) -> &PositionSampler {
        &self.sampler
    }

    /// Re-read the active sites
    pub fn refresh_sites(&mut self) -> ClockResult<Option<CoreEvent>> {
        self.sites = self.store.list_active_sites()?;
        debug!(site_count = self.sites.len(), "Sites refreshed");
        Ok(self.recompute_nearest())
    }

    /// Feed one event from the position subscription
    pub fn ingest(&mut self, event: PositionEvent) -> Option<CoreEvent> {
        match self.sampler.record(event) {
            SamplerUpdate::Fix(_) => self.recompute_nearest(),
            SamplerUpdate::Lost(error) => {
                self.nearest = None;
                Some(CoreEvent::PositionLost { error })
            }
        }
    }

    /// Use a location the user supplied in place of a device fix
    pub fn use_manual_location(
        &mut self,
        location: Coordinate,
        accuracy_meters: f64,
        now: DateTime<Local>,
    ) -> Option<CoreEvent> {
        info!(location = %location, "Using manual location");
        self.sampler.use_manual(location, accuracy_meters, now);
        self.recompute_nearest()
    }

    /// Location offered for a manual fallback
    pub fn manual_fallback(&self) -> Coordinate {
        manual_fallback_location(&self.sites)
    }

    fn recompute_nearest(&mut self) -> Option<CoreEvent> {
        let nearest = self
            .sampler
            .latest()
            .and_then(|sample| find_nearest(sample.location, &self.sites));

        if nearest == self.nearest {
            return None;
        }

        if let Some(n) = &nearest {
            debug!(
                site_id = %n.site.id,
                distance_m = n.distance_meters,
                radius_m = n.site.radius_meters,
                within_range = n.is_within_range(),
                "Nearest site"
            );
        }

        self.nearest = nearest.clone();
        Some(CoreEvent::NearestSiteChanged { nearest })
    }

    /// Whether a clock-in attempted at `now` would pass every check short
    /// of the storage write
    pub fn can_clock_in(&self, now: DateTime<Local>) -> bool {
        self.state == ClockState::ClockedOut
            && evaluate_clock_in(self.sampler.fresh_sample(now), self.nearest.as_ref()).is_ok()
    }

    /// ClockedOut -> ClockedIn
    pub fn clock_in(&mut self, now: DateTime<Local>) -> ClockResult<CoreEvent> {
        if self.state == ClockState::ClockedIn {
            return Err(ClockError::AlreadyClockedIn);
        }

        let plan = match evaluate_clock_in(self.sampler.fresh_sample(now), self.nearest.as_ref()) {
            Ok(plan) => plan,
            Err(reason) => {
                info!(user_id = %self.user_id, reason = %reason, "Clock-in rejected");
                self.audit(AuditEventType::ClockInRejected {
                    user_id: self.user_id.clone(),
                    reason: reason.clone(),
                });
                return Err(reason.into());
            }
        };

        let session = self
            .store
            .create_session(&self.user_id, Some(&plan.site_id), plan.location, now)
            .inspect_err(|e| warn!(user_id = %self.user_id, error = %e, "Clock-in write failed"))?;

        info!(
            session_id = %session.id,
            user_id = %self.user_id,
            site_id = %plan.site_id,
            distance_m = plan.distance_meters,
            radius_m = plan.radius_meters,
            "Clocked in"
        );

        self.audit(AuditEventType::ClockedIn {
            session_id: session.id,
            user_id: self.user_id.clone(),
            site_id: Some(plan.site_id.clone()),
            distance_meters: plan.distance_meters,
        });

        self.state = ClockState::ClockedIn;
        self.active = Some(session.clone());

        Ok(CoreEvent::ClockedIn {
            session,
            site_name: plan.site_name,
            distance_meters: plan.distance_meters,
        })
    }

    /// ClockedIn -> ClockedOut
    ///
    /// Returns `None` when there was no active session to complete; the
    /// state is reset to `ClockedOut` and nothing is written.
    pub fn clock_out(&mut self, now: DateTime<Local>) -> ClockResult<Option<CoreEvent>> {
        let Some(session) = self.active.as_ref() else {
            if self.state == ClockState::ClockedIn {
                warn!(user_id = %self.user_id, "Clocked in without an active session, resetting");
            }
            self.state = ClockState::ClockedOut;
            return Ok(None);
        };

        self.store
            .complete_session(&session.id, now)
            .inspect_err(|e| warn!(session_id = %session.id, error = %e, "Clock-out write failed"))?;

        let session_id = session.id;
        let worked = now.signed_duration_since(session.clock_in_time);

        info!(
            session_id = %session_id,
            user_id = %self.user_id,
            worked_secs = worked.num_seconds(),
            "Clocked out"
        );

        self.audit(AuditEventType::ClockedOut {
            session_id,
            user_id: self.user_id.clone(),
            worked_seconds: worked.num_seconds(),
        });

        self.state = ClockState::ClockedOut;
        self.active = None;

        Ok(Some(CoreEvent::ClockedOut {
            session_id,
            clock_out_time: now,
            worked,
        }))
    }

    pub fn status(&self, now: DateTime<Local>) -> ClockStatus {
        ClockStatus {
            user_id: self.user_id.clone(),
            state: self.state,
            active_session: self.active.clone(),
            elapsed: self.active.as_ref().map(|s| s.worked(now)),
            nearest: self.nearest.clone(),
            position_error: self.sampler.last_error().cloned(),
            can_clock_in: self.can_clock_in(now),
        }
    }

    fn audit(&self, event: AuditEventType) {
        if let Err(e) = self.store.append_audit(AuditEvent::new(event)) {
            warn!(error = %e, "Failed to write audit event");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use geoclock_api::{NewJobSite, PositionSample, SampleSource, SessionStatus};
    use geoclock_position::{MockPositionProvider, PositionProvider};
    use geoclock_store::{AuditLog, FlakyStore, SiteStore, SqliteStore, StaticAuth, TimesheetStore};

    const METERS_PER_DEGREE_LAT: f64 = crate::EARTH_RADIUS_METERS * std::f64::consts::PI / 180.0;

    fn at(hour: u32, min: u32, sec: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(2025, 3, 10, hour, min, sec).unwrap()
    }

    fn site_location() -> Coordinate {
        Coordinate::new(51.5007, -0.1246).unwrap()
    }

    fn north_of_site(meters: f64) -> Coordinate {
        Coordinate::new(51.5007 + meters / METERS_PER_DEGREE_LAT, -0.1246).unwrap()
    }

    fn fix(location: Coordinate, captured_at: DateTime<Local>) -> PositionEvent {
        PositionEvent::Sample(PositionSample::device(location, 5.0, captured_at))
    }

    fn sqlite_with_site() -> Arc<SqliteStore> {
        let store = SqliteStore::in_memory().unwrap();
        store
            .create_site(&NewJobSite::new("Westminster", site_location()).with_radius(100.0))
            .unwrap();
        Arc::new(store)
    }

    fn flaky_with_site() -> Arc<FlakyStore> {
        let store = FlakyStore::new().unwrap();
        store
            .create_site(&NewJobSite::new("Westminster", site_location()).with_radius(100.0))
            .unwrap();
        Arc::new(store)
    }

    fn engine(store: Arc<dyn Store>) -> ClockEngine {
        ClockEngine::load(&StaticAuth::new("dana"), store, Duration::from_secs(10)).unwrap()
    }

    #[test]
    fn test_out_of_range_then_in_range() {
        let store = sqlite_with_site();
        let mut engine = engine(store.clone());
        assert_eq!(engine.state(), ClockState::ClockedOut);

        engine.ingest(fix(north_of_site(150.0), at(9, 0, 0)));
        let err = engine.clock_in(at(9, 0, 1)).unwrap_err();
        match err {
            ClockError::Rejected(ClockRejection::OutOfRange {
                distance_meters,
                radius_meters,
                ..
            }) => {
                assert!((distance_meters - 150.0).abs() < 0.01, "got {distance_meters}");
                assert_eq!(radius_meters, 100.0);
            }
            other => panic!("expected OutOfRange, got {other:?}"),
        }
        assert_eq!(engine.state(), ClockState::ClockedOut);
        assert!(store.find_active_session(engine.user_id()).unwrap().is_none());

        engine.ingest(fix(north_of_site(80.0), at(9, 1, 0)));
        assert!(engine.can_clock_in(at(9, 1, 1)));
        let event = engine.clock_in(at(9, 1, 1)).unwrap();
        let CoreEvent::ClockedIn { session, .. } = event else {
            panic!("expected ClockedIn");
        };
        assert_eq!(session.status, SessionStatus::ClockedIn);
        assert_eq!(session.clock_in_location, north_of_site(80.0));
        assert_eq!(engine.state(), ClockState::ClockedIn);

        let event = engine.clock_out(at(9, 1, 30)).unwrap();
        assert!(matches!(event, Some(CoreEvent::ClockedOut { .. })));
        assert_eq!(engine.state(), ClockState::ClockedOut);

        let history = store.list_sessions_for_user(engine.user_id()).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].status, SessionStatus::Completed);
        let out = history[0].clock_out_time.unwrap();
        assert!(out > history[0].clock_in_time);
    }

    #[test]
    fn test_no_signal_and_no_sites() {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let mut engine = engine(store.clone());

        assert!(matches!(
            engine.clock_in(at(9, 0, 0)),
            Err(ClockError::Rejected(ClockRejection::NoLocationSignal))
        ));

        engine.ingest(fix(site_location(), at(9, 0, 0)));
        assert!(engine.nearest().is_none());
        assert!(matches!(
            engine.clock_in(at(9, 0, 1)),
            Err(ClockError::Rejected(ClockRejection::NoActiveSites))
        ));

        // Both refusals were audited
        assert_eq!(store.get_recent_audits(10).unwrap().len(), 2);
    }

    #[test]
    fn test_stale_fix_is_no_signal() {
        let mut engine = engine(sqlite_with_site());
        engine.ingest(fix(site_location(), at(9, 0, 0)));

        assert!(matches!(
            engine.clock_in(at(9, 0, 11)),
            Err(ClockError::Rejected(ClockRejection::NoLocationSignal))
        ));
        assert!(engine.clock_in(at(9, 0, 10)).is_ok());
    }

    #[test]
    fn test_position_error_drops_nearest() {
        let mut engine = engine(sqlite_with_site());
        engine.ingest(fix(site_location(), at(9, 0, 0)));
        assert!(engine.nearest().is_some());

        let event = engine.ingest(PositionEvent::Error(PositionError::PermissionDenied));
        assert_eq!(
            event,
            Some(CoreEvent::PositionLost {
                error: PositionError::PermissionDenied
            })
        );
        assert!(engine.nearest().is_none());
        assert!(matches!(
            engine.clock_in(at(9, 0, 1)),
            Err(ClockError::Rejected(ClockRejection::NoLocationSignal))
        ));

        // Manual fallback recovers
        let fallback = engine.manual_fallback();
        assert_eq!(fallback, site_location());
        engine.use_manual_location(fallback, 50.0, at(9, 0, 2));
        assert_eq!(
            engine.sampler().latest().map(|s| s.source),
            Some(SampleSource::Manual)
        );
        assert!(engine.sampler().last_error().is_none());
        assert!(engine.clock_in(at(9, 0, 3)).is_ok());
    }

    #[test]
    fn test_nearest_changes_only_when_result_moves() {
        let mut engine = engine(sqlite_with_site());
        assert!(matches!(
            engine.ingest(fix(site_location(), at(9, 0, 0))),
            Some(CoreEvent::NearestSiteChanged { nearest: Some(_) })
        ));
        assert_eq!(engine.ingest(fix(site_location(), at(9, 0, 1))), None);
    }

    #[test]
    fn test_clock_in_twice_is_refused() {
        let store = sqlite_with_site();
        let mut engine = engine(store.clone());
        engine.ingest(fix(site_location(), at(9, 0, 0)));
        engine.clock_in(at(9, 0, 1)).unwrap();

        assert!(!engine.can_clock_in(at(9, 0, 2)));
        assert!(matches!(
            engine.clock_in(at(9, 0, 2)),
            Err(ClockError::AlreadyClockedIn)
        ));
        assert_eq!(store.list_sessions_for_user(engine.user_id()).unwrap().len(), 1);
    }

    #[test]
    fn test_double_clock_out_writes_once() {
        let store = flaky_with_site();
        let mut engine = engine(store.clone());
        engine.ingest(fix(site_location(), at(9, 0, 0)));
        engine.clock_in(at(9, 0, 1)).unwrap();

        assert!(engine.clock_out(at(17, 0, 0)).unwrap().is_some());
        let writes = store.timesheet_writes();

        assert_eq!(engine.clock_out(at(17, 0, 5)).unwrap(), None);
        assert_eq!(engine.state(), ClockState::ClockedOut);
        assert_eq!(store.timesheet_writes(), writes);

        let history = store.list_sessions_for_user(engine.user_id()).unwrap();
        assert_eq!(history[0].clock_out_time, Some(at(17, 0, 0)));
    }

    #[test]
    fn test_clock_in_write_failure_keeps_state() {
        let store = flaky_with_site();
        let mut engine = engine(store.clone());
        engine.ingest(fix(site_location(), at(9, 0, 0)));

        *store.fail_create.lock().unwrap() = true;
        assert!(matches!(
            engine.clock_in(at(9, 0, 1)),
            Err(ClockError::Storage(StoreError::Database(_)))
        ));
        assert_eq!(engine.state(), ClockState::ClockedOut);
        assert!(engine.active_session().is_none());

        // Retry succeeds once storage recovers
        *store.fail_create.lock().unwrap() = false;
        engine.clock_in(at(9, 0, 2)).unwrap();
        assert_eq!(engine.state(), ClockState::ClockedIn);
    }

    #[test]
    fn test_clock_out_write_failure_keeps_session() {
        let store = flaky_with_site();
        let mut engine = engine(store.clone());
        engine.ingest(fix(site_location(), at(9, 0, 0)));
        engine.clock_in(at(9, 0, 1)).unwrap();
        let session_id = engine.active_session().unwrap().id;

        *store.fail_complete.lock().unwrap() = true;
        assert!(engine.clock_out(at(12, 0, 0)).is_err());
        assert_eq!(engine.state(), ClockState::ClockedIn);
        assert_eq!(engine.active_session().unwrap().id, session_id);

        *store.fail_complete.lock().unwrap() = false;
        engine.clock_out(at(12, 0, 1)).unwrap();
        assert_eq!(engine.state(), ClockState::ClockedOut);
    }

    #[test]
    fn test_audit_failure_does_not_fail_clock_in() {
        let store = flaky_with_site();
        *store.fail_audit.lock().unwrap() = true;

        let mut engine = engine(store);
        engine.ingest(fix(site_location(), at(9, 0, 0)));
        assert!(engine.clock_in(at(9, 0, 1)).is_ok());
    }

    #[test]
    fn test_load_resumes_active_session() {
        let store = sqlite_with_site();
        let mut first = engine(store.clone());
        first.ingest(fix(site_location(), at(9, 0, 0)));
        first.clock_in(at(9, 0, 1)).unwrap();

        let second = engine(store);
        assert_eq!(second.state(), ClockState::ClockedIn);
        assert_eq!(
            second.active_session().map(|s| s.id),
            first.active_session().map(|s| s.id)
        );

        let status = second.status(at(10, 30, 1));
        assert_eq!(status.elapsed.map(|d| d.num_minutes()), Some(90));
        assert!(!status.can_clock_in);
    }

    #[test]
    fn test_second_engine_cannot_open_second_session() {
        let store = sqlite_with_site();
        let mut phone = engine(store.clone());
        let mut tablet = engine(store.clone());

        phone.ingest(fix(site_location(), at(9, 0, 0)));
        tablet.ingest(fix(site_location(), at(9, 0, 0)));

        phone.clock_in(at(9, 0, 1)).unwrap();
        assert!(matches!(
            tablet.clock_in(at(9, 0, 2)),
            Err(ClockError::Storage(StoreError::Constraint(_)))
        ));
        assert_eq!(tablet.state(), ClockState::ClockedOut);
    }

    #[test]
    fn test_unauthenticated_load() {
        let store = sqlite_with_site();
        assert!(matches!(
            ClockEngine::load(&StaticAuth::signed_out(), store, Duration::from_secs(10)),
            Err(ClockError::Unauthenticated)
        ));
    }

    #[test]
    fn test_load_surfaces_storage_failure() {
        let store = flaky_with_site();
        *store.fail_find_active.lock().unwrap() = true;
        assert!(matches!(
            ClockEngine::load(&StaticAuth::new("dana"), store.clone(), Duration::from_secs(10)),
            Err(ClockError::Storage(StoreError::Database(_)))
        ));

        *store.fail_find_active.lock().unwrap() = false;
        *store.fail_list_sites.lock().unwrap() = true;
        assert!(matches!(
            ClockEngine::load(&StaticAuth::new("dana"), store, Duration::from_secs(10)),
            Err(ClockError::Storage(_))
        ));
    }

    #[test]
    fn test_refresh_picks_up_new_site() {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let mut engine = engine(store.clone());
        engine.ingest(fix(site_location(), at(9, 0, 0)));
        assert!(engine.nearest().is_none());

        store
            .create_site(&NewJobSite::new("Westminster", site_location()))
            .unwrap();
        let event = engine.refresh_sites().unwrap();
        assert!(matches!(
            event,
            Some(CoreEvent::NearestSiteChanged { nearest: Some(_) })
        ));
        assert!(engine.can_clock_in(at(9, 0, 1)));
    }

    #[test]
    fn test_driven_by_subscription() {
        let provider = MockPositionProvider::new();
        let mut sub = provider.watch().unwrap();
        let mut engine = engine(sqlite_with_site());

        let now = geoclock_util::now();
        provider.push_fix(north_of_site(150.0), 5.0, now);
        provider.push_fix(north_of_site(20.0), 5.0, now);

        while let Some(event) = sub.try_next() {
            engine.ingest(event);
        }
        assert!(engine.nearest().unwrap().is_within_range());
        assert!(engine.clock_in(now).is_ok());

        sub.stop();
        assert_eq!(provider.active_subscriptions(), 0);
    }
}
