//! Fault-injecting store for testing

use chrono::{DateTime, Local};
use geoclock_api::{
    AttendanceEntry, Coordinate, JobSite, NewJobSite, Profile, TimesheetSession,
};
use geoclock_util::{SessionId, SiteId, UserId};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::{
    AuditEvent, AuditLog, ProfileStore, SiteStore, SqliteStore, Store, StoreError, StoreResult,
    TimesheetStore,
};

/// In-memory SQLite store whose operations can be made to fail on demand
///
/// Also counts timesheet writes so tests can assert that an action
/// touched nothing.
pub struct FlakyStore {
    inner: SqliteStore,
    timesheet_writes: AtomicUsize,

    /// Configure `create_session` to fail
    pub fail_create: Arc<Mutex<bool>>,

    /// Configure `complete_session` to fail
    pub fail_complete: Arc<Mutex<bool>>,

    /// Configure `find_active_session` to fail
    pub fail_find_active: Arc<Mutex<bool>>,

    /// Configure site listing to fail
    pub fail_list_sites: Arc<Mutex<bool>>,

    /// Configure `append_audit` to fail
    pub fail_audit: Arc<Mutex<bool>>,
}

impl FlakyStore {
    pub fn new() -> StoreResult<Self> {
        Ok(Self::wrap(SqliteStore::in_memory()?))
    }

    pub fn wrap(inner: SqliteStore) -> Self {
        Self {
            inner,
            timesheet_writes: AtomicUsize::new(0),
            fail_create: Arc::new(Mutex::new(false)),
            fail_complete: Arc::new(Mutex::new(false)),
            fail_find_active: Arc::new(Mutex::new(false)),
            fail_list_sites: Arc::new(Mutex::new(false)),
            fail_audit: Arc::new(Mutex::new(false)),
        }
    }

    /// Attempted `create_session` and `complete_session` calls, failed ones included
    pub fn timesheet_writes(&self) -> usize {
        self.timesheet_writes.load(Ordering::SeqCst)
    }

    fn check(flag: &Mutex<bool>, op: &str) -> StoreResult<()> {
        if *flag.lock().unwrap() {
            return Err(StoreError::Database(format!("{op}: connection lost")));
        }
        Ok(())
    }
}

impl SiteStore for FlakyStore {
    fn list_sites(&self) -> StoreResult<Vec<JobSite>> {
        Self::check(&self.fail_list_sites, "list_sites")?;
        self.inner.list_sites()
    }

    fn list_active_sites(&self) -> StoreResult<Vec<JobSite>> {
        Self::check(&self.fail_list_sites, "list_active_sites")?;
        self.inner.list_active_sites()
    }

    fn get_site(&self, id: &SiteId) -> StoreResult<JobSite> {
        self.inner.get_site(id)
    }

    fn create_site(&self, site: &NewJobSite) -> StoreResult<JobSite> {
        self.inner.create_site(site)
    }

    fn update_site(&self, id: &SiteId, site: &NewJobSite) -> StoreResult<JobSite> {
        self.inner.update_site(id, site)
    }

    fn set_site_active(&self, id: &SiteId, active: bool) -> StoreResult<()> {
        self.inner.set_site_active(id, active)
    }

    fn delete_site(&self, id: &SiteId) -> StoreResult<()> {
        self.inner.delete_site(id)
    }

    fn upsert_site(&self, site: &JobSite) -> StoreResult<()> {
        self.inner.upsert_site(site)
    }
}

impl TimesheetStore for FlakyStore {
    fn find_active_session(&self, user_id: &UserId) -> StoreResult<Option<TimesheetSession>> {
        Self::check(&self.fail_find_active, "find_active_session")?;
        self.inner.find_active_session(user_id)
    }

    fn create_session(
        &self,
        user_id: &UserId,
        site_id: Option<&SiteId>,
        clock_in_location: Coordinate,
        clock_in_time: DateTime<Local>,
    ) -> StoreResult<TimesheetSession> {
        self.timesheet_writes.fetch_add(1, Ordering::SeqCst);
        Self::check(&self.fail_create, "create_session")?;
        self.inner
            .create_session(user_id, site_id, clock_in_location, clock_in_time)
    }

    fn complete_session(
        &self,
        session_id: &SessionId,
        clock_out_time: DateTime<Local>,
    ) -> StoreResult<()> {
        self.timesheet_writes.fetch_add(1, Ordering::SeqCst);
        Self::check(&self.fail_complete, "complete_session")?;
        self.inner.complete_session(session_id, clock_out_time)
    }

    fn list_sessions_for_user(&self, user_id: &UserId) -> StoreResult<Vec<TimesheetSession>> {
        self.inner.list_sessions_for_user(user_id)
    }

    fn list_attendance(&self) -> StoreResult<Vec<AttendanceEntry>> {
        self.inner.list_attendance()
    }
}

impl ProfileStore for FlakyStore {
    fn upsert_profile(&self, profile: &Profile) -> StoreResult<()> {
        self.inner.upsert_profile(profile)
    }

    fn get_profile(&self, id: &UserId) -> StoreResult<Option<Profile>> {
        self.inner.get_profile(id)
    }

    fn list_profiles(&self, search: Option<&str>) -> StoreResult<Vec<Profile>> {
        self.inner.list_profiles(search)
    }
}

impl AuditLog for FlakyStore {
    fn append_audit(&self, event: AuditEvent) -> StoreResult<()> {
        Self::check(&self.fail_audit, "append_audit")?;
        self.inner.append_audit(event)
    }

    fn get_recent_audits(&self, limit: usize) -> StoreResult<Vec<AuditEvent>> {
        self.inner.get_recent_audits(limit)
    }
}

impl Store for FlakyStore {
    fn is_healthy(&self) -> bool {
        self.inner.is_healthy()
    }
}
