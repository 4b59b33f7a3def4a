//! Store trait definitions

use chrono::{DateTime, Local};
use geoclock_api::{
    AttendanceEntry, Coordinate, JobSite, NewJobSite, Profile, TimesheetSession,
};
use geoclock_util::{SessionId, SiteId, UserId};

use crate::{AuditEvent, StoreResult};

/// Job site storage
pub trait SiteStore: Send + Sync {
    /// All sites, newest first
    fn list_sites(&self) -> StoreResult<Vec<JobSite>>;

    /// Sites employees can clock in at, newest first
    fn list_active_sites(&self) -> StoreResult<Vec<JobSite>>;

    fn get_site(&self, id: &SiteId) -> StoreResult<JobSite>;

    /// Create an active site with a generated ID
    fn create_site(&self, site: &NewJobSite) -> StoreResult<JobSite>;

    /// Replace the editable fields of a site
    fn update_site(&self, id: &SiteId, site: &NewJobSite) -> StoreResult<JobSite>;

    fn set_site_active(&self, id: &SiteId, active: bool) -> StoreResult<()>;

    /// Delete a site; timesheets that referenced it lose their site link
    fn delete_site(&self, id: &SiteId) -> StoreResult<()>;

    /// Insert or overwrite a site with a caller-chosen ID
    fn upsert_site(&self, site: &JobSite) -> StoreResult<()>;
}

/// Timesheet storage
pub trait TimesheetStore: Send + Sync {
    /// The user's session with status `clocked_in`, if any
    fn find_active_session(&self, user_id: &UserId) -> StoreResult<Option<TimesheetSession>>;

    /// Record a clock-in
    ///
    /// Fails with [`StoreError::Constraint`](crate::StoreError::Constraint)
    /// if the user already has an active session.
    fn create_session(
        &self,
        user_id: &UserId,
        site_id: Option<&SiteId>,
        clock_in_location: Coordinate,
        clock_in_time: DateTime<Local>,
    ) -> StoreResult<TimesheetSession>;

    /// Record a clock-out on an active session
    fn complete_session(
        &self,
        session_id: &SessionId,
        clock_out_time: DateTime<Local>,
    ) -> StoreResult<()>;

    /// A user's sessions, newest first
    fn list_sessions_for_user(&self, user_id: &UserId) -> StoreResult<Vec<TimesheetSession>>;

    /// Every session with employee and site names, newest clock-in first
    fn list_attendance(&self) -> StoreResult<Vec<AttendanceEntry>>;
}

/// Employee profile storage
pub trait ProfileStore: Send + Sync {
    fn upsert_profile(&self, profile: &Profile) -> StoreResult<()>;

    fn get_profile(&self, id: &UserId) -> StoreResult<Option<Profile>>;

    /// Profiles sorted by full name, optionally filtered by a
    /// case-insensitive search on name or email
    fn list_profiles(&self, search: Option<&str>) -> StoreResult<Vec<Profile>>;
}

/// Append-only audit log
pub trait AuditLog: Send + Sync {
    fn append_audit(&self, event: AuditEvent) -> StoreResult<()>;

    /// Most recent events first
    fn get_recent_audits(&self, limit: usize) -> StoreResult<Vec<AuditEvent>>;
}

/// Main store trait
pub trait Store: SiteStore + TimesheetStore + ProfileStore + AuditLog {
    /// Check if store is healthy
    fn is_healthy(&self) -> bool;
}
