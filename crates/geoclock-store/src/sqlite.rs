//! SQLite-based store implementation

use chrono::{DateTime, Local, SecondsFormat, SubsecRound, Utc};
use geoclock_api::{
    AttendanceEntry, Coordinate, JobSite, NewJobSite, Profile, SessionStatus, TimesheetSession,
    UserRole, validate_radius,
};
use geoclock_util::{SessionId, SiteId, UserId, parse_timestamp};
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info, warn};

use crate::{
    AuditEvent, AuditEventType, AuditLog, ProfileStore, SiteStore, Store, StoreError,
    StoreResult, TimesheetStore,
};

const SITE_COLUMNS: &str =
    "s.id, s.name, s.latitude, s.longitude, s.radius_meters, s.is_active, s.created_at";

const SESSION_COLUMNS: &str = "t.id, t.user_id, t.site_id, t.clock_in_time, t.clock_out_time, \
     t.clock_in_latitude, t.clock_in_longitude, t.status";

const PROFILE_COLUMNS: &str = "id, email, full_name, role, created_at";

/// SQLite-based store
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create a store at the given path
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory store (for testing)
    pub fn in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();

        conn.execute_batch(
            r#"
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS job_sites (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                latitude REAL NOT NULL,
                longitude REAL NOT NULL,
                radius_meters REAL NOT NULL DEFAULT 100 CHECK (radius_meters > 0),
                is_active INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS profiles (
                id TEXT PRIMARY KEY,
                email TEXT,
                full_name TEXT,
                role TEXT NOT NULL CHECK (role IN ('admin', 'employee')),
                created_at TEXT NOT NULL
            );

            -- Timesheets outlive the sites they reference
            CREATE TABLE IF NOT EXISTS timesheets (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                site_id TEXT REFERENCES job_sites(id) ON DELETE SET NULL,
                clock_in_time TEXT NOT NULL,
                clock_out_time TEXT,
                clock_in_latitude REAL NOT NULL,
                clock_in_longitude REAL NOT NULL,
                status TEXT NOT NULL CHECK (status IN ('clocked_in', 'completed'))
            );

            -- Audit log (append-only)
            CREATE TABLE IF NOT EXISTS audit_log (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp TEXT NOT NULL,
                event_json TEXT NOT NULL
            );

            -- At most one active session per user, across every client
            CREATE UNIQUE INDEX IF NOT EXISTS idx_timesheets_one_active
                ON timesheets(user_id) WHERE status = 'clocked_in';

            CREATE INDEX IF NOT EXISTS idx_timesheets_user ON timesheets(user_id, clock_in_time);
            CREATE INDEX IF NOT EXISTS idx_timesheets_site ON timesheets(site_id);
            CREATE INDEX IF NOT EXISTS idx_audit_timestamp ON audit_log(timestamp);
            "#,
        )?;

        debug!("Store schema initialized");
        Ok(())
    }
}

/// Fixed-width RFC 3339 in UTC, so text order is time order whatever the
/// local offset was at write time. Values handed back to callers are
/// truncated to the same microsecond precision.
fn timestamp(dt: &DateTime<Local>) -> String {
    dt.with_timezone(&Utc)
        .to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn invalid_column(idx: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, message.into())
}

fn get_time(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Local>> {
    let s: String = row.get(idx)?;
    parse_timestamp(&s).ok_or_else(|| invalid_column(idx, format!("bad timestamp '{s}'")))
}

fn get_coordinate(row: &Row<'_>, lat_idx: usize) -> rusqlite::Result<Coordinate> {
    Coordinate::new(row.get(lat_idx)?, row.get(lat_idx + 1)?)
        .map_err(|e| invalid_column(lat_idx, e.to_string()))
}

fn site_from_row(row: &Row<'_>) -> rusqlite::Result<JobSite> {
    Ok(JobSite {
        id: SiteId::new(row.get::<_, String>(0)?),
        name: row.get(1)?,
        location: get_coordinate(row, 2)?,
        radius_meters: row.get(4)?,
        is_active: row.get(5)?,
        created_at: get_time(row, 6)?,
    })
}

fn session_from_row(row: &Row<'_>) -> rusqlite::Result<TimesheetSession> {
    let id: String = row.get(0)?;
    let status: String = row.get(7)?;
    let clock_out_time = match row.get::<_, Option<String>>(4)? {
        Some(_) => Some(get_time(row, 4)?),
        None => None,
    };

    Ok(TimesheetSession {
        id: SessionId::parse(&id).ok_or_else(|| invalid_column(0, format!("bad session id '{id}'")))?,
        user_id: UserId::new(row.get::<_, String>(1)?),
        site_id: row.get::<_, Option<String>>(2)?.map(SiteId::new),
        clock_in_time: get_time(row, 3)?,
        clock_out_time,
        clock_in_location: get_coordinate(row, 5)?,
        status: SessionStatus::parse(&status)
            .ok_or_else(|| invalid_column(7, format!("bad status '{status}'")))?,
    })
}

fn profile_from_row(row: &Row<'_>) -> rusqlite::Result<Profile> {
    let role: String = row.get(3)?;
    Ok(Profile {
        id: UserId::new(row.get::<_, String>(0)?),
        email: row.get(1)?,
        full_name: row.get(2)?,
        role: UserRole::parse(&role).ok_or_else(|| invalid_column(3, format!("bad role '{role}'")))?,
        created_at: get_time(row, 4)?,
    })
}

fn query_site(conn: &Connection, id: &SiteId) -> StoreResult<JobSite> {
    conn.query_row(
        &format!("SELECT {SITE_COLUMNS} FROM job_sites s WHERE s.id = ?"),
        [id.as_str()],
        site_from_row,
    )
    .optional()?
    .ok_or_else(|| StoreError::NotFound(format!("job site {id}")))
}

impl SiteStore for SqliteStore {
    fn list_sites(&self) -> StoreResult<Vec<JobSite>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {SITE_COLUMNS} FROM job_sites s ORDER BY s.created_at DESC, s.rowid DESC"
        ))?;
        let sites = stmt
            .query_map([], site_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(sites)
    }

    fn list_active_sites(&self) -> StoreResult<Vec<JobSite>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {SITE_COLUMNS} FROM job_sites s WHERE s.is_active = 1 \
             ORDER BY s.created_at DESC, s.rowid DESC"
        ))?;
        let sites = stmt
            .query_map([], site_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(sites)
    }

    fn get_site(&self, id: &SiteId) -> StoreResult<JobSite> {
        let conn = self.conn.lock().unwrap();
        query_site(&conn, id)
    }

    fn create_site(&self, site: &NewJobSite) -> StoreResult<JobSite> {
        site.validate()?;
        let conn = self.conn.lock().unwrap();

        let created = JobSite {
            id: SiteId::generate(),
            name: site.name.trim().to_string(),
            location: site.location,
            radius_meters: site.radius_meters,
            is_active: true,
            created_at: geoclock_util::now().trunc_subsecs(6),
        };

        conn.execute(
            "INSERT INTO job_sites (id, name, latitude, longitude, radius_meters, is_active, created_at) \
             VALUES (?, ?, ?, ?, ?, 1, ?)",
            params![
                created.id.as_str(),
                created.name,
                created.location.latitude(),
                created.location.longitude(),
                created.radius_meters,
                timestamp(&created.created_at),
            ],
        )?;

        info!(site_id = %created.id, name = %created.name, radius_m = created.radius_meters, "Job site created");
        Ok(created)
    }

    fn update_site(&self, id: &SiteId, site: &NewJobSite) -> StoreResult<JobSite> {
        site.validate()?;
        let conn = self.conn.lock().unwrap();

        let changed = conn.execute(
            "UPDATE job_sites SET name = ?, latitude = ?, longitude = ?, radius_meters = ? WHERE id = ?",
            params![
                site.name.trim(),
                site.location.latitude(),
                site.location.longitude(),
                site.radius_meters,
                id.as_str(),
            ],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(format!("job site {id}")));
        }

        debug!(site_id = %id, "Job site updated");
        query_site(&conn, id)
    }

    fn set_site_active(&self, id: &SiteId, active: bool) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        let changed = conn.execute(
            "UPDATE job_sites SET is_active = ? WHERE id = ?",
            params![active, id.as_str()],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(format!("job site {id}")));
        }

        debug!(site_id = %id, active, "Job site activation changed");
        Ok(())
    }

    fn delete_site(&self, id: &SiteId) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        let changed = conn.execute("DELETE FROM job_sites WHERE id = ?", [id.as_str()])?;
        if changed == 0 {
            return Err(StoreError::NotFound(format!("job site {id}")));
        }

        info!(site_id = %id, "Job site deleted");
        Ok(())
    }

    fn upsert_site(&self, site: &JobSite) -> StoreResult<()> {
        if site.name.trim().is_empty() {
            return Err(StoreError::Invalid("site name cannot be empty".into()));
        }
        validate_radius(site.radius_meters)?;

        let conn = self.conn.lock().unwrap();
        conn.execute(
            r#"
            INSERT INTO job_sites (id, name, latitude, longitude, radius_meters, is_active, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                latitude = excluded.latitude,
                longitude = excluded.longitude,
                radius_meters = excluded.radius_meters,
                is_active = excluded.is_active
            "#,
            params![
                site.id.as_str(),
                site.name.trim(),
                site.location.latitude(),
                site.location.longitude(),
                site.radius_meters,
                site.is_active,
                timestamp(&site.created_at),
            ],
        )?;

        debug!(site_id = %site.id, "Job site upserted");
        Ok(())
    }
}

impl TimesheetStore for SqliteStore {
    fn find_active_session(&self, user_id: &UserId) -> StoreResult<Option<TimesheetSession>> {
        let conn = self.conn.lock().unwrap();
        let session = conn
            .query_row(
                &format!(
                    "SELECT {SESSION_COLUMNS} FROM timesheets t \
                     WHERE t.user_id = ? AND t.status = 'clocked_in'"
                ),
                [user_id.as_str()],
                session_from_row,
            )
            .optional()?;
        Ok(session)
    }

    fn create_session(
        &self,
        user_id: &UserId,
        site_id: Option<&SiteId>,
        clock_in_location: Coordinate,
        clock_in_time: DateTime<Local>,
    ) -> StoreResult<TimesheetSession> {
        let clock_in_time = clock_in_time.trunc_subsecs(6);
        let conn = self.conn.lock().unwrap();

        let session = TimesheetSession {
            id: SessionId::new(),
            user_id: user_id.clone(),
            site_id: site_id.cloned(),
            clock_in_time,
            clock_out_time: None,
            clock_in_location,
            status: SessionStatus::ClockedIn,
        };

        conn.execute(
            "INSERT INTO timesheets (id, user_id, site_id, clock_in_time, clock_out_time, \
             clock_in_latitude, clock_in_longitude, status) VALUES (?, ?, ?, ?, NULL, ?, ?, ?)",
            params![
                session.id.to_string(),
                user_id.as_str(),
                site_id.map(|s| s.as_str()),
                timestamp(&clock_in_time),
                clock_in_location.latitude(),
                clock_in_location.longitude(),
                SessionStatus::ClockedIn.as_str(),
            ],
        )?;

        debug!(session_id = %session.id, user_id = %user_id, "Timesheet session created");
        Ok(session)
    }

    fn complete_session(
        &self,
        session_id: &SessionId,
        clock_out_time: DateTime<Local>,
    ) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        let changed = conn.execute(
            "UPDATE timesheets SET clock_out_time = ?, status = ? WHERE id = ? AND status = ?",
            params![
                timestamp(&clock_out_time),
                SessionStatus::Completed.as_str(),
                session_id.to_string(),
                SessionStatus::ClockedIn.as_str(),
            ],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(format!("active session {session_id}")));
        }

        debug!(session_id = %session_id, "Timesheet session completed");
        Ok(())
    }

    fn list_sessions_for_user(&self, user_id: &UserId) -> StoreResult<Vec<TimesheetSession>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {SESSION_COLUMNS} FROM timesheets t WHERE t.user_id = ? \
             ORDER BY t.clock_in_time DESC, t.rowid DESC"
        ))?;
        let sessions = stmt
            .query_map([user_id.as_str()], session_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(sessions)
    }

    fn list_attendance(&self) -> StoreResult<Vec<AttendanceEntry>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {SESSION_COLUMNS}, p.full_name, p.email, s.name FROM timesheets t \
             LEFT JOIN profiles p ON p.id = t.user_id \
             LEFT JOIN job_sites s ON s.id = t.site_id \
             ORDER BY t.clock_in_time DESC, t.rowid DESC"
        ))?;
        let entries = stmt
            .query_map([], |row| {
                Ok(AttendanceEntry {
                    session: session_from_row(row)?,
                    employee_name: row.get(8)?,
                    employee_email: row.get(9)?,
                    site_name: row.get(10)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }
}

impl ProfileStore for SqliteStore {
    fn upsert_profile(&self, profile: &Profile) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            r#"
            INSERT INTO profiles (id, email, full_name, role, created_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                email = excluded.email,
                full_name = excluded.full_name,
                role = excluded.role
            "#,
            params![
                profile.id.as_str(),
                profile.email,
                profile.full_name,
                profile.role.as_str(),
                timestamp(&profile.created_at),
            ],
        )?;

        debug!(user_id = %profile.id, role = profile.role.as_str(), "Profile saved");
        Ok(())
    }

    fn get_profile(&self, id: &UserId) -> StoreResult<Option<Profile>> {
        let conn = self.conn.lock().unwrap();
        let profile = conn
            .query_row(
                &format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE id = ?"),
                [id.as_str()],
                profile_from_row,
            )
            .optional()?;
        Ok(profile)
    }

    fn list_profiles(&self, search: Option<&str>) -> StoreResult<Vec<Profile>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {PROFILE_COLUMNS} FROM profiles ORDER BY full_name COLLATE NOCASE, id"
        ))?;
        let mut profiles = stmt
            .query_map([], profile_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        if let Some(query) = search.map(str::trim).filter(|q| !q.is_empty()) {
            profiles.retain(|p| p.matches_search(query));
        }
        Ok(profiles)
    }
}

impl AuditLog for SqliteStore {
    fn append_audit(&self, mut event: AuditEvent) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        let event_json = serde_json::to_string(&event.event)?;

        conn.execute(
            "INSERT INTO audit_log (timestamp, event_json) VALUES (?, ?)",
            params![timestamp(&event.timestamp), event_json],
        )?;

        event.id = conn.last_insert_rowid();
        debug!(event_id = event.id, kind = event.event.kind(), "Audit event appended");

        Ok(())
    }

    fn get_recent_audits(&self, limit: usize) -> StoreResult<Vec<AuditEvent>> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = conn.prepare(
            "SELECT id, timestamp, event_json FROM audit_log ORDER BY id DESC LIMIT ?",
        )?;

        let rows = stmt.query_map([limit as i64], |row| {
            let id: i64 = row.get(0)?;
            let timestamp = get_time(row, 1)?;
            let event_json: String = row.get(2)?;
            Ok((id, timestamp, event_json))
        })?;

        let mut events = Vec::new();
        for row in rows {
            let (id, timestamp, event_json) = row?;
            let event: AuditEventType = serde_json::from_str(&event_json)?;
            events.push(AuditEvent {
                id,
                timestamp,
                event,
            });
        }

        Ok(events)
    }
}

impl Store for SqliteStore {
    fn is_healthy(&self) -> bool {
        match self.conn.lock() {
            Ok(conn) => conn.query_row("SELECT 1", [], |_| Ok(())).is_ok(),
            Err(_) => {
                warn!("Store lock poisoned");
                false
            }
        }
    }
}
