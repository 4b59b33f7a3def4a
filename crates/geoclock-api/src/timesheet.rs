//! Timesheet sessions and clock state

use chrono::{DateTime, Local};
use geoclock_util::{SessionId, SiteId, UserId};
use serde::{Deserialize, Serialize};

use crate::Coordinate;

/// Persisted status of a timesheet session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    ClockedIn,
    Completed,
}

impl SessionStatus {
    /// Storage representation
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::ClockedIn => "clocked_in",
            SessionStatus::Completed => "completed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "clocked_in" => Some(SessionStatus::ClockedIn),
            "completed" => Some(SessionStatus::Completed),
            _ => None,
        }
    }

    /// Human-readable label for reports
    pub fn label(&self) -> &'static str {
        match self {
            SessionStatus::ClockedIn => "Clocked In",
            SessionStatus::Completed => "Completed",
        }
    }
}

/// Per-user clock state held by the session state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClockState {
    ClockedOut,
    ClockedIn,
}

/// One clock-in/clock-out record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimesheetSession {
    pub id: SessionId,
    pub user_id: UserId,
    /// None once the referenced site has been deleted
    pub site_id: Option<SiteId>,
    pub clock_in_time: DateTime<Local>,
    pub clock_out_time: Option<DateTime<Local>>,
    pub clock_in_location: Coordinate,
    pub status: SessionStatus,
}

impl TimesheetSession {
    pub fn is_active(&self) -> bool {
        self.status == SessionStatus::ClockedIn
    }

    /// Worked time: until clock-out, or until `now` while still active
    pub fn worked(&self, now: DateTime<Local>) -> chrono::Duration {
        let end = self.clock_out_time.unwrap_or(now);
        end.signed_duration_since(self.clock_in_time)
    }
}

/// A session joined with the names an attendance log displays
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendanceEntry {
    pub session: TimesheetSession,
    pub employee_name: Option<String>,
    pub employee_email: Option<String>,
    pub site_name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn status_round_trips_through_storage_form() {
        for status in [SessionStatus::ClockedIn, SessionStatus::Completed] {
            assert_eq!(SessionStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(SessionStatus::parse("suspended"), None);
    }

    #[test]
    fn worked_uses_now_while_active() {
        let start = Local.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap();
        let mut session = TimesheetSession {
            id: SessionId::new(),
            user_id: UserId::new("u1"),
            site_id: Some(SiteId::new("hq")),
            clock_in_time: start,
            clock_out_time: None,
            clock_in_location: Coordinate::new(0.0, 0.0).unwrap(),
            status: SessionStatus::ClockedIn,
        };

        let later = start + chrono::Duration::minutes(90);
        assert!(session.is_active());
        assert_eq!(session.worked(later).num_minutes(), 90);

        session.clock_out_time = Some(start + chrono::Duration::minutes(30));
        session.status = SessionStatus::Completed;
        assert!(!session.is_active());
        assert_eq!(session.worked(later).num_minutes(), 30);
    }
}
