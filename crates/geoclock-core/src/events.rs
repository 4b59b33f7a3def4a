//! Core events emitted by the engine

use chrono::{DateTime, Local};
use geoclock_api::{NearestSite, TimesheetSession};
use geoclock_position::PositionError;
use geoclock_util::SessionId;

/// Events emitted by the clock engine
#[derive(Debug, Clone, PartialEq)]
pub enum CoreEvent {
    /// A timesheet session was opened
    ClockedIn {
        session: TimesheetSession,
        site_name: String,
        distance_meters: f64,
    },

    /// The active session was completed
    ClockedOut {
        session_id: SessionId,
        clock_out_time: DateTime<Local>,
        worked: chrono::Duration,
    },

    /// A new fix (or site list) moved the nearest-site result
    NearestSiteChanged { nearest: Option<NearestSite> },

    /// The position provider failed; no fix is trusted until the next one
    PositionLost { error: PositionError },
}
