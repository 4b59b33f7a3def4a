//! Audit event types

use chrono::{DateTime, Local};
use geoclock_api::{ClockRejection, UserRole};
use geoclock_util::{SessionId, SiteId, UserId};
use serde::{Deserialize, Serialize};

/// Types of audit events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuditEventType {
    /// Employee clocked in at a site
    ClockedIn {
        session_id: SessionId,
        user_id: UserId,
        site_id: Option<SiteId>,
        distance_meters: f64,
    },

    /// Employee clocked out
    ClockedOut {
        session_id: SessionId,
        user_id: UserId,
        worked_seconds: i64,
    },

    /// Clock-in refused
    ClockInRejected {
        user_id: UserId,
        reason: ClockRejection,
    },

    SiteCreated { site_id: SiteId, name: String },

    SiteUpdated { site_id: SiteId, name: String },

    SiteDeleted { site_id: SiteId },

    ProfileUpdated { user_id: UserId, role: UserRole },
}

impl AuditEventType {
    /// Short label for log listings
    pub fn kind(&self) -> &'static str {
        match self {
            AuditEventType::ClockedIn { .. } => "clocked_in",
            AuditEventType::ClockedOut { .. } => "clocked_out",
            AuditEventType::ClockInRejected { .. } => "clock_in_rejected",
            AuditEventType::SiteCreated { .. } => "site_created",
            AuditEventType::SiteUpdated { .. } => "site_updated",
            AuditEventType::SiteDeleted { .. } => "site_deleted",
            AuditEventType::ProfileUpdated { .. } => "profile_updated",
        }
    }
}

/// Full audit event with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Unique event ID
    pub id: i64,

    /// Event timestamp
    pub timestamp: DateTime<Local>,

    /// Event type and details
    pub event: AuditEventType,
}

impl AuditEvent {
    pub fn new(event: AuditEventType) -> Self {
        Self {
            id: 0, // Will be set by store
            timestamp: geoclock_util::now(),
            event,
        }
    }
}
