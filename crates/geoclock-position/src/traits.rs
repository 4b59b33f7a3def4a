//! Position provider traits

use geoclock_api::PositionSample;
use thiserror::Error;

use crate::PositionSubscription;

/// Failures reported by a position provider
///
/// None of these are retried automatically: permission and support problems
/// need user action, and the user can fall back to a manual location.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PositionError {
    #[error("location permission was denied")]
    PermissionDenied,

    #[error("location is not supported on this device")]
    Unsupported,

    #[error("timed out waiting for a location fix")]
    Timeout,

    #[error("location unavailable: {0}")]
    Unknown(String),
}

pub type PositionResult<T> = Result<T, PositionError>;

/// One item delivered by a subscription
#[derive(Debug, Clone, PartialEq)]
pub enum PositionEvent {
    Sample(PositionSample),
    Error(PositionError),
}

/// Source of continuous position updates
pub trait PositionProvider: Send + Sync {
    /// Start a continuous watch.
    ///
    /// Updates flow until the returned subscription is stopped or dropped.
    /// Providers that fail up front (no hardware, permission refused) return
    /// the error here rather than through the stream.
    fn watch(&self) -> PositionResult<PositionSubscription>;
}
