//! Geofence clock-in core for geoclock
//!
//! This crate contains:
//! - Great-circle distance between coordinates
//! - Nearest active job site matching
//! - The clock state machine (ClockedOut <-> ClockedIn) and its storage writes
//! - The attendance report

mod distance;
mod engine;
mod events;
mod matcher;
mod report;
mod session;

pub use distance::*;
pub use engine::*;
pub use events::*;
pub use matcher::*;
pub use report::*;
pub use session::*;
