//! Shared utilities for geoclock
//!
//! This crate provides:
//! - ID types (UserId, SiteId, SessionId)
//! - Wall-clock time with a debug-only mock override
//! - Duration and timestamp formatting used by reports and the CLI
//! - Default paths for the config file and data directory

mod ids;
mod paths;
mod time;

pub use ids::*;
pub use paths::*;
pub use time::*;
