//! Shared domain types for geoclock
//!
//! This crate defines the value types every other crate exchanges:
//! - Coordinates and position samples
//! - Job sites and the nearest-site result
//! - Timesheet sessions and the per-user clock state
//! - Employee profiles and roles
//! - Structured reasons for rejecting a clock-in

mod geo;
mod profile;
mod reasons;
mod timesheet;

pub use geo::*;
pub use profile::*;
pub use reasons::*;
pub use timesheet::*;
