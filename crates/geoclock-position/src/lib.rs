//! Position sampling for geoclock
//!
//! This crate defines the interface between the clock engine and whatever
//! produces device coordinates. It contains no platform code itself:
//! - [`PositionProvider`] starts a continuous watch
//! - [`PositionSubscription`] owns that watch and tears it down on drop
//! - [`PositionSampler`] keeps the latest fix and applies the staleness bound
//! - [`MockPositionProvider`] and [`ReplayPositionProvider`] feed tests and the CLI

mod mock;
mod replay;
mod sampler;
mod subscription;
mod traits;

pub use mock::*;
pub use replay::*;
pub use sampler::*;
pub use subscription::*;
pub use traits::*;
