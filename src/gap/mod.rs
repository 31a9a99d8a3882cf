//! Gap-filling loads against the backing source.

pub mod engine;
pub mod miss;

pub use engine::{GapFillEngine, KnownBounds};
pub use miss::MissCounter;
