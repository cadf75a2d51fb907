//! Foundation utilities shared by every subsystem
//!
//! Math aliases, fixed-timestep clock, and logging setup.

pub mod logging;
pub mod math;
pub mod time;

pub use math::{Point2, Vec2};
pub use time::FixedTimestep;
