//! Physics integration system
//!
//! Drives the fixed-timestep simulation on top of the rigid-body
//! backend: registers bodies and gravity fields from component lifecycle
//! events, resolves the dominant gravity field per body with hysteresis,
//! applies gravitational force, publishes contact events, and computes
//! interpolated transforms for variable-rate rendering.

pub mod system;

pub use system::PhysicsSystem;

#[cfg(test)]
mod tests;
