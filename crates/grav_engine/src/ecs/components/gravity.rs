//! Gravity field component

use log::warn;
use serde::{Deserialize, Serialize};

use crate::foundation::math::Vec2;

/// Valid gravity field priority range.
pub const PRIORITY_RANGE: std::ops::RangeInclusive<i32> = -100..=100;

fn zero_vec() -> Vec2 {
    Vec2::zeros()
}

/// The acceleration a field exerts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GravityKind {
    /// Constant acceleration vector, everywhere inside the field.
    Directional {
        /// Acceleration in units/s^2.
        accel: Vec2,
    },
    /// Acceleration toward a center point that moves with the field's
    /// owner.
    Radial {
        /// Pull center in the owner's local space; the origin by default.
        #[serde(default = "zero_vec")]
        center: Vec2,
        /// Acceleration magnitude in units/s^2.
        strength: f32,
    },
}

/// Directional or radial acceleration source attached to an entity.
///
/// A body is affected by a field while the body's gravitation point lies
/// inside one of the field owner's fixtures; overlapping fields resolve
/// by highest priority, ties by field registration order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompGravField {
    /// What acceleration the field produces.
    pub kind: GravityKind,
    priority: i32,
}

impl CompGravField {
    /// Create a field, clamping `priority` into [-100, 100] with a
    /// warning when out of range.
    pub fn new(kind: GravityKind, priority: i32) -> Self {
        Self {
            kind,
            priority: Self::clamp_priority(priority),
        }
    }

    /// Resolution priority, always within [-100, 100].
    pub fn priority(&self) -> i32 {
        Self::clamp_priority(self.priority)
    }

    /// Replace the priority, clamping out-of-range values.
    pub fn set_priority(&mut self, priority: i32) {
        self.priority = Self::clamp_priority(priority);
    }

    fn clamp_priority(priority: i32) -> i32 {
        if PRIORITY_RANGE.contains(&priority) {
            priority
        } else {
            let clamped = priority.clamp(*PRIORITY_RANGE.start(), *PRIORITY_RANGE.end());
            warn!("gravity field priority {priority} out of range, clamped to {clamped}");
            clamped
        }
    }
}
