//! Position component

use serde::{Deserialize, Serialize};

use crate::foundation::math::Vec2;

fn zero_vec() -> Vec2 {
    Vec2::zeros()
}

/// World-space transform of an entity.
///
/// Read once by the physics system at registration time for the initial
/// body transform, then written back after every fixed step. Entities
/// without a physics body keep whatever the loader set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompPosition {
    /// World position of the body origin.
    #[serde(default = "zero_vec")]
    pub position: Vec2,
    /// Orientation in radians.
    #[serde(default)]
    pub angle: f32,
}

impl Default for CompPosition {
    fn default() -> Self {
        Self {
            position: Vec2::zeros(),
            angle: 0.0,
        }
    }
}

impl CompPosition {
    /// Create a position component.
    pub fn new(position: Vec2, angle: f32) -> Self {
        Self { position, angle }
    }
}
