//! Math utilities and types
//!
//! Provides the fundamental 2D math types used by the simulation core.

use std::f32::consts::{PI, TAU};

pub use nalgebra::{Rotation2, Vector2};

/// 2D vector type
pub type Vec2 = Vector2<f32>;

/// 2D point type
pub type Point2 = nalgebra::Point2<f32>;

/// Wrap an angle into the (-pi, pi] range.
pub fn normalize_angle(angle: f32) -> f32 {
    let mut a = angle % TAU;
    if a > PI {
        a -= TAU;
    } else if a <= -PI {
        a += TAU;
    }
    a
}

/// Signed shortest angular distance from `from` to `to`.
pub fn angle_delta(from: f32, to: f32) -> f32 {
    normalize_angle(to - from)
}

/// Interpolate between two angles along the shortest path across the
/// +-pi wraparound. `t` in [0, 1].
pub fn lerp_angle(from: f32, to: f32, t: f32) -> f32 {
    normalize_angle(from + angle_delta(from, to) * t)
}

/// Rotate a vector by `angle` radians.
pub fn rotate(v: Vec2, angle: f32) -> Vec2 {
    Rotation2::new(angle) * v
}

/// 2D cross product (z component of the 3D cross).
pub fn cross(a: Vec2, b: Vec2) -> f32 {
    a.x * b.y - a.y * b.x
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn normalize_wraps_into_range() {
        assert_relative_eq!(normalize_angle(3.0 * PI).abs(), PI, epsilon = 1e-5);
        assert_relative_eq!(normalize_angle(-3.0 * PI).abs(), PI, epsilon = 1e-5);
        assert_relative_eq!(normalize_angle(0.5), 0.5);
        assert!(normalize_angle(3.0 * PI) > -PI && normalize_angle(3.0 * PI) <= PI + 1e-5);
    }

    #[test]
    fn lerp_angle_takes_shortest_path() {
        // From just below +pi to just above -pi is a short hop, not a full turn.
        let from = PI - 0.1;
        let to = -PI + 0.1;
        let mid = lerp_angle(from, to, 0.5);
        assert_relative_eq!(mid.abs(), PI, epsilon = 1e-4);
    }

    #[test]
    fn rotate_quarter_turn() {
        let v = rotate(Vec2::new(1.0, 0.0), PI / 2.0);
        assert_relative_eq!(v.x, 0.0, epsilon = 1e-6);
        assert_relative_eq!(v.y, 1.0, epsilon = 1e-6);
    }
}
