//! Collision shape component

use serde::{Deserialize, Serialize};

use crate::foundation::math::Vec2;
use crate::solver::ShapeGeom;

fn zero_vec() -> Vec2 {
    Vec2::zeros()
}

/// Collision geometry in body-local space.
///
/// Referenced by [`super::CompPhysics`] shape definitions through the
/// component instance id; one fixture is created per reference when the
/// owning entity registers with the physics system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CompShape {
    /// A circle with a local-space center offset.
    Circle {
        /// Center offset from the body origin.
        #[serde(default = "zero_vec")]
        center: Vec2,
        /// Circle radius; must be positive.
        radius: f32,
    },
    /// A convex polygon, vertices in counter-clockwise order.
    Polygon {
        /// Local-space vertices.
        vertices: Vec<Vec2>,
    },
}

impl CompShape {
    /// Convert to solver geometry.
    pub fn to_geometry(&self) -> ShapeGeom {
        match self {
            Self::Circle { center, radius } => ShapeGeom::Circle {
                center: *center,
                radius: *radius,
            },
            Self::Polygon { vertices } => ShapeGeom::Polygon {
                vertices: vertices.clone(),
            },
        }
    }

    /// Radius of a circle centered on the body origin that encloses the
    /// shape.
    pub fn bounding_radius(&self) -> f32 {
        match self {
            Self::Circle { center, radius } => center.norm() + radius,
            Self::Polygon { vertices } => vertices
                .iter()
                .map(|v| v.norm())
                .fold(0.0_f32, f32::max),
        }
    }
}
