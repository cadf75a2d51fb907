//! Shape geometry: containment and overlap tests
//!
//! Shapes are circles and convex CCW polygons. Overlap results carry a
//! representative touch point and a normal pointing from the first shape
//! toward the second; they feed contact events and gravity field tests,
//! not a constraint solver.

use serde::{Deserialize, Serialize};

use crate::foundation::math::{cross, rotate, Vec2};

/// Collision geometry in body-local space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ShapeGeom {
    /// Circle with a local center offset.
    Circle {
        /// Center offset from the body origin.
        center: Vec2,
        /// Radius; must be positive.
        radius: f32,
    },
    /// Convex polygon, vertices counter-clockwise.
    Polygon {
        /// Local-space vertices.
        vertices: Vec<Vec2>,
    },
}

impl ShapeGeom {
    /// Shape area. Degenerate polygons yield zero.
    pub fn area(&self) -> f32 {
        match self {
            Self::Circle { radius, .. } => std::f32::consts::PI * radius * radius,
            Self::Polygon { vertices } => {
                if vertices.len() < 3 {
                    return 0.0;
                }
                let mut twice_area = 0.0;
                for i in 0..vertices.len() {
                    let a = vertices[i];
                    let b = vertices[(i + 1) % vertices.len()];
                    twice_area += cross(a, b);
                }
                twice_area.abs() * 0.5
            }
        }
    }

    /// Local-space centroid.
    pub fn centroid(&self) -> Vec2 {
        match self {
            Self::Circle { center, .. } => *center,
            Self::Polygon { vertices } => {
                if vertices.len() < 3 {
                    return vertices.iter().sum::<Vec2>()
                        / (vertices.len().max(1) as f32);
                }
                let mut twice_area = 0.0;
                let mut weighted = Vec2::zeros();
                for i in 0..vertices.len() {
                    let a = vertices[i];
                    let b = vertices[(i + 1) % vertices.len()];
                    let c = cross(a, b);
                    twice_area += c;
                    weighted += (a + b) * c;
                }
                if twice_area.abs() < f32::EPSILON {
                    return vertices.iter().sum::<Vec2>() / (vertices.len() as f32);
                }
                weighted / (3.0 * twice_area)
            }
        }
    }

    /// Radius of a circle around the body origin enclosing the shape.
    pub fn bounding_radius(&self) -> f32 {
        match self {
            Self::Circle { center, radius } => center.norm() + radius,
            Self::Polygon { vertices } => {
                vertices.iter().map(|v| v.norm()).fold(0.0_f32, f32::max)
            }
        }
    }
}

/// A shape transformed into world space.
#[derive(Debug, Clone)]
pub enum WorldShape {
    /// Circle at a world-space center.
    Circle {
        /// World-space center.
        center: Vec2,
        /// Radius.
        radius: f32,
    },
    /// Polygon with world-space vertices.
    Polygon {
        /// World-space vertices, counter-clockwise.
        vertices: Vec<Vec2>,
    },
}

/// Transform a local shape by a body transform.
pub fn to_world(geom: &ShapeGeom, position: Vec2, angle: f32) -> WorldShape {
    match geom {
        ShapeGeom::Circle { center, radius } => WorldShape::Circle {
            center: position + rotate(*center, angle),
            radius: *radius,
        },
        ShapeGeom::Polygon { vertices } => WorldShape::Polygon {
            vertices: vertices
                .iter()
                .map(|v| position + rotate(*v, angle))
                .collect(),
        },
    }
}

/// Point containment test.
pub fn contains_point(shape: &WorldShape, point: Vec2) -> bool {
    match shape {
        WorldShape::Circle { center, radius } => (point - center).norm_squared() <= radius * radius,
        WorldShape::Polygon { vertices } => {
            if vertices.len() < 3 {
                return false;
            }
            for i in 0..vertices.len() {
                let a = vertices[i];
                let b = vertices[(i + 1) % vertices.len()];
                if cross(b - a, point - a) < 0.0 {
                    return false;
                }
            }
            true
        }
    }
}

/// Representative geometry of one touching pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactGeom {
    /// World-space touch point.
    pub point: Vec2,
    /// Normal pointing from the first shape toward the second.
    pub normal: Vec2,
}

/// Overlap test with contact geometry; `None` when the shapes are apart.
pub fn overlap(a: &WorldShape, b: &WorldShape) -> Option<ContactGeom> {
    match (a, b) {
        (
            WorldShape::Circle {
                center: ca,
                radius: ra,
            },
            WorldShape::Circle {
                center: cb,
                radius: rb,
            },
        ) => circle_circle(*ca, *ra, *cb, *rb),
        (
            WorldShape::Circle { center, radius },
            WorldShape::Polygon { vertices },
        ) => circle_polygon(*center, *radius, vertices).map(|g| ContactGeom {
            point: g.point,
            normal: g.normal,
        }),
        (
            WorldShape::Polygon { vertices },
            WorldShape::Circle { center, radius },
        ) => circle_polygon(*center, *radius, vertices).map(|g| ContactGeom {
            point: g.point,
            normal: -g.normal,
        }),
        (
            WorldShape::Polygon { vertices: va },
            WorldShape::Polygon { vertices: vb },
        ) => polygon_polygon(va, vb),
    }
}

fn circle_circle(ca: Vec2, ra: f32, cb: Vec2, rb: f32) -> Option<ContactGeom> {
    let delta = cb - ca;
    let dist_sq = delta.norm_squared();
    let reach = ra + rb;
    if dist_sq > reach * reach {
        return None;
    }
    let normal = if dist_sq > f32::EPSILON {
        delta / dist_sq.sqrt()
    } else {
        Vec2::new(1.0, 0.0)
    };
    Some(ContactGeom {
        point: ca + normal * ra,
        normal,
    })
}

/// Circle-vs-polygon. The returned normal points from the circle toward
/// the polygon.
fn circle_polygon(center: Vec2, radius: f32, vertices: &[Vec2]) -> Option<ContactGeom> {
    if vertices.len() < 3 {
        return None;
    }
    let poly = WorldShape::Polygon {
        vertices: vertices.to_vec(),
    };
    if contains_point(&poly, center) {
        let centroid = vertices.iter().sum::<Vec2>() / (vertices.len() as f32);
        let delta = centroid - center;
        let normal = if delta.norm_squared() > f32::EPSILON {
            delta.normalize()
        } else {
            Vec2::new(1.0, 0.0)
        };
        return Some(ContactGeom {
            point: center,
            normal,
        });
    }
    // Closest point on the polygon boundary.
    let mut best: Option<(f32, Vec2)> = None;
    for i in 0..vertices.len() {
        let a = vertices[i];
        let b = vertices[(i + 1) % vertices.len()];
        let closest = closest_on_segment(a, b, center);
        let dist_sq = (closest - center).norm_squared();
        if best.map_or(true, |(d, _)| dist_sq < d) {
            best = Some((dist_sq, closest));
        }
    }
    let (dist_sq, closest) = best?;
    if dist_sq > radius * radius {
        return None;
    }
    let delta = closest - center;
    let normal = if dist_sq > f32::EPSILON {
        delta / dist_sq.sqrt()
    } else {
        Vec2::new(1.0, 0.0)
    };
    Some(ContactGeom {
        point: closest,
        normal,
    })
}

/// SAT overlap for two convex CCW polygons.
fn polygon_polygon(va: &[Vec2], vb: &[Vec2]) -> Option<ContactGeom> {
    if va.len() < 3 || vb.len() < 3 {
        return None;
    }
    if separating_axis_exists(va, vb) || separating_axis_exists(vb, va) {
        return None;
    }
    let centroid_a = va.iter().sum::<Vec2>() / (va.len() as f32);
    let centroid_b = vb.iter().sum::<Vec2>() / (vb.len() as f32);
    let delta = centroid_b - centroid_a;
    let normal = if delta.norm_squared() > f32::EPSILON {
        delta.normalize()
    } else {
        Vec2::new(1.0, 0.0)
    };
    Some(ContactGeom {
        point: (centroid_a + centroid_b) * 0.5,
        normal,
    })
}

fn separating_axis_exists(edges_of: &[Vec2], other: &[Vec2]) -> bool {
    for i in 0..edges_of.len() {
        let a = edges_of[i];
        let b = edges_of[(i + 1) % edges_of.len()];
        let edge = b - a;
        // Outward normal of a CCW edge.
        let axis = Vec2::new(edge.y, -edge.x);
        let (min_a, max_a) = project(edges_of, axis);
        let (min_b, max_b) = project(other, axis);
        if max_a < min_b || max_b < min_a {
            return true;
        }
    }
    false
}

fn project(vertices: &[Vec2], axis: Vec2) -> (f32, f32) {
    let mut min = f32::INFINITY;
    let mut max = f32::NEG_INFINITY;
    for v in vertices {
        let d = v.dot(&axis);
        min = min.min(d);
        max = max.max(d);
    }
    (min, max)
}

fn closest_on_segment(a: Vec2, b: Vec2, p: Vec2) -> Vec2 {
    let ab = b - a;
    let len_sq = ab.norm_squared();
    if len_sq < f32::EPSILON {
        return a;
    }
    let t = ((p - a).dot(&ab) / len_sq).clamp(0.0, 1.0);
    a + ab * t
}
