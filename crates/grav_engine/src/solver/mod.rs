//! 2D rigid-body backend
//!
//! The simulation core consumes this module through a narrow interface:
//! create/destroy bodies and fixtures, get/set transforms and velocities,
//! apply forces, iterate contacts, point query, and a fixed-timestep
//! `step`. The reference implementation here integrates forces with
//! semi-implicit Euler and tracks overlap-based contacts; it performs no
//! constraint resolution, and a full-featured backend can replace it
//! behind the same interface.

pub mod geometry;
pub mod world;

pub use geometry::{ContactGeom, ShapeGeom, WorldShape};
pub use world::{
    BodyDef, BodyFlags, BodyKey, BodyType, Contact, ContactEdge, FixtureDef, FixtureKey,
    FixtureTag, World,
};
