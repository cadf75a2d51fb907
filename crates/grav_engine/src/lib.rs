//! # Grav Engine
//!
//! A 2D game runtime built around an entity/component registry and a
//! fixed-timestep physics integration with multiple gravity sources.
//!
//! ## Features
//!
//! - **Entity/Component Registry**: entities as named bags of typed
//!   components, with lifecycle events on every change
//! - **Event Bus**: reentrancy-safe publish/subscribe channels with
//!   RAII subscriptions
//! - **Gravity Fields**: directional and radial fields with priorities
//!   and switch hysteresis, layered over a root fallback field
//! - **Path Following**: waypoint traversal with uniform and
//!   accelerated motion profiles, driven through the physics body
//! - **Render Interpolation**: smoothed transforms between fixed steps
//!   for variable-rate presentation
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use grav_engine::prelude::*;
//!
//! fn main() {
//!     let bus = EventBus::new();
//!     let registry = ComponentRegistry::new(bus.clone());
//!     let physics = PhysicsSystem::new(PhysicsConfig::default(), &registry);
//!
//!     let level = LevelDoc::from_file("levels/pit.ron").expect("level");
//!     level.instantiate(&registry);
//!
//!     let mut clock = FixedTimestep::new(physics.fixed_timestep());
//!     loop {
//!         clock.advance(0.016);
//!         while clock.tick() {
//!             physics.tick();
//!         }
//!         physics.calculate_smooth_positions(clock.accumulator());
//!     }
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names)]

pub mod config;
pub mod ecs;
pub mod events;
pub mod foundation;
pub mod level;
pub mod physics;
pub mod solver;

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        config::{Config, EngineConfig, PhysicsConfig},
        ecs::{
            component::{Component, ComponentData, ComponentRef, ComponentTag},
            components::{
                ActiveField, CompGravField, CompPath, CompPathMove, CompPhysics, CompPosition,
                CompShape, GravityKind, MotionMode, PathPoint, ShapeFixture,
            },
            registry::ComponentRegistry,
            EntityId,
        },
        events::{ContactEvent, EventBus, Subscription},
        foundation::{
            math::{Point2, Vec2},
            time::FixedTimestep,
        },
        level::LevelDoc,
        physics::PhysicsSystem,
        solver::BodyType,
    };
}
