//! Physics body component

use log::warn;
use serde::{Deserialize, Serialize};

use crate::ecs::EntityId;
use crate::foundation::math::Vec2;
use crate::solver::{BodyKey, BodyType};

fn default_density() -> f32 {
    1.0
}

fn zero_vec() -> Vec2 {
    Vec2::zeros()
}

/// One fixture declaration: collision geometry comes from the sibling
/// Shape component named by `shape_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeFixture {
    /// Instance id of the sibling Shape component ("" = default instance).
    #[serde(default)]
    pub shape_id: String,
    /// Mass density in mass units per area unit.
    #[serde(default = "default_density")]
    pub density: f32,
    /// Surface friction coefficient.
    #[serde(default)]
    pub friction: f32,
    /// Bounciness in [0, 1].
    #[serde(default)]
    pub restitution: f32,
    /// Sensors report contacts but produce no collision response.
    #[serde(default)]
    pub is_sensor: bool,
}

impl Default for ShapeFixture {
    fn default() -> Self {
        Self {
            shape_id: String::new(),
            density: default_density(),
            friction: 0.0,
            restitution: 0.0,
            is_sensor: false,
        }
    }
}

/// The gravity field currently steering a body. Never "none" once the
/// body is registered; the root field is the fallback.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ActiveField {
    /// The global fallback field from [`crate::config::PhysicsConfig`].
    #[default]
    Root,
    /// A gravity field component.
    Field {
        /// Entity owning the field.
        entity_id: EntityId,
        /// Field component instance id.
        instance_id: String,
    },
}

/// Runtime-only state owned by the physics system. Not serialized; a
/// freshly loaded component starts unregistered.
#[derive(Debug, Clone, PartialEq)]
pub struct BodyRuntime {
    /// Solver body handle, present while registered.
    pub body: Option<BodyKey>,
    /// Center of mass before the most recent step.
    pub prev_position: Vec2,
    /// Angle before the most recent step.
    pub prev_angle: f32,
    /// Center of mass after the most recent step.
    pub cur_position: Vec2,
    /// Angle after the most recent step.
    pub cur_angle: f32,
    /// Interpolated center of mass for rendering.
    pub smooth_position: Vec2,
    /// Interpolated angle for rendering.
    pub smooth_angle: f32,
    /// Dominant gravity field.
    pub active_field: ActiveField,
    /// Ticks elapsed since the active field last changed (hysteresis).
    pub ticks_since_field_change: u32,
}

impl Default for BodyRuntime {
    fn default() -> Self {
        Self {
            body: None,
            prev_position: Vec2::zeros(),
            prev_angle: 0.0,
            cur_position: Vec2::zeros(),
            cur_angle: 0.0,
            smooth_position: Vec2::zeros(),
            smooth_angle: 0.0,
            active_field: ActiveField::Root,
            ticks_since_field_change: 0,
        }
    }
}

/// Wraps one rigid body and its fixtures.
///
/// The underlying solver body is created lazily when the component
/// registers with the physics system and destroyed on unregistration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompPhysics {
    /// Static bodies never move; dynamic bodies integrate forces.
    #[serde(default)]
    pub body_type: BodyType,
    /// Fixture declarations, one solver fixture each.
    pub shapes: Vec<ShapeFixture>,
    /// Linear velocity damping per second.
    #[serde(default)]
    pub linear_damping: f32,
    /// Angular velocity damping per second.
    #[serde(default)]
    pub angular_damping: f32,
    /// Lock the body's rotation.
    #[serde(default)]
    pub fixed_rotation: bool,
    /// Continuous-collision hint for fast bodies.
    #[serde(default)]
    pub bullet: bool,
    /// Body-local point tested against gravity field fixtures.
    #[serde(default = "zero_vec")]
    pub grav_point: Vec2,
    /// State owned by the physics system while registered.
    #[serde(skip)]
    pub(crate) runtime: BodyRuntime,
}

impl CompPhysics {
    /// Create a physics component with the given fixture declarations.
    pub fn new(body_type: BodyType, shapes: Vec<ShapeFixture>) -> Self {
        Self {
            body_type,
            shapes,
            linear_damping: 0.0,
            angular_damping: 0.0,
            fixed_rotation: false,
            bullet: false,
            grav_point: Vec2::zeros(),
            runtime: BodyRuntime::default(),
        }
    }

    /// Builder-style gravitation point override.
    #[must_use]
    pub fn with_grav_point(mut self, grav_point: Vec2) -> Self {
        self.grav_point = grav_point;
        self
    }

    /// Whether the component currently owns a solver body.
    pub fn is_registered(&self) -> bool {
        self.runtime.body.is_some()
    }

    /// Solver body handle, if registered.
    pub fn body_key(&self) -> Option<BodyKey> {
        self.runtime.body
    }

    /// The dominant gravity field.
    pub fn active_field(&self) -> &ActiveField {
        &self.runtime.active_field
    }

    /// Center of mass before the most recent step.
    pub fn previous_position(&self) -> Vec2 {
        self.runtime.prev_position
    }

    /// Center of mass after the most recent step.
    pub fn current_position(&self) -> Vec2 {
        self.runtime.cur_position
    }

    /// Interpolated center of mass from the last
    /// `calculate_smooth_positions` call.
    ///
    /// Returns the origin with a warning if the component has not been
    /// registered with the physics system yet.
    pub fn smooth_position(&self) -> Vec2 {
        if self.runtime.body.is_none() {
            warn!("smooth_position queried before physics registration");
            return Vec2::zeros();
        }
        self.runtime.smooth_position
    }

    /// Interpolated angle from the last `calculate_smooth_positions` call.
    pub fn smooth_angle(&self) -> f32 {
        if self.runtime.body.is_none() {
            warn!("smooth_angle queried before physics registration");
            return 0.0;
        }
        self.runtime.smooth_angle
    }
}
