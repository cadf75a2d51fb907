//! Body and fixture storage, force integration, and contact tracking

use std::collections::HashMap;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use slotmap::{new_key_type, SlotMap};

use crate::foundation::math::{cross, normalize_angle, rotate, Vec2};

use super::geometry::{self, ShapeGeom};

new_key_type! {
    /// Handle to a rigid body.
    pub struct BodyKey;
    /// Handle to a fixture.
    pub struct FixtureKey;
}

bitflags! {
    /// Body behavior flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct BodyFlags: u8 {
        /// Lock the body's rotation.
        const FIXED_ROTATION = 1 << 0;
        /// Continuous-collision hint for fast bodies.
        const BULLET = 1 << 1;
    }
}

/// Whether a body moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BodyType {
    /// Infinite mass; never moves.
    Static,
    /// Integrates forces and velocities.
    #[default]
    Dynamic,
}

/// Parameters for body creation.
#[derive(Debug, Clone)]
pub struct BodyDef {
    /// Initial world position of the body origin.
    pub position: Vec2,
    /// Initial orientation in radians.
    pub angle: f32,
    /// Static or dynamic.
    pub body_type: BodyType,
    /// Linear velocity damping per second.
    pub linear_damping: f32,
    /// Angular velocity damping per second.
    pub angular_damping: f32,
    /// Behavior flags.
    pub flags: BodyFlags,
}

impl Default for BodyDef {
    fn default() -> Self {
        Self {
            position: Vec2::zeros(),
            angle: 0.0,
            body_type: BodyType::Dynamic,
            linear_damping: 0.0,
            angular_damping: 0.0,
            flags: BodyFlags::empty(),
        }
    }
}

/// Identifies the component behind a fixture, for contact resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixtureTag {
    /// Entity owning the fixture's Shape component.
    pub entity_id: String,
    /// Shape component instance id.
    pub shape_id: String,
}

/// Parameters for fixture creation.
#[derive(Debug, Clone)]
pub struct FixtureDef {
    /// Local-space collision geometry.
    pub shape: ShapeGeom,
    /// Mass density.
    pub density: f32,
    /// Friction coefficient.
    pub friction: f32,
    /// Restitution in [0, 1].
    pub restitution: f32,
    /// Sensors report contacts without collision response.
    pub is_sensor: bool,
    /// Back-reference to the owning Shape component.
    pub tag: FixtureTag,
}

struct Fixture {
    body: BodyKey,
    shape: ShapeGeom,
    #[allow(dead_code)] // Consumed by a constraint-solving backend.
    friction: f32,
    #[allow(dead_code)]
    restitution: f32,
    #[allow(dead_code)]
    is_sensor: bool,
    density: f32,
    tag: FixtureTag,
}

struct Body {
    position: Vec2,
    angle: f32,
    linear_velocity: Vec2,
    angular_velocity: f32,
    force: Vec2,
    torque: f32,
    body_type: BodyType,
    linear_damping: f32,
    angular_damping: f32,
    flags: BodyFlags,
    mass: f32,
    inv_mass: f32,
    inv_inertia: f32,
    local_center: Vec2,
    fixtures: Vec<FixtureKey>,
}

impl Body {
    fn world_center(&self) -> Vec2 {
        self.position + rotate(self.local_center, self.angle)
    }
}

/// One new touching fixture pair, recorded during `step`.
#[derive(Debug, Clone)]
pub struct Contact {
    /// First fixture of the pair.
    pub fixture_a: FixtureKey,
    /// Second fixture of the pair.
    pub fixture_b: FixtureKey,
    /// Representative world-space touch point.
    pub point: Vec2,
    /// Normal pointing from the first fixture toward the second.
    pub normal: Vec2,
}

/// A touching pair seen from one body.
#[derive(Debug, Clone)]
pub struct ContactEdge {
    /// This body's fixture.
    pub my_fixture: FixtureKey,
    /// The touching fixture on the other body.
    pub other_fixture: FixtureKey,
    /// The other body.
    pub other_body: BodyKey,
    /// World-space touch point.
    pub point: Vec2,
    /// Normal pointing from this body toward the other.
    pub normal: Vec2,
}

/// The rigid-body world: bodies, fixtures, and the touching-pair set.
#[derive(Default)]
pub struct World {
    bodies: SlotMap<BodyKey, Body>,
    fixtures: SlotMap<FixtureKey, Fixture>,
    /// Currently touching fixture pairs with their contact geometry.
    /// Keys are ordered pairs (`a < b` by key order) for stable lookup.
    touching: HashMap<(FixtureKey, FixtureKey), geometry::ContactGeom>,
    /// Pairs that began touching during the most recent step; drained by
    /// the caller after the step so events stay out of the solve.
    new_contacts: Vec<Contact>,
}

impl World {
    /// Create an empty world.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a body; fixtures are added separately.
    pub fn create_body(&mut self, def: &BodyDef) -> BodyKey {
        self.bodies.insert(Body {
            position: def.position,
            angle: def.angle,
            linear_velocity: Vec2::zeros(),
            angular_velocity: 0.0,
            force: Vec2::zeros(),
            torque: 0.0,
            body_type: def.body_type,
            linear_damping: def.linear_damping,
            angular_damping: def.angular_damping,
            flags: def.flags,
            mass: 0.0,
            inv_mass: 0.0,
            inv_inertia: 0.0,
            local_center: Vec2::zeros(),
            fixtures: Vec::new(),
        })
    }

    /// Destroy a body, its fixtures, and any contacts they were in.
    pub fn destroy_body(&mut self, key: BodyKey) {
        let Some(body) = self.bodies.remove(key) else {
            return;
        };
        for fixture in body.fixtures {
            self.fixtures.remove(fixture);
            self.touching
                .retain(|(a, b), _| *a != fixture && *b != fixture);
        }
    }

    /// Attach a fixture to a body and recompute the body's mass data.
    pub fn create_fixture(&mut self, body: BodyKey, def: FixtureDef) -> Option<FixtureKey> {
        if !self.bodies.contains_key(body) {
            return None;
        }
        let key = self.fixtures.insert(Fixture {
            body,
            shape: def.shape,
            friction: def.friction,
            restitution: def.restitution,
            is_sensor: def.is_sensor,
            density: def.density,
            tag: def.tag,
        });
        self.bodies[body].fixtures.push(key);
        self.recompute_mass(body);
        Some(key)
    }

    /// Detach and destroy one fixture.
    pub fn destroy_fixture(&mut self, key: FixtureKey) {
        let Some(fixture) = self.fixtures.remove(key) else {
            return;
        };
        self.touching.retain(|(a, b), _| *a != key && *b != key);
        if let Some(body) = self.bodies.get_mut(fixture.body) {
            body.fixtures.retain(|f| *f != key);
        }
        self.recompute_mass(fixture.body);
    }

    /// Density-weighted mass, center, and rotational inertia. A dynamic
    /// body whose fixtures sum to zero mass gets unit mass, matching the
    /// usual rigid-body convention.
    fn recompute_mass(&mut self, key: BodyKey) {
        let Some(body) = self.bodies.get(key) else {
            return;
        };
        if body.body_type == BodyType::Static {
            let body = &mut self.bodies[key];
            body.mass = 0.0;
            body.inv_mass = 0.0;
            body.inv_inertia = 0.0;
            body.local_center = Vec2::zeros();
            return;
        }
        let mut mass = 0.0;
        let mut weighted_center = Vec2::zeros();
        let mut parts: Vec<(f32, Vec2, f32)> = Vec::new();
        for &fk in &body.fixtures {
            let fixture = &self.fixtures[fk];
            let m = fixture.density * fixture.shape.area();
            let c = fixture.shape.centroid();
            parts.push((m, c, fixture.shape.bounding_radius()));
            mass += m;
            weighted_center += c * m;
        }
        let (mass, local_center) = if mass > 0.0 {
            (mass, weighted_center / mass)
        } else {
            (1.0, Vec2::zeros())
        };
        let mut inertia = 0.0;
        for (m, c, r) in parts {
            inertia += m * (r * r * 0.5 + (c - local_center).norm_squared());
        }
        if inertia <= 0.0 {
            inertia = mass;
        }
        let body = &mut self.bodies[key];
        body.mass = mass;
        body.inv_mass = 1.0 / mass;
        body.inv_inertia = 1.0 / inertia;
        body.local_center = local_center;
    }

    /// Whether a body handle is alive.
    pub fn contains_body(&self, key: BodyKey) -> bool {
        self.bodies.contains_key(key)
    }

    /// Number of live bodies.
    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    /// World position of the body origin.
    pub fn position(&self, key: BodyKey) -> Vec2 {
        self.bodies[key].position
    }

    /// Body orientation in radians.
    pub fn angle(&self, key: BodyKey) -> f32 {
        self.bodies[key].angle
    }

    /// World-space center of mass.
    pub fn world_center(&self, key: BodyKey) -> Vec2 {
        self.bodies[key].world_center()
    }

    /// Teleport a body.
    pub fn set_transform(&mut self, key: BodyKey, position: Vec2, angle: f32) {
        let body = &mut self.bodies[key];
        body.position = position;
        body.angle = angle;
    }

    /// Linear velocity.
    pub fn linear_velocity(&self, key: BodyKey) -> Vec2 {
        self.bodies[key].linear_velocity
    }

    /// Overwrite linear velocity.
    pub fn set_linear_velocity(&mut self, key: BodyKey, velocity: Vec2) {
        self.bodies[key].linear_velocity = velocity;
    }

    /// Angular velocity in radians/s.
    pub fn angular_velocity(&self, key: BodyKey) -> f32 {
        self.bodies[key].angular_velocity
    }

    /// Overwrite angular velocity.
    pub fn set_angular_velocity(&mut self, key: BodyKey, velocity: f32) {
        self.bodies[key].angular_velocity = velocity;
    }

    /// Mass in mass units; zero for static bodies.
    pub fn mass(&self, key: BodyKey) -> f32 {
        self.bodies[key].mass
    }

    /// Whether the body is static.
    pub fn is_static(&self, key: BodyKey) -> bool {
        self.bodies[key].body_type == BodyType::Static
    }

    /// Accumulate a force (applied at a world point) for the next step.
    pub fn apply_force(&mut self, key: BodyKey, force: Vec2, world_point: Vec2) {
        let center = self.bodies[key].world_center();
        let body = &mut self.bodies[key];
        if body.body_type == BodyType::Static {
            return;
        }
        body.force += force;
        body.torque += cross(world_point - center, force);
    }

    /// Accumulate an instantaneous impulse at a world point.
    pub fn apply_impulse(&mut self, key: BodyKey, impulse: Vec2, world_point: Vec2) {
        let center = self.bodies[key].world_center();
        let body = &mut self.bodies[key];
        if body.body_type == BodyType::Static {
            return;
        }
        body.linear_velocity += impulse * body.inv_mass;
        if !body.flags.contains(BodyFlags::FIXED_ROTATION) {
            body.angular_velocity += cross(world_point - center, impulse) * body.inv_inertia;
        }
    }

    /// Fixtures of a body.
    pub fn body_fixtures(&self, key: BodyKey) -> &[FixtureKey] {
        self.bodies
            .get(key)
            .map(|b| b.fixtures.as_slice())
            .unwrap_or(&[])
    }

    /// The component tag behind a fixture.
    pub fn fixture_tag(&self, key: FixtureKey) -> Option<&FixtureTag> {
        self.fixtures.get(key).map(|f| &f.tag)
    }

    /// The body a fixture belongs to.
    pub fn fixture_body(&self, key: FixtureKey) -> Option<BodyKey> {
        self.fixtures.get(key).map(|f| f.body)
    }

    /// World-space containment test against one fixture.
    pub fn fixture_contains_point(&self, key: FixtureKey, point: Vec2) -> bool {
        let Some(fixture) = self.fixtures.get(key) else {
            return false;
        };
        let Some(body) = self.bodies.get(fixture.body) else {
            return false;
        };
        geometry::contains_point(
            &geometry::to_world(&fixture.shape, body.position, body.angle),
            point,
        )
    }

    /// All fixtures containing a world point.
    pub fn query_point(&self, point: Vec2) -> Vec<FixtureKey> {
        self.fixtures
            .keys()
            .filter(|&key| self.fixture_contains_point(key, point))
            .collect()
    }

    /// Touching pairs involving a body's fixtures, with geometry oriented
    /// from this body outward.
    pub fn contacts_of(&self, key: BodyKey) -> Vec<ContactEdge> {
        let mut edges = Vec::new();
        for (&(a, b), geom) in &self.touching {
            let (mine, other, normal) = if self.fixtures.get(a).map(|f| f.body) == Some(key) {
                (a, b, geom.normal)
            } else if self.fixtures.get(b).map(|f| f.body) == Some(key) {
                (b, a, -geom.normal)
            } else {
                continue;
            };
            let Some(other_body) = self.fixtures.get(other).map(|f| f.body) else {
                continue;
            };
            edges.push(ContactEdge {
                my_fixture: mine,
                other_fixture: other,
                other_body,
                point: geom.point,
                normal,
            });
        }
        edges
    }

    /// Pairs that began touching during the most recent step. Drained so
    /// callers can publish them in one post-step batch.
    pub fn drain_new_contacts(&mut self) -> Vec<Contact> {
        std::mem::take(&mut self.new_contacts)
    }

    /// Advance one fixed timestep.
    ///
    /// The iteration counts are part of the backend interface; this
    /// reference integrator has no constraint solve to iterate, so they
    /// are accepted and ignored.
    pub fn step(&mut self, dt: f32, _velocity_iterations: u32, _position_iterations: u32) {
        self.new_contacts.clear();
        self.integrate(dt);
        self.update_contacts();
    }

    fn integrate(&mut self, dt: f32) {
        for (_, body) in &mut self.bodies {
            if body.body_type == BodyType::Static {
                body.force = Vec2::zeros();
                body.torque = 0.0;
                continue;
            }
            body.linear_velocity += body.force * body.inv_mass * dt;
            body.angular_velocity += body.torque * body.inv_inertia * dt;
            // First-order damping, stable for any dt.
            body.linear_velocity /= 1.0 + body.linear_damping * dt;
            body.angular_velocity /= 1.0 + body.angular_damping * dt;
            if body.flags.contains(BodyFlags::FIXED_ROTATION) {
                body.angular_velocity = 0.0;
            }
            body.position += body.linear_velocity * dt;
            body.angle = normalize_angle(body.angle + body.angular_velocity * dt);
            body.force = Vec2::zeros();
            body.torque = 0.0;
        }
    }

    /// Refresh the touching-pair set from current transforms and record
    /// pairs that began touching this step.
    fn update_contacts(&mut self) {
        let keys: Vec<FixtureKey> = self.fixtures.keys().collect();
        let mut still_touching: HashMap<(FixtureKey, FixtureKey), geometry::ContactGeom> =
            HashMap::new();

        for (i, &a) in keys.iter().enumerate() {
            let fa = &self.fixtures[a];
            let ba = &self.bodies[fa.body];
            let shape_a = geometry::to_world(&fa.shape, ba.position, ba.angle);
            let radius_a = fa.shape.bounding_radius();
            for &b in &keys[i + 1..] {
                let fb = &self.fixtures[b];
                if fa.body == fb.body {
                    continue;
                }
                let bb = &self.bodies[fb.body];
                // Cheap broad phase on bounding radii.
                let reach = radius_a + fb.shape.bounding_radius();
                if (bb.position - ba.position).norm_squared() > reach * reach {
                    continue;
                }
                let shape_b = geometry::to_world(&fb.shape, bb.position, bb.angle);
                if let Some(geom) = geometry::overlap(&shape_a, &shape_b) {
                    let pair = if a < b { (a, b) } else { (b, a) };
                    let oriented = if pair == (a, b) {
                        geom
                    } else {
                        geometry::ContactGeom {
                            point: geom.point,
                            normal: -geom.normal,
                        }
                    };
                    if !self.touching.contains_key(&pair) {
                        self.new_contacts.push(Contact {
                            fixture_a: pair.0,
                            fixture_b: pair.1,
                            point: oriented.point,
                            normal: oriented.normal,
                        });
                    }
                    still_touching.insert(pair, oriented);
                }
            }
        }
        self.touching = still_touching;
    }
}
