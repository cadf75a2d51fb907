//! Fixed-timestep integration and gravity resolution

use std::cell::{Cell, Ref, RefCell, RefMut};
use std::rc::{Rc, Weak};

use log::{debug, warn};

use crate::config::PhysicsConfig;
use crate::ecs::components::{ActiveField, GravityKind};
use crate::ecs::{ComponentRef, ComponentRegistry, ComponentTag, EntityId};
use crate::events::{ComponentEvent, ContactEvent, EventBus, Subscription};
use crate::foundation::math::{lerp_angle, rotate, Vec2};
use crate::solver::{BodyDef, BodyFlags, FixtureDef, FixtureTag, World};

/// Per-tick choice of gravity field for one body.
struct FieldChoice {
    field: ActiveField,
    priority: i32,
    registration_order: usize,
}

/// The physics integration system.
///
/// Tracks every registered Physics component and gravity field. A body's
/// life cycle: unregistered until its `new_component` event, then ticked
/// with the root gravity field and a saturated hysteresis counter (so the
/// first real field is adopted immediately), then unregistered on its
/// `delete_component` event.
pub struct PhysicsSystem {
    config: PhysicsConfig,
    registry: Weak<ComponentRegistry>,
    bus: EventBus,
    world: RefCell<World>,
    /// Registered Physics components, in registration order.
    bodies: RefCell<Vec<ComponentRef>>,
    /// Registered gravity field components; list position is the
    /// deterministic tie-break for equal priorities.
    fields: RefCell<Vec<ComponentRef>>,
    subscriptions: RefCell<Vec<Subscription>>,
    ticks: Cell<u64>,
}

impl PhysicsSystem {
    /// Create the system and wire it to the registry's lifecycle events.
    pub fn new(config: PhysicsConfig, registry: &Rc<ComponentRegistry>) -> Rc<Self> {
        let system = Rc::new(Self {
            config,
            registry: Rc::downgrade(registry),
            bus: registry.bus().clone(),
            world: RefCell::new(World::new()),
            bodies: RefCell::new(Vec::new()),
            fields: RefCell::new(Vec::new()),
            subscriptions: RefCell::new(Vec::new()),
            ticks: Cell::new(0),
        });
        Self::listen_for_lifecycle(&system);
        system
    }

    /// The fixed timestep in seconds.
    pub fn fixed_timestep(&self) -> f32 {
        self.config.fixed_timestep
    }

    /// Number of ticks run so far.
    pub fn tick_count(&self) -> u64 {
        self.ticks.get()
    }

    /// Number of registered bodies.
    pub fn body_count(&self) -> usize {
        self.bodies.borrow().len()
    }

    /// Read access to the underlying rigid-body world.
    pub fn solver(&self) -> Ref<'_, World> {
        self.world.borrow()
    }

    /// Write access to the underlying rigid-body world.
    pub fn solver_mut(&self) -> RefMut<'_, World> {
        self.world.borrow_mut()
    }

    fn listen_for_lifecycle(system: &Rc<Self>) {
        let on_new = {
            let weak = Rc::downgrade(system);
            system
                .bus
                .new_component
                .subscribe(move |ev: &ComponentEvent| {
                    if let Some(system) = weak.upgrade() {
                        system.on_register_comp(ev);
                    }
                })
        };
        let on_delete = {
            let weak = Rc::downgrade(system);
            system
                .bus
                .delete_component
                .subscribe(move |ev: &ComponentEvent| {
                    if let Some(system) = weak.upgrade() {
                        system.on_unregister_comp(ev);
                    }
                })
        };
        system
            .subscriptions
            .borrow_mut()
            .extend([on_new, on_delete]);
    }

    /// Lifecycle dispatch by type tag: only Physics and GravField
    /// components concern this system.
    fn on_register_comp(&self, ev: &ComponentEvent) {
        match ev.component.borrow().tag() {
            ComponentTag::Physics => {}
            ComponentTag::GravField => {
                self.fields.borrow_mut().push(Rc::clone(&ev.component));
                return;
            }
            _ => return,
        }
        self.register_body(&ev.component);
    }

    fn on_unregister_comp(&self, ev: &ComponentEvent) {
        match ev.component.borrow().tag() {
            ComponentTag::Physics => {}
            ComponentTag::GravField => {
                self.fields
                    .borrow_mut()
                    .retain(|f| !Rc::ptr_eq(f, &ev.component));
                return;
            }
            _ => return,
        }
        self.unregister_body(&ev.component);
    }

    /// Create the solver body and fixtures for a Physics component.
    ///
    /// The initial transform comes from a sibling Position component;
    /// its absence is not an error, the body starts at the origin with a
    /// warning. Each declared shape definition becomes one fixture whose
    /// geometry is read from the sibling Shape component it names; a
    /// missing shape reference skips that fixture with a warning.
    fn register_body(&self, comp: &ComponentRef) {
        let Some(registry) = self.registry.upgrade() else {
            return;
        };
        let entity_id = comp.borrow().entity_id().to_owned();

        let (position, angle) =
            match registry.component(&entity_id, ComponentTag::Position, "") {
                Some(pos_comp) => {
                    let pos_comp = pos_comp.borrow();
                    let pos = pos_comp.as_position().map(|p| (p.position, p.angle));
                    pos.unwrap_or((Vec2::zeros(), 0.0))
                }
                None => {
                    warn!("entity \"{entity_id}\": Physics registered without a Position sibling");
                    (Vec2::zeros(), 0.0)
                }
            };

        let (def, shapes) = {
            let comp = comp.borrow();
            let Some(physics) = comp.as_physics() else {
                return;
            };
            let mut flags = BodyFlags::empty();
            if physics.fixed_rotation {
                flags |= BodyFlags::FIXED_ROTATION;
            }
            if physics.bullet {
                flags |= BodyFlags::BULLET;
            }
            (
                BodyDef {
                    position,
                    angle,
                    body_type: physics.body_type,
                    linear_damping: physics.linear_damping,
                    angular_damping: physics.angular_damping,
                    flags,
                },
                physics.shapes.clone(),
            )
        };

        let mut world = self.world.borrow_mut();
        let key = world.create_body(&def);
        for shape_def in &shapes {
            let Some(shape_comp) =
                registry.component(&entity_id, ComponentTag::Shape, &shape_def.shape_id)
            else {
                warn!(
                    "entity \"{entity_id}\": no Shape \"{}\" for fixture, skipped",
                    shape_def.shape_id
                );
                continue;
            };
            let geometry = {
                let shape_comp = shape_comp.borrow();
                match shape_comp.as_shape() {
                    Some(shape) => shape.to_geometry(),
                    None => continue,
                }
            };
            world.create_fixture(
                key,
                FixtureDef {
                    shape: geometry,
                    density: shape_def.density,
                    friction: shape_def.friction,
                    restitution: shape_def.restitution,
                    is_sensor: shape_def.is_sensor,
                    tag: FixtureTag {
                        entity_id: entity_id.clone(),
                        shape_id: shape_def.shape_id.clone(),
                    },
                },
            );
        }
        let center = world.world_center(key);
        let body_angle = world.angle(key);
        drop(world);

        {
            let mut comp = comp.borrow_mut();
            if let Some(physics) = comp.as_physics_mut() {
                let runtime = &mut physics.runtime;
                runtime.body = Some(key);
                // Zero initial delta: previous == current == smooth.
                runtime.prev_position = center;
                runtime.prev_angle = body_angle;
                runtime.cur_position = center;
                runtime.cur_angle = body_angle;
                runtime.smooth_position = center;
                runtime.smooth_angle = body_angle;
                runtime.active_field = ActiveField::Root;
                // Saturated so the first qualifying field wins immediately.
                runtime.ticks_since_field_change = u32::MAX;
            }
        }
        self.bodies.borrow_mut().push(Rc::clone(comp));
    }

    fn unregister_body(&self, comp: &ComponentRef) {
        let key = {
            let mut comp = comp.borrow_mut();
            match comp.as_physics_mut() {
                Some(physics) => {
                    let key = physics.runtime.body.take();
                    physics.runtime.active_field = ActiveField::Root;
                    key
                }
                None => None,
            }
        };
        if let Some(key) = key {
            self.world.borrow_mut().destroy_body(key);
        }
        self.bodies.borrow_mut().retain(|c| !Rc::ptr_eq(c, comp));
    }

    /// Run one fixed timestep.
    ///
    /// Order per tick: snapshot previous transforms, advance the solver
    /// (which clears and re-accumulates the begin-contact buffer), write
    /// transforms back to Position siblings, resolve gravity and apply
    /// forces, apply path-follower target velocities, then publish the
    /// batched contact events.
    ///
    /// Gravity forces and path velocities are applied after the step and
    /// consumed by the next one, so a field's velocity change (and a
    /// follower's motion) shows up one tick after the cause.
    pub fn tick(&self) {
        let Some(registry) = self.registry.upgrade() else {
            return;
        };
        let dt = self.config.fixed_timestep;
        // Snapshot: bus handlers may add or remove bodies mid-tick.
        let tracked: Vec<ComponentRef> = self.bodies.borrow().clone();

        {
            let world = self.world.borrow();
            for comp in &tracked {
                let mut comp = comp.borrow_mut();
                let Some(physics) = comp.as_physics_mut() else {
                    continue;
                };
                let Some(key) = physics.runtime.body else {
                    continue;
                };
                if !world.contains_body(key) {
                    continue;
                }
                physics.runtime.prev_position = world.world_center(key);
                physics.runtime.prev_angle = world.angle(key);
            }
        }

        self.world.borrow_mut().step(
            dt,
            self.config.velocity_iterations,
            self.config.position_iterations,
        );

        for comp in &tracked {
            self.write_back_transform(&registry, comp);
        }
        for comp in &tracked {
            self.resolve_gravity(&registry, comp);
        }
        for comp in &tracked {
            self.apply_path_motion(&registry, comp, dt);
        }

        let contacts = self.world.borrow_mut().drain_new_contacts();
        for contact in contacts {
            let event = {
                let world = self.world.borrow();
                let (Some(tag_a), Some(tag_b)) = (
                    world.fixture_tag(contact.fixture_a),
                    world.fixture_tag(contact.fixture_b),
                ) else {
                    continue;
                };
                ContactEvent {
                    entity_a: tag_a.entity_id.clone(),
                    shape_a: tag_a.shape_id.clone(),
                    entity_b: tag_b.entity_id.clone(),
                    shape_b: tag_b.shape_id.clone(),
                    point: contact.point,
                    normal: contact.normal,
                }
            };
            self.bus.new_contact.fire(&event);
        }

        self.ticks.set(self.ticks.get() + 1);
    }

    /// Copy the post-step transform into the runtime cache and any
    /// sibling Position component.
    fn write_back_transform(&self, registry: &Rc<ComponentRegistry>, comp: &ComponentRef) {
        let (key, entity_id) = {
            let comp = comp.borrow();
            let Some(physics) = comp.as_physics() else {
                return;
            };
            let Some(key) = physics.runtime.body else {
                return;
            };
            (key, comp.entity_id().to_owned())
        };
        let (origin, center, angle) = {
            let world = self.world.borrow();
            if !world.contains_body(key) {
                return;
            }
            (world.position(key), world.world_center(key), world.angle(key))
        };
        {
            let mut comp = comp.borrow_mut();
            if let Some(physics) = comp.as_physics_mut() {
                physics.runtime.cur_position = center;
                physics.runtime.cur_angle = angle;
            }
        }
        if let Some(pos_comp) = registry.component(&entity_id, ComponentTag::Position, "") {
            let mut pos_comp = pos_comp.borrow_mut();
            if let Some(position) = pos_comp.as_position_mut() {
                position.position = origin;
                position.angle = angle;
            }
        }
    }

    /// Dominant-field selection with hysteresis, then force application.
    fn resolve_gravity(&self, registry: &Rc<ComponentRegistry>, comp: &ComponentRef) {
        let (key, grav_point_local, entity_id) = {
            let comp = comp.borrow();
            let Some(physics) = comp.as_physics() else {
                return;
            };
            let Some(key) = physics.runtime.body else {
                return;
            };
            (key, physics.grav_point, comp.entity_id().to_owned())
        };

        let choice = {
            let world = self.world.borrow();
            if !world.contains_body(key) || world.is_static(key) {
                return;
            }
            let grav_point_world =
                world.position(key) + rotate(grav_point_local, world.angle(key));

            let mut best: Option<FieldChoice> = None;
            let mut seen_entities: Vec<EntityId> = Vec::new();
            for edge in world.contacts_of(key) {
                let Some(tag) = world.fixture_tag(edge.other_fixture) else {
                    continue;
                };
                let other_entity = tag.entity_id.clone();
                if other_entity == entity_id || seen_entities.contains(&other_entity) {
                    continue;
                }
                seen_entities.push(other_entity.clone());

                // The gravitation point (not merely the contact) must lie
                // inside one of the field owner's fixtures.
                let inside = world
                    .body_fixtures(edge.other_body)
                    .iter()
                    .any(|&f| world.fixture_contains_point(f, grav_point_world));
                if !inside {
                    continue;
                }

                for field_comp in registry.components_of(&other_entity, ComponentTag::GravField) {
                    let (priority, instance_id) = {
                        let field_comp = field_comp.borrow();
                        let Some(field) = field_comp.as_grav_field() else {
                            continue;
                        };
                        (field.priority(), field_comp.instance_id().to_owned())
                    };
                    let order = self.field_registration_order(&field_comp);
                    let wins = match &best {
                        None => true,
                        Some(current) => {
                            priority > current.priority
                                || (priority == current.priority
                                    && order < current.registration_order)
                        }
                    };
                    if wins {
                        best = Some(FieldChoice {
                            field: ActiveField::Field {
                                entity_id: other_entity.clone(),
                                instance_id,
                            },
                            priority,
                            registration_order: order,
                        });
                    }
                }
            }
            best
        };

        let chosen = choice.map_or(ActiveField::Root, |c| c.field);

        let active = {
            let mut comp = comp.borrow_mut();
            let Some(physics) = comp.as_physics_mut() else {
                return;
            };
            let runtime = &mut physics.runtime;
            runtime.ticks_since_field_change = runtime.ticks_since_field_change.saturating_add(1);
            // Hysteresis: only commit a change after enough quiet ticks,
            // so bodies straddling a field boundary do not oscillate.
            if chosen != runtime.active_field
                && runtime.ticks_since_field_change >= self.config.field_switch_ticks
            {
                debug!("entity \"{entity_id}\": gravity field -> {chosen:?}");
                runtime.active_field = chosen;
                runtime.ticks_since_field_change = 0;
            }
            runtime.active_field.clone()
        };

        let body_center = self.world.borrow().world_center(key);
        let acceleration = self.field_acceleration(registry, comp, &active, body_center);

        let mut world = self.world.borrow_mut();
        let mass = world.mass(key);
        if mass > 0.0 {
            world.apply_force(key, acceleration * mass, body_center);
        }
    }

    /// Acceleration the active field exerts at a world point.
    fn field_acceleration(
        &self,
        registry: &Rc<ComponentRegistry>,
        comp: &ComponentRef,
        active: &ActiveField,
        body_center: Vec2,
    ) -> Vec2 {
        let (field_entity, field_instance) = match active {
            ActiveField::Root => return self.config.root_gravity,
            ActiveField::Field {
                entity_id,
                instance_id,
            } => (entity_id, instance_id),
        };
        let Some(field_comp) =
            registry.component(field_entity, ComponentTag::GravField, field_instance)
        else {
            // The field's entity is gone; fall back to the root field
            // until the next resolution pass re-selects.
            debug!("active gravity field on \"{field_entity}\" vanished, using root field");
            let mut comp = comp.borrow_mut();
            if let Some(physics) = comp.as_physics_mut() {
                physics.runtime.active_field = ActiveField::Root;
            }
            return self.config.root_gravity;
        };
        let kind = {
            let field_comp = field_comp.borrow();
            match field_comp.as_grav_field() {
                Some(field) => field.kind.clone(),
                None => return self.config.root_gravity,
            }
        };
        match kind {
            GravityKind::Directional { accel } => accel,
            GravityKind::Radial { center, strength } => {
                let center = self.field_center(registry, field_entity, center);
                let delta = center - body_center;
                let dist_sq = delta.norm_squared();
                if dist_sq <= f32::EPSILON {
                    Vec2::zeros()
                } else {
                    // Unit vector from the body toward the field center.
                    delta / dist_sq.sqrt() * strength
                }
            }
        }
    }

    /// World center of a radial field: the declared local center resolved
    /// against the owner's body transform while registered, else against
    /// the owner's Position component.
    fn field_center(
        &self,
        registry: &Rc<ComponentRegistry>,
        field_entity: &str,
        local: Vec2,
    ) -> Vec2 {
        if let Some(phys_comp) = registry.component(field_entity, ComponentTag::Physics, "") {
            let key = phys_comp.borrow().as_physics().and_then(|p| p.runtime.body);
            if let Some(key) = key {
                let world = self.world.borrow();
                if world.contains_body(key) {
                    return world.position(key) + rotate(local, world.angle(key));
                }
            }
        }
        if let Some(pos_comp) = registry.component(field_entity, ComponentTag::Position, "") {
            if let Some(position) = pos_comp.borrow().as_position() {
                return position.position + rotate(local, position.angle);
            }
        }
        warn!("radial field on \"{field_entity}\" has no body or Position; using its local center");
        local
    }

    fn field_registration_order(&self, field_comp: &ComponentRef) -> usize {
        self.fields
            .borrow()
            .iter()
            .position(|f| Rc::ptr_eq(f, field_comp))
            .unwrap_or(usize::MAX)
    }

    /// Apply a sibling path follower's target velocities to the body.
    fn apply_path_motion(&self, registry: &Rc<ComponentRegistry>, comp: &ComponentRef, dt: f32) {
        let (key, entity_id) = {
            let comp = comp.borrow();
            let Some(physics) = comp.as_physics() else {
                return;
            };
            let Some(key) = physics.runtime.body else {
                return;
            };
            (key, comp.entity_id().to_owned())
        };
        let Some(mover_comp) = registry.component(&entity_id, ComponentTag::PathMove, "") else {
            return;
        };
        let path_id = {
            let mover_comp = mover_comp.borrow();
            match mover_comp.as_path_move() {
                Some(mover) => mover.path_id.clone(),
                None => return,
            }
        };
        let Some(path_comp) = registry.component(&entity_id, ComponentTag::Path, &path_id) else {
            warn!("entity \"{entity_id}\": PathMove references missing Path \"{path_id}\"");
            return;
        };

        let target = {
            let path_comp = path_comp.borrow();
            let Some(path) = path_comp.as_path() else {
                return;
            };
            let mut mover_comp = mover_comp.borrow_mut();
            match mover_comp.as_path_move_mut() {
                Some(mover) => mover.advance(path, dt),
                None => return,
            }
        };
        let Some(target) = target else {
            return;
        };

        let mut world = self.world.borrow_mut();
        if !world.contains_body(key) {
            return;
        }
        world.set_linear_velocity(key, target.linear);
        world.set_angular_velocity(key, target.angular);
        if target.snap_position.is_some() || target.snap_angle.is_some() {
            let position = target.snap_position.unwrap_or_else(|| world.position(key));
            let angle = target.snap_angle.unwrap_or_else(|| world.angle(key));
            world.set_transform(key, position, angle);
        }
    }

    /// Interpolate every tracked body's transform between the previous
    /// and current solver states.
    ///
    /// `accumulator` is the partial-tick time elapsed since the last full
    /// step; the blend factor `accumulator / fixed_timestep` is clamped
    /// to [0, 1]. Angles interpolate along the shortest path across the
    /// +-pi wraparound.
    pub fn calculate_smooth_positions(&self, accumulator: f32) {
        let alpha = (accumulator / self.config.fixed_timestep).clamp(0.0, 1.0);
        for comp in self.bodies.borrow().iter() {
            let mut comp = comp.borrow_mut();
            let Some(physics) = comp.as_physics_mut() else {
                continue;
            };
            let runtime = &mut physics.runtime;
            if runtime.body.is_none() {
                continue;
            }
            runtime.smooth_position =
                runtime.prev_position.lerp(&runtime.cur_position, alpha);
            runtime.smooth_angle = lerp_angle(runtime.prev_angle, runtime.cur_angle, alpha);
        }
    }

    /// Find the entity whose fixtures contain a world point, with its
    /// full component list.
    pub fn select_entity(&self, point: Vec2) -> Option<(EntityId, Vec<ComponentRef>)> {
        let registry = self.registry.upgrade()?;
        let entity_id = {
            let world = self.world.borrow();
            let hits = world.query_point(point);
            let fixture = hits.first()?;
            world.fixture_tag(*fixture)?.entity_id.clone()
        };
        let components = registry.entity_components(&entity_id);
        Some((entity_id, components))
    }
}
