//! Integration tests for the full registry + physics pipeline
//!
//! Scenes are built through the component registry so the tests exercise
//! lifecycle events, gravity resolution, path following, contacts, and
//! interpolation together.

use std::cell::RefCell;
use std::rc::Rc;

use approx::assert_relative_eq;

use crate::config::PhysicsConfig;
use crate::ecs::component::{Component, ComponentData};
use crate::ecs::components::{
    ActiveField, CompGravField, CompPath, CompPathMove, CompPhysics, CompPosition, CompShape,
    GravityKind, PathPoint, ShapeFixture,
};
use crate::ecs::registry::ComponentRegistry;
use crate::ecs::ComponentTag;
use crate::events::{ContactEvent, EventBus};
use crate::foundation::math::Vec2;
use crate::physics::PhysicsSystem;
use crate::solver::{BodyKey, BodyType};

const DT: f32 = 1.0 / 60.0;

fn engine(root_gravity: Vec2) -> (EventBus, Rc<ComponentRegistry>, Rc<PhysicsSystem>) {
    let bus = EventBus::new();
    let registry = ComponentRegistry::new(bus.clone());
    let config = PhysicsConfig {
        root_gravity,
        ..PhysicsConfig::default()
    };
    let physics = PhysicsSystem::new(config, &registry);
    (bus, registry, physics)
}

fn ball(position: Vec2) -> Vec<Component> {
    vec![
        Component::new(ComponentData::Shape(CompShape::Circle {
            center: Vec2::zeros(),
            radius: 0.5,
        })),
        Component::new(ComponentData::Position(CompPosition::new(position, 0.0))),
        Component::new(ComponentData::Physics(CompPhysics::new(
            BodyType::Dynamic,
            vec![ShapeFixture::default()],
        ))),
    ]
}

fn field_owner(
    position: Vec2,
    radius: f32,
    kind: GravityKind,
    priority: i32,
) -> Vec<Component> {
    vec![
        Component::new(ComponentData::Shape(CompShape::Circle {
            center: Vec2::zeros(),
            radius,
        })),
        Component::new(ComponentData::Position(CompPosition::new(position, 0.0))),
        Component::new(ComponentData::Physics(CompPhysics::new(
            BodyType::Static,
            vec![ShapeFixture {
                is_sensor: true,
                ..ShapeFixture::default()
            }],
        ))),
        Component::new(ComponentData::GravField(CompGravField::new(kind, priority))),
    ]
}

fn body_key(registry: &Rc<ComponentRegistry>, entity: &str) -> BodyKey {
    registry
        .component(entity, ComponentTag::Physics, "")
        .unwrap()
        .borrow()
        .as_physics()
        .unwrap()
        .body_key()
        .unwrap()
}

fn active_field_entity(registry: &Rc<ComponentRegistry>, entity: &str) -> Option<String> {
    let comp = registry.component(entity, ComponentTag::Physics, "")?;
    let comp = comp.borrow();
    match comp.as_physics()?.active_field() {
        ActiveField::Root => None,
        ActiveField::Field { entity_id, .. } => Some(entity_id.clone()),
    }
}

#[test]
fn root_gravity_shows_up_one_tick_after_application() {
    let (_bus, registry, physics) = engine(Vec2::new(0.0, -25.0));
    registry.add_entity("ball", ball(Vec2::zeros()));
    let key = body_key(&registry, "ball");

    // Forces applied after a step are consumed by the next one.
    physics.tick();
    assert_eq!(physics.solver().linear_velocity(key), Vec2::zeros());

    physics.tick();
    assert_relative_eq!(
        physics.solver().linear_velocity(key).y,
        -25.0 * DT,
        epsilon = 1e-5
    );

    physics.tick();
    let position = registry
        .component("ball", ComponentTag::Position, "")
        .unwrap();
    assert!(position.borrow().as_position().unwrap().position.y < 0.0);
}

#[test]
fn directional_field_replaces_root_gravity() {
    let (_bus, registry, physics) = engine(Vec2::new(0.0, -25.0));
    registry.add_entity(
        "booster",
        field_owner(
            Vec2::zeros(),
            5.0,
            GravityKind::Directional {
                accel: Vec2::new(10.0, 0.0),
            },
            10,
        ),
    );
    registry.add_entity("ball", ball(Vec2::zeros()));
    let key = body_key(&registry, "ball");

    // A fresh body adopts its first field without waiting out hysteresis.
    physics.tick();
    assert_eq!(
        active_field_entity(&registry, "ball"),
        Some("booster".to_owned())
    );

    physics.tick();
    let velocity = physics.solver().linear_velocity(key);
    assert_relative_eq!(velocity.x, 10.0 * DT, epsilon = 1e-5);
    assert_relative_eq!(velocity.y, 0.0);
}

#[test]
fn radial_field_pulls_toward_owner_center() {
    let (_bus, registry, physics) = engine(Vec2::new(0.0, -25.0));
    registry.add_entity(
        "planet",
        field_owner(
            Vec2::new(10.0, 0.0),
            8.0,
            GravityKind::Radial {
                center: Vec2::zeros(),
                strength: 25.0,
            },
            50,
        ),
    );
    registry.add_entity("ball", ball(Vec2::new(4.0, 0.0)));
    let key = body_key(&registry, "ball");

    physics.tick();
    assert_eq!(
        active_field_entity(&registry, "ball"),
        Some("planet".to_owned())
    );

    physics.tick();
    let velocity = physics.solver().linear_velocity(key);
    assert_relative_eq!(velocity.x, 25.0 * DT, epsilon = 1e-4);
    assert_relative_eq!(velocity.y, 0.0);

    for _ in 0..10 {
        physics.tick();
    }
    assert_eq!(
        active_field_entity(&registry, "ball"),
        Some("planet".to_owned())
    );
}

#[test]
fn radial_center_offset_moves_the_pull_point() {
    let (_bus, registry, physics) = engine(Vec2::zeros());
    // The owner sits at (10, 0) but pulls toward (10, 0) + (-8, 0).
    registry.add_entity(
        "planet",
        field_owner(
            Vec2::new(10.0, 0.0),
            8.0,
            GravityKind::Radial {
                center: Vec2::new(-8.0, 0.0),
                strength: 25.0,
            },
            50,
        ),
    );
    registry.add_entity("ball", ball(Vec2::new(4.0, 0.0)));
    let key = body_key(&registry, "ball");

    physics.tick();
    physics.tick();
    // The pull center (2, 0) is behind the ball, so it accelerates in -x
    // even though the owner's body is ahead of it.
    let velocity = physics.solver().linear_velocity(key);
    assert_relative_eq!(velocity.x, -25.0 * DT, epsilon = 1e-4);
    assert_relative_eq!(velocity.y, 0.0);
}

#[test]
fn higher_priority_field_wins_and_switch_waits_out_hysteresis() {
    let (_bus, registry, physics) = engine(Vec2::new(0.0, -25.0));
    registry.add_entity(
        "weak",
        field_owner(
            Vec2::zeros(),
            6.0,
            GravityKind::Directional {
                accel: Vec2::new(5.0, 0.0),
            },
            10,
        ),
    );
    registry.add_entity(
        "strong",
        field_owner(
            Vec2::zeros(),
            6.0,
            GravityKind::Directional {
                accel: Vec2::new(0.0, 30.0),
            },
            90,
        ),
    );
    registry.add_entity("ball", ball(Vec2::zeros()));

    physics.tick();
    assert_eq!(
        active_field_entity(&registry, "ball"),
        Some("strong".to_owned())
    );

    // Pull the stronger field's owner out from under the ball.
    let strong_key = body_key(&registry, "strong");
    physics
        .solver_mut()
        .set_transform(strong_key, Vec2::new(100.0, 0.0), 0.0);

    // field_switch_ticks = 10: the change is held back for nine ticks.
    for _ in 0..9 {
        physics.tick();
        assert_eq!(
            active_field_entity(&registry, "ball"),
            Some("strong".to_owned())
        );
    }
    physics.tick();
    assert_eq!(
        active_field_entity(&registry, "ball"),
        Some("weak".to_owned())
    );
}

#[test]
fn equal_priority_resolves_by_registration_order() {
    let (_bus, registry, physics) = engine(Vec2::new(0.0, -25.0));
    registry.add_entity(
        "first",
        field_owner(
            Vec2::zeros(),
            6.0,
            GravityKind::Directional {
                accel: Vec2::new(1.0, 0.0),
            },
            20,
        ),
    );
    registry.add_entity(
        "second",
        field_owner(
            Vec2::zeros(),
            6.0,
            GravityKind::Directional {
                accel: Vec2::new(-1.0, 0.0),
            },
            20,
        ),
    );
    registry.add_entity("ball", ball(Vec2::zeros()));

    physics.tick();
    assert_eq!(
        active_field_entity(&registry, "ball"),
        Some("first".to_owned())
    );
}

#[test]
fn path_follower_drives_body_through_solver() {
    let (_bus, registry, physics) = engine(Vec2::zeros());
    let mut components = ball(Vec2::zeros());
    components.push(Component::new(ComponentData::Path(CompPath::new(vec![
        PathPoint::timed(Vec2::zeros(), 0.0, 0.0),
        PathPoint::timed(Vec2::new(12.0, 0.0), 0.0, 2.0),
    ]))));
    components.push(Component::new(ComponentData::PathMove(CompPathMove::new(
        "",
    ))));
    registry.add_entity("platform", components);
    let key = body_key(&registry, "platform");

    // The first tick only sets the target velocity; motion starts on the
    // second.
    physics.tick();
    assert_relative_eq!(physics.solver().position(key).x, 0.0);
    assert_relative_eq!(physics.solver().linear_velocity(key).x, 6.0, epsilon = 1e-4);

    physics.tick();
    assert_relative_eq!(physics.solver().position(key).x, 6.0 * DT, epsilon = 1e-4);

    for _ in 0..130 {
        physics.tick();
    }
    // Arrives near the waypoint (velocity application lags one tick) and
    // halts there.
    let x = physics.solver().position(key).x;
    assert!((x - 12.0).abs() < 0.25, "stopped at x = {x}");
    assert_eq!(physics.solver().linear_velocity(key), Vec2::zeros());
}

#[test]
fn repeating_path_snaps_back_to_first_waypoint() {
    let (_bus, registry, physics) = engine(Vec2::zeros());
    let mut components = ball(Vec2::zeros());
    components.push(Component::new(ComponentData::Path(CompPath::new(vec![
        PathPoint::timed(Vec2::zeros(), 0.0, 0.0),
        PathPoint::timed(Vec2::new(12.0, 0.0), 0.0, 2.0),
    ]))));
    components.push(Component::new(ComponentData::PathMove(
        CompPathMove::new("").repeating(true),
    )));
    registry.add_entity("platform", components);
    let key = body_key(&registry, "platform");

    let mut max_x: f32 = 0.0;
    for _ in 0..123 {
        physics.tick();
        max_x = max_x.max(physics.solver().position(key).x);
    }
    // Travelled most of the segment, then teleported back on wraparound.
    assert!(max_x > 11.0, "max x = {max_x}");
    assert!(physics.solver().position(key).x < 1.0);
}

#[test]
fn new_contacts_fire_once_with_entity_ids() {
    let (bus, registry, physics) = engine(Vec2::zeros());
    registry.add_entity("a", ball(Vec2::zeros()));
    registry.add_entity("b", ball(Vec2::new(0.6, 0.0)));

    let seen: Rc<RefCell<Vec<(String, String)>>> = Rc::new(RefCell::new(Vec::new()));
    let _sub = {
        let seen = Rc::clone(&seen);
        bus.new_contact.subscribe(move |ev: &ContactEvent| {
            seen.borrow_mut()
                .push((ev.entity_a.clone(), ev.entity_b.clone()));
        })
    };

    physics.tick();
    {
        let seen = seen.borrow();
        assert_eq!(seen.len(), 1);
        let mut pair = vec![seen[0].0.clone(), seen[0].1.clone()];
        pair.sort();
        assert_eq!(pair, vec!["a".to_owned(), "b".to_owned()]);
    }

    // Still touching: no repeat event.
    physics.tick();
    assert_eq!(seen.borrow().len(), 1);
}

#[test]
fn select_entity_hits_the_fixture_under_the_point() {
    let (_bus, registry, physics) = engine(Vec2::zeros());
    registry.add_entity("a", ball(Vec2::zeros()));
    registry.add_entity("b", ball(Vec2::new(3.0, 0.0)));
    physics.tick();

    let (entity, components) = physics.select_entity(Vec2::new(3.1, 0.0)).unwrap();
    assert_eq!(entity, "b");
    assert_eq!(components.len(), 3);
    assert!(physics.select_entity(Vec2::new(50.0, 50.0)).is_none());
}

#[test]
fn removing_the_entity_destroys_its_body() {
    let (_bus, registry, physics) = engine(Vec2::zeros());
    registry.add_entity("ball", ball(Vec2::zeros()));
    let key = body_key(&registry, "ball");
    assert_eq!(physics.body_count(), 1);

    registry.remove_entity("ball");
    assert_eq!(physics.body_count(), 0);
    assert!(!physics.solver().contains_body(key));
}

#[test]
fn smooth_transforms_interpolate_between_steps() {
    let (_bus, registry, physics) = engine(Vec2::zeros());
    registry.add_entity("ball", ball(Vec2::zeros()));
    let key = body_key(&registry, "ball");
    physics
        .solver_mut()
        .set_linear_velocity(key, Vec2::new(6.0, 0.0));

    physics.tick();
    physics.calculate_smooth_positions(DT * 0.5);

    let comp = registry
        .component("ball", ComponentTag::Physics, "")
        .unwrap();
    let smooth = comp.borrow().as_physics().unwrap().smooth_position();
    assert_relative_eq!(smooth.x, 6.0 * DT * 0.5, epsilon = 1e-5);

    // Alpha clamps at one past a full step.
    physics.calculate_smooth_positions(DT * 3.0);
    let smooth = comp.borrow().as_physics().unwrap().smooth_position();
    assert_relative_eq!(smooth.x, 6.0 * DT, epsilon = 1e-5);
}

#[test]
fn smooth_angle_crosses_the_pi_wraparound_the_short_way() {
    let (_bus, registry, physics) = engine(Vec2::zeros());
    let mut components = ball(Vec2::zeros());
    components[1] = Component::new(ComponentData::Position(CompPosition::new(
        Vec2::zeros(),
        3.0,
    )));
    registry.add_entity("spinner", components);
    let key = body_key(&registry, "spinner");
    // Half a radian per tick pushes the angle across +pi.
    physics.solver_mut().set_angular_velocity(key, 0.5 / DT);

    physics.tick();
    physics.calculate_smooth_positions(DT * 0.5);

    let comp = registry
        .component("spinner", ComponentTag::Physics, "")
        .unwrap();
    let smooth = comp.borrow().as_physics().unwrap().smooth_angle();
    // Midway between 3.0 and the wrapped 3.5 stays near the seam instead
    // of sweeping back through zero.
    assert!(smooth.abs() > 3.0, "smooth angle = {smooth}");
}
