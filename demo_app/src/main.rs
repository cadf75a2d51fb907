//! Orbit demo
//!
//! Headless scene exercising the gravity field machinery: a ball falls
//! under root gravity, enters a planet's radial field, and a platform
//! loops a rectangular waypoint path. Runs ten simulated seconds and
//! logs what happens.

use grav_engine::foundation::logging;
use grav_engine::prelude::*;

fn spawn_planet(registry: &std::rc::Rc<ComponentRegistry>) {
    registry.add_entity(
        "planet",
        vec![
            Component::new(ComponentData::Shape(CompShape::Circle {
                center: Vec2::zeros(),
                radius: 3.0,
            })),
            Component::with_id(
                ComponentData::Shape(CompShape::Circle {
                    center: Vec2::zeros(),
                    radius: 12.0,
                }),
                "influence",
            ),
            Component::new(ComponentData::Position(CompPosition::new(
                Vec2::new(0.0, 30.0),
                0.0,
            ))),
            Component::new(ComponentData::Physics(CompPhysics::new(
                BodyType::Static,
                vec![
                    ShapeFixture::default(),
                    ShapeFixture {
                        shape_id: "influence".to_owned(),
                        is_sensor: true,
                        ..ShapeFixture::default()
                    },
                ],
            ))),
            Component::new(ComponentData::GravField(CompGravField::new(
                GravityKind::Radial {
                    center: Vec2::zeros(),
                    strength: 25.0,
                },
                50,
            ))),
        ],
    );
}

fn spawn_ball(registry: &std::rc::Rc<ComponentRegistry>) {
    registry.add_entity(
        "ball",
        vec![
            Component::new(ComponentData::Shape(CompShape::Circle {
                center: Vec2::zeros(),
                radius: 0.5,
            })),
            Component::new(ComponentData::Position(CompPosition::new(
                Vec2::new(4.0, 45.0),
                0.0,
            ))),
            Component::new(ComponentData::Physics(CompPhysics::new(
                BodyType::Dynamic,
                vec![ShapeFixture::default()],
            ))),
        ],
    );
}

fn spawn_platform(registry: &std::rc::Rc<ComponentRegistry>) {
    let corners = [
        Vec2::new(-8.0, 0.0),
        Vec2::new(8.0, 0.0),
        Vec2::new(8.0, 6.0),
        Vec2::new(-8.0, 6.0),
    ];
    let points = corners
        .iter()
        .map(|corner| PathPoint::timed(*corner, 0.0, 2.0))
        .collect();

    registry.add_entity(
        "platform",
        vec![
            Component::new(ComponentData::Shape(CompShape::Polygon {
                vertices: vec![
                    Vec2::new(-1.5, -0.25),
                    Vec2::new(1.5, -0.25),
                    Vec2::new(1.5, 0.25),
                    Vec2::new(-1.5, 0.25),
                ],
            })),
            Component::new(ComponentData::Position(CompPosition::new(
                corners[0], 0.0,
            ))),
            Component::new(ComponentData::Physics(CompPhysics::new(
                BodyType::Dynamic,
                vec![ShapeFixture {
                    is_sensor: true,
                    ..ShapeFixture::default()
                }],
            ))),
            Component::new(ComponentData::Path(CompPath::new(points))),
            Component::new(ComponentData::PathMove(
                CompPathMove::new("").repeating(false),
            )),
        ],
    );
}

fn main() {
    logging::init();

    let bus = EventBus::new();
    let registry = ComponentRegistry::new(bus.clone());
    let physics = PhysicsSystem::new(PhysicsConfig::default(), &registry);

    spawn_planet(&registry);
    spawn_ball(&registry);
    spawn_platform(&registry);

    let _contact_log = bus.new_contact.subscribe(|contact: &ContactEvent| {
        log::info!(
            "contact: {} <-> {} at ({:.2}, {:.2})",
            contact.entity_a,
            contact.entity_b,
            contact.point.x,
            contact.point.y
        );
    });

    let mut clock = FixedTimestep::new(physics.fixed_timestep());
    let frame_delta = 1.0 / 60.0;
    let frames = 600;

    for frame in 0..frames {
        clock.advance(frame_delta);
        while clock.tick() {
            physics.tick();
        }
        physics.calculate_smooth_positions(clock.accumulator());

        if frame % 60 == 0 {
            report(&registry, &physics, frame);
        }
    }

    log::info!("simulated {} ticks", physics.tick_count());
}

fn report(registry: &std::rc::Rc<ComponentRegistry>, physics: &PhysicsSystem, frame: u32) {
    let Some(ball) = registry.component("ball", ComponentTag::Physics, "") else {
        return;
    };
    let ball = ball.borrow();
    let Some(body) = ball.as_physics() else {
        return;
    };
    let position = body.smooth_position();
    let field = match body.active_field() {
        ActiveField::Root => "root".to_owned(),
        ActiveField::Field { entity_id, .. } => entity_id.clone(),
    };
    log::info!(
        "frame {frame}: ball at ({:.2}, {:.2}), field {field}, {} bodies",
        position.x,
        position.y,
        physics.body_count()
    );
}
