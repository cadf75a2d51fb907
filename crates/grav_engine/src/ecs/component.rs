//! Component: a typed, optionally-identified unit of data attached to an
//! entity
//!
//! The variant set is closed and known at compile time, so dispatch is a
//! match on [`ComponentTag`] rather than downcasting.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::components::{
    CompGravField, CompPath, CompPathMove, CompPhysics, CompPlayerController, CompPosition,
    CompShape, CompTrigger, CompVariable, CompVisualAnimation, CompVisualMessage,
    CompVisualTexture,
};
use super::registry::ComponentRegistry;
use super::EntityId;

/// Shared handle to a component. Sharing exists only at the registry
/// storage layer so systems can keep references across lifecycle events;
/// a component is never owned by two entities.
pub type ComponentRef = Rc<RefCell<Component>>;

/// Stable type tag, one per [`ComponentData`] variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentTag {
    /// Collision geometry.
    Shape,
    /// World transform.
    Position,
    /// Rigid body wrapper.
    Physics,
    /// Gravity field source.
    GravField,
    /// Waypoint list.
    Path,
    /// Path follower.
    PathMove,
    /// Player input tuning.
    PlayerController,
    /// Static texture.
    VisualTexture,
    /// Frame animation.
    VisualAnimation,
    /// On-screen message.
    VisualMessage,
    /// Named integer variable.
    Variable,
    /// Trigger declaration.
    Trigger,
}

impl ComponentTag {
    /// Initialization rank. Components with lower ranks are inserted
    /// (and receive their `new_component` event) first, because some
    /// setup logic depends on siblings already being attached: Physics
    /// reads Position and Shape at registration time, PathMove reads
    /// Path.
    pub fn init_rank(self) -> u8 {
        match self {
            Self::Shape => 0,
            Self::Position => 1,
            Self::Physics => 2,
            Self::Path => 3,
            Self::PathMove => 4,
            _ => 5,
        }
    }

    /// Stable display name of the tag.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Shape => "Shape",
            Self::Position => "Position",
            Self::Physics => "Physics",
            Self::GravField => "GravField",
            Self::Path => "Path",
            Self::PathMove => "PathMove",
            Self::PlayerController => "PlayerController",
            Self::VisualTexture => "VisualTexture",
            Self::VisualAnimation => "VisualAnimation",
            Self::VisualMessage => "VisualMessage",
            Self::Variable => "Variable",
            Self::Trigger => "Trigger",
        }
    }
}

/// Closed tagged union over every component variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ComponentData {
    /// Collision geometry.
    Shape(CompShape),
    /// World transform.
    Position(CompPosition),
    /// Rigid body wrapper.
    Physics(CompPhysics),
    /// Gravity field source.
    GravField(CompGravField),
    /// Waypoint list.
    Path(CompPath),
    /// Path follower.
    PathMove(CompPathMove),
    /// Player input tuning.
    PlayerController(CompPlayerController),
    /// Static texture.
    VisualTexture(CompVisualTexture),
    /// Frame animation.
    VisualAnimation(CompVisualAnimation),
    /// On-screen message.
    VisualMessage(CompVisualMessage),
    /// Named integer variable.
    Variable(CompVariable),
    /// Trigger declaration.
    Trigger(CompTrigger),
}

impl ComponentData {
    /// The tag of this variant.
    pub fn tag(&self) -> ComponentTag {
        match self {
            Self::Shape(_) => ComponentTag::Shape,
            Self::Position(_) => ComponentTag::Position,
            Self::Physics(_) => ComponentTag::Physics,
            Self::GravField(_) => ComponentTag::GravField,
            Self::Path(_) => ComponentTag::Path,
            Self::PathMove(_) => ComponentTag::PathMove,
            Self::PlayerController(_) => ComponentTag::PlayerController,
            Self::VisualTexture(_) => ComponentTag::VisualTexture,
            Self::VisualAnimation(_) => ComponentTag::VisualAnimation,
            Self::VisualMessage(_) => ComponentTag::VisualMessage,
            Self::Variable(_) => ComponentTag::Variable,
            Self::Trigger(_) => ComponentTag::Trigger,
        }
    }
}

/// Property-tree (de)serialization failures.
#[derive(Error, Debug)]
pub enum PropertyTreeError {
    /// Serialization failed.
    #[error("serialize: {0}")]
    Serialize(#[from] ron::Error),
    /// Parsing failed.
    #[error("parse: {0}")]
    Parse(#[from] ron::error::SpannedError),
}

/// On-disk form of a component: instance id plus variant data.
#[derive(Serialize, Deserialize)]
struct PropertyTree {
    #[serde(default)]
    instance_id: String,
    data: ComponentData,
}

/// A component instance: variant data, an optional instance id (unique
/// within its owning entity for its type; "" is the default instance),
/// the owning entity id, and a weak handle to the registry for sibling
/// lookup.
#[derive(Debug, Clone)]
pub struct Component {
    data: ComponentData,
    instance_id: String,
    entity_id: EntityId,
    registry: Weak<ComponentRegistry>,
}

impl Component {
    /// Create a component with the default ("") instance id.
    pub fn new(data: ComponentData) -> Self {
        Self::with_id(data, "")
    }

    /// Create a component with an explicit instance id.
    pub fn with_id(data: ComponentData, instance_id: impl Into<String>) -> Self {
        Self {
            data,
            instance_id: instance_id.into(),
            entity_id: EntityId::new(),
            registry: Weak::new(),
        }
    }

    /// The variant tag.
    pub fn tag(&self) -> ComponentTag {
        self.data.tag()
    }

    /// Instance id; "" for the default instance.
    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    /// Id of the owning entity; empty until inserted into a registry.
    pub fn entity_id(&self) -> &str {
        &self.entity_id
    }

    /// The variant data.
    pub fn data(&self) -> &ComponentData {
        &self.data
    }

    /// Mutable variant data.
    pub fn data_mut(&mut self) -> &mut ComponentData {
        &mut self.data
    }

    /// The registry this component is attached to, if still alive.
    pub fn registry(&self) -> Option<Rc<ComponentRegistry>> {
        self.registry.upgrade()
    }

    /// Look up a sibling component on the same entity.
    pub fn sibling(&self, tag: ComponentTag, instance_id: &str) -> Option<ComponentRef> {
        self.registry()?.component(&self.entity_id, tag, instance_id)
    }

    pub(crate) fn attach(&mut self, entity_id: &str, registry: Weak<ComponentRegistry>) {
        self.entity_id = entity_id.to_owned();
        self.registry = registry;
    }

    pub(crate) fn set_entity_id(&mut self, entity_id: &str) {
        self.entity_id = entity_id.to_owned();
    }

    /// Serialize instance id and variant data to a property tree string.
    /// Runtime-only state (solver handles, interpolation caches) is not
    /// written.
    pub fn to_property_tree(&self) -> Result<String, PropertyTreeError> {
        let tree = PropertyTree {
            instance_id: self.instance_id.clone(),
            data: self.data.clone(),
        };
        Ok(ron::ser::to_string_pretty(
            &tree,
            ron::ser::PrettyConfig::default(),
        )?)
    }

    /// Rebuild a component from a property tree string. The result is
    /// detached: it belongs to no entity until inserted into a registry.
    pub fn from_property_tree(text: &str) -> Result<Self, PropertyTreeError> {
        let tree: PropertyTree = ron::from_str(text)?;
        Ok(Self::with_id(tree.data, tree.instance_id))
    }

    /// Shape data, if this is a Shape component.
    pub fn as_shape(&self) -> Option<&CompShape> {
        match &self.data {
            ComponentData::Shape(s) => Some(s),
            _ => None,
        }
    }

    /// Position data, if this is a Position component.
    pub fn as_position(&self) -> Option<&CompPosition> {
        match &self.data {
            ComponentData::Position(p) => Some(p),
            _ => None,
        }
    }

    /// Mutable position data.
    pub fn as_position_mut(&mut self) -> Option<&mut CompPosition> {
        match &mut self.data {
            ComponentData::Position(p) => Some(p),
            _ => None,
        }
    }

    /// Physics data, if this is a Physics component.
    pub fn as_physics(&self) -> Option<&CompPhysics> {
        match &self.data {
            ComponentData::Physics(p) => Some(p),
            _ => None,
        }
    }

    /// Mutable physics data.
    pub fn as_physics_mut(&mut self) -> Option<&mut CompPhysics> {
        match &mut self.data {
            ComponentData::Physics(p) => Some(p),
            _ => None,
        }
    }

    /// Gravity field data, if this is a GravField component.
    pub fn as_grav_field(&self) -> Option<&CompGravField> {
        match &self.data {
            ComponentData::GravField(g) => Some(g),
            _ => None,
        }
    }

    /// Path data, if this is a Path component.
    pub fn as_path(&self) -> Option<&CompPath> {
        match &self.data {
            ComponentData::Path(p) => Some(p),
            _ => None,
        }
    }

    /// Path follower data, if this is a PathMove component.
    pub fn as_path_move(&self) -> Option<&CompPathMove> {
        match &self.data {
            ComponentData::PathMove(p) => Some(p),
            _ => None,
        }
    }

    /// Mutable path follower data.
    pub fn as_path_move_mut(&mut self) -> Option<&mut CompPathMove> {
        match &mut self.data {
            ComponentData::PathMove(p) => Some(p),
            _ => None,
        }
    }

    /// Variable data, if this is a Variable component.
    pub fn as_variable(&self) -> Option<&CompVariable> {
        match &self.data {
            ComponentData::Variable(v) => Some(v),
            _ => None,
        }
    }

    /// Mutable variable data.
    pub fn as_variable_mut(&mut self) -> Option<&mut CompVariable> {
        match &mut self.data {
            ComponentData::Variable(v) => Some(v),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::components::{GravityKind, PathPoint, ShapeFixture};
    use crate::foundation::math::Vec2;
    use crate::solver::BodyType;

    #[test]
    fn tag_matches_variant() {
        let comp = Component::new(ComponentData::Position(CompPosition::default()));
        assert_eq!(comp.tag(), ComponentTag::Position);
        assert_eq!(comp.instance_id(), "");
    }

    #[test]
    fn init_ranks_order_core_variants_first() {
        assert!(ComponentTag::Shape.init_rank() < ComponentTag::Physics.init_rank());
        assert!(ComponentTag::Position.init_rank() < ComponentTag::Physics.init_rank());
        assert!(ComponentTag::Path.init_rank() < ComponentTag::PathMove.init_rank());
        assert!(ComponentTag::PathMove.init_rank() < ComponentTag::Trigger.init_rank());
    }

    #[test]
    fn property_tree_round_trip_keeps_instance_id() {
        let comp = Component::with_id(
            ComponentData::Shape(CompShape::Circle {
                center: Vec2::new(1.0, 2.0),
                radius: 3.0,
            }),
            "hull",
        );
        let text = comp.to_property_tree().unwrap();
        let back = Component::from_property_tree(&text).unwrap();
        assert_eq!(back.instance_id(), "hull");
        assert_eq!(back.data(), comp.data());
    }

    #[test]
    fn property_tree_round_trips_every_variant() {
        let variants = vec![
            ComponentData::Shape(CompShape::Polygon {
                vertices: vec![
                    Vec2::new(-1.0, -1.0),
                    Vec2::new(1.0, -1.0),
                    Vec2::new(0.0, 1.0),
                ],
            }),
            ComponentData::Position(CompPosition::new(Vec2::new(1.0, -2.0), 0.5)),
            ComponentData::Physics(
                CompPhysics::new(BodyType::Static, vec![ShapeFixture::default()])
                    .with_grav_point(Vec2::new(0.0, -0.5)),
            ),
            ComponentData::GravField(CompGravField::new(
                GravityKind::Radial {
                    center: Vec2::new(0.0, 1.0),
                    strength: 9.0,
                },
                7,
            )),
            ComponentData::Path(CompPath::new(vec![
                PathPoint::timed(Vec2::zeros(), 0.0, 0.0),
                PathPoint::timed(Vec2::new(3.0, 0.0), 1.0, 2.0),
            ])),
            ComponentData::PathMove(CompPathMove::new("route").repeating(true)),
            ComponentData::PlayerController(CompPlayerController {
                walk_accel: 40.0,
                max_walk_speed: 8.0,
                jump_impulse: 12.0,
            }),
            ComponentData::VisualTexture(CompVisualTexture {
                texture: "crate".to_owned(),
                size: Vec2::new(1.0, 1.0),
                z_order: 2,
            }),
            ComponentData::VisualAnimation(CompVisualAnimation {
                animation: "spin".to_owned(),
                start_frame: 3,
                looping: true,
            }),
            ComponentData::VisualMessage(CompVisualMessage {
                text: "checkpoint".to_owned(),
                duration_secs: 1.5,
            }),
            ComponentData::Variable(CompVariable { value: -3 }),
            ComponentData::Trigger(CompTrigger {
                condition: "score > 1".to_owned(),
                effects: vec!["end_level".to_owned()],
            }),
        ];

        for data in variants {
            let comp = Component::with_id(data, "x");
            let text = comp.to_property_tree().unwrap();
            let back = Component::from_property_tree(&text).unwrap();
            assert_eq!(back.data(), comp.data(), "variant {}", comp.tag().name());
            assert_eq!(back.instance_id(), "x");
        }
    }
}
