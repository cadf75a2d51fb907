//! Level loading
//!
//! A level is a RON document declaring entities and their components.
//! Documents are validated before instantiation so a bad reference (a
//! fixture naming a missing Shape, a follower naming a missing Path)
//! fails the whole load instead of producing a half-built scene.

use std::rc::Rc;

use log::info;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ecs::component::{Component, ComponentData, ComponentTag};
use crate::ecs::components::PathError;
use crate::ecs::registry::ComponentRegistry;
use crate::ecs::EntityId;

/// Level loading failures.
#[derive(Error, Debug)]
pub enum LoadError {
    /// File read failed.
    #[error("read: {0}")]
    Io(#[from] std::io::Error),
    /// RON parse failed.
    #[error("parse: {0}")]
    Parse(#[from] ron::error::SpannedError),
    /// Two entity declarations share an id.
    #[error("duplicate entity \"{0}\"")]
    DuplicateEntity(EntityId),
    /// A fixture names a Shape instance the entity does not carry.
    #[error("entity \"{entity}\": fixture references unknown shape \"{shape_id}\"")]
    UnknownShape {
        /// Declaring entity.
        entity: EntityId,
        /// Missing Shape instance id.
        shape_id: String,
    },
    /// A follower names a Path instance the entity does not carry.
    #[error("entity \"{entity}\": follower references unknown path \"{path_id}\"")]
    UnknownPath {
        /// Declaring entity.
        entity: EntityId,
        /// Missing Path instance id.
        path_id: String,
    },
    /// A Path component fails its own validation.
    #[error("entity \"{entity}\": invalid path: {source}")]
    InvalidPath {
        /// Declaring entity.
        entity: EntityId,
        /// Underlying path error.
        source: PathError,
    },
}

/// One component declaration inside an entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentDecl {
    /// Instance id ("" for the default instance).
    #[serde(default)]
    pub instance_id: String,
    /// Variant payload.
    pub data: ComponentData,
}

/// One entity declaration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityDecl {
    /// Entity id, unique within the document.
    pub id: EntityId,
    /// Component declarations in any order; initialization order is
    /// decided by the registry.
    #[serde(default)]
    pub components: Vec<ComponentDecl>,
}

/// A parsed level document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LevelDoc {
    /// Human-readable level name.
    #[serde(default)]
    pub name: String,
    /// Entity declarations.
    #[serde(default)]
    pub entities: Vec<EntityDecl>,
}

impl LevelDoc {
    /// Parse a document from RON text.
    pub fn from_str(text: &str) -> Result<Self, LoadError> {
        let doc: Self = ron::from_str(text)?;
        doc.validate()?;
        Ok(doc)
    }

    /// Parse a document from a file.
    pub fn from_file(path: &str) -> Result<Self, LoadError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_str(&text)
    }

    /// Check internal references without touching any registry.
    pub fn validate(&self) -> Result<(), LoadError> {
        let mut seen = std::collections::HashSet::new();
        for entity in &self.entities {
            if !seen.insert(entity.id.as_str()) {
                return Err(LoadError::DuplicateEntity(entity.id.clone()));
            }
            validate_entity(entity)?;
        }
        Ok(())
    }

    /// Instantiate every declared entity into `registry`. The document
    /// must already be valid (construction via [`Self::from_str`] or
    /// [`Self::from_file`] guarantees it).
    pub fn instantiate(&self, registry: &Rc<ComponentRegistry>) {
        info!(
            "loading level \"{}\": {} entities",
            self.name,
            self.entities.len()
        );
        for entity in &self.entities {
            let components = entity
                .components
                .iter()
                .map(|decl| Component::with_id(decl.data.clone(), decl.instance_id.clone()))
                .collect();
            registry.add_entity(entity.id.clone(), components);
        }
    }
}

fn validate_entity(entity: &EntityDecl) -> Result<(), LoadError> {
    let has_instance = |tag: ComponentTag, id: &str| {
        entity
            .components
            .iter()
            .any(|decl| decl.data.tag() == tag && decl.instance_id == id)
    };

    for decl in &entity.components {
        match &decl.data {
            ComponentData::Physics(physics) => {
                for fixture in &physics.shapes {
                    if !has_instance(ComponentTag::Shape, &fixture.shape_id) {
                        return Err(LoadError::UnknownShape {
                            entity: entity.id.clone(),
                            shape_id: fixture.shape_id.clone(),
                        });
                    }
                }
            }
            ComponentData::Path(path) => {
                path.validate().map_err(|source| LoadError::InvalidPath {
                    entity: entity.id.clone(),
                    source,
                })?;
            }
            ComponentData::PathMove(follower) => {
                if !has_instance(ComponentTag::Path, &follower.path_id) {
                    return Err(LoadError::UnknownPath {
                        entity: entity.id.clone(),
                        path_id: follower.path_id.clone(),
                    });
                }
            }
            _ => {}
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::components::{
        CompPathMove, CompPhysics, CompPosition, CompShape, ShapeFixture,
    };
    use crate::events::EventBus;
    use crate::foundation::math::Vec2;
    use crate::solver::BodyType;

    fn decl(data: ComponentData) -> ComponentDecl {
        ComponentDecl {
            instance_id: String::new(),
            data,
        }
    }

    fn pit_level() -> LevelDoc {
        LevelDoc {
            name: "pit".to_owned(),
            entities: vec![
                EntityDecl {
                    id: "floor".to_owned(),
                    components: vec![
                        decl(ComponentData::Shape(CompShape::Polygon {
                            vertices: vec![
                                Vec2::new(-10.0, 0.0),
                                Vec2::new(10.0, 0.0),
                                Vec2::new(10.0, 1.0),
                                Vec2::new(-10.0, 1.0),
                            ],
                        })),
                        decl(ComponentData::Position(CompPosition::new(
                            Vec2::new(0.0, -1.0),
                            0.0,
                        ))),
                        decl(ComponentData::Physics(CompPhysics::new(
                            BodyType::Static,
                            vec![ShapeFixture::default()],
                        ))),
                    ],
                },
                EntityDecl {
                    id: "ball".to_owned(),
                    components: vec![
                        decl(ComponentData::Shape(CompShape::Circle {
                            center: Vec2::zeros(),
                            radius: 0.5,
                        })),
                        decl(ComponentData::Position(CompPosition::new(
                            Vec2::new(0.0, 3.0),
                            0.0,
                        ))),
                        decl(ComponentData::Physics(CompPhysics::new(
                            BodyType::Dynamic,
                            vec![ShapeFixture::default()],
                        ))),
                    ],
                },
            ],
        }
    }

    #[test]
    fn round_trips_and_instantiates() {
        let text = ron::ser::to_string_pretty(&pit_level(), Default::default()).unwrap();
        let doc = LevelDoc::from_str(&text).unwrap();
        assert_eq!(doc.name, "pit");
        assert_eq!(doc.entities.len(), 2);

        let registry = ComponentRegistry::new(EventBus::new());
        doc.instantiate(&registry);
        assert_eq!(registry.entity_count(), 2);
        assert!(registry
            .component("ball", ComponentTag::Physics, "")
            .is_some());
    }

    #[test]
    fn rejects_unknown_shape_reference() {
        let doc = LevelDoc {
            name: String::new(),
            entities: vec![EntityDecl {
                id: "e".to_owned(),
                components: vec![decl(ComponentData::Physics(CompPhysics::new(
                    BodyType::Dynamic,
                    vec![ShapeFixture {
                        shape_id: "hull".to_owned(),
                        ..ShapeFixture::default()
                    }],
                )))],
            }],
        };
        assert!(matches!(
            doc.validate().unwrap_err(),
            LoadError::UnknownShape { .. }
        ));
    }

    #[test]
    fn rejects_unknown_path_reference() {
        let doc = LevelDoc {
            name: String::new(),
            entities: vec![EntityDecl {
                id: "e".to_owned(),
                components: vec![decl(ComponentData::PathMove(CompPathMove::new("route")))],
            }],
        };
        assert!(matches!(
            doc.validate().unwrap_err(),
            LoadError::UnknownPath { .. }
        ));
    }

    #[test]
    fn rejects_duplicate_entity() {
        let doc = LevelDoc {
            name: String::new(),
            entities: vec![
                EntityDecl {
                    id: "e".to_owned(),
                    components: vec![],
                },
                EntityDecl {
                    id: "e".to_owned(),
                    components: vec![],
                },
            ],
        };
        assert!(matches!(
            doc.validate().unwrap_err(),
            LoadError::DuplicateEntity(_)
        ));
    }
}
