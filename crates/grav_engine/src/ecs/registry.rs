//! Component registry: owns all entities and their components
//!
//! All methods take `&self`; the entity map lives behind a `RefCell` and
//! every internal borrow is released before bus events fire, so listeners
//! may query or mutate the registry reentrantly from the same call stack.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::{Rc, Weak};

use log::warn;
use thiserror::Error;

use crate::events::{ComponentEvent, EntityEvent, EventBus, Subscription, VariableChange};

use super::component::{Component, ComponentRef, ComponentTag};
use super::EntityId;

/// Registry operation failures.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum RegistryError {
    /// Rename target already exists.
    #[error("entity \"{0}\" already exists")]
    EntityExists(String),
    /// Entity not found.
    #[error("entity \"{0}\" not found")]
    EntityNotFound(String),
}

#[derive(Default)]
struct EntityRecord {
    /// All components in initialization order; drives event ordering.
    ordered: Vec<ComponentRef>,
    /// Per-tag storage for typed lookup.
    by_tag: HashMap<ComponentTag, Vec<ComponentRef>>,
}

/// Owns every entity (an opaque string id) and its attached components.
///
/// Mutating operations publish lifecycle events on the shared
/// [`EventBus`]; see each method for the exact ordering contract.
pub struct ComponentRegistry {
    entities: RefCell<HashMap<EntityId, EntityRecord>>,
    /// Entities mid-teardown; guards against reentrant removal while
    /// delete events are still being dispatched.
    tearing_down: RefCell<HashSet<EntityId>>,
    bus: EventBus,
    subscriptions: RefCell<Vec<Subscription>>,
    /// Handed to components on attach for sibling lookup.
    weak_self: Weak<ComponentRegistry>,
}

impl ComponentRegistry {
    /// Create a registry publishing on `bus`.
    pub fn new(bus: EventBus) -> Rc<Self> {
        let registry = Rc::new_cyclic(|weak| Self {
            entities: RefCell::new(HashMap::new()),
            tearing_down: RefCell::new(HashSet::new()),
            bus,
            subscriptions: RefCell::new(Vec::new()),
            weak_self: weak.clone(),
        });
        registry.listen_for_variable_changes();
        registry
    }

    /// The bus this registry publishes on.
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Insert an entity with its components.
    ///
    /// If `id` already exists the old entity is torn down first through
    /// the normal [`Self::remove_entity`] event sequence, so listeners
    /// never see components vanish silently. Components are sorted into
    /// initialization order (Shape, Position, Physics, Path, PathMove,
    /// then the rest) before insertion; `new_component` fires per
    /// component in that order, then `new_entity` fires once.
    pub fn add_entity(&self, id: impl Into<EntityId>, components: Vec<Component>) {
        let id = id.into();
        if self.contains_entity(&id) {
            warn!("add_entity: replacing existing entity \"{id}\"");
            self.remove_entity(&id);
        }

        let mut components = components;
        components.sort_by_key(|c| c.tag().init_rank());

        let mut record = EntityRecord::default();
        for mut component in components {
            component.attach(&id, self.weak_self.clone());
            let tag = component.tag();
            let instance_id = component.instance_id().to_owned();
            let slot = record.by_tag.entry(tag).or_default();
            if !instance_id.is_empty()
                && slot
                    .iter()
                    .any(|c| c.borrow().instance_id() == instance_id)
            {
                warn!(
                    "entity \"{id}\": duplicate {} instance id \"{instance_id}\"",
                    tag.name()
                );
            }
            let handle: ComponentRef = Rc::new(RefCell::new(component));
            slot.push(Rc::clone(&handle));
            record.ordered.push(handle);
        }

        let ordered = record.ordered.clone();
        self.entities.borrow_mut().insert(id.clone(), record);

        // Map borrow released; listeners may query the registry.
        for component in ordered {
            self.bus.new_component.fire(&ComponentEvent {
                entity_id: id.clone(),
                component,
            });
        }
        self.bus.new_entity.fire(&EntityEvent {
            entity_id: id.clone(),
        });
    }

    /// Remove an entity and all its components. No-op if absent.
    ///
    /// Fires `delete_entity` first, then `delete_component` per component
    /// in storage order, and only then removes the entity structurally,
    /// so listeners can still query "this entity is going away" while the
    /// events dispatch.
    /// Returns whether the entity existed.
    pub fn remove_entity(&self, id: &str) -> bool {
        if !self.contains_entity(id) || !self.tearing_down.borrow_mut().insert(id.to_owned()) {
            return false;
        }
        let ordered = self
            .entities
            .borrow()
            .get(id)
            .map(|record| record.ordered.clone())
            .unwrap_or_default();

        self.bus.delete_entity.fire(&EntityEvent {
            entity_id: id.to_owned(),
        });
        for component in ordered {
            self.bus.delete_component.fire(&ComponentEvent {
                entity_id: id.to_owned(),
                component,
            });
        }

        self.entities.borrow_mut().remove(id);
        self.tearing_down.borrow_mut().remove(id);
        true
    }

    /// Re-key an entity, updating every owned component's entity
    /// back-reference. Fails if `new` exists or `old` does not.
    pub fn rename_entity(&self, old: &str, new: &str) -> Result<(), RegistryError> {
        let mut entities = self.entities.borrow_mut();
        if entities.contains_key(new) {
            return Err(RegistryError::EntityExists(new.to_owned()));
        }
        let record = entities
            .remove(old)
            .ok_or_else(|| RegistryError::EntityNotFound(old.to_owned()))?;
        for component in &record.ordered {
            component.borrow_mut().set_entity_id(new);
        }
        entities.insert(new.to_owned(), record);
        Ok(())
    }

    /// Look up one component by entity, tag, and instance id.
    ///
    /// An empty `instance_id` returns the first component of that tag in
    /// storage order (ambiguous when several exist).
    pub fn component(
        &self,
        entity_id: &str,
        tag: ComponentTag,
        instance_id: &str,
    ) -> Option<ComponentRef> {
        let entities = self.entities.borrow();
        let slot = entities.get(entity_id)?.by_tag.get(&tag)?;
        if instance_id.is_empty() {
            slot.first().cloned()
        } else {
            slot.iter()
                .find(|c| c.borrow().instance_id() == instance_id)
                .cloned()
        }
    }

    /// All components of a tag for an entity, in storage order.
    pub fn components_of(&self, entity_id: &str, tag: ComponentTag) -> Vec<ComponentRef> {
        self.entities
            .borrow()
            .get(entity_id)
            .and_then(|record| record.by_tag.get(&tag))
            .map(|slot| slot.clone())
            .unwrap_or_default()
    }

    /// Every component of an entity, in initialization order.
    pub fn entity_components(&self, entity_id: &str) -> Vec<ComponentRef> {
        self.entities
            .borrow()
            .get(entity_id)
            .map(|record| record.ordered.clone())
            .unwrap_or_default()
    }

    /// Whether an entity exists.
    pub fn contains_entity(&self, id: &str) -> bool {
        self.entities.borrow().contains_key(id)
    }

    /// Ids of all entities, in no particular order.
    pub fn all_entities(&self) -> Vec<EntityId> {
        self.entities.borrow().keys().cloned().collect()
    }

    /// Number of entities.
    pub fn entity_count(&self) -> usize {
        self.entities.borrow().len()
    }

    /// Apply `variable_change` requests to Variable components.
    fn listen_for_variable_changes(&self) {
        let weak = self.weak_self.clone();
        let sub = self
            .bus
            .variable_change
            .subscribe(move |change: &VariableChange| {
                let Some(registry) = weak.upgrade() else {
                    return;
                };
                match registry.component(
                    &change.entity_id,
                    ComponentTag::Variable,
                    &change.instance_id,
                ) {
                    Some(comp) => {
                        let mut comp = comp.borrow_mut();
                        if let Some(var) = comp.as_variable_mut() {
                            var.value = (change.apply)(var.value);
                        }
                    }
                    None => warn!(
                        "variable_change: no Variable \"{}\" on entity \"{}\"",
                        change.instance_id, change.entity_id
                    ),
                }
            });
        self.subscriptions.borrow_mut().push(sub);
    }
}
