//! Entity/component runtime
//!
//! Entities are opaque string identifiers owning a bag of components.
//! Components are variants of a closed tagged union ([`ComponentData`]),
//! stored behind shared handles at the registry layer so systems can hold
//! references across lifecycle events.

pub mod component;
pub mod components;
pub mod registry;

pub use component::{Component, ComponentData, ComponentRef, ComponentTag, PropertyTreeError};
pub use registry::{ComponentRegistry, RegistryError};

/// Opaque entity identifier. An entity has no storage of its own; it
/// exists only as a key in the [`ComponentRegistry`].
pub type EntityId = String;
