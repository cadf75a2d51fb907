//! Event system for lifecycle and gameplay notifications
//!
//! Key principles:
//! - Typed channels (one payload type per channel, no downcasting)
//! - Synchronous, ordered dispatch on the calling thread
//! - Registration returns an RAII [`Subscription`] that unregisters on drop
//! - Copy-on-fire snapshots so listeners may unsubscribe mid-dispatch

use std::cell::RefCell;
use std::rc::Rc;

use crate::ecs::{ComponentRef, EntityId};
use crate::foundation::math::Vec2;

type Listener<T> = Rc<RefCell<dyn FnMut(&T)>>;

struct Listeners<T> {
    next_id: u64,
    entries: Vec<(u64, Listener<T>)>,
}

/// A typed publish/subscribe channel.
///
/// Cloning a channel shares the listener list; both clones fire to the
/// same subscribers. Dispatch is immediate, in registration order, with
/// no queuing and no cross-tick buffering.
pub struct Channel<T> {
    inner: Rc<RefCell<Listeners<T>>>,
}

impl<T> Clone for Channel<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: 'static> Default for Channel<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static> Channel<T> {
    /// Create an empty channel.
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(Listeners {
                next_id: 0,
                entries: Vec::new(),
            })),
        }
    }

    /// Register a listener; it stays registered for the lifetime of the
    /// returned [`Subscription`].
    pub fn subscribe(&self, listener: impl FnMut(&T) + 'static) -> Subscription {
        let id = {
            let mut inner = self.inner.borrow_mut();
            let id = inner.next_id;
            inner.next_id += 1;
            inner.entries.push((id, Rc::new(RefCell::new(listener))));
            id
        };
        let weak = Rc::downgrade(&self.inner);
        Subscription {
            cancel: Some(Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    inner.borrow_mut().entries.retain(|(i, _)| *i != id);
                }
            })),
        }
    }

    /// Invoke every currently-registered listener with `payload`, in
    /// registration order, on the calling thread.
    ///
    /// The listener list is snapshotted first, so a listener removing
    /// itself or another listener does not corrupt iteration; listeners
    /// added during dispatch are not invoked until the next fire.
    ///
    /// Dispatch tolerates re-entry: a listener whose body makes this
    /// channel fire again (say, an entity-creation handler spawning
    /// another entity) is skipped by the inner dispatch, since it is
    /// already running further up the stack. Every other listener still
    /// receives the inner payload.
    pub fn fire(&self, payload: &T) {
        let snapshot: Vec<Listener<T>> = self
            .inner
            .borrow()
            .entries
            .iter()
            .map(|(_, l)| Rc::clone(l))
            .collect();
        for listener in snapshot {
            let Ok(mut listener) = listener.try_borrow_mut() else {
                continue;
            };
            (*listener)(payload);
        }
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.inner.borrow().entries.len()
    }
}

/// RAII subscription handle; dropping it unregisters the listener.
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    /// Keep the listener registered for the remaining lifetime of the
    /// channel, discarding the handle.
    pub fn detach(mut self) {
        self.cancel = None;
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

/// Payload for entity lifecycle channels.
#[derive(Clone)]
pub struct EntityEvent {
    /// The entity being created or removed.
    pub entity_id: EntityId,
}

/// Payload for component lifecycle channels.
#[derive(Clone)]
pub struct ComponentEvent {
    /// Owning entity of the component.
    pub entity_id: EntityId,
    /// The component itself; receivers may borrow it mutably.
    pub component: ComponentRef,
}

/// One new touching shape pair, published after the physics step.
#[derive(Clone)]
pub struct ContactEvent {
    /// Entity owning the first fixture.
    pub entity_a: EntityId,
    /// Shape component instance id behind the first fixture.
    pub shape_a: String,
    /// Entity owning the second fixture.
    pub entity_b: EntityId,
    /// Shape component instance id behind the second fixture.
    pub shape_b: String,
    /// Representative world-space touch point.
    pub point: Vec2,
    /// Contact normal pointing from the first body toward the second.
    pub normal: Vec2,
}

/// Read-modify-write request against a named Variable component.
#[derive(Clone)]
pub struct VariableChange {
    /// Entity owning the variable.
    pub entity_id: EntityId,
    /// Variable component instance id.
    pub instance_id: String,
    /// Transform applied to the current value.
    pub apply: Rc<dyn Fn(i64) -> i64>,
}

/// A message to surface to the player (consumed by the excluded renderer).
#[derive(Clone)]
pub struct DisplayMessage {
    /// Message text.
    pub text: String,
}

/// Level-end notification.
#[derive(Clone)]
pub struct LevelEnd {
    /// Whether the player won.
    pub won: bool,
}

/// The named channels the core publishes on.
///
/// Cloning shares every channel, so the registry, the physics system and
/// gameplay code all see the same subscribers.
#[derive(Clone, Default)]
pub struct EventBus {
    /// Fired once per `add_entity`, after its `new_component` events.
    pub new_entity: Channel<EntityEvent>,
    /// Fired before `delete_component` when an entity is removed.
    pub delete_entity: Channel<EntityEvent>,
    /// Fired per component on insertion, in initialization order.
    pub new_component: Channel<ComponentEvent>,
    /// Fired per component on removal, after `delete_entity`.
    pub delete_component: Channel<ComponentEvent>,
    /// Fired per new touching shape pair, batched after each physics step.
    pub new_contact: Channel<ContactEvent>,
    /// Functional update requests against Variable components.
    pub variable_change: Channel<VariableChange>,
    /// Player-facing message requests.
    pub display_message: Channel<DisplayMessage>,
    /// Level-end requests.
    pub level_end: Channel<LevelEnd>,
}

impl EventBus {
    /// Create a bus with all channels empty.
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn fires_in_registration_order() {
        let channel: Channel<u32> = Channel::new();
        let seen = Rc::new(RefCell::new(Vec::new()));

        let s1 = {
            let seen = Rc::clone(&seen);
            channel.subscribe(move |v| seen.borrow_mut().push(('a', *v)))
        };
        let s2 = {
            let seen = Rc::clone(&seen);
            channel.subscribe(move |v| seen.borrow_mut().push(('b', *v)))
        };

        channel.fire(&7);
        assert_eq!(*seen.borrow(), vec![('a', 7), ('b', 7)]);
        drop(s1);
        drop(s2);
    }

    #[test]
    fn drop_unregisters() {
        let channel: Channel<u32> = Channel::new();
        let count = Rc::new(Cell::new(0));

        let sub = {
            let count = Rc::clone(&count);
            channel.subscribe(move |_| count.set(count.get() + 1))
        };
        channel.fire(&0);
        assert_eq!(count.get(), 1);

        drop(sub);
        channel.fire(&0);
        assert_eq!(count.get(), 1);
        assert_eq!(channel.listener_count(), 0);
    }

    #[test]
    fn listener_may_unsubscribe_another_mid_fire() {
        let channel: Channel<u32> = Channel::new();
        let count = Rc::new(Cell::new(0));

        let victim = {
            let count = Rc::clone(&count);
            channel.subscribe(move |_| count.set(count.get() + 1))
        };
        let slot: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));
        // First listener in order drops the second's subscription; the
        // snapshot still delivers this fire to both.
        let killer = {
            let slot = Rc::clone(&slot);
            channel.subscribe(move |_| {
                slot.borrow_mut().take();
            })
        };
        // Re-subscribe victim after killer so order is killer, victim.
        drop(victim);
        let victim = {
            let count = Rc::clone(&count);
            channel.subscribe(move |_| count.set(count.get() + 1))
        };
        *slot.borrow_mut() = Some(victim);

        channel.fire(&0);
        assert_eq!(count.get(), 1);
        channel.fire(&0);
        assert_eq!(count.get(), 1);
        drop(killer);
    }

    #[test]
    fn reentrant_fire_skips_the_listener_already_running() {
        let channel: Channel<u32> = Channel::new();
        let seen = Rc::new(RefCell::new(Vec::new()));

        let inner_channel = channel.clone();
        let count = Rc::new(Cell::new(0));
        let refire = {
            let count = Rc::clone(&count);
            channel.subscribe(move |v| {
                count.set(count.get() + 1);
                if *v == 0 {
                    inner_channel.fire(&1);
                }
            })
        };
        let recorder = {
            let seen = Rc::clone(&seen);
            channel.subscribe(move |v| seen.borrow_mut().push(*v))
        };

        channel.fire(&0);
        // The refiring listener ran once; the inner fire reached the
        // other listener before the outer dispatch resumed.
        assert_eq!(count.get(), 1);
        assert_eq!(*seen.borrow(), vec![1, 0]);
        drop(refire);
        drop(recorder);
    }

    #[test]
    fn detach_keeps_listener_alive() {
        let channel: Channel<u32> = Channel::new();
        let count = Rc::new(Cell::new(0));
        {
            let count = Rc::clone(&count);
            channel.subscribe(move |_| count.set(count.get() + 1)).detach();
        }
        channel.fire(&0);
        assert_eq!(count.get(), 1);
    }
}
