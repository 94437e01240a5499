#![forbid(unsafe_code)]

//! The engine snapshot and its change listeners.
//!
//! The engine owns a [`SnapshotHub`] and publishes a fresh
//! [`EngineSnapshot`] at the end of every update. Listeners run only when
//! the published value differs from the previous one, in the order they
//! subscribed.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

/// Externally observable engine state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EngineSnapshot {
    /// Initial load not yet painted.
    pub is_loading: bool,
    pub is_refreshing: bool,
    pub has_more_before: bool,
    pub has_more_after: bool,
    pub auto_scroll: bool,
    pub len: usize,
    pub generation: u64,
}

type Listener = Rc<dyn Fn(&EngineSnapshot)>;

#[derive(Default)]
struct Registry {
    next_id: u64,
    entries: Vec<(u64, Listener)>,
}

/// Current snapshot plus the listeners waiting on it.
#[derive(Default)]
pub struct SnapshotHub {
    current: EngineSnapshot,
    registry: Rc<RefCell<Registry>>,
}

impl SnapshotHub {
    #[must_use]
    pub fn current(&self) -> EngineSnapshot {
        self.current
    }

    /// Replace the snapshot. Returns `false`, and notifies nobody, when
    /// `next` equals the current value.
    pub fn publish(&mut self, next: EngineSnapshot) -> bool {
        if next == self.current {
            return false;
        }
        tracing::trace!(?next, "snapshot changed");
        self.current = next;
        // Cloned out so a listener may drop any guard, its own included.
        let listeners: Vec<Listener> = self
            .registry
            .borrow()
            .entries
            .iter()
            .map(|(_, listener)| Rc::clone(listener))
            .collect();
        for listener in listeners {
            listener(&next);
        }
        true
    }

    pub fn subscribe(&self, listener: impl Fn(&EngineSnapshot) + 'static) -> Subscription {
        let mut registry = self.registry.borrow_mut();
        let id = registry.next_id;
        registry.next_id += 1;
        registry.entries.push((id, Rc::new(listener)));
        Subscription {
            id,
            registry: Rc::downgrade(&self.registry),
        }
    }
}

impl fmt::Debug for SnapshotHub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SnapshotHub")
            .field("current", &self.current)
            .field("listeners", &self.registry.borrow().entries.len())
            .finish()
    }
}

/// Keeps a snapshot listener registered. Drop to unsubscribe.
#[must_use = "dropping a Subscription unsubscribes the listener"]
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    registry: Weak<RefCell<Registry>>,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry
                .borrow_mut()
                .entries
                .retain(|(id, _)| *id != self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn with_len(len: usize) -> EngineSnapshot {
        EngineSnapshot {
            len,
            ..EngineSnapshot::default()
        }
    }

    #[test]
    fn unchanged_snapshot_is_not_announced() {
        let mut hub = SnapshotHub::default();
        let hits = Rc::new(Cell::new(0u32));
        let counter = Rc::clone(&hits);
        let _sub = hub.subscribe(move |_| counter.set(counter.get() + 1));

        assert!(!hub.publish(EngineSnapshot::default()));
        assert!(hub.publish(with_len(3)));
        assert!(!hub.publish(with_len(3)));
        assert_eq!(hits.get(), 1);
        assert_eq!(hub.current().len, 3);
    }

    #[test]
    fn listeners_run_in_subscription_order() {
        let mut hub = SnapshotHub::default();
        let order = Rc::new(RefCell::new(Vec::new()));
        let a = Rc::clone(&order);
        let b = Rc::clone(&order);
        let _first = hub.subscribe(move |s| a.borrow_mut().push(("first", s.len)));
        let _second = hub.subscribe(move |s| b.borrow_mut().push(("second", s.len)));
        hub.publish(with_len(7));
        assert_eq!(*order.borrow(), vec![("first", 7), ("second", 7)]);
    }

    #[test]
    fn dropping_the_guard_unsubscribes() {
        let mut hub = SnapshotHub::default();
        let hits = Rc::new(Cell::new(0u32));
        let counter = Rc::clone(&hits);
        let sub = hub.subscribe(move |_| counter.set(counter.get() + 1));
        hub.publish(with_len(1));
        drop(sub);
        hub.publish(with_len(2));
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn listener_may_drop_a_later_guard() {
        let mut hub = SnapshotHub::default();
        let later: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));
        let slot = Rc::clone(&later);
        let _first = hub.subscribe(move |_| drop(slot.borrow_mut().take()));
        let hits = Rc::new(Cell::new(0u32));
        let counter = Rc::clone(&hits);
        *later.borrow_mut() = Some(hub.subscribe(move |_| counter.set(counter.get() + 1)));

        // The second listener was already collected for this round.
        hub.publish(with_len(1));
        assert_eq!(hits.get(), 1);
        hub.publish(with_len(2));
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn guard_outliving_the_hub_is_harmless() {
        let hub = SnapshotHub::default();
        let sub = hub.subscribe(|_| {});
        drop(hub);
        drop(sub);
    }
}
