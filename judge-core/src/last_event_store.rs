//! Concurrent mapping from event identity to the last emitted event.
//!
//! A single alert identity is owned by exactly one scheduler worker in the
//! normal case (§5 of spec.md), but this store must stay correct even if
//! that assumption is violated — it is also consulted by other components
//! of the broader system. `Get`/`Set` are the only two operations, each
//! atomic with respect to readers, matching the "narrow operations with
//! explicit atomicity" design principle (no ambient globals, no partial
//! reads of a torn event).

use std::collections::HashMap;
use std::sync::RwLock;

use crate::model::Event;

#[derive(Default)]
pub struct LastEventStore {
    inner: RwLock<HashMap<String, Event>>,
}

impl LastEventStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
        }
    }

    /// Fetch the last event for an identity, if any.
    pub fn get(&self, id: &str) -> Option<Event> {
        self.inner
            .read()
            .expect("last-event store lock poisoned")
            .get(id)
            .cloned()
    }

    /// Overwrite the last event for an identity. The prior event (if any)
    /// is discarded atomically with respect to readers.
    pub fn set(&self, event: Event) {
        self.inner
            .write()
            .expect("last-event store lock poisoned")
            .insert(event.id.clone(), event);
    }

    pub fn len(&self) -> usize {
        self.inner.read().expect("last-event store lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
