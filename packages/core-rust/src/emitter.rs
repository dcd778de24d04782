//! Minimal event emitter with ordered listener lists.
//!
//! Request and response objects expose lifecycle events through this
//! capability; the re-scoping adapter in [`crate::rescope`] wraps it so
//! deferred handlers run inside the context active at subscription time.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;
use serde_json::Value;

use crate::rescope::RescopeTable;

/// Identity token for a registered handler.
///
/// The Rust rendering of "the handler reference the caller passed in":
/// closures have no usable identity of their own, so subscription returns a
/// token and removal takes it back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

type Handler = Arc<dyn Fn(&Value) + Send + Sync>;

struct Listener {
    id: HandlerId,
    handler: Handler,
}

/// Event emitter dispatching to listeners in registration order.
///
/// Dispatch snapshots the listener list, so a handler may subscribe or
/// unsubscribe on the same emitter without deadlocking. Listener lists are
/// owned by the emitter and dropped with it.
#[derive(Default)]
pub struct EventEmitter {
    listeners: Mutex<HashMap<String, Vec<Listener>>>,
    next_id: AtomicU64,
    // Set once by the first ScopedEmitter adaptation; shared by all later
    // adaptations so no second indirection layer can exist.
    rescope: OnceLock<Arc<RescopeTable>>,
}

impl EventEmitter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn register(&self, event: &str, handler: Handler, prepend: bool) -> HandlerId {
        let id = HandlerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let listener = Listener { id, handler };
        let mut listeners = self.listeners.lock();
        let entry = listeners.entry(event.to_owned()).or_default();
        if prepend {
            entry.insert(0, listener);
        } else {
            entry.push(listener);
        }
        id
    }

    /// Appends a listener for `event`.
    pub fn on(&self, event: &str, handler: impl Fn(&Value) + Send + Sync + 'static) -> HandlerId {
        self.register(event, Arc::new(handler), false)
    }

    /// Inserts a listener at the front of `event`'s invocation order.
    pub fn prepend(
        &self,
        event: &str,
        handler: impl Fn(&Value) + Send + Sync + 'static,
    ) -> HandlerId {
        self.register(event, Arc::new(handler), true)
    }

    /// Removes the listener identified by `id`. Returns whether a listener
    /// was actually detached; removing an unknown id is a silent no-op.
    pub fn off(&self, event: &str, id: HandlerId) -> bool {
        let mut listeners = self.listeners.lock();
        let Some(entry) = listeners.get_mut(event) else {
            return false;
        };
        let before = entry.len();
        entry.retain(|l| l.id != id);
        let removed = entry.len() < before;
        if entry.is_empty() {
            listeners.remove(event);
        }
        removed
    }

    /// Invokes all listeners for `event` in order with `payload`.
    /// Returns the number of listeners invoked.
    pub fn emit(&self, event: &str, payload: &Value) -> usize {
        let snapshot: Vec<Handler> = {
            let listeners = self.listeners.lock();
            match listeners.get(event) {
                Some(entry) => entry.iter().map(|l| Arc::clone(&l.handler)).collect(),
                None => Vec::new(),
            }
        };
        for handler in &snapshot {
            handler(payload);
        }
        snapshot.len()
    }

    /// Number of listeners currently registered for `event`.
    #[must_use]
    pub fn listener_count(&self, event: &str) -> usize {
        self.listeners
            .lock()
            .get(event)
            .map_or(0, Vec::len)
    }

    pub(crate) fn rescope_table(&self) -> Arc<RescopeTable> {
        Arc::clone(self.rescope.get_or_init(|| Arc::new(RescopeTable::new())))
    }
}

impl std::fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let listeners = self.listeners.lock();
        f.debug_struct("EventEmitter")
            .field("events", &listeners.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
