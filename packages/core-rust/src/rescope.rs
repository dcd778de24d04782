//! Emitter re-scoping: subscription-time context capture.
//!
//! An [`EventEmitter`]'s internal dispatch knows nothing about logical
//! executions -- a handler registered while request R's scope is active may
//! fire from a completely different task, long after the registering call
//! stack is gone. [`ScopedEmitter`] is the explicit adapter around an
//! emitter: each subscription captures the context active at that moment
//! and installs a wrapper that re-enters it around the original handler.
//!
//! Adaptation is idempotent per emitter. The side table recording
//! wrapper registrations is created once and shared by every adapter handle,
//! so adapting twice never stacks a second indirection layer, and a handler
//! registered through one handle is removable through another.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;

use crate::context::{self, ContextRecord};
use crate::emitter::{EventEmitter, HandlerId};

/// Per-emitter side table: event name -> scoped registrations in
/// subscription order. Lives inside the emitter (created on first
/// adaptation) and is dropped with it.
#[derive(Default)]
pub(crate) struct RescopeTable {
    entries: Mutex<HashMap<String, Vec<HandlerId>>>,
}

impl RescopeTable {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn record(&self, event: &str, id: HandlerId) {
        self.entries.lock().entry(event.to_owned()).or_default().push(id);
    }

    /// Removes `id` from `event`'s registrations by identity.
    fn forget(&self, event: &str, id: HandlerId) -> bool {
        let mut entries = self.entries.lock();
        let Some(ids) = entries.get_mut(event) else {
            return false;
        };
        let before = ids.len();
        ids.retain(|known| *known != id);
        let removed = ids.len() < before;
        if ids.is_empty() {
            entries.remove(event);
        }
        removed
    }

    /// Pops the most recently subscribed registration for `event`.
    fn pop_last(&self, event: &str) -> Option<HandlerId> {
        let mut entries = self.entries.lock();
        let ids = entries.get_mut(event)?;
        let id = ids.pop();
        if ids.is_empty() {
            entries.remove(event);
        }
        id
    }

    fn count(&self, event: &str) -> usize {
        self.entries.lock().get(event).map_or(0, Vec::len)
    }
}

/// Context-capturing adapter over an [`EventEmitter`].
#[derive(Clone)]
pub struct ScopedEmitter {
    inner: Arc<EventEmitter>,
    table: Arc<RescopeTable>,
}

impl ScopedEmitter {
    /// Adapts `emitter` for context capture.
    ///
    /// Idempotent: adapting the same emitter again returns a handle onto the
    /// same side table, never an additional wrapping layer.
    #[must_use]
    pub fn adapt(emitter: Arc<EventEmitter>) -> Self {
        let table = emitter.rescope_table();
        Self { inner: emitter, table }
    }

    fn wrap(
        handler: impl Fn(&Value) + Send + Sync + 'static,
    ) -> impl Fn(&Value) + Send + Sync + 'static {
        // Captured once, at subscription time. A handler subscribed outside
        // any scope stays unscoped rather than entering an empty one.
        let scope: Option<ContextRecord> = context::try_request_context();
        move |payload| match &scope {
            Some(record) => context::sync_scope(record.clone(), || handler(payload)),
            None => handler(payload),
        }
    }

    /// Appends a handler that will fire inside the currently active context.
    pub fn on(&self, event: &str, handler: impl Fn(&Value) + Send + Sync + 'static) -> HandlerId {
        let id = self.inner.on(event, Self::wrap(handler));
        self.table.record(event, id);
        id
    }

    /// Like [`Self::on`] but the handler runs before existing listeners.
    ///
    /// Invocation order is prepend-first, but the side table still records
    /// subscription order, which is what [`Self::remove_last`] pops from.
    pub fn prepend(
        &self,
        event: &str,
        handler: impl Fn(&Value) + Send + Sync + 'static,
    ) -> HandlerId {
        let id = self.inner.prepend(event, Self::wrap(handler));
        self.table.record(event, id);
        id
    }

    /// Removes the handler identified by `id`, matching by identity.
    ///
    /// Ids unknown to the side table (a listener registered directly on the
    /// raw emitter) fall through to a plain removal on the inner emitter, so
    /// the call behaves like the unadapted one would have.
    pub fn off(&self, event: &str, id: HandlerId) -> bool {
        self.table.forget(event, id);
        self.inner.off(event, id)
    }

    /// Removes the most recently subscribed scoped handler for `event`.
    ///
    /// Legacy removal path for callers that do not identify a handler:
    /// last-in-first-out regardless of invocation order. Prefer [`Self::off`]
    /// when the [`HandlerId`] is known. Returns the detached id, or `None`
    /// (not an error) when no scoped handler remains.
    pub fn remove_last(&self, event: &str) -> Option<HandlerId> {
        let id = self.table.pop_last(event)?;
        self.inner.off(event, id);
        Some(id)
    }

    /// Invokes `event`'s listeners; wrappers restore their captured scopes.
    pub fn emit(&self, event: &str, payload: &Value) -> usize {
        self.inner.emit(event, payload)
    }

    /// Number of listeners on the underlying emitter for `event`.
    #[must_use]
    pub fn listener_count(&self, event: &str) -> usize {
        self.inner.listener_count(event)
    }

    /// Number of scoped registrations for `event` made through adaptation.
    #[must_use]
    pub fn scoped_count(&self, event: &str) -> usize {
        self.table.count(event)
    }

    /// The adapted emitter.
    #[must_use]
    pub fn raw(&self) -> &Arc<EventEmitter> {
        &self.inner
    }
}

impl std::fmt::Debug for ScopedEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopedEmitter")
            .field("inner", &self.inner)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
