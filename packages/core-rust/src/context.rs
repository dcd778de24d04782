//! Task-scoped request context store.
//!
//! Binds a shared [`ContextRecord`] to the logical execution handling one
//! inbound request, using a tokio task-local as the propagation substrate:
//! every future awaited inside [`run_with_context`] -- timers, I/O
//! completions, nested awaits, however deep -- observes the same record,
//! while concurrently interleaved requests never see each other's records.
//!
//! Detached work (`tokio::spawn`) leaves the causal chain and must carry the
//! record explicitly via [`ContextFutureExt`].

use std::future::Future;
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::{Map, Value};
use tokio::task::futures::TaskLocalFuture;

/// Key under which the request correlation identifier is stored.
pub const REQUEST_ID_KEY: &str = "requestId";

/// Key under which the authenticated user is stored.
pub const USER_KEY: &str = "user";

tokio::task_local! {
    static CURRENT: ContextRecord;
}

/// Mutable key/value bag carried implicitly through one logical execution.
///
/// `ContextRecord` is a cheap-clone handle: all clones point at the same
/// underlying map, so a mutation through any holder is visible to every
/// other holder. Records of different logical executions never share
/// storage. Individual writes are last-write-wins per key; there is no
/// transactional guarantee across multiple fields.
#[derive(Debug, Clone, Default)]
pub struct ContextRecord {
    fields: Arc<RwLock<Map<String, Value>>>,
}

impl ContextRecord {
    /// Creates an empty record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a record seeded with a `requestId` field.
    #[must_use]
    pub fn with_request_id(request_id: impl Into<String>) -> Self {
        let record = Self::new();
        record.set(REQUEST_ID_KEY, Value::String(request_id.into()));
        record
    }

    /// Returns the request correlation identifier, if one was seeded.
    #[must_use]
    pub fn request_id(&self) -> Option<String> {
        match self.fields.read().get(REQUEST_ID_KEY) {
            Some(Value::String(id)) => Some(id.clone()),
            _ => None,
        }
    }

    /// Returns a clone of the value stored under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Value> {
        self.fields.read().get(key).cloned()
    }

    /// Sets `key` in place. Last write wins; visible to all holders.
    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) {
        self.fields.write().insert(key.into(), value.into());
    }

    /// Returns a point-in-time copy of all fields.
    #[must_use]
    pub fn snapshot(&self) -> Map<String, Value> {
        self.fields.read().clone()
    }

    /// True when the record holds no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.read().is_empty()
    }

    /// True when `other` is a handle onto the same underlying record.
    #[must_use]
    pub fn same_record(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.fields, &other.fields)
    }
}

/// Returns the record bound to the caller's logical execution, or a detached
/// empty record when no scope is active. Never fails; absence is a valid,
/// empty state.
#[must_use]
pub fn request_context() -> ContextRecord {
    try_request_context().unwrap_or_default()
}

/// Returns the active record, or `None` outside any scope.
#[must_use]
pub fn try_request_context() -> Option<ContextRecord> {
    CURRENT.try_with(Clone::clone).ok()
}

/// Sets `key` on the active record in place. No-op without an active scope.
pub fn push_request_context(key: impl Into<String>, value: impl Into<Value>) {
    if let Some(record) = try_request_context() {
        record.set(key, value);
    }
}

/// Attaches the authenticated user to the active record.
pub fn push_user(user: impl Into<Value>) {
    push_request_context(USER_KEY, user);
}

/// Opens a logical execution scope for `fut`.
///
/// Everything the future awaits -- directly or transitively -- observes
/// `record` as the current context, including fields mutated after a
/// sub-future was created but before it runs. Scopes nest: the innermost
/// one wins for its extent.
pub async fn run_with_context<F>(record: ContextRecord, fut: F) -> F::Output
where
    F: Future,
{
    CURRENT.scope(record, fut).await
}

/// Synchronous scope entry: runs `f` with `record` as the current context.
///
/// Used by the emitter re-scoping wrappers, which fire handlers from
/// whatever task happens to emit the event.
pub fn sync_scope<T>(record: ContextRecord, f: impl FnOnce() -> T) -> T {
    CURRENT.sync_scope(record, f)
}

/// Explicit context carry for futures that leave the causal chain.
pub trait ContextFutureExt: Future + Sized {
    /// Runs the future inside a scope bound to `record`.
    fn in_context(self, record: ContextRecord) -> TaskLocalFuture<ContextRecord, Self>;

    /// Runs the future inside the caller's current scope (empty record when
    /// none is active). Required when handing work to `tokio::spawn`, which
    /// does not inherit task-locals.
    fn in_current_context(self) -> TaskLocalFuture<ContextRecord, Self> {
        self.in_context(request_context())
    }
}

impl<F: Future> ContextFutureExt for F {
    fn in_context(self, record: ContextRecord) -> TaskLocalFuture<ContextRecord, Self> {
        CURRENT.scope(record, self)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
