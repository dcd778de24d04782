//! Request/response emitter pair carried through request extensions.

use std::sync::Arc;

use reqtrace_core::{EventEmitter, ScopedEmitter};

/// Lifecycle event names emitted by the middleware itself. Applications may
/// emit their own events on either emitter as well.
pub mod event_names {
    /// Emitted on the response emitter once the inner service has produced
    /// its response. Payload: `{"status": u16}`.
    pub const FINISH: &str = "finish";
    /// Conventional name for early-termination events.
    pub const CLOSE: &str = "close";
    /// Conventional name for error events.
    pub const ERROR: &str = "error";
}

/// The re-scoped request and response emitters for one inbound request.
///
/// Created by the tracer middleware before it opens the request's scope and
/// inserted into the request extensions. Downstream code subscribes from
/// inside the scope, so every handler fires with that request's context
/// restored no matter which task eventually emits the event.
#[derive(Debug, Clone)]
pub struct HttpEvents {
    pub request: ScopedEmitter,
    pub response: ScopedEmitter,
}

impl HttpEvents {
    #[must_use]
    pub fn new() -> Self {
        Self {
            request: ScopedEmitter::adapt(Arc::new(EventEmitter::new())),
            response: ScopedEmitter::adapt(Arc::new(EventEmitter::new())),
        }
    }
}

impl Default for HttpEvents {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn clones_share_the_same_emitters() {
        let events = HttpEvents::new();
        let other = events.clone();
        events.response.on(event_names::FINISH, |_| {});
        assert_eq!(other.response.listener_count(event_names::FINISH), 1);
        assert_eq!(other.response.emit(event_names::FINISH, &json!({})), 1);
    }
}
