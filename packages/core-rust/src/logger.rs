//! Context-enriching logging facade.
//!
//! Every call reads the active [`ContextRecord`](crate::context::ContextRecord)
//! and merges its fields into the emitted `tracing` event alongside the
//! payload's own metadata. Context fields win on key collision, so a
//! request's `requestId` cannot be shadowed by caller-supplied metadata.
//! Absent context contributes nothing; it is never an error.

use std::borrow::Cow;

use serde_json::{Map, Value};
use tracing::Level;

use crate::context::request_context;
use crate::payload::LogPayload;

/// Severity-leveled logger bound to a context label (typically the
/// subsystem or type name doing the logging).
#[derive(Debug, Clone)]
pub struct Logger {
    context: Cow<'static, str>,
}

impl Logger {
    #[must_use]
    pub fn new(context: impl Into<Cow<'static, str>>) -> Self {
        Self {
            context: context.into(),
        }
    }

    pub fn error(&self, payload: impl Into<LogPayload>) {
        self.emit(Level::ERROR, &payload.into());
    }

    pub fn warn(&self, payload: impl Into<LogPayload>) {
        self.emit(Level::WARN, &payload.into());
    }

    pub fn info(&self, payload: impl Into<LogPayload>) {
        self.emit(Level::INFO, &payload.into());
    }

    pub fn debug(&self, payload: impl Into<LogPayload>) {
        self.emit(Level::DEBUG, &payload.into());
    }

    pub fn trace(&self, payload: impl Into<LogPayload>) {
        self.emit(Level::TRACE, &payload.into());
    }

    fn emit(&self, level: Level, payload: &LogPayload) {
        let (message, meta) = compose(payload);
        let meta = Value::Object(meta);
        // `tracing::event!` requires a const level; dispatch per level.
        if level == Level::ERROR {
            tracing::error!(context = %self.context, meta = %meta, "{message}");
        } else if level == Level::WARN {
            tracing::warn!(context = %self.context, meta = %meta, "{message}");
        } else if level == Level::INFO {
            tracing::info!(context = %self.context, meta = %meta, "{message}");
        } else if level == Level::DEBUG {
            tracing::debug!(context = %self.context, meta = %meta, "{message}");
        } else {
            tracing::trace!(context = %self.context, meta = %meta, "{message}");
        }
    }
}

/// Merges the payload's fields with the current context record's fields.
/// The record is merged second: context wins on key collision.
fn compose(payload: &LogPayload) -> (&str, Map<String, Value>) {
    let (message, mut meta) = payload.fields();
    for (key, value) in request_context().snapshot() {
        meta.insert(key, value);
    }
    (message, meta)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::context::{sync_scope, ContextRecord};
    use crate::payload::ErrorDetails;

    #[test]
    fn compose_merges_context_fields() {
        let record = ContextRecord::with_request_id("req-9");
        record.set("user", json!({"id": 4}));
        let payload = LogPayload::error(
            "lookup failed",
            ErrorDetails::new("NotFound", "no such row"),
        );
        let (message, meta) = sync_scope(record, || compose(&payload));
        assert_eq!(message, "lookup failed");
        assert_eq!(meta["error"], json!("no such row"));
        assert_eq!(meta["requestId"], json!("req-9"));
        assert_eq!(meta["user"], json!({"id": 4}));
    }

    #[test]
    fn context_wins_key_collisions() {
        let mut fields = Map::new();
        fields.insert("requestId".to_owned(), json!("spoofed"));
        let payload = LogPayload::structured("m", fields);
        let (_, meta) = sync_scope(ContextRecord::with_request_id("real"), || {
            compose(&payload)
        });
        assert_eq!(meta["requestId"], json!("real"));
    }

    #[test]
    fn compose_without_context_adds_nothing() {
        let (_, meta) = compose(&LogPayload::message("plain"));
        assert!(meta.is_empty());
    }

    #[test]
    fn logger_calls_do_not_panic_without_subscriber() {
        let logger = Logger::new("Tests");
        logger.info("started");
        logger.error(LogPayload::error(
            "failed",
            ErrorDetails::new("Test", "synthetic"),
        ));
    }
}
