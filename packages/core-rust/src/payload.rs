//! Closed set of log payload shapes.
//!
//! Callers pick the variant at the call site instead of the facade sniffing
//! payload shapes at render time. Each variant flattens to a metadata map
//! with one fixed field set.

use serde::Serialize;
use serde_json::{Map, Value};

/// What a single log call carries besides its severity and context label.
#[derive(Debug, Clone)]
pub enum LogPayload {
    /// Bare human-readable message, no metadata.
    Message(String),
    /// Message plus a captured error.
    Error {
        message: String,
        details: ErrorDetails,
    },
    /// Message plus a failed outbound HTTP call.
    HttpError {
        message: String,
        details: HttpErrorDetails,
    },
    /// Message plus free-form structured fields.
    Structured {
        message: String,
        fields: Map<String, Value>,
    },
}

/// Fields contributed by an error-valued payload.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorDetails {
    /// The error's display message.
    pub error: String,
    /// Error type or classification name.
    pub name: String,
    /// Cause chain or backtrace text, when available.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

impl ErrorDetails {
    #[must_use]
    pub fn new(name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            name: name.into(),
            stack: None,
        }
    }

    /// Captures an error's message and source chain. The chain stands in
    /// for a stack trace: one line per cause, outermost first.
    #[must_use]
    pub fn from_error(name: impl Into<String>, err: &(dyn std::error::Error + 'static)) -> Self {
        let mut chain = Vec::new();
        let mut source = err.source();
        while let Some(cause) = source {
            chain.push(cause.to_string());
            source = cause.source();
        }
        Self {
            error: err.to_string(),
            name: name.into(),
            stack: (!chain.is_empty()).then(|| chain.join("\ncaused by: ")),
        }
    }
}

/// Fields contributed by a failed outbound HTTP call.
#[derive(Debug, Clone, Default, Serialize)]
pub struct HttpErrorDetails {
    /// The client library's error code, e.g. `ECONNREFUSED`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// The transport-level error message.
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    /// Query parameters of the failed call.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    /// Request body of the failed call.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    /// Response status, when a response was received at all.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    /// Response body, when a response was received at all.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

impl LogPayload {
    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }

    #[must_use]
    pub fn error(message: impl Into<String>, details: ErrorDetails) -> Self {
        Self::Error {
            message: message.into(),
            details,
        }
    }

    #[must_use]
    pub fn http_error(message: impl Into<String>, details: HttpErrorDetails) -> Self {
        Self::HttpError {
            message: message.into(),
            details,
        }
    }

    #[must_use]
    pub fn structured(message: impl Into<String>, fields: Map<String, Value>) -> Self {
        Self::Structured {
            message: message.into(),
            fields,
        }
    }

    /// Flattens the payload into its message and metadata fields.
    #[must_use]
    pub fn fields(&self) -> (&str, Map<String, Value>) {
        match self {
            Self::Message(message) => (message.as_str(), Map::new()),
            Self::Error { message, details } => (message.as_str(), to_map(details)),
            Self::HttpError { message, details } => (message.as_str(), to_map(details)),
            Self::Structured { message, fields } => (message.as_str(), fields.clone()),
        }
    }
}

impl From<String> for LogPayload {
    fn from(message: String) -> Self {
        Self::Message(message)
    }
}

impl From<&str> for LogPayload {
    fn from(message: &str) -> Self {
        Self::Message(message.to_owned())
    }
}

fn to_map<T: Serialize>(details: &T) -> Map<String, Value> {
    match serde_json::to_value(details) {
        Ok(Value::Object(map)) => map,
        // Serialization of these plain structs cannot fail; an unexpected
        // shape degrades to no metadata rather than a panic.
        _ => Map::new(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[derive(Debug)]
    struct Outer(std::io::Error);

    impl std::fmt::Display for Outer {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "request failed")
        }
    }

    impl std::error::Error for Outer {
        fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
            Some(&self.0)
        }
    }

    #[test]
    fn message_payload_has_no_fields() {
        let payload = LogPayload::message("hello");
        let (message, fields) = payload.fields();
        assert_eq!(message, "hello");
        assert!(fields.is_empty());
    }

    #[test]
    fn error_payload_contributes_error_name_stack() {
        let err = Outer(std::io::Error::other("boom"));
        let payload = LogPayload::error("db call failed", ErrorDetails::from_error("Outer", &err));
        let (message, fields) = payload.fields();
        assert_eq!(message, "db call failed");
        assert_eq!(fields["error"], json!("request failed"));
        assert_eq!(fields["name"], json!("Outer"));
        assert_eq!(fields["stack"], json!("boom"));
    }

    #[test]
    fn error_details_without_cause_omits_stack() {
        let err = std::io::Error::other("boom");
        let details = ErrorDetails::from_error("io", &err);
        assert!(details.stack.is_none());
        let (_, fields) = LogPayload::error("m", details).fields();
        assert!(!fields.contains_key("stack"));
    }

    #[test]
    fn http_error_payload_contributes_call_shape() {
        let details = HttpErrorDetails {
            code: Some("ECONNRESET".to_owned()),
            error: "socket hang up".to_owned(),
            url: Some("https://api.example.com/v1/users".to_owned()),
            method: Some("POST".to_owned()),
            payload: Some(json!({"name": "bob"})),
            status: Some(502),
            response: Some(json!({"detail": "bad gateway"})),
            ..HttpErrorDetails::default()
        };
        let (_, fields) = LogPayload::http_error("upstream failed", details).fields();
        assert_eq!(fields["code"], json!("ECONNRESET"));
        assert_eq!(fields["status"], json!(502));
        assert_eq!(fields["response"], json!({"detail": "bad gateway"}));
        assert!(!fields.contains_key("params"));
    }

    #[test]
    fn structured_payload_passes_fields_through() {
        let mut fields = Map::new();
        fields.insert("attempt".to_owned(), json!(3));
        let (_, out) = LogPayload::structured("retrying", fields).fields();
        assert_eq!(out["attempt"], json!(3));
    }
}
