//! Request-identifier negotiation.
//!
//! One identifier per inbound request: the configured header value when
//! trusted and usable, otherwise a freshly generated one. No retries and no
//! uniqueness verification -- uniqueness is delegated to the factory.

use std::sync::Arc;

use http::HeaderMap;
use uuid::Uuid;

use crate::config::TracerConfig;

/// Produces a correlation identifier for a request that did not carry one.
/// Receives the request headers so deployments can derive ids from other
/// inbound metadata.
pub type RequestIdFactory = Arc<dyn Fn(&HeaderMap) -> String + Send + Sync>;

/// The default factory: random UUID v4 per request.
#[must_use]
pub fn uuid_factory() -> RequestIdFactory {
    Arc::new(|_| Uuid::new_v4().to_string())
}

/// Resolves the identifier for one inbound request.
///
/// The header value is preferred only when `use_header` is set and the
/// header is present, valid UTF-8, and non-empty. Everything else falls
/// back to the factory. A panicking factory propagates to the framework's
/// error path; no logical execution is opened in that case.
#[must_use]
pub fn resolve_request_id(config: &TracerConfig, headers: &HeaderMap) -> String {
    if config.use_header {
        let inbound = headers
            .get(&config.header_name)
            .and_then(|value| value.to_str().ok())
            .filter(|value| !value.is_empty());
        if let Some(id) = inbound {
            return id.to_owned();
        }
    }
    (config.id_factory)(headers)
}
