//! Request tracer middleware.
//!
//! Opens one logical execution scope per inbound request, seeded with the
//! negotiated request identifier, and runs the entire inner service inside
//! it. Everything causally descended from the handler -- awaited futures,
//! timers, subscriptions on the request/response emitter pair -- observes
//! that request's [`ContextRecord`] and no other request's.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use http::{HeaderValue, Request, Response};
use reqtrace_core::{run_with_context, ContextRecord};
use serde_json::json;
use tower::{Layer, Service};

use crate::config::TracerConfig;
use crate::events::{event_names, HttpEvents};
use crate::request_id::resolve_request_id;

// ---------------------------------------------------------------------------
// RequestTracerLayer
// ---------------------------------------------------------------------------

/// Tower layer that wraps services with per-request context scoping.
#[derive(Debug, Clone, Default)]
pub struct RequestTracerLayer {
    config: Arc<TracerConfig>,
}

impl RequestTracerLayer {
    #[must_use]
    pub fn new(config: TracerConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }
}

impl<S> Layer<S> for RequestTracerLayer {
    type Service = RequestTracerService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestTracerService {
            inner,
            config: Arc::clone(&self.config),
        }
    }
}

// ---------------------------------------------------------------------------
// RequestTracerService
// ---------------------------------------------------------------------------

/// Service wrapper produced by [`RequestTracerLayer`].
#[derive(Debug, Clone)]
pub struct RequestTracerService<S> {
    inner: S,
    config: Arc<TracerConfig>,
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for RequestTracerService<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    ReqBody: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<S::Response, S::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<ReqBody>) -> Self::Future {
        let config = Arc::clone(&self.config);

        // Identifier negotiation happens before the scope opens; a panicking
        // factory therefore aborts the call without opening any scope.
        let request_id = resolve_request_id(&config, req.headers());
        let record = ContextRecord::with_request_id(request_id.clone());

        let events = HttpEvents::new();
        req.extensions_mut().insert(events.clone());

        // Take the ready service and leave its clone behind, so the inner
        // call happens inside the scope rather than in this sync prologue.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(run_with_context(record, async move {
            let mut response = inner.call(req).await?;

            if config.echo_header {
                if let Ok(value) = HeaderValue::from_str(&request_id) {
                    response.headers_mut().insert(config.header_name.clone(), value);
                }
            }

            events.response.emit(
                event_names::FINISH,
                &json!({ "status": response.status().as_u16() }),
            );

            Ok(response)
        }))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::convert::Infallible;
    use std::sync::Mutex;

    use axum::body::Body;
    use http::StatusCode;
    use reqtrace_core::request_context;
    use serde_json::Value;
    use tower::ServiceExt;
    use uuid::Uuid;

    use super::*;

    /// Service that reports the request id it observed via a response header.
    #[derive(Clone)]
    struct EchoContextService;

    impl Service<Request<Body>> for EchoContextService {
        type Response = Response<Body>;
        type Error = Infallible;
        type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Infallible>> + Send>>;

        fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
            Poll::Ready(Ok(()))
        }

        fn call(&mut self, _req: Request<Body>) -> Self::Future {
            Box::pin(async {
                tokio::time::sleep(std::time::Duration::from_millis(1)).await;
                let seen = request_context().request_id().unwrap_or_default();
                let response = Response::builder()
                    .status(StatusCode::OK)
                    .header("x-seen-id", seen)
                    .body(Body::empty())
                    .unwrap();
                Ok(response)
            })
        }
    }

    fn request_with_header(value: &'static str) -> Request<Body> {
        Request::builder()
            .header("x-request-id", value)
            .body(Body::empty())
            .unwrap()
    }

    fn seen_id(response: &Response<Body>) -> String {
        response.headers()["x-seen-id"].to_str().unwrap().to_owned()
    }

    #[tokio::test]
    async fn trusted_header_seeds_the_context() {
        let layer = RequestTracerLayer::new(TracerConfig {
            use_header: true,
            ..TracerConfig::default()
        });
        let response = layer
            .layer(EchoContextService)
            .oneshot(request_with_header("abc-123"))
            .await
            .unwrap();
        assert_eq!(seen_id(&response), "abc-123");
        // Not configured to echo.
        assert!(!response.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn echo_header_writes_the_resolved_id_back() {
        let layer = RequestTracerLayer::new(TracerConfig {
            use_header: true,
            echo_header: true,
            ..TracerConfig::default()
        });
        let response = layer
            .layer(EchoContextService)
            .oneshot(request_with_header("abc-123"))
            .await
            .unwrap();
        assert_eq!(response.headers()["x-request-id"], "abc-123");
    }

    #[tokio::test]
    async fn untrusted_header_is_ignored_and_ids_are_generated() {
        let layer = RequestTracerLayer::new(TracerConfig::default());

        let first = layer
            .layer(EchoContextService)
            .oneshot(request_with_header("abc-123"))
            .await
            .unwrap();
        let second = layer
            .layer(EchoContextService)
            .oneshot(request_with_header("abc-123"))
            .await
            .unwrap();

        let (a, b) = (seen_id(&first), seen_id(&second));
        assert_ne!(a, "abc-123");
        assert_ne!(a, b);
        assert!(Uuid::parse_str(&a).is_ok());
        assert!(Uuid::parse_str(&b).is_ok());
    }

    /// Service that subscribes to the response `finish` event from inside
    /// the request, recording what its handler observes when it later fires.
    #[derive(Clone)]
    struct SubscribingService {
        observed: Arc<Mutex<Vec<(Option<String>, Value)>>>,
    }

    impl Service<Request<Body>> for SubscribingService {
        type Response = Response<Body>;
        type Error = Infallible;
        type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Infallible>> + Send>>;

        fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
            Poll::Ready(Ok(()))
        }

        fn call(&mut self, req: Request<Body>) -> Self::Future {
            let observed = Arc::clone(&self.observed);
            Box::pin(async move {
                let events = req.extensions().get::<HttpEvents>().unwrap().clone();
                events.response.on(event_names::FINISH, move |payload| {
                    observed
                        .lock()
                        .unwrap()
                        .push((request_context().request_id(), payload.clone()));
                });
                let response = Response::builder()
                    .status(StatusCode::CREATED)
                    .body(Body::empty())
                    .unwrap();
                Ok(response)
            })
        }
    }

    #[tokio::test]
    async fn finish_listener_fires_inside_the_request_scope() {
        let observed = Arc::new(Mutex::new(Vec::new()));
        let layer = RequestTracerLayer::new(TracerConfig {
            use_header: true,
            ..TracerConfig::default()
        });
        let service = SubscribingService {
            observed: Arc::clone(&observed),
        };

        layer
            .layer(service)
            .oneshot(request_with_header("req-42"))
            .await
            .unwrap();

        let observed = observed.lock().unwrap();
        assert_eq!(observed.len(), 1);
        let (request_id, payload) = &observed[0];
        assert_eq!(request_id.as_deref(), Some("req-42"));
        assert_eq!(payload["status"], 201);
    }
}
