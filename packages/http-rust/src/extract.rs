//! Axum extractors for the request context and emitter pair.

use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::response::{IntoResponse, Response};
use http::request::Parts;
use http::StatusCode;
use reqtrace_core::ContextRecord;

use crate::events::HttpEvents;

/// Extractor handing the active [`ContextRecord`] to a handler.
///
/// Infallible: outside any scope (tracer layer not installed) it yields a
/// detached empty record, matching the store's read semantics.
#[derive(Debug, Clone)]
pub struct RequestContext(pub ContextRecord);

impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(_parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(reqtrace_core::request_context()))
    }
}

/// Rejection for extracting [`HttpEvents`] on a route without the tracer
/// layer. A programming error, surfaced as a 500.
#[derive(Debug)]
pub struct EventsNotInstalled;

impl IntoResponse for EventsNotInstalled {
    fn into_response(self) -> Response {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "request tracer middleware not installed",
        )
            .into_response()
    }
}

impl<S> FromRequestParts<S> for HttpEvents
where
    S: Send + Sync,
{
    type Rejection = EventsNotInstalled;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<HttpEvents>()
            .cloned()
            .ok_or(EventsNotInstalled)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
