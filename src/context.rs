// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Per-request context.
//!
//! Built once per request and passed explicitly through the authorization
//! flow and into handlers, so every log line and error response for a
//! request carries the same correlation id.

use std::convert::Infallible;

use axum::{
    extract::{FromRequestParts, OriginalUri},
    http::{request::Parts, HeaderMap, Method},
};
use uuid::Uuid;

/// Header carrying the request id assigned by the outer request-id layer.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Identity of a single inbound request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub correlation_id: Uuid,
    pub method: Method,
    pub path: String,
}

impl RequestContext {
    pub fn new(method: Method, path: impl Into<String>, headers: &HeaderMap) -> Self {
        Self {
            correlation_id: correlation_id_from(headers),
            method,
            path: path.into(),
        }
    }

    /// Build a context from request parts.
    ///
    /// The path comes from [`OriginalUri`] when present so that nested
    /// routers still see the full request path.
    pub fn from_parts(parts: &Parts) -> Self {
        let path = parts
            .extensions
            .get::<OriginalUri>()
            .map(|uri| uri.0.path().to_string())
            .unwrap_or_else(|| parts.uri.path().to_string());
        Self::new(parts.method.clone(), path, &parts.headers)
    }
}

/// Reuse the inbound request id when it is a UUID, otherwise mint one.
fn correlation_id_from(headers: &HeaderMap) -> Uuid {
    headers
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| Uuid::parse_str(value.trim()).ok())
        .unwrap_or_else(Uuid::new_v4)
}

impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(ctx) = parts.extensions.get::<RequestContext>() {
            return Ok(ctx.clone());
        }
        let ctx = RequestContext::from_parts(parts);
        parts.extensions.insert(ctx.clone());
        Ok(ctx)
    }
}
