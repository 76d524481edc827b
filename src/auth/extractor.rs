// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractor for the authorized caller.
//!
//! ```rust,ignore
//! async fn my_handler(Auth(principal): Auth) -> impl IntoResponse {
//!     // principal is Principal
//! }
//! ```

use axum::{extract::FromRequestParts, http::request::Parts};

use super::Principal;
use crate::context::RequestContext;
use crate::error::ClientError;
use crate::state::AppState;

/// The request's [`Principal`].
///
/// Uses the principal placed by
/// [`require_principal`](super::middleware::require_principal) when the
/// route sits behind it, and authorizes the request itself otherwise.
pub struct Auth(pub Principal);

impl FromRequestParts<AppState> for Auth {
    type Rejection = ClientError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if let Some(principal) = parts.extensions.get::<Principal>().cloned() {
            return Ok(Auth(principal));
        }

        let ctx = match parts.extensions.get::<RequestContext>() {
            Some(ctx) => ctx.clone(),
            None => RequestContext::from_parts(parts),
        };
        let principal = state.authorizer.authorize(&ctx, &parts.headers).await?;
        parts.extensions.insert(ctx);
        parts.extensions.insert(principal.clone());
        Ok(Auth(principal))
    }
}
