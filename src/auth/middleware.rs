// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authorization middleware for Axum.
//!
//! Applied to a whole router subtree so that every handler below it only
//! runs with an authorized [`Principal`](super::Principal) in the request
//! extensions:
//!
//! ```rust,ignore
//! let protected = Router::new()
//!     .route("/companies", get(list_companies))
//!     .route_layer(axum::middleware::from_fn_with_state(
//!         state.clone(),
//!         require_principal,
//!     ));
//! ```

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::context::RequestContext;
use crate::state::AppState;

/// Authorize the request, or answer it with the translated error.
pub async fn require_principal(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let (mut parts, body) = request.into_parts();
    let ctx = match parts.extensions.get::<RequestContext>() {
        Some(ctx) => ctx.clone(),
        None => RequestContext::from_parts(&parts),
    };

    match state.authorizer.authorize(&ctx, &parts.headers).await {
        Ok(principal) => {
            parts.extensions.insert(ctx);
            parts.extensions.insert(principal);
            next.run(Request::from_parts(parts, body)).await
        }
        Err(err) => err.into_response(),
    }
}
