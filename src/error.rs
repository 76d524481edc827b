// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Error Translation
//!
//! Every failure inside the authorization flow or a handler is an
//! [`ApiError`]. Before anything leaves the service it is translated into a
//! [`ClientError`], which carries only a status, a stable code, a safe
//! message and the request's correlation id. The technical detail is logged
//! against the same correlation id and never sent to the client.
//!
//! | Kind | Status | Code |
//! |------|--------|------|
//! | `MissingToken`, `InvalidToken` | 401 | `unauthorized` |
//! | `InsufficientScope` | 403 | `insufficient_scope` |
//! | `KeyLookupFailed`, `IntrospectionFailed`, `ClaimsLookupFailed` | 500 | `server_error` |
//! | `InvalidInput` | 400 | caller supplied |
//! | `NotFoundOrUnauthorized` | 404 | caller supplied |

use axum::{
    http::{header::WWW_AUTHENTICATE, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::auth::error::{IntrospectionError, KeyResolverError, TokenError};
use crate::claims::ExtraClaimsError;
use crate::context::RequestContext;

pub const UNAUTHORIZED_MESSAGE: &str = "Missing, invalid or expired access token";
pub const INSUFFICIENT_SCOPE_MESSAGE: &str =
    "Access token does not have a valid scope for this API endpoint";
pub const SERVER_ERROR_MESSAGE: &str = "A technical problem was encountered in the API";

/// Internal failure taxonomy.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("no bearer token in Authorization header")]
    MissingToken,
    #[error("{0}")]
    InvalidToken(TokenError),
    #[error("signing key lookup failed: {0}")]
    KeyLookupFailed(KeyResolverError),
    #[error("token introspection failed: {0}")]
    IntrospectionFailed(IntrospectionError),
    #[error("extra claims lookup failed: {0}")]
    ClaimsLookupFailed(#[from] ExtraClaimsError),
    #[error("token lacks required scope `{required}`")]
    InsufficientScope { required: String },
    #[error("{message}")]
    InvalidInput { code: &'static str, message: String },
    #[error("{message}")]
    NotFoundOrUnauthorized { code: &'static str, message: String },
}

impl From<TokenError> for ApiError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::KeyLookup(inner) => ApiError::KeyLookupFailed(inner),
            TokenError::Introspection(inner) => ApiError::IntrospectionFailed(inner),
            other => ApiError::InvalidToken(other),
        }
    }
}

impl ApiError {
    pub fn invalid_input(code: &'static str, message: impl Into<String>) -> Self {
        ApiError::InvalidInput {
            code,
            message: message.into(),
        }
    }

    /// Not found and not permitted are deliberately the same response.
    pub fn not_found(code: &'static str, message: impl Into<String>) -> Self {
        ApiError::NotFoundOrUnauthorized {
            code,
            message: message.into(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::MissingToken | ApiError::InvalidToken(_) => StatusCode::UNAUTHORIZED,
            ApiError::InsufficientScope { .. } => StatusCode::FORBIDDEN,
            ApiError::KeyLookupFailed(_)
            | ApiError::IntrospectionFailed(_)
            | ApiError::ClaimsLookupFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::InvalidInput { .. } => StatusCode::BAD_REQUEST,
            ApiError::NotFoundOrUnauthorized { .. } => StatusCode::NOT_FOUND,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::MissingToken | ApiError::InvalidToken(_) => "unauthorized",
            ApiError::InsufficientScope { .. } => "insufficient_scope",
            ApiError::KeyLookupFailed(_)
            | ApiError::IntrospectionFailed(_)
            | ApiError::ClaimsLookupFailed(_) => "server_error",
            ApiError::InvalidInput { code, .. } | ApiError::NotFoundOrUnauthorized { code, .. } => {
                *code
            }
        }
    }

    /// Message safe to show the caller.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::MissingToken | ApiError::InvalidToken(_) => UNAUTHORIZED_MESSAGE.to_string(),
            ApiError::InsufficientScope { .. } => INSUFFICIENT_SCOPE_MESSAGE.to_string(),
            ApiError::KeyLookupFailed(_)
            | ApiError::IntrospectionFailed(_)
            | ApiError::ClaimsLookupFailed(_) => SERVER_ERROR_MESSAGE.to_string(),
            ApiError::InvalidInput { message, .. }
            | ApiError::NotFoundOrUnauthorized { message, .. } => message.clone(),
        }
    }

    /// Log the full detail and produce the client-facing error.
    pub fn translate(self, ctx: &RequestContext) -> ClientError {
        let status = self.status_code();
        let code = self.error_code();
        let log_context = self.to_string();

        if status.is_server_error() {
            error!(
                correlation_id = %ctx.correlation_id,
                method = %ctx.method,
                path = %ctx.path,
                status = status.as_u16(),
                code,
                detail = %log_context,
                "Request failed"
            );
        } else if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
            warn!(
                correlation_id = %ctx.correlation_id,
                method = %ctx.method,
                path = %ctx.path,
                status = status.as_u16(),
                code,
                detail = %log_context,
                "Request rejected"
            );
        } else {
            info!(
                correlation_id = %ctx.correlation_id,
                status = status.as_u16(),
                code,
                detail = %log_context,
                "Request rejected"
            );
        }

        let required_scope = match &self {
            ApiError::InsufficientScope { required } => Some(required.clone()),
            _ => None,
        };

        ClientError {
            status,
            code,
            message: self.user_message(),
            correlation_id: ctx.correlation_id,
            required_scope,
            log_context,
        }
    }
}

/// An error as the client sees it.
#[derive(Debug, Clone)]
pub struct ClientError {
    status: StatusCode,
    code: &'static str,
    message: String,
    correlation_id: Uuid,
    required_scope: Option<String>,
    log_context: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody<'a> {
    code: &'a str,
    message: &'a str,
    correlation_id: Uuid,
}

impl ClientError {
    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn code(&self) -> &str {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    /// Internal detail, for server-side logs only.
    pub fn log_context(&self) -> &str {
        &self.log_context
    }

    fn challenge(&self) -> Option<String> {
        match self.status {
            StatusCode::UNAUTHORIZED => Some(format!(
                r#"Bearer error="{}", error_description="{}""#,
                self.code, self.message
            )),
            StatusCode::FORBIDDEN => Some(format!(
                r#"Bearer error="{}", error_description="{}", scope="{}""#,
                self.code,
                self.message,
                self.required_scope.as_deref().unwrap_or_default()
            )),
            _ => None,
        }
    }
}

impl IntoResponse for ClientError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            code: self.code,
            message: &self.message,
            correlation_id: self.correlation_id,
        });
        let mut response = (self.status, body).into_response();
        if let Some(value) = self
            .challenge()
            .and_then(|challenge| HeaderValue::from_str(&challenge).ok())
        {
            response.headers_mut().insert(WWW_AUTHENTICATE, value);
        }
        response
    }
}
