// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Signing key, introspection and token validation errors.
//!
//! These never reach a client directly. The authorizer converts them into
//! [`ApiError`](crate::error::ApiError), which decides status and wording.

use thiserror::Error;

/// Failures while loading or resolving signing keys.
#[derive(Debug, Clone, Error)]
pub enum KeyResolverError {
    /// Network failure or timeout talking to the authorization server.
    #[error("request to {url} failed: {reason}")]
    Fetch { url: String, reason: String },
    /// Non-success HTTP status from the authorization server.
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },
    /// Response body could not be parsed.
    #[error("invalid document from {url}: {reason}")]
    Parse { url: String, reason: String },
    /// Key id still absent after a refresh.
    #[error("no signing key with kid `{0}`")]
    KeyNotFound(String),
    /// Key present but cannot be turned into a verification key.
    #[error("signing key `{kid}` is unusable: {reason}")]
    UnusableKey { kid: String, reason: String },
}

/// Failures calling the token introspection endpoint.
#[derive(Debug, Clone, Error)]
pub enum IntrospectionError {
    #[error("request to {url} failed: {reason}")]
    Fetch { url: String, reason: String },
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("invalid introspection response from {url}: {reason}")]
    Parse { url: String, reason: String },
}

/// Reasons an access token is rejected.
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token is malformed: {0}")]
    Malformed(String),
    #[error("token algorithm {0} is not permitted")]
    DisallowedAlgorithm(String),
    #[error("token header has no kid")]
    MissingKeyId,
    #[error("token signed with unknown kid `{0}`")]
    UnknownKey(String),
    #[error("token signature is invalid")]
    InvalidSignature,
    #[error("token has expired")]
    Expired,
    #[error("token is not active according to introspection")]
    Inactive,
    #[error("token is not yet valid")]
    NotYetValid,
    #[error("token issuer is invalid")]
    InvalidIssuer,
    #[error("token audience is invalid")]
    InvalidAudience,
    #[error("token client_id is invalid")]
    InvalidClientId,
    #[error("token is missing claim `{0}`")]
    MissingClaim(String),
    /// Keys could not be loaded; this is a server-side failure, not the
    /// caller's.
    #[error("signing key lookup failed: {0}")]
    KeyLookup(#[source] KeyResolverError),
    /// The introspection endpoint could not give an answer.
    #[error("token introspection failed: {0}")]
    Introspection(#[source] IntrospectionError),
}

impl TokenError {
    /// Whether the failure lies with the token rather than with this service.
    pub fn is_client_fault(&self) -> bool {
        !matches!(
            self,
            TokenError::KeyLookup(_) | TokenError::Introspection(_)
        )
    }
}

impl From<KeyResolverError> for TokenError {
    fn from(err: KeyResolverError) -> Self {
        match err {
            KeyResolverError::KeyNotFound(kid) => TokenError::UnknownKey(kid),
            other => TokenError::KeyLookup(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_key_is_a_token_problem() {
        let err = TokenError::from(KeyResolverError::KeyNotFound("kid-9".to_string()));
        assert!(matches!(err, TokenError::UnknownKey(ref kid) if kid == "kid-9"));
        assert!(err.is_client_fault());
    }

    #[test]
    fn fetch_failures_are_server_problems() {
        let err = TokenError::from(KeyResolverError::Status {
            url: "https://login.example.com/jwks".to_string(),
            status: 503,
        });
        assert!(!err.is_client_fault());
        assert!(err.to_string().contains("HTTP 503"));
    }

    #[test]
    fn inactive_token_is_the_callers_problem() {
        assert!(TokenError::Inactive.is_client_fault());
        let err = TokenError::Introspection(IntrospectionError::Status {
            url: "https://login.example.com/introspect".to_string(),
            status: 500,
        });
        assert!(!err.is_client_fault());
    }
}
