// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Access token validation.
//!
//! With the default JWT strategy a token is accepted only when all of the
//! following hold:
//!
//! - its header names the configured algorithm and carries a `kid`
//! - the signature verifies against the issuer's key for that `kid`
//! - `iss` matches the configured issuer
//! - `aud` matches the configured audience, or when no audience is
//!   configured and the check is enabled, `client_id` matches the
//!   configured client id
//! - `now < exp + leeway`, where leeway is zero unless configured
//!
//! With the introspection strategy the decision is delegated to
//! [`TokenIntrospector`].

use std::collections::BTreeSet;
use std::sync::Arc;

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, decode_header, Algorithm, Validation};
use serde::Deserialize;
use serde_json::Value;

use super::claims::BaseClaims;
use super::error::TokenError;
use super::introspection::TokenIntrospector;
use super::jwks::KeyResolver;
use crate::config::{OAuthConfig, TokenValidationStrategy};

/// Registered and custom claims read from an access token.
#[derive(Debug, Deserialize)]
struct AccessTokenClaims {
    sub: String,
    exp: i64,
    #[serde(default)]
    scope: Option<ScopeClaim>,
    #[serde(default)]
    client_id: Option<String>,
    #[serde(default)]
    azp: Option<String>,
    #[serde(default)]
    manager_id: Option<Value>,
}

/// `scope` is normally a space separated string, but some servers
/// issue an array.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(super) enum ScopeClaim {
    Joined(String),
    List(Vec<String>),
}

impl ScopeClaim {
    pub(super) fn into_set(self) -> BTreeSet<String> {
        let items = match self {
            ScopeClaim::Joined(joined) => vec![joined],
            ScopeClaim::List(list) => list,
        };
        items
            .iter()
            .flat_map(|item| item.split_whitespace())
            .map(String::from)
            .collect()
    }
}

/// `manager_id` may be issued as a string or a number.
pub(super) fn manager_id_claim(value: Option<Value>) -> Option<String> {
    value.and_then(|value| match value {
        Value::String(s) if !s.is_empty() => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// A token is already expired at its expiry instant.
pub(super) fn is_expired(expiry: i64, leeway: u64, now: i64) -> bool {
    let leeway = i64::try_from(leeway).unwrap_or(i64::MAX);
    now >= expiry.saturating_add(leeway)
}

/// Verifies access tokens and extracts [`BaseClaims`].
pub struct TokenValidator {
    keys: Arc<KeyResolver>,
    introspector: Option<TokenIntrospector>,
    issuer: String,
    audience: Option<String>,
    client_id: String,
    enforce_client_id: bool,
    algorithm: Algorithm,
    leeway: u64,
}

impl TokenValidator {
    /// Validator using local JWT verification.
    pub fn new(keys: Arc<KeyResolver>, config: &OAuthConfig) -> Self {
        Self {
            keys,
            introspector: None,
            issuer: config.issuer.clone(),
            audience: config.audience.clone(),
            client_id: config.client_id.clone(),
            enforce_client_id: config.enforce_client_id,
            algorithm: config.algorithm,
            leeway: config.clock_skew.as_secs(),
        }
    }

    /// Validate tokens by introspection instead of local verification.
    pub fn with_introspection(mut self, introspector: TokenIntrospector) -> Self {
        self.introspector = Some(introspector);
        self
    }

    pub fn strategy(&self) -> TokenValidationStrategy {
        match self.introspector {
            Some(_) => TokenValidationStrategy::Introspection,
            None => TokenValidationStrategy::Jwt,
        }
    }

    pub fn key_resolver(&self) -> &KeyResolver {
        &self.keys
    }

    /// Validate `token` and return its base claims.
    pub async fn validate(&self, token: &str) -> Result<BaseClaims, TokenError> {
        match &self.introspector {
            Some(introspector) => introspector.introspect(token).await,
            None => self.verify_jwt(token).await,
        }
    }

    async fn verify_jwt(&self, token: &str) -> Result<BaseClaims, TokenError> {
        let header = decode_header(token).map_err(|e| TokenError::Malformed(e.to_string()))?;
        if header.alg != self.algorithm {
            return Err(TokenError::DisallowedAlgorithm(format!("{:?}", header.alg)));
        }
        let kid = header.kid.ok_or(TokenError::MissingKeyId)?;

        let resolved = self.keys.resolve_key(&kid).await?;
        if resolved.algorithm.is_some_and(|alg| alg != self.algorithm) {
            return Err(TokenError::DisallowedAlgorithm(format!("{:?}", header.alg)));
        }

        let mut validation = Validation::new(self.algorithm);
        validation.leeway = self.leeway;
        validation.validate_nbf = true;
        validation.set_issuer(&[&self.issuer]);
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);
        match &self.audience {
            Some(audience) => validation.set_audience(&[audience]),
            None => validation.validate_aud = false,
        }

        let claims = decode::<AccessTokenClaims>(token, &resolved.key, &validation)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                ErrorKind::InvalidSignature => TokenError::InvalidSignature,
                ErrorKind::InvalidIssuer => TokenError::InvalidIssuer,
                ErrorKind::InvalidAudience => TokenError::InvalidAudience,
                ErrorKind::ImmatureSignature => TokenError::NotYetValid,
                ErrorKind::InvalidAlgorithm => {
                    TokenError::DisallowedAlgorithm(format!("{:?}", header.alg))
                }
                ErrorKind::MissingRequiredClaim(claim) => TokenError::MissingClaim(claim.clone()),
                _ => TokenError::Malformed(e.to_string()),
            })?
            .claims;

        // The library tolerates `exp == now`.
        if is_expired(claims.exp, self.leeway, chrono::Utc::now().timestamp()) {
            return Err(TokenError::Expired);
        }

        let client_id = claims.client_id.or(claims.azp).unwrap_or_default();
        if self.audience.is_none() && self.enforce_client_id && client_id != self.client_id {
            return Err(TokenError::InvalidClientId);
        }

        Ok(BaseClaims::new(
            claims.sub,
            client_id,
            claims.scope.map(ScopeClaim::into_set).unwrap_or_default(),
            claims.exp,
            manager_id_claim(claims.manager_id),
        ))
    }
}
