// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Token validation by introspection (RFC 7662).
//!
//! Instead of verifying a signature locally, the token is posted to the
//! authorization server, which answers whether it is still active. The API
//! authenticates that call with its own client id and secret using HTTP
//! Basic authentication. This also works for opaque (non-JWT) tokens and
//! picks up revocations immediately.
//!
//! An `active: false` answer is the caller's problem (401). Failing to get
//! an answer at all is ours (500).

use std::time::Instant;

use chrono::Utc;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::claims::BaseClaims;
use super::error::{IntrospectionError, TokenError};
use super::validator::{is_expired, manager_id_claim, ScopeClaim};
use crate::config::OAuthConfig;

/// Fields of an introspection response this service reads.
#[derive(Debug, Deserialize)]
struct IntrospectionResponse {
    #[serde(default)]
    active: bool,
    #[serde(default)]
    sub: Option<String>,
    #[serde(default)]
    exp: Option<i64>,
    #[serde(default)]
    iss: Option<String>,
    #[serde(default)]
    scope: Option<ScopeClaim>,
    #[serde(default)]
    client_id: Option<String>,
    #[serde(default)]
    manager_id: Option<Value>,
}

/// Client for the authorization server's introspection endpoint.
pub struct TokenIntrospector {
    endpoint: String,
    client_id: String,
    client_secret: String,
    issuer: String,
    leeway: u64,
    client: reqwest::Client,
}

impl TokenIntrospector {
    /// Build an introspector from the OAuth settings.
    ///
    /// Returns `None` when no client secret is configured.
    pub fn from_config(
        config: &OAuthConfig,
        endpoint: String,
        client: reqwest::Client,
    ) -> Option<Self> {
        Some(Self {
            endpoint,
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone()?,
            issuer: config.issuer.clone(),
            leeway: config.clock_skew.as_secs(),
            client,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Ask the authorization server about `token` and return its base claims.
    pub async fn introspect(&self, token: &str) -> Result<BaseClaims, TokenError> {
        let started = Instant::now();
        let response = self
            .client
            .post(&self.endpoint)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .header(reqwest::header::ACCEPT, "application/json")
            .form(&[("token", token), ("token_type_hint", "access_token")])
            .send()
            .await
            .map_err(|e| {
                TokenError::Introspection(IntrospectionError::Fetch {
                    url: self.endpoint.clone(),
                    reason: e.to_string(),
                })
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(TokenError::Introspection(IntrospectionError::Status {
                url: self.endpoint.clone(),
                status: status.as_u16(),
            }));
        }

        let body: IntrospectionResponse = response.json().await.map_err(|e| {
            TokenError::Introspection(IntrospectionError::Parse {
                url: self.endpoint.clone(),
                reason: e.to_string(),
            })
        })?;
        debug!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            active = body.active,
            "Access token introspected"
        );

        self.base_claims(body, Utc::now().timestamp())
    }

    fn base_claims(&self, body: IntrospectionResponse, now: i64) -> Result<BaseClaims, TokenError> {
        if !body.active {
            return Err(TokenError::Inactive);
        }
        if body.iss.as_deref().is_some_and(|iss| iss != self.issuer) {
            return Err(TokenError::InvalidIssuer);
        }

        let subject = body
            .sub
            .filter(|sub| !sub.is_empty())
            .ok_or_else(|| TokenError::MissingClaim("sub".to_string()))?;
        let expiry = body
            .exp
            .ok_or_else(|| TokenError::MissingClaim("exp".to_string()))?;
        if is_expired(expiry, self.leeway, now) {
            return Err(TokenError::Expired);
        }

        Ok(BaseClaims::new(
            subject,
            body.client_id.unwrap_or_default(),
            body.scope.map(ScopeClaim::into_set).unwrap_or_default(),
            expiry,
            manager_id_claim(body.manager_id),
        ))
    }
}
