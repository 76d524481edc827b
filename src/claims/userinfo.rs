// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! OpenID Connect user-info client.
//!
//! Forwards the caller's access token as-is and reads standard profile
//! claims from the JSON response.

use serde::Deserialize;
use tracing::debug;

use super::error::ExtraClaimsError;
use crate::auth::UserInfoClaims;

#[derive(Debug, Deserialize)]
struct UserInfoResponse {
    #[serde(default)]
    given_name: String,
    #[serde(default)]
    family_name: String,
    #[serde(default)]
    email: String,
}

#[derive(Debug, Clone)]
pub struct UserInfoClient {
    endpoint: String,
    client: reqwest::Client,
}

impl UserInfoClient {
    /// `client` should carry the configured request timeout.
    pub fn new(endpoint: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            endpoint: endpoint.into(),
            client,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub async fn fetch(&self, access_token: &str) -> Result<UserInfoClaims, ExtraClaimsError> {
        let response = self
            .client
            .get(&self.endpoint)
            .bearer_auth(access_token)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| ExtraClaimsError::Connection {
                endpoint: self.endpoint.clone(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ExtraClaimsError::status(&self.endpoint, status.as_u16(), &body));
        }

        let info: UserInfoResponse =
            response.json().await.map_err(|e| ExtraClaimsError::Parse {
                endpoint: self.endpoint.clone(),
                reason: e.to_string(),
            })?;
        debug!(endpoint = %self.endpoint, "User info received");

        Ok(UserInfoClaims {
            given_name: info.given_name,
            family_name: info.family_name,
            email: info.email,
        })
    }
}
