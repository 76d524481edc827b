// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Extra-claims providers.
//!
//! One provider is chosen at startup and shared by every request. Providers
//! are only invoked on a claims cache miss.

use async_trait::async_trait;

use super::directory::ManagerDirectory;
use super::error::ExtraClaimsError;
use super::userinfo::UserInfoClient;
use crate::auth::{BaseClaims, ExtraClaims};

/// Resolves the extra attributes used for authorization.
#[async_trait]
pub trait ExtraClaimsProvider: Send + Sync {
    /// Resolve claims for an already validated token.
    ///
    /// `access_token` may be forwarded to upstream endpoints but must not be
    /// logged.
    async fn resolve(
        &self,
        access_token: &str,
        base: &BaseClaims,
    ) -> Result<ExtraClaims, ExtraClaimsError>;
}

/// Manager directory lookup, optionally enriched with user info.
pub struct InvestmentsClaimsProvider {
    directory: ManagerDirectory,
    user_info: Option<UserInfoClient>,
}

impl InvestmentsClaimsProvider {
    pub fn new(directory: ManagerDirectory, user_info: Option<UserInfoClient>) -> Self {
        Self {
            directory,
            user_info,
        }
    }
}

#[async_trait]
impl ExtraClaimsProvider for InvestmentsClaimsProvider {
    async fn resolve(
        &self,
        access_token: &str,
        base: &BaseClaims,
    ) -> Result<ExtraClaims, ExtraClaimsError> {
        let mut claims = self.directory.lookup(base.manager_id());
        if let Some(client) = &self.user_info {
            claims.user_info = Some(client.fetch(access_token).await?);
        }
        Ok(ExtraClaims::Investments(claims))
    }
}

/// User-info endpoint only.
pub struct UserInfoClaimsProvider {
    client: UserInfoClient,
}

impl UserInfoClaimsProvider {
    pub fn new(client: UserInfoClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ExtraClaimsProvider for UserInfoClaimsProvider {
    async fn resolve(
        &self,
        access_token: &str,
        _base: &BaseClaims,
    ) -> Result<ExtraClaims, ExtraClaimsError> {
        Ok(ExtraClaims::UserInfo(self.client.fetch(access_token).await?))
    }
}
