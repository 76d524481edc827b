// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Claims and the per-request principal.
//!
//! Claims are split in two:
//!
//! - [`BaseClaims`] come straight out of a validated access token and are
//!   rebuilt on every request.
//! - [`ExtraClaims`] come from auxiliary lookups (manager directory,
//!   user-info endpoint). They are the expensive part and the only part
//!   that is cached.
//!
//! A [`Principal`] pairs the two for the lifetime of one request.

use std::collections::BTreeSet;
use std::sync::Arc;

use super::roles::Role;

/// Claims read from a validated access token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseClaims {
    subject: String,
    client_id: String,
    scopes: BTreeSet<String>,
    expiry: i64,
    manager_id: Option<String>,
}

impl BaseClaims {
    /// Only the token validator constructs base claims.
    pub(crate) fn new(
        subject: String,
        client_id: String,
        scopes: BTreeSet<String>,
        expiry: i64,
        manager_id: Option<String>,
    ) -> Self {
        Self {
            subject,
            client_id,
            scopes,
            expiry,
            manager_id,
        }
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn scopes(&self) -> &BTreeSet<String> {
        &self.scopes
    }

    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes.contains(scope)
    }

    /// Token expiry as a unix timestamp in seconds.
    pub fn expiry(&self) -> i64 {
        self.expiry
    }

    /// Custom `manager_id` claim, when the authorization server issues one.
    pub fn manager_id(&self) -> Option<&str> {
        self.manager_id.as_deref()
    }
}

/// Standard OpenID Connect profile claims from the user-info endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserInfoClaims {
    pub given_name: String,
    pub family_name: String,
    pub email: String,
}

/// Attributes the investments API authorizes with.
///
/// An unknown manager produces an empty value (no role, no regions) rather
/// than an error; what that caller may see is decided by business logic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvestmentsClaims {
    pub manager_id: Option<String>,
    pub role: Option<Role>,
    pub title: String,
    pub regions: Vec<String>,
    pub user_info: Option<UserInfoClaims>,
}

/// Product specific claims, one variant per extra-claims source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtraClaims {
    Investments(InvestmentsClaims),
    UserInfo(UserInfoClaims),
}

impl ExtraClaims {
    pub fn role(&self) -> Option<Role> {
        match self {
            ExtraClaims::Investments(claims) => claims.role,
            ExtraClaims::UserInfo(_) => None,
        }
    }

    pub fn regions(&self) -> &[String] {
        match self {
            ExtraClaims::Investments(claims) => claims.regions.as_slice(),
            ExtraClaims::UserInfo(_) => &[],
        }
    }

    pub fn title(&self) -> &str {
        match self {
            ExtraClaims::Investments(claims) => claims.title.as_str(),
            ExtraClaims::UserInfo(_) => "",
        }
    }

    pub fn user_info(&self) -> Option<&UserInfoClaims> {
        match self {
            ExtraClaims::Investments(claims) => claims.user_info.as_ref(),
            ExtraClaims::UserInfo(info) => Some(info),
        }
    }
}

/// The authorized caller of a single request.
///
/// Handlers receive a principal through the [`Auth`](super::Auth)
/// extractor; they cannot build one themselves.
#[derive(Debug, Clone)]
pub struct Principal {
    base: BaseClaims,
    extra: Arc<ExtraClaims>,
}

impl Principal {
    pub(crate) fn new(base: BaseClaims, extra: Arc<ExtraClaims>) -> Self {
        Self { base, extra }
    }

    pub fn base(&self) -> &BaseClaims {
        &self.base
    }

    pub fn extra(&self) -> &ExtraClaims {
        &self.extra
    }

    pub fn user_id(&self) -> &str {
        self.base.subject()
    }

    /// True when the caller's role grants at least `required`.
    pub fn has_role(&self, required: Role) -> bool {
        self.extra
            .role()
            .is_some_and(|role| role.has_privilege(required))
    }

    /// True when the caller is scoped to `region`.
    pub fn covers_region(&self, region: &str) -> bool {
        self.extra.regions().iter().any(|r| r == region)
    }
}
