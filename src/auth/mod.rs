// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authorization Module
//!
//! OAuth access-token authorization for the investments API.
//!
//! ## Auth Flow
//!
//! 1. Client sends `Authorization: Bearer <access token>`
//! 2. The service:
//!    - Resolves the signing key from the issuer's JWKS (discovered via
//!      `/.well-known/openid-configuration`)
//!    - Verifies signature, algorithm, expiry, issuer, audience, or with
//!      the introspection strategy asks the issuer whether the token is
//!      active
//!    - Extracts base claims (`sub`, `client_id`, `scope`, `exp`)
//!    - Enforces the route's required scope
//!    - Loads extra claims from the cache, or from the configured provider
//!      on a miss
//! 3. Handlers receive a [`Principal`] through [`Auth`]
//!
//! ## Security
//!
//! - Every `/investments` endpoint requires authorization
//! - Only the configured asymmetric algorithm is accepted
//! - Unknown key ids trigger at most one JWKS refresh
//! - Raw tokens are never logged; the cache is keyed by their SHA-256

pub mod authorizer;
pub mod claims;
pub mod error;
pub mod extractor;
pub mod introspection;
pub mod jwks;
pub mod middleware;
pub mod roles;
pub mod scope;
pub mod validator;

#[cfg(test)]
pub(crate) mod test_support;

pub use authorizer::{Authorizer, AuthorizerSettings};
pub use claims::{BaseClaims, ExtraClaims, InvestmentsClaims, Principal, UserInfoClaims};
pub use error::{IntrospectionError, KeyResolverError, TokenError};
pub use extractor::Auth;
pub use introspection::TokenIntrospector;
pub use jwks::KeyResolver;
pub use roles::Role;
pub use scope::{ScopePolicy, ScopeRule};
pub use validator::TokenValidator;
