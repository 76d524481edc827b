// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Extra Claims
//!
//! Everything needed to resolve the attributes a validated token does not
//! carry itself, and to reuse them across requests bearing the same token.
//!
//! - `provider` - Provider trait and the two built-in sources
//! - `directory` - Manager directory (domain lookup)
//! - `userinfo` - User-info endpoint client
//! - `cache` - Expiring cache keyed by token hash
//! - `sweeper` - Optional background purge of expired entries

pub mod cache;
pub mod directory;
pub mod error;
pub mod provider;
pub mod sweeper;
pub mod userinfo;

pub use cache::{token_hash, ClaimsCache};
pub use directory::ManagerDirectory;
pub use error::ExtraClaimsError;
pub use provider::{ExtraClaimsProvider, InvestmentsClaimsProvider, UserInfoClaimsProvider};
pub use sweeper::ClaimsCacheSweeper;
pub use userinfo::UserInfoClient;
