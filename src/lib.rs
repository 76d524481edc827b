// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Claims Authorizer - OAuth per-request authorization
//!
//! Validates bearer access tokens against the issuer's signing keys, adds
//! product specific claims from a directory or user-info lookup, and caches
//! those claims per token until it expires.
//!
//! ## Modules
//!
//! - `auth` - Key resolution, token validation, the per-request authorizer
//! - `claims` - Extra-claims providers, the claims cache and its sweeper
//! - `error` - Failure taxonomy and translation to client responses
//! - `api` - Sample investments API (Axum)
//! - `app` - Service wiring and graceful shutdown

pub mod api;
pub mod app;
pub mod auth;
pub mod claims;
pub mod config;
pub mod context;
pub mod error;
pub mod logging;
pub mod models;
pub mod state;
pub mod store;
