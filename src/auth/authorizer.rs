// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Per-request Authorization
//!
//! [`Authorizer::authorize`] turns request headers into a [`Principal`]:
//!
//! 1. Read the bearer token from `Authorization`
//! 2. Validate it and extract base claims
//! 3. Check the route's required scope, if any
//! 4. Look up extra claims in the cache by token hash
//! 5. On a miss, resolve them through the provider and cache the result
//!    until `min(token expiry, now + max TTL)`
//!
//! Any failure is translated into a [`ClientError`] before it is returned.
//!
//! ## Single flight
//!
//! Concurrent misses for the same token hash share one provider call. The
//! first miss registers a shared future in `inflight`; later misses await
//! that future instead of calling the provider. The lookup itself runs on
//! its own task, so a caller that disconnects does not cancel it and the
//! result still lands in the cache for everyone else. The in-flight entry
//! is removed only after the result has been stored.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::http::{header::AUTHORIZATION, HeaderMap};
use chrono::Utc;
use dashmap::{mapref::entry::Entry, DashMap};
use futures::future::{BoxFuture, FutureExt, Shared};
use tracing::{debug, field, info, info_span, Instrument, Span};

use super::claims::{BaseClaims, ExtraClaims, Principal};
use super::scope::ScopePolicy;
use super::validator::TokenValidator;
use crate::claims::cache::{entry_expiry, short, token_hash, ClaimsCache};
use crate::claims::{ExtraClaimsError, ExtraClaimsProvider};
use crate::context::RequestContext;
use crate::error::{ApiError, ClientError};

type LookupResult = Result<Arc<ExtraClaims>, ExtraClaimsError>;
type LookupFuture = Shared<BoxFuture<'static, LookupResult>>;

struct PendingLookup {
    id: u64,
    lookup: LookupFuture,
}

/// Tuning for the authorization flow.
#[derive(Debug, Clone)]
pub struct AuthorizerSettings {
    /// Upper bound on claims cache entry lifetime.
    pub max_cache_ttl: Duration,
    /// Upper bound on a single extra-claims lookup.
    pub lookup_timeout: Duration,
    pub scopes: ScopePolicy,
}

pub struct Authorizer {
    validator: TokenValidator,
    provider: Arc<dyn ExtraClaimsProvider>,
    cache: Arc<ClaimsCache>,
    inflight: Arc<DashMap<String, PendingLookup>>,
    next_lookup_id: AtomicU64,
    settings: AuthorizerSettings,
}

impl Authorizer {
    pub fn new(
        validator: TokenValidator,
        provider: Arc<dyn ExtraClaimsProvider>,
        settings: AuthorizerSettings,
    ) -> Self {
        Self {
            validator,
            provider,
            cache: Arc::new(ClaimsCache::new()),
            inflight: Arc::new(DashMap::new()),
            next_lookup_id: AtomicU64::new(0),
            settings,
        }
    }

    pub fn cache(&self) -> Arc<ClaimsCache> {
        Arc::clone(&self.cache)
    }

    pub fn validator(&self) -> &TokenValidator {
        &self.validator
    }

    /// Lookups currently in flight.
    pub fn pending_lookups(&self) -> usize {
        self.inflight.len()
    }

    /// Authorize one request.
    pub async fn authorize(
        &self,
        ctx: &RequestContext,
        headers: &HeaderMap,
    ) -> Result<Principal, ClientError> {
        let span = info_span!(
            "authorize",
            correlation_id = %ctx.correlation_id,
            method = %ctx.method,
            path = %ctx.path,
            user_id = field::Empty,
            client_id = field::Empty,
            scope = field::Empty,
            token_hash = field::Empty,
        );

        self.authorize_request(ctx, headers)
            .instrument(span)
            .await
            .map_err(|err| err.translate(ctx))
    }

    async fn authorize_request(
        &self,
        ctx: &RequestContext,
        headers: &HeaderMap,
    ) -> Result<Principal, ApiError> {
        let token = bearer_token(headers).ok_or(ApiError::MissingToken)?;

        let started = Instant::now();
        let base = self.validator.validate(token).await?;
        debug!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Access token validated"
        );

        let span = Span::current();
        span.record("user_id", base.subject());
        span.record("client_id", base.client_id());
        span.record(
            "scope",
            field::display(base.scopes().iter().cloned().collect::<Vec<_>>().join(" ")),
        );

        if let Some(required) = self.settings.scopes.required_scope(&ctx.path) {
            if !base.has_scope(required) {
                return Err(ApiError::InsufficientScope {
                    required: required.to_string(),
                });
            }
        }

        let hash = token_hash(token);
        span.record("token_hash", short(&hash));

        let extra = self.extra_claims(token, &base, &hash).await?;
        info!("Request authorized");
        Ok(Principal::new(base, extra))
    }

    async fn extra_claims(
        &self,
        token: &str,
        base: &BaseClaims,
        hash: &str,
    ) -> Result<Arc<ExtraClaims>, ApiError> {
        if let Some(hit) = self.cache.get(hash) {
            debug!("Claims cache hit");
            return Ok(hit);
        }

        let lookup = match self.inflight.entry(hash.to_string()) {
            Entry::Occupied(pending) => {
                debug!("Joining in-flight claims lookup");
                pending.get().lookup.clone()
            }
            Entry::Vacant(vacant) => {
                // A lookup may have finished between the cache read and
                // taking this entry; it stores before it deregisters.
                if let Some(hit) = self.cache.get(hash) {
                    debug!("Claims cache hit");
                    return Ok(hit);
                }
                debug!("Claims cache miss, starting lookup");
                let id = self.next_lookup_id.fetch_add(1, Ordering::Relaxed);
                let lookup = self.start_lookup(id, token, base, hash);
                vacant.insert(PendingLookup {
                    id,
                    lookup: lookup.clone(),
                });
                lookup
            }
        };

        Ok(lookup.await?)
    }

    fn start_lookup(&self, id: u64, token: &str, base: &BaseClaims, hash: &str) -> LookupFuture {
        let provider = Arc::clone(&self.provider);
        let cache = Arc::clone(&self.cache);
        let inflight = Arc::clone(&self.inflight);
        let token = token.to_string();
        let base = base.clone();
        let key = hash.to_string();
        let timeout = self.settings.lookup_timeout;
        let max_ttl = self.settings.max_cache_ttl;

        let task = tokio::spawn(
            {
                let key = key.clone();
                let inflight = Arc::clone(&inflight);
                async move {
                    let started = Instant::now();
                    let outcome =
                        match tokio::time::timeout(timeout, provider.resolve(&token, &base)).await {
                            Ok(Ok(extra)) => {
                                let extra = Arc::new(extra);
                                let now = Utc::now();
                                cache.put(
                                    &key,
                                    Arc::clone(&extra),
                                    entry_expiry(base.expiry(), max_ttl, now),
                                );
                                Ok(extra)
                            }
                            Ok(Err(err)) => Err(err),
                            Err(_) => Err(ExtraClaimsError::Timeout(timeout)),
                        };
                    debug!(
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        ok = outcome.is_ok(),
                        "Extra claims lookup finished"
                    );
                    inflight.remove_if(&key, |_, pending| pending.id == id);
                    outcome
                }
            }
            .instrument(Span::current()),
        );

        async move {
            match task.await {
                Ok(outcome) => outcome,
                Err(join) => {
                    // The task never reached its own cleanup.
                    inflight.remove_if(&key, |_, pending| pending.id == id);
                    Err(ExtraClaimsError::Aborted(join.to_string()))
                }
            }
        }
        .boxed()
        .shared()
    }
}

/// Token from an `Authorization: Bearer <token>` header. The scheme is
/// case-insensitive.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}
