// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Signing key resolution.
//!
//! ## Lifecycle
//!
//! - At startup [`KeyResolver::initialize`] downloads the issuer's discovery
//!   document and its JWKS. Failure here is fatal: without keys no request
//!   can be served.
//! - Discovery metadata is immutable afterwards. Only the JWKS behind the
//!   discovered `jwks_uri` is ever re-fetched.
//! - A re-fetch happens lazily when a token names a `kid` the cached set
//!   does not contain. There is no background refresh.
//!
//! ## Concurrency
//!
//! Lookups against the cached key set only take a read lock. Refreshes are
//! serialized by a gate; callers that missed while another refresh was
//! running reuse its outcome instead of fetching again.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use jsonwebtoken::jwk::{AlgorithmParameters, Jwk, JwkSet, KeyAlgorithm};
use jsonwebtoken::{Algorithm, DecodingKey};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use super::error::KeyResolverError;
use crate::config::OAuthConfig;

/// Subset of the OpenID Connect discovery document this service uses.
#[derive(Debug, Clone, Deserialize)]
pub struct DiscoveryMetadata {
    pub issuer: String,
    pub jwks_uri: String,
    #[serde(default)]
    pub userinfo_endpoint: Option<String>,
    #[serde(default)]
    pub introspection_endpoint: Option<String>,
}

/// A verification key and the algorithm its JWK declares, if any.
#[derive(Clone)]
pub struct ResolvedKey {
    pub key: DecodingKey,
    pub algorithm: Option<Algorithm>,
}

/// Resolves token key ids to verification keys.
pub struct KeyResolver {
    metadata: DiscoveryMetadata,
    client: reqwest::Client,
    keys: RwLock<Arc<JwkSet>>,
    /// Serializes refreshes and remembers the last failed one so waiters can
    /// share it.
    refresh_gate: Mutex<Option<KeyResolverError>>,
    /// Completed refresh attempts. Bumped after the key set is swapped.
    refreshes: AtomicU64,
}

impl KeyResolver {
    /// Fetch discovery metadata and the initial key set.
    ///
    /// `client` should carry the configured request timeout.
    pub async fn initialize(
        config: &OAuthConfig,
        client: reqwest::Client,
    ) -> Result<Self, KeyResolverError> {
        let metadata: DiscoveryMetadata = get_json(&client, &config.discovery_url()).await?;
        if metadata.issuer.trim_end_matches('/') != config.issuer.trim_end_matches('/') {
            warn!(
                configured = %config.issuer,
                discovered = %metadata.issuer,
                "Discovery document issuer differs from configured issuer"
            );
        }

        let keys: JwkSet = get_json(&client, &metadata.jwks_uri).await?;
        info!(
            jwks_uri = %metadata.jwks_uri,
            key_count = keys.keys.len(),
            "Signing keys loaded"
        );

        Ok(Self::from_parts(metadata, keys, client))
    }

    pub(crate) fn from_parts(
        metadata: DiscoveryMetadata,
        keys: JwkSet,
        client: reqwest::Client,
    ) -> Self {
        Self {
            metadata,
            client,
            keys: RwLock::new(Arc::new(keys)),
            refresh_gate: Mutex::new(None),
            refreshes: AtomicU64::new(0),
        }
    }

    pub fn metadata(&self) -> &DiscoveryMetadata {
        &self.metadata
    }

    /// Number of JWKS refreshes attempted since startup.
    pub fn refresh_count(&self) -> u64 {
        self.refreshes.load(Ordering::Acquire)
    }

    /// Keys currently held.
    pub async fn key_count(&self) -> usize {
        self.keys.read().await.keys.len()
    }

    /// Resolve `kid` to a verification key.
    ///
    /// On a miss the key set is refreshed once; if the id is still absent
    /// this fails with [`KeyResolverError::KeyNotFound`].
    pub async fn resolve_key(&self, kid: &str) -> Result<ResolvedKey, KeyResolverError> {
        let seen = self.refreshes.load(Ordering::Acquire);
        let keys = self.keys.read().await.clone();
        if let Some(jwk) = keys.find(kid) {
            return jwk_to_decoding_key(kid, jwk);
        }

        debug!(kid, "Unknown kid, refreshing signing keys");
        let keys = self.refresh(seen).await?;
        match keys.find(kid) {
            Some(jwk) => jwk_to_decoding_key(kid, jwk),
            None => Err(KeyResolverError::KeyNotFound(kid.to_string())),
        }
    }

    /// Re-fetch the JWKS unless another caller already did so since `seen`.
    async fn refresh(&self, seen: u64) -> Result<Arc<JwkSet>, KeyResolverError> {
        let mut last_failure = self.refresh_gate.lock().await;

        if self.refreshes.load(Ordering::Acquire) != seen {
            return match last_failure.as_ref() {
                Some(err) => Err(err.clone()),
                None => Ok(self.keys.read().await.clone()),
            };
        }

        let outcome = get_json::<JwkSet>(&self.client, &self.metadata.jwks_uri).await;
        let result = match outcome {
            Ok(keys) => {
                let keys = Arc::new(keys);
                *self.keys.write().await = keys.clone();
                *last_failure = None;
                info!(key_count = keys.keys.len(), "Signing keys refreshed");
                Ok(keys)
            }
            Err(err) => {
                warn!(error = %err, "Signing key refresh failed");
                *last_failure = Some(err.clone());
                Err(err)
            }
        };
        self.refreshes.fetch_add(1, Ordering::AcqRel);
        result
    }
}

/// GET a JSON document, mapping every failure to a [`KeyResolverError`].
async fn get_json<T: DeserializeOwned>(
    client: &reqwest::Client,
    url: &str,
) -> Result<T, KeyResolverError> {
    let response = client
        .get(url)
        .header(reqwest::header::ACCEPT, "application/json")
        .send()
        .await
        .map_err(|e| KeyResolverError::Fetch {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    if !response.status().is_success() {
        return Err(KeyResolverError::Status {
            url: url.to_string(),
            status: response.status().as_u16(),
        });
    }

    response.json().await.map_err(|e| KeyResolverError::Parse {
        url: url.to_string(),
        reason: e.to_string(),
    })
}

/// Convert a JWK to a DecodingKey.
fn jwk_to_decoding_key(kid: &str, jwk: &Jwk) -> Result<ResolvedKey, KeyResolverError> {
    let unusable = |reason: String| KeyResolverError::UnusableKey {
        kid: kid.to_string(),
        reason,
    };

    let key = match &jwk.algorithm {
        AlgorithmParameters::RSA(rsa) => DecodingKey::from_rsa_components(&rsa.n, &rsa.e)
            .map_err(|e| unusable(format!("Failed to create RSA key: {e}")))?,
        AlgorithmParameters::EllipticCurve(ec) => DecodingKey::from_ec_components(&ec.x, &ec.y)
            .map_err(|e| unusable(format!("Failed to create EC key: {e}")))?,
        AlgorithmParameters::OctetKeyPair(okp) => DecodingKey::from_ed_components(&okp.x)
            .map_err(|e| unusable(format!("Failed to create EdDSA key: {e}")))?,
        _ => return Err(unusable("Unsupported key type in JWKS".to_string())),
    };

    let algorithm = jwk.common.key_algorithm.and_then(|a| match a {
        KeyAlgorithm::RS256 => Some(Algorithm::RS256),
        KeyAlgorithm::RS384 => Some(Algorithm::RS384),
        KeyAlgorithm::RS512 => Some(Algorithm::RS512),
        KeyAlgorithm::PS256 => Some(Algorithm::PS256),
        KeyAlgorithm::PS384 => Some(Algorithm::PS384),
        KeyAlgorithm::PS512 => Some(Algorithm::PS512),
        KeyAlgorithm::ES256 => Some(Algorithm::ES256),
        KeyAlgorithm::ES384 => Some(Algorithm::ES384),
        KeyAlgorithm::EdDSA => Some(Algorithm::EdDSA),
        _ => None,
    });

    Ok(ResolvedKey { key, algorithm })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::test_support::offline_resolver;
    use serde_json::json;

    #[tokio::test]
    async fn cached_kid_resolves_without_refresh() {
        let resolver = offline_resolver(&["kid-1"]);
        let resolved = resolver.resolve_key("kid-1").await.unwrap();
        assert_eq!(resolved.algorithm, Some(Algorithm::RS256));
        assert_eq!(resolver.refresh_count(), 0);
    }

    #[tokio::test]
    async fn unknown_kid_with_unreachable_jwks_reports_fetch_failure() {
        let resolver = offline_resolver(&["kid-1"]);
        let err = resolver.resolve_key("kid-2").await.err().unwrap();
        assert!(matches!(err, KeyResolverError::Fetch { .. }));
        assert_eq!(resolver.refresh_count(), 1);
    }

    #[test]
    fn unsupported_key_type_is_unusable() {
        let jwk: Jwk = serde_json::from_value(json!({
            "kty": "oct",
            "kid": "hmac",
            "k": "c2VjcmV0"
        }))
        .unwrap();
        let err = jwk_to_decoding_key("hmac", &jwk).err().unwrap();
        assert!(matches!(err, KeyResolverError::UnusableKey { .. }));
    }
}
