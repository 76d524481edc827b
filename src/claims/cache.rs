// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Expiring cache of extra claims, keyed by access token hash.
//!
//! The cache is a passive map. It never holds placeholders for lookups in
//! progress; coordinating concurrent misses is the authorizer's job.
//!
//! Expiry is lazy: an entry read at or after its `expires_at` is dropped and
//! reported as absent. [`ClaimsCache::purge_expired`] exists only to bound
//! memory and is not needed for correctness.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use dashmap::DashMap;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::auth::ExtraClaims;

/// Hex SHA-256 of a raw access token. The raw token is never stored.
pub fn token_hash(raw_token: &str) -> String {
    format!("{:x}", Sha256::digest(raw_token.as_bytes()))
}

/// When an entry for a token expiring at `token_expiry` should lapse.
///
/// `min(token_expiry, now + max_ttl)`: an entry never outlives its token.
pub fn entry_expiry(token_expiry: i64, max_ttl: Duration, now: DateTime<Utc>) -> DateTime<Utc> {
    let token_expiry = DateTime::from_timestamp(token_expiry, 0).unwrap_or(now);
    let capped = TimeDelta::from_std(max_ttl)
        .ok()
        .and_then(|ttl| now.checked_add_signed(ttl))
        .unwrap_or(token_expiry);
    token_expiry.min(capped)
}

struct CachedEntry {
    claims: Arc<ExtraClaims>,
    expires_at: DateTime<Utc>,
}

#[derive(Default)]
pub struct ClaimsCache {
    entries: DashMap<String, CachedEntry>,
}

impl ClaimsCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, token_hash: &str) -> Option<Arc<ExtraClaims>> {
        self.get_at(token_hash, Utc::now())
    }

    /// Look up `token_hash` as of `now`.
    pub fn get_at(&self, token_hash: &str, now: DateTime<Utc>) -> Option<Arc<ExtraClaims>> {
        match self.entries.get(token_hash) {
            Some(entry) if now < entry.expires_at => return Some(Arc::clone(&entry.claims)),
            Some(_) => {}
            None => return None,
        }

        // Only drop the entry if a concurrent put has not replaced it.
        if self
            .entries
            .remove_if(token_hash, |_, entry| now >= entry.expires_at)
            .is_some()
        {
            debug!(token_hash = short(token_hash), "Evicted expired claims");
        }
        None
    }

    /// Store `claims` until `expires_at`, replacing any existing entry.
    pub fn put(&self, token_hash: &str, claims: Arc<ExtraClaims>, expires_at: DateTime<Utc>) {
        self.put_at(token_hash, claims, expires_at, Utc::now());
    }

    /// Store as of `now`. Entries that would already be expired are skipped.
    pub fn put_at(
        &self,
        token_hash: &str,
        claims: Arc<ExtraClaims>,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) {
        if expires_at <= now {
            debug!(token_hash = short(token_hash), "Not caching claims for expiring token");
            return;
        }
        debug!(
            token_hash = short(token_hash),
            ttl_secs = (expires_at - now).num_seconds(),
            "Caching extra claims"
        );
        self.entries.insert(
            token_hash.to_string(),
            CachedEntry { claims, expires_at },
        );
    }

    /// Drop every entry expired as of `now`; returns how many were removed.
    pub fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        let mut removed = 0;
        self.entries.retain(|_, entry| {
            let live = now < entry.expires_at;
            if !live {
                removed += 1;
            }
            live
        });
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Leading hex digits of a hash, enough to correlate log lines.
pub(crate) fn short(token_hash: &str) -> &str {
    token_hash.get(..8).unwrap_or(token_hash)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{InvestmentsClaims, Role};

    fn claims(title: &str) -> Arc<ExtraClaims> {
        Arc::new(ExtraClaims::Investments(InvestmentsClaims {
            manager_id: Some("10345".to_string()),
            role: Some(Role::User),
            title: title.to_string(),
            regions: vec!["USA".to_string()],
            user_info: None,
        }))
    }

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    #[test]
    fn hit_before_expiry_miss_after() {
        let cache = ClaimsCache::new();
        let stored = claims("Regional Manager");
        cache.put_at("h1", stored.clone(), at(1_000), at(900));

        assert_eq!(cache.get_at("h1", at(999)), Some(stored));
        assert_eq!(cache.get_at("h1", at(1_000)), None);
        // Lazily evicted on that read.
        assert!(cache.is_empty());
    }

    #[test]
    fn put_overwrites_existing_entry() {
        let cache = ClaimsCache::new();
        cache.put_at("h1", claims("first"), at(1_000), at(900));
        cache.put_at("h1", claims("second"), at(2_000), at(900));

        let hit = cache.get_at("h1", at(1_500)).unwrap();
        assert_eq!(hit.title(), "second");
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn already_expired_entries_are_not_stored() {
        let cache = ClaimsCache::new();
        cache.put_at("h1", claims("late"), at(900), at(900));
        assert!(cache.is_empty());
    }

    #[test]
    fn purge_removes_only_expired_entries() {
        let cache = ClaimsCache::new();
        cache.put_at("old", claims("old"), at(1_000), at(0));
        cache.put_at("new", claims("new"), at(5_000), at(0));

        assert_eq!(cache.purge_expired(at(2_000)), 1);
        assert_eq!(cache.len(), 1);
        assert!(cache.get_at("new", at(2_000)).is_some());
    }

    #[test]
    fn expiry_is_capped_by_token_expiry() {
        let now = at(1_000);
        let max_ttl = Duration::from_secs(15 * 60);

        // Token outlives the cap.
        assert_eq!(entry_expiry(10_000, max_ttl, now), at(1_900));
        // Token expires first.
        assert_eq!(entry_expiry(1_300, max_ttl, now), at(1_300));
    }

    #[test]
    fn token_hash_is_hex_sha256() {
        let hash = token_hash("abc");
        assert_eq!(
            hash,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(short(&hash), "ba7816bf");
    }
}
