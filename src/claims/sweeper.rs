// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Claims Cache Sweeper
//!
//! Background task that periodically drops expired claims cache entries.
//! Reads already ignore expired entries, so this only bounds memory held by
//! tokens that are never presented again.
//!
//! ## Shutdown
//!
//! Uses `tokio_util::sync::CancellationToken` for graceful shutdown.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::cache::ClaimsCache;

pub struct ClaimsCacheSweeper {
    cache: Arc<ClaimsCache>,
    interval: Duration,
}

impl ClaimsCacheSweeper {
    pub fn new(cache: Arc<ClaimsCache>, interval: Duration) -> Self {
        Self { cache, interval }
    }

    /// Run the sweep loop until the cancellation token is triggered.
    ///
    /// Should be spawned as a background task:
    /// ```rust,ignore
    /// tokio::spawn(sweeper.run(shutdown.clone()));
    /// ```
    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            interval_secs = self.interval.as_secs(),
            "Claims cache sweeper starting"
        );

        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {},
                _ = shutdown.cancelled() => {
                    info!("Claims cache sweeper shutting down");
                    return;
                }
            }

            self.sweep_step();
        }
    }

    fn sweep_step(&self) {
        let removed = self.cache.purge_expired(Utc::now());
        if removed > 0 {
            debug!(
                removed,
                remaining = self.cache.len(),
                "Claims cache sweep removed expired entries"
            );
        }
    }
}
