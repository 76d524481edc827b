// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Extra-claims lookup errors.

use std::time::Duration;

use thiserror::Error;

/// Longest upstream body excerpt kept for logging.
const MAX_BODY_EXCERPT: usize = 512;

/// Failure to resolve extra claims.
///
/// Upstream status and body are kept for server-side logs only. `Clone` so
/// one failed lookup can be handed to every request waiting on it.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExtraClaimsError {
    #[error("request to {endpoint} failed: {reason}")]
    Connection { endpoint: String, reason: String },
    #[error("{endpoint} returned HTTP {status}: {body}")]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },
    #[error("invalid response from {endpoint}: {reason}")]
    Parse { endpoint: String, reason: String },
    #[error("extra claims lookup timed out after {0:?}")]
    Timeout(Duration),
    #[error("extra claims lookup did not complete: {0}")]
    Aborted(String),
}

impl ExtraClaimsError {
    pub(crate) fn status(endpoint: &str, status: u16, body: &str) -> Self {
        ExtraClaimsError::Status {
            endpoint: endpoint.to_string(),
            status,
            body: excerpt(body),
        }
    }
}

fn excerpt(body: &str) -> String {
    match body.char_indices().nth(MAX_BODY_EXCERPT) {
        Some((cut, _)) => format!("{}...", &body[..cut]),
        None => body.to_string(),
    }
}
