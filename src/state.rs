// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::auth::Authorizer;
use crate::store::CompanyStore;

/// Shared application state, cloned into every handler.
#[derive(Clone)]
pub struct AppState {
    pub authorizer: Arc<Authorizer>,
    pub companies: Arc<CompanyStore>,
}

impl AppState {
    pub fn new(authorizer: Authorizer, companies: CompanyStore) -> Self {
        Self {
            authorizer: Arc::new(authorizer),
            companies: Arc::new(companies),
        }
    }
}
