// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Manager directory: the in-process domain lookup behind investments claims.

use std::collections::HashMap;

use crate::auth::{InvestmentsClaims, Role};

#[derive(Debug, Clone)]
struct ManagerRecord {
    role: Role,
    title: &'static str,
    regions: &'static [&'static str],
}

/// Maps manager ids to business role, title and regions.
///
/// Lookups are total: an unknown or absent manager id yields empty claims.
#[derive(Debug, Clone)]
pub struct ManagerDirectory {
    managers: HashMap<&'static str, ManagerRecord>,
}

impl Default for ManagerDirectory {
    fn default() -> Self {
        let managers = HashMap::from([
            (
                "20116",
                ManagerRecord {
                    role: Role::Admin,
                    title: "Global Manager",
                    regions: &["Europe", "USA", "Asia"],
                },
            ),
            (
                "10345",
                ManagerRecord {
                    role: Role::User,
                    title: "Regional Manager",
                    regions: &["USA"],
                },
            ),
        ]);
        Self { managers }
    }
}

impl ManagerDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lookup(&self, manager_id: Option<&str>) -> InvestmentsClaims {
        let Some(id) = manager_id else {
            return InvestmentsClaims::default();
        };
        match self.managers.get(id) {
            Some(record) => InvestmentsClaims {
                manager_id: Some(id.to_string()),
                role: Some(record.role),
                title: record.title.to_string(),
                regions: record.regions.iter().map(|r| r.to_string()).collect(),
                user_info: None,
            },
            None => InvestmentsClaims {
                manager_id: Some(id.to_string()),
                ..InvestmentsClaims::default()
            },
        }
    }
}
