// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-memory company data with business authorization applied on read.
//!
//! Access rules:
//! - `admin` sees every company
//! - `user` sees companies in one of their regions
//! - any other caller sees nothing
//!
//! A company the caller may not see is reported exactly like one that does
//! not exist.

use std::collections::BTreeMap;

use crate::auth::{Principal, Role};
use crate::error::ApiError;
use crate::models::{Company, CompanyTransactions, Transaction};

pub struct CompanyStore {
    companies: BTreeMap<u32, CompanyTransactions>,
}

impl Default for CompanyStore {
    fn default() -> Self {
        Self::seeded()
    }
}

impl CompanyStore {
    pub fn new(entries: impl IntoIterator<Item = CompanyTransactions>) -> Self {
        Self {
            companies: entries.into_iter().map(|entry| (entry.id, entry)).collect(),
        }
    }

    /// The sample data set served by the API.
    pub fn seeded() -> Self {
        let company = |id, name: &str, region: &str, target_usd, investment_usd, no_investors| {
            Company {
                id,
                name: name.to_string(),
                region: region.to_string(),
                target_usd,
                investment_usd,
                no_investors,
            }
        };
        let transaction = |id: &str, investor: &str, amount_usd| Transaction {
            id: id.to_string(),
            investor_id: investor.to_string(),
            amount_usd,
        };

        Self::new([
            CompanyTransactions {
                id: 1,
                company: company(1, "Micro Technologies", "Europe", 70_000, 60_000, 23),
                transactions: vec![
                    transaction("11", "10342", 12_000),
                    transaction("12", "10578", 9_500),
                ],
            },
            CompanyTransactions {
                id: 2,
                company: company(2, "Mega Corp", "USA", 850_000, 640_000, 68),
                transactions: vec![
                    transaction("21", "10345", 95_000),
                    transaction("22", "10871", 120_000),
                    transaction("23", "11005", 38_000),
                ],
            },
            CompanyTransactions {
                id: 3,
                company: company(3, "Ace Ventures", "USA", 120_000, 87_000, 11),
                transactions: vec![transaction("31", "10423", 20_000)],
            },
            CompanyTransactions {
                id: 4,
                company: company(4, "Global Holdings", "Asia", 500_000, 390_000, 41),
                transactions: vec![
                    transaction("41", "12003", 75_000),
                    transaction("42", "12417", 43_000),
                ],
            },
        ])
    }

    /// Companies the caller is allowed to see.
    pub fn list_for(&self, principal: &Principal) -> Vec<Company> {
        self.companies
            .values()
            .filter(|entry| is_authorized_for(principal, &entry.company))
            .map(|entry| entry.company.clone())
            .collect()
    }

    /// Transactions of one company, if the caller is allowed to see it.
    pub fn transactions_for(
        &self,
        principal: &Principal,
        company_id: u32,
    ) -> Result<CompanyTransactions, ApiError> {
        self.companies
            .get(&company_id)
            .filter(|entry| is_authorized_for(principal, &entry.company))
            .cloned()
            .ok_or_else(|| {
                ApiError::not_found(
                    "company_not_found",
                    format!("Transactions for company {company_id} were not found for this user"),
                )
            })
    }
}

fn is_authorized_for(principal: &Principal, company: &Company) -> bool {
    if principal.has_role(Role::Admin) {
        return true;
    }
    principal.has_role(Role::User) && principal.covers_region(&company.region)
}
