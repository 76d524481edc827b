// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! Response bodies of the investments API. All types derive `Serialize` and
//! `ToSchema` for JSON handling and OpenAPI documentation.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A company open to investment.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Company {
    pub id: u32,
    pub name: String,
    /// Business region used for authorization.
    pub region: String,
    pub target_usd: u64,
    pub investment_usd: u64,
    pub no_investors: u32,
}

/// A single investment into a company.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: String,
    pub investor_id: String,
    pub amount_usd: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct CompanyTransactions {
    pub id: u32,
    pub company: Company,
    pub transactions: Vec<Transaction>,
}

/// Product attributes of the caller, as shown by the user-info endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct ClientUserInfo {
    pub title: String,
    pub regions: Vec<String>,
}
