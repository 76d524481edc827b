// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Company endpoints.
//!
//! Both endpoints sit behind the authorization middleware. What a caller
//! sees is decided by their role and regions; see [`crate::store`].

use axum::{
    extract::{Path, State},
    Json,
};

use crate::{
    auth::Auth,
    context::RequestContext,
    error::{ApiError, ClientError},
    models::{Company, CompanyTransactions},
    state::AppState,
};

/// List the companies the caller may see.
#[utoipa::path(
    get,
    path = "/investments/companies",
    tag = "Investments",
    responses(
        (status = 200, description = "Companies visible to the caller", body = [Company]),
        (status = 401, description = "Missing, invalid or expired access token"),
        (status = 403, description = "Access token lacks the required scope"),
        (status = 500, description = "Technical problem")
    )
)]
pub async fn list_companies(
    State(state): State<AppState>,
    Auth(principal): Auth,
) -> Json<Vec<Company>> {
    Json(state.companies.list_for(&principal))
}

/// Transactions of a single company.
#[utoipa::path(
    get,
    path = "/investments/companies/{company_id}/transactions",
    tag = "Investments",
    params(
        ("company_id" = String, Path, description = "Positive numeric company id")
    ),
    responses(
        (status = 200, description = "Company transactions", body = CompanyTransactions),
        (status = 400, description = "Company id is not a positive integer"),
        (status = 401, description = "Missing, invalid or expired access token"),
        (status = 404, description = "Company not found for this user"),
        (status = 500, description = "Technical problem")
    )
)]
pub async fn company_transactions(
    State(state): State<AppState>,
    Auth(principal): Auth,
    ctx: RequestContext,
    Path(company_id): Path<String>,
) -> Result<Json<CompanyTransactions>, ClientError> {
    let id = parse_company_id(&company_id).ok_or_else(|| {
        ApiError::invalid_input(
            "invalid_company_id",
            "The company ID must be a positive numeric integer",
        )
        .translate(&ctx)
    })?;

    state
        .companies
        .transactions_for(&principal, id)
        .map(Json)
        .map_err(|err| err.translate(&ctx))
}

fn parse_company_id(raw: &str) -> Option<u32> {
    raw.parse::<u32>().ok().filter(|id| *id > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn company_ids_must_be_positive_integers() {
        assert_eq!(parse_company_id("4"), Some(4));
        assert_eq!(parse_company_id("0"), None);
        assert_eq!(parse_company_id("-2"), None);
        assert_eq!(parse_company_id("abc"), None);
        assert_eq!(parse_company_id("2.5"), None);
    }
}
