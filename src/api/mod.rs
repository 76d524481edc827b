// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{http::HeaderName, middleware, routing::get, Router};
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    auth::middleware::require_principal,
    context::REQUEST_ID_HEADER,
    models::{ClientUserInfo, Company, CompanyTransactions, Transaction},
    state::AppState,
};

pub mod companies;
pub mod health;
pub mod userinfo;

pub fn router(state: AppState) -> Router {
    let investments = Router::new()
        .route("/companies", get(companies::list_companies))
        .route(
            "/companies/{company_id}/transactions",
            get(companies::company_transactions),
        )
        .route("/userinfo", get(userinfo::get_user_info))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_principal,
        ))
        .with_state(state.clone());

    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);

    Router::new()
        .route("/health", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .with_state(state)
        .nest("/investments", investments)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(request_id.clone(), MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::new(request_id)),
        )
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::liveness,
        health::readiness,
        companies::list_companies,
        companies::company_transactions,
        userinfo::get_user_info
    ),
    components(
        schemas(
            Company,
            Transaction,
            CompanyTransactions,
            ClientUserInfo,
            health::HealthResponse,
            health::ReadyResponse,
            health::HealthChecks
        )
    ),
    tags(
        (name = "Investments", description = "Company data filtered by the caller's claims"),
        (name = "Health", description = "Liveness and readiness probes")
    )
)]
struct ApiDoc;
