// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::Json;

use crate::{auth::Auth, models::ClientUserInfo};

/// Product attributes of the caller.
///
/// Served from the extra claims already resolved for the token, so this
/// never triggers a lookup of its own.
#[utoipa::path(
    get,
    path = "/investments/userinfo",
    tag = "Investments",
    responses(
        (status = 200, description = "Caller's title and regions", body = ClientUserInfo),
        (status = 401, description = "Missing, invalid or expired access token")
    )
)]
pub async fn get_user_info(Auth(principal): Auth) -> Json<ClientUserInfo> {
    let extra = principal.extra();
    Json(ClientUserInfo {
        title: extra.title().to_string(),
        regions: extra.regions().to_vec(),
    })
}
