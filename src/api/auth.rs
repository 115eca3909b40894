// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};

use crate::{
    auth::{error::INVALID_TOKEN_MESSAGE, keys::truncate, OptionalUser},
    error::ApiError,
    models::{AuthStatus, AuthStatusFailure, MemberInfo, MemberProfile},
    state::AppState,
};

const NO_TOKEN_MESSAGE: &str = "No authentication token provided";
const MAX_HANDLE_LEN: usize = 50;

/// Whether `handle` is 1-50 ASCII letters, digits, `_` or `-`.
pub fn is_valid_handle(handle: &str) -> bool {
    (1..=MAX_HANDLE_LEN).contains(&handle.len())
        && handle
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}

#[utoipa::path(
    get,
    path = "/api/auth/status",
    tag = "Auth",
    responses(
        (status = 200, description = "Token is valid", body = AuthStatus),
        (status = 401, description = "No token, or the token was rejected", body = AuthStatusFailure)
    )
)]
pub async fn auth_status(
    State(state): State<AppState>,
    OptionalUser(user): OptionalUser,
    headers: HeaderMap,
) -> Response {
    if let Some(info) = user {
        let body = AuthStatus {
            authenticated: true,
            member_info: MemberInfo::from(&info),
        };
        return Json(body).into_response();
    }

    // This path tolerates invalid tokens, so tell "absent" from "rejected".
    let error = if state.auth.locate_token(&headers).is_some() {
        INVALID_TOKEN_MESSAGE
    } else {
        NO_TOKEN_MESSAGE
    };
    let body = AuthStatusFailure {
        authenticated: false,
        error: error.to_string(),
    };
    (StatusCode::UNAUTHORIZED, Json(body)).into_response()
}

#[utoipa::path(
    get,
    path = "/api/auth/member/{handle}",
    params(
        ("handle" = String, Path, description = "Member handle, 1-50 of [A-Za-z0-9_-]")
    ),
    tag = "Auth",
    responses(
        (status = 200, body = MemberProfile),
        (status = 400, description = "Invalid handle format")
    )
)]
pub async fn member_profile(Path(handle): Path<String>) -> Result<Json<MemberProfile>, ApiError> {
    if !is_valid_handle(&handle) {
        tracing::warn!(handle = %truncate(&handle), "invalid handle format");
        return Err(ApiError::Invalid("Invalid handle format"));
    }

    Ok(Json(MemberProfile {
        handle,
        status: "active".to_string(),
    }))
}
