// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    auth::{CurrentUser, OptionalUser},
    error::{required, ApiError},
    models::{Contestant, ContestantList, RegisterRequest, UnregisterResponse},
    state::AppState,
    store::contestants::Registrant,
};

/// Register for a competition.
///
/// Authenticated callers are registered under their token identity and a
/// repeated call returns the existing registration. Without a token the
/// caller is registered as a guest using the handle from the body, if any.
#[utoipa::path(
    post,
    path = "/api/contestants/register",
    request_body = RegisterRequest,
    tag = "Contestants",
    responses(
        (status = 201, description = "Registration created", body = Contestant),
        (status = 200, description = "Already registered", body = Contestant),
        (status = 400, description = "Missing competitionId")
    )
)]
pub async fn register(
    State(state): State<AppState>,
    OptionalUser(user): OptionalUser,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<Contestant>), ApiError> {
    let competition_id = required(request.competition_id, "competitionId")?;

    let registrant = match &user {
        Some(info) => Registrant {
            member_handle: info.handle().map(str::to_string),
            member_id: info.user_id().map(str::to_string),
            display_name: request.display_name,
            authenticated: true,
        },
        None => Registrant {
            member_handle: request.member_handle,
            member_id: request.member_id,
            display_name: request.display_name,
            authenticated: false,
        },
    };

    let (contestant, created) = state
        .contestants
        .write()
        .await
        .register(competition_id, registrant);

    if created {
        tracing::info!(
            registration_id = %contestant.id,
            competition_id = %contestant.competition_id,
            authenticated = contestant.authenticated,
            "contestant registered"
        );
        Ok((StatusCode::CREATED, Json(contestant)))
    } else {
        Ok((StatusCode::OK, Json(contestant)))
    }
}

#[utoipa::path(
    get,
    path = "/api/contestants/registration/{competition_id}",
    params(("competition_id" = String, Path, description = "Competition identifier")),
    tag = "Contestants",
    responses(
        (status = 200, body = Contestant),
        (status = 401, description = "Authentication required"),
        (status = 404, description = "Not registered")
    )
)]
pub async fn registration(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(competition_id): Path<String>,
) -> Result<Json<Contestant>, ApiError> {
    let store = state.contestants.read().await;
    user.handle()
        .and_then(|handle| store.registration(&competition_id, handle))
        .map(Json)
        .ok_or(ApiError::NotFound("Not registered"))
}

#[utoipa::path(
    get,
    path = "/api/contestants/my-registrations",
    tag = "Contestants",
    responses(
        (status = 200, body = [Contestant]),
        (status = 401, description = "Authentication required")
    )
)]
pub async fn my_registrations(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Json<Vec<Contestant>> {
    let Some(handle) = user.handle() else {
        return Json(Vec::new());
    };
    Json(state.contestants.read().await.registrations_by_member(handle))
}

#[utoipa::path(
    delete,
    path = "/api/contestants/unregister/{competition_id}",
    params(("competition_id" = String, Path, description = "Competition identifier")),
    tag = "Contestants",
    responses(
        (status = 200, body = UnregisterResponse),
        (status = 401, description = "Authentication required"),
        (status = 404, description = "Registration not found")
    )
)]
pub async fn unregister(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(competition_id): Path<String>,
) -> Result<Json<UnregisterResponse>, ApiError> {
    let removed = match user.handle() {
        Some(handle) => state.contestants.write().await.unregister(&competition_id, handle),
        None => false,
    };
    if !removed {
        return Err(ApiError::NotFound("Registration not found"));
    }

    tracing::info!(competition_id = %competition_id, "contestant unregistered");
    Ok(Json(UnregisterResponse { success: true }))
}

#[utoipa::path(
    get,
    path = "/api/contestants/competition/{competition_id}",
    params(("competition_id" = String, Path, description = "Competition identifier")),
    tag = "Contestants",
    responses((status = 200, body = ContestantList))
)]
pub async fn competition_contestants(
    State(state): State<AppState>,
    Path(competition_id): Path<String>,
) -> Json<ContestantList> {
    let contestants = state.contestants.read().await.contestants(&competition_id);
    Json(ContestantList {
        total: contestants.len(),
        competition_id,
        contestants,
    })
}
