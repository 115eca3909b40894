// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Progress checkpoint endpoints. Every route acts on the caller's own
//! checkpoints, identified by the handle in their token.

use axum::{
    extract::{Path, State},
    Json,
};

use crate::{
    auth::{CurrentUser, TokenInfo},
    error::{required, ApiError},
    models::{ClearProgressResponse, Progress, ProgressStats, SaveProgressRequest},
    state::AppState,
};

fn member_handle(user: &TokenInfo) -> Result<&str, ApiError> {
    user.handle()
        .ok_or(ApiError::Invalid("Token does not identify a member"))
}

#[utoipa::path(
    post,
    path = "/api/progress/save",
    request_body = SaveProgressRequest,
    tag = "Progress",
    responses(
        (status = 200, body = Progress),
        (status = 400, description = "Missing competitionId or checkpointId"),
        (status = 401, description = "Authentication required")
    )
)]
pub async fn save_progress(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(request): Json<SaveProgressRequest>,
) -> Result<Json<Progress>, ApiError> {
    let handle = member_handle(&user)?;
    let competition_id = required(request.competition_id, "competitionId")?;
    let checkpoint_id = required(request.checkpoint_id, "checkpointId")?;

    let progress = state.progress.write().await.save(
        competition_id,
        checkpoint_id,
        handle.to_string(),
        user.user_id().map(str::to_string),
        request.data,
    );

    tracing::info!(
        handle = %progress.member_handle,
        competition_id = %progress.competition_id,
        checkpoint_id = %progress.checkpoint_id,
        "progress saved"
    );

    Ok(Json(progress))
}

#[utoipa::path(
    get,
    path = "/api/progress/load/{competition_id}",
    params(("competition_id" = String, Path, description = "Competition identifier")),
    tag = "Progress",
    responses(
        (status = 200, body = [Progress]),
        (status = 401, description = "Authentication required")
    )
)]
pub async fn load_progress(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(competition_id): Path<String>,
) -> Result<Json<Vec<Progress>>, ApiError> {
    let handle = member_handle(&user)?;
    let store = state.progress.read().await;
    Ok(Json(store.load_competition(&competition_id, handle)))
}

#[utoipa::path(
    get,
    path = "/api/progress/load/{competition_id}/{checkpoint_id}",
    params(
        ("competition_id" = String, Path, description = "Competition identifier"),
        ("checkpoint_id" = String, Path, description = "Checkpoint identifier")
    ),
    tag = "Progress",
    responses(
        (status = 200, body = Progress),
        (status = 401, description = "Authentication required"),
        (status = 404, description = "Progress not found")
    )
)]
pub async fn load_checkpoint(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((competition_id, checkpoint_id)): Path<(String, String)>,
) -> Result<Json<Progress>, ApiError> {
    let handle = member_handle(&user)?;
    let store = state.progress.read().await;
    store
        .load(&competition_id, &checkpoint_id, handle)
        .map(Json)
        .ok_or(ApiError::NotFound("Progress not found"))
}

#[utoipa::path(
    get,
    path = "/api/progress/history",
    tag = "Progress",
    responses(
        (status = 200, body = [Progress]),
        (status = 401, description = "Authentication required")
    )
)]
pub async fn progress_history(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<Progress>>, ApiError> {
    let handle = member_handle(&user)?;
    Ok(Json(state.progress.read().await.history(handle)))
}

#[utoipa::path(
    delete,
    path = "/api/progress/clear/{competition_id}",
    params(("competition_id" = String, Path, description = "Competition identifier")),
    tag = "Progress",
    responses(
        (status = 200, body = ClearProgressResponse),
        (status = 401, description = "Authentication required")
    )
)]
pub async fn clear_progress(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(competition_id): Path<String>,
) -> Result<Json<ClearProgressResponse>, ApiError> {
    let handle = member_handle(&user)?;
    let removed = state.progress.write().await.clear(&competition_id, handle);
    tracing::info!(removed, handle, competition_id = %competition_id, "progress cleared");

    Ok(Json(ClearProgressResponse {
        success: removed > 0,
        competition_id,
    }))
}

#[utoipa::path(
    get,
    path = "/api/progress/stats",
    tag = "Progress",
    responses(
        (status = 200, body = ProgressStats),
        (status = 401, description = "Authentication required")
    )
)]
pub async fn progress_stats(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<ProgressStats>, ApiError> {
    let handle = member_handle(&user)?;
    Ok(Json(state.progress.read().await.stats(handle)))
}
