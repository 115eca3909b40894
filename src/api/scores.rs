// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::Value;
use utoipa::IntoParams;

use crate::{
    auth::CurrentUser,
    error::{required, ApiError},
    models::{Leaderboard, RankInfo, Score, SubmitScoreRequest},
    state::AppState,
};

const DEFAULT_LIMIT: usize = 50;

#[derive(Debug, Deserialize, IntoParams)]
pub struct LeaderboardQuery {
    /// Page size (default 50).
    pub limit: Option<usize>,
    /// Rows to skip (default 0).
    pub offset: Option<usize>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(rename_all = "camelCase")]
pub struct CompetitionFilter {
    pub competition_id: Option<String>,
}

fn parse_score(value: Option<&Value>) -> Result<f64, ApiError> {
    let parsed = match value {
        None | Some(Value::Null) => return Err(ApiError::MissingField("score")),
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        Some(_) => None,
    };
    parsed
        .filter(|s| s.is_finite())
        .ok_or(ApiError::Invalid("Invalid score value"))
}

#[utoipa::path(
    post,
    path = "/api/scores/submit",
    request_body = SubmitScoreRequest,
    tag = "Scores",
    responses(
        (status = 201, body = Score),
        (status = 400, description = "Missing competitionId or invalid score"),
        (status = 401, description = "Authentication required"),
        (status = 403, description = "Requires the member or administrator role")
    )
)]
pub async fn submit_score(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(request): Json<SubmitScoreRequest>,
) -> Result<(StatusCode, Json<Score>), ApiError> {
    let competition_id = required(request.competition_id, "competitionId")?;
    let score = parse_score(request.score.as_ref())?;

    let mut store = state.scores.write().await;
    let entry = store.submit(
        competition_id,
        user.handle().map(str::to_string),
        user.user_id().map(str::to_string),
        score,
        request.metadata,
    );

    tracing::info!(
        score_id = %entry.id,
        competition_id = %entry.competition_id,
        handle = entry.member_handle.as_deref().unwrap_or("-"),
        score = entry.score,
        "score submitted"
    );

    Ok((StatusCode::CREATED, Json(entry)))
}

#[utoipa::path(
    get,
    path = "/api/scores/leaderboard/{competition_id}",
    params(
        ("competition_id" = String, Path, description = "Competition identifier"),
        LeaderboardQuery
    ),
    tag = "Scores",
    responses((status = 200, body = Leaderboard))
)]
pub async fn leaderboard(
    State(state): State<AppState>,
    Path(competition_id): Path<String>,
    Query(query): Query<LeaderboardQuery>,
) -> Json<Leaderboard> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT);
    let offset = query.offset.unwrap_or(0);

    let store = state.scores.read().await;
    let entries = store.leaderboard(&competition_id, limit, offset);

    Json(Leaderboard {
        competition_id,
        entries,
        limit,
        offset,
    })
}

#[utoipa::path(
    get,
    path = "/api/scores/my-scores",
    params(CompetitionFilter),
    tag = "Scores",
    responses(
        (status = 200, body = [Score]),
        (status = 401, description = "Authentication required")
    )
)]
pub async fn my_scores(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(filter): Query<CompetitionFilter>,
) -> Json<Vec<Score>> {
    let Some(handle) = user.handle() else {
        return Json(Vec::new());
    };
    let store = state.scores.read().await;
    Json(store.scores_by_member(handle, filter.competition_id.as_deref()))
}

#[utoipa::path(
    get,
    path = "/api/scores/by-handle/{handle}",
    params(
        ("handle" = String, Path, description = "Member handle"),
        CompetitionFilter
    ),
    tag = "Scores",
    responses(
        (status = 200, body = [Score]),
        (status = 404, description = "No scores found")
    )
)]
pub async fn scores_by_handle(
    State(state): State<AppState>,
    Path(handle): Path<String>,
    Query(filter): Query<CompetitionFilter>,
) -> Result<Json<Vec<Score>>, ApiError> {
    let store = state.scores.read().await;
    let scores = store.scores_by_member(&handle, filter.competition_id.as_deref());
    if scores.is_empty() {
        return Err(ApiError::NotFound("No scores found"));
    }
    Ok(Json(scores))
}

#[utoipa::path(
    get,
    path = "/api/scores/my-rank/{competition_id}",
    params(
        ("competition_id" = String, Path, description = "Competition identifier")
    ),
    tag = "Scores",
    responses(
        (status = 200, body = RankInfo),
        (status = 401, description = "Authentication required"),
        (status = 404, description = "Not ranked")
    )
)]
pub async fn my_rank(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(competition_id): Path<String>,
) -> Result<Json<RankInfo>, ApiError> {
    let store = state.scores.read().await;
    user.handle()
        .and_then(|handle| store.member_rank(&competition_id, handle))
        .map(Json)
        .ok_or(ApiError::NotFound("Not ranked"))
}

#[utoipa::path(
    delete,
    path = "/api/scores",
    tag = "Scores",
    responses(
        (status = 204, description = "All scores removed"),
        (status = 401, description = "Authentication required"),
        (status = 403, description = "Requires the administrator role")
    )
)]
pub async fn clear_scores(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> StatusCode {
    let removed = state.scores.write().await.clear();
    tracing::warn!(
        removed,
        handle = user.handle().unwrap_or("-"),
        "score registry cleared"
    );
    StatusCode::NO_CONTENT
}
