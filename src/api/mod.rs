// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    middleware::from_fn_with_state,
    routing::{delete, get, post},
    Router,
};
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    auth::{authenticate, authorize, RoleRequirement},
    models::{
        AuthStatus, AuthStatusFailure, ClearProgressResponse, Contestant, ContestantList,
        Leaderboard, LeaderboardEntry, MemberInfo, MemberProfile, Progress, ProgressStats,
        RankInfo, RegisterRequest, SaveProgressRequest, Score, SubmitScoreRequest,
        UnregisterResponse,
    },
    state::AppState,
};

pub mod auth;
pub mod contestants;
pub mod cors;
pub mod health;
pub mod progress;
pub mod scores;

/// Build the application router.
///
/// Layers, outermost first: CORS, request id, request tracing,
/// authentication. Role requirements are attached per route.
pub fn router(state: AppState) -> Router {
    let auth_config = &state.config.auth;
    let member_or_admin =
        RoleRequirement::any_of([auth_config.member_role.clone(), auth_config.admin_role.clone()]);
    let admin_only = RoleRequirement::any_of([auth_config.admin_role.clone()]);

    let submit = Router::new()
        .route("/scores/submit", post(scores::submit_score))
        .route_layer(from_fn_with_state(member_or_admin, authorize));

    let admin = Router::new()
        .route("/scores", delete(scores::clear_scores))
        .route_layer(from_fn_with_state(admin_only, authorize));

    let api_routes = Router::new()
        .route("/auth/status", get(auth::auth_status))
        .route("/auth/member/{handle}", get(auth::member_profile))
        .route("/health", get(health::health))
        .route(
            "/scores/leaderboard/{competition_id}",
            get(scores::leaderboard),
        )
        .route("/scores/my-scores", get(scores::my_scores))
        .route("/scores/by-handle/{handle}", get(scores::scores_by_handle))
        .route("/scores/my-rank/{competition_id}", get(scores::my_rank))
        .route("/progress/save", post(progress::save_progress))
        .route("/progress/load/{competition_id}", get(progress::load_progress))
        .route(
            "/progress/load/{competition_id}/{checkpoint_id}",
            get(progress::load_checkpoint),
        )
        .route("/progress/history", get(progress::progress_history))
        .route("/progress/clear/{competition_id}", delete(progress::clear_progress))
        .route("/progress/stats", get(progress::progress_stats))
        .route("/contestants/register", post(contestants::register))
        .route(
            "/contestants/registration/{competition_id}",
            get(contestants::registration),
        )
        .route("/contestants/my-registrations", get(contestants::my_registrations))
        .route(
            "/contestants/unregister/{competition_id}",
            delete(contestants::unregister),
        )
        .route(
            "/contestants/competition/{competition_id}",
            get(contestants::competition_contestants),
        )
        .merge(submit)
        .merge(admin)
        .with_state(state.clone());

    let origins = cors::OriginPolicy::new(
        &state.config.server.cors_allowed_origins,
        state.config.auth.development,
    );

    Router::new()
        .nest("/api", api_routes)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(from_fn_with_state(state.auth.clone(), authenticate))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(cors::cors_layer(origins))
}

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::auth_status,
        auth::member_profile,
        health::health,
        scores::submit_score,
        scores::leaderboard,
        scores::my_scores,
        scores::scores_by_handle,
        scores::my_rank,
        scores::clear_scores,
        progress::save_progress,
        progress::load_progress,
        progress::load_checkpoint,
        progress::progress_history,
        progress::clear_progress,
        progress::progress_stats,
        contestants::register,
        contestants::registration,
        contestants::my_registrations,
        contestants::unregister,
        contestants::competition_contestants
    ),
    components(
        schemas(
            AuthStatus,
            AuthStatusFailure,
            MemberInfo,
            MemberProfile,
            Score,
            SubmitScoreRequest,
            LeaderboardEntry,
            Leaderboard,
            RankInfo,
            Progress,
            SaveProgressRequest,
            ClearProgressResponse,
            ProgressStats,
            Contestant,
            RegisterRequest,
            ContestantList,
            UnregisterResponse,
            health::HealthResponse,
            health::HealthChecks
        )
    ),
    tags(
        (name = "Auth", description = "Authentication status and member profiles"),
        (name = "Health", description = "Service health"),
        (name = "Scores", description = "Score submission and leaderboards"),
        (name = "Progress", description = "Per-member progress checkpoints"),
        (name = "Contestants", description = "Competition registrations")
    )
)]
pub struct ApiDoc;
