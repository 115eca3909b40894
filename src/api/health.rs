// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::state::AppState;

/// Health check response with individual component status.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Overall health status ("ok" or "degraded").
    pub status: String,
    pub checks: HealthChecks,
}

/// Individual health check results.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthChecks {
    /// Whether the service process is running.
    pub service: String,
    /// Key set endpoint status ("ok" or "unavailable").
    pub jwks: String,
}

/// Keys are healthy when fresh ones are cached or a fetch succeeds within
/// the lookup timeout. Concurrent checks share the running fetch.
async fn check_jwks(state: &AppState) -> bool {
    let keys = state.keys();
    if keys.has_fresh_keys().await {
        return true;
    }
    match keys.warm().await {
        Ok(count) => count > 0,
        Err(e) => {
            tracing::warn!(reason = e.reason(), "key set unavailable for health check");
            false
        }
    }
}

/// Health check endpoint handler.
///
/// Returns 200 if all checks pass, 503 if the key set is unreachable.
#[utoipa::path(
    get,
    path = "/api/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
        (status = 503, description = "Key set endpoint is unreachable", body = HealthResponse)
    )
)]
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let jwks_ok = check_jwks(&state).await;

    let response = HealthResponse {
        status: if jwks_ok { "ok" } else { "degraded" }.to_string(),
        checks: HealthChecks {
            service: "ok".to_string(),
            jwks: if jwks_ok { "ok" } else { "unavailable" }.to_string(),
        },
    };

    let status = if jwks_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{router, test_support::{send, state_with, state_with_jwks}};
    use crate::auth::test_support as tokens;
    use crate::config::{JWKS_LOOKUP_TIMEOUT_ENV, JWKS_URL_ENV};
    use axum::http::Method;
    use std::time::{Duration, Instant};
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn healthy_when_key_set_is_reachable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(tokens::key_set("key-1")))
            .expect(1)
            .mount(&server)
            .await;
        let state = state_with_jwks(&format!("{}/jwks.json", server.uri()));

        let (status, body) = send(router(state.clone()), Method::GET, "/api/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["checks"]["service"], "ok");
        assert_eq!(body["checks"]["jwks"], "ok");

        // Served from cache the second time.
        let (status, _) = send(router(state), Method::GET, "/api/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn degraded_when_key_set_is_unreachable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        let state = state_with_jwks(&format!("{}/jwks.json", server.uri()));

        let (status, body) = send(router(state), Method::GET, "/api/health", None, None).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["status"], "degraded");
        assert_eq!(body["checks"]["jwks"], "unavailable");
    }

    #[tokio::test]
    async fn slow_key_set_does_not_hold_health_checks() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(tokens::key_set("key-1"))
                    .set_delay(Duration::from_millis(800)),
            )
            .expect(1)
            .mount(&server)
            .await;
        let url = format!("{}/jwks.json", server.uri());
        let state = state_with(&[(JWKS_URL_ENV, url.as_str()), (JWKS_LOOKUP_TIMEOUT_ENV, "100")]);

        for _ in 0..3 {
            let started = Instant::now();
            let (status, body) = send(router(state.clone()), Method::GET, "/api/health", None, None).await;
            assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
            assert_eq!(body["checks"]["jwks"], "unavailable");
            assert!(started.elapsed() < Duration::from_millis(500));
        }
        assert_eq!(state.keys().upstream_fetches(), 1);
    }
}
