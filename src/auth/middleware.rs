// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Request authentication middleware.
//!
//! Locates a token, validates it and attaches the resulting [`TokenInfo`]
//! to the request extensions. Authentication is optional at this stage:
//! requests without a token continue unauthenticated and role checks
//! further down reject them where an identity is required.
//!
//! A token that fails validation ends the request with 401, except on the
//! public paths, where the request continues unauthenticated.
//!
//! ```rust,ignore
//! let app = Router::new()
//!     .nest("/api", api)
//!     .layer(axum::middleware::from_fn_with_state(authenticator, authenticate));
//! ```

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{
        header::{AUTHORIZATION, COOKIE},
        HeaderMap,
    },
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::keys::truncate;
use super::token::BEARER_PREFIX;
use super::validator::TokenValidator;
use crate::config::AuthConfig;

/// Paths where a token is optional and an invalid one is ignored.
pub const PUBLIC_PATHS: &[&str] = &[
    "/api/auth/status",
    "/api/auth/member",
    "/api/health",
    "/api/public",
];

/// Where a token was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenSource {
    Header,
    V3Cookie,
    LegacyCookie,
}

impl TokenSource {
    fn as_str(self) -> &'static str {
        match self {
            TokenSource::Header => "header",
            TokenSource::V3Cookie => "v3_cookie",
            TokenSource::LegacyCookie => "legacy_cookie",
        }
    }
}

/// A raw token and its origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatedToken {
    pub token: String,
    pub source: TokenSource,
}

/// Request authenticator shared by the middleware and the handlers that
/// need to know whether a token was presented.
#[derive(Clone)]
pub struct Authenticator {
    validator: TokenValidator,
    cookie_name: String,
    v3_cookie_name: String,
    public_paths: Vec<String>,
}

impl Authenticator {
    pub fn new(config: &AuthConfig, validator: TokenValidator) -> Self {
        Self {
            validator,
            cookie_name: config.cookie_name.clone(),
            v3_cookie_name: config.v3_cookie_name.clone(),
            public_paths: PUBLIC_PATHS.iter().map(|p| p.to_string()).collect(),
        }
    }

    pub fn validator(&self) -> &TokenValidator {
        &self.validator
    }

    /// Find a token: `Authorization: Bearer` first, then the v3 cookie,
    /// then the legacy cookie.
    pub fn locate_token(&self, headers: &HeaderMap) -> Option<LocatedToken> {
        let bearer = headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix(BEARER_PREFIX))
            .map(str::trim)
            .filter(|t| !t.is_empty());
        if let Some(token) = bearer {
            return Some(LocatedToken {
                token: token.to_string(),
                source: TokenSource::Header,
            });
        }

        if let Some(token) = cookie_value(headers, &self.v3_cookie_name) {
            return Some(LocatedToken {
                token,
                source: TokenSource::V3Cookie,
            });
        }

        cookie_value(headers, &self.cookie_name).map(|token| LocatedToken {
            token,
            source: TokenSource::LegacyCookie,
        })
    }

    /// Whether `path` is optionally authenticated. Paths are compared with
    /// an `/api` prefix, so nested routers see the same list.
    pub fn is_public_path(&self, path: &str) -> bool {
        let normalized = normalize_path(path);
        self.public_paths.iter().any(|public| {
            normalized == *public
                || normalized
                    .strip_prefix(public.as_str())
                    .is_some_and(|rest| rest.starts_with('/'))
        })
    }
}

/// Authentication middleware.
pub async fn authenticate(
    State(auth): State<Arc<Authenticator>>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(located) = auth.locate_token(request.headers()) else {
        return next.run(request).await;
    };

    match auth.validator.validate(&located.token).await {
        Ok(info) => {
            let handle = info.handle().map(truncate).unwrap_or_default();
            tracing::debug!(
                handle = %handle,
                source = located.source.as_str(),
                v3 = info.schema().is_v3(),
                "request authenticated"
            );
            request.extensions_mut().insert(info);
        }
        Err(e) => {
            let path = request.uri().path();
            tracing::debug!(
                reason = e.reason(),
                source = located.source.as_str(),
                path = %truncate(path),
                "token rejected"
            );
            if !auth.is_public_path(path) {
                return e.into_response();
            }
        }
    }

    next.run(request).await
}

fn normalize_path(path: &str) -> String {
    let under_api = path == "/api" || path.starts_with("/api/");
    if under_api {
        path.to_string()
    } else if path.starts_with('/') {
        format!("/api{path}")
    } else {
        format!("/api/{path}")
    }
}

/// Value of the first cookie named `name` across all `Cookie` headers.
fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim().trim_matches('"').to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::claims::TokenInfo;
    use crate::auth::keys::KeyCache;
    use crate::auth::test_support::{self, now};
    use crate::config::KeyCacheConfig;
    use axum::{
        body::{to_bytes, Body},
        http::{Request as HttpRequest, StatusCode},
        routing::get,
        Router,
    };
    use serde_json::json;
    use tower::ServiceExt;
    use url::Url;

    fn authenticator() -> Arc<Authenticator> {
        let config = AuthConfig {
            development: true,
            ..AuthConfig::default()
        };
        let url = Url::parse("http://127.0.0.1:9/jwks.json").unwrap();
        let keys = KeyCache::new(&KeyCacheConfig::new(url)).unwrap();
        Arc::new(Authenticator::new(&config, TokenValidator::new(&config, keys)))
    }

    fn dev_token(handle: &str, exp: i64) -> String {
        test_support::unsigned(
            &json!({"alg": "HS256"}),
            &test_support::legacy_claims(handle, "1", exp),
        )
    }

    async fn whoami(request: HttpRequest<Body>) -> String {
        request
            .extensions()
            .get::<TokenInfo>()
            .and_then(|info| info.handle().map(str::to_string))
            .unwrap_or_else(|| "anonymous".to_string())
    }

    fn app() -> Router {
        Router::new()
            .route("/api/private", get(whoami))
            .route("/api/auth/status", get(whoami))
            .route("/api/healthz", get(whoami))
            .layer(axum::middleware::from_fn_with_state(authenticator(), authenticate))
    }

    async fn call(uri: &str, header: Option<(&str, String)>) -> (StatusCode, String) {
        let mut builder = HttpRequest::builder().uri(uri);
        if let Some((name, value)) = header {
            builder = builder.header(name, value);
        }
        let response = app().oneshot(builder.body(Body::empty()).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    fn headers(pairs: &[(&str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.append(
                axum::http::HeaderName::from_bytes(name.as_bytes()).unwrap(),
                value.parse().unwrap(),
            );
        }
        map
    }

    #[test]
    fn header_wins_over_cookies() {
        let auth = authenticator();
        let located = auth
            .locate_token(&headers(&[
                ("authorization", "Bearer from-header"),
                ("cookie", "v3jwt=from-v3; tcjwt=from-legacy"),
            ]))
            .unwrap();
        assert_eq!(located.token, "from-header");
        assert_eq!(located.source, TokenSource::Header);
    }

    #[test]
    fn v3_cookie_wins_over_legacy_cookie() {
        let auth = authenticator();
        let located = auth
            .locate_token(&headers(&[("cookie", "tcjwt=from-legacy; v3jwt=from-v3")]))
            .unwrap();
        assert_eq!(located.token, "from-v3");
        assert_eq!(located.source, TokenSource::V3Cookie);

        let located = auth
            .locate_token(&headers(&[("cookie", "other=1"), ("cookie", "tcjwt=legacy")]))
            .unwrap();
        assert_eq!(located.source, TokenSource::LegacyCookie);
    }

    #[test]
    fn non_bearer_and_empty_values_are_ignored() {
        let auth = authenticator();
        assert!(auth.locate_token(&headers(&[("authorization", "Basic abc")])).is_none());
        assert!(auth.locate_token(&headers(&[("authorization", "Bearer   ")])).is_none());
        assert!(auth.locate_token(&headers(&[("cookie", "v3jwt=")])).is_none());
        assert!(auth.locate_token(&HeaderMap::new()).is_none());
    }

    #[test]
    fn public_paths_match_exactly_or_by_segment() {
        let auth = authenticator();
        assert!(auth.is_public_path("/api/auth/status"));
        assert!(auth.is_public_path("/api/auth/member/alice"));
        assert!(auth.is_public_path("/api/health"));
        assert!(auth.is_public_path("/api/public/rules"));
        // Paths seen inside a router nested under /api.
        assert!(auth.is_public_path("/health"));
        assert!(auth.is_public_path("/auth/member/bob"));

        assert!(!auth.is_public_path("/api/healthz"));
        assert!(!auth.is_public_path("/api/scores/submit"));
        assert!(!auth.is_public_path("/api/auth/statusx"));
    }

    #[tokio::test]
    async fn valid_token_attaches_identity() {
        let token = dev_token("alice", now() + 3600);
        let (status, body) = call("/api/private", Some(("authorization", format!("Bearer {token}")))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "alice");
    }

    #[tokio::test]
    async fn cookie_token_attaches_identity() {
        let token = dev_token("cookie-user", now() + 3600);
        let (status, body) = call("/api/private", Some(("cookie", format!("v3jwt={token}")))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "cookie-user");
    }

    #[tokio::test]
    async fn missing_token_continues_unauthenticated() {
        let (status, body) = call("/api/private", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "anonymous");
    }

    #[tokio::test]
    async fn invalid_token_is_rejected_on_protected_paths() {
        let expired = dev_token("late", now() - 3600);
        let (status, body) = call("/api/private", Some(("authorization", format!("Bearer {expired}")))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let body: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(body["error_code"], "invalid_token");

        let (status, _) = call("/api/healthz", Some(("authorization", "Bearer garbage".to_string()))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn invalid_token_is_ignored_on_public_paths() {
        let (status, body) =
            call("/api/auth/status", Some(("authorization", "Bearer not.a.token".to_string()))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "anonymous");
    }
}
