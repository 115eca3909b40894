// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Per-route role requirements.
//!
//! Each protected route declares the roles it accepts when it is registered:
//!
//! ```rust,ignore
//! Router::new()
//!     .route("/scores", delete(clear_scores))
//!     .route_layer(axum::middleware::from_fn_with_state(
//!         RoleRequirement::any_of(["administrator"]),
//!         authorize,
//!     ));
//! ```
//!
//! The check runs after [`super::middleware::authenticate`] and only reads the
//! identity it attached.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::claims::TokenInfo;
use super::error::AuthError;

/// Roles accepted by a route. Any one of them is enough (case-insensitive).
/// An empty requirement admits every request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleRequirement {
    required_roles: Vec<String>,
}

impl RoleRequirement {
    pub fn any_of<I, S>(roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            required_roles: roles.into_iter().map(Into::into).collect(),
        }
    }

    pub fn required_roles(&self) -> &[String] {
        &self.required_roles
    }

    /// Check an identity against this requirement.
    pub fn check(&self, identity: Option<&TokenInfo>) -> Result<(), AuthError> {
        if self.required_roles.is_empty() {
            return Ok(());
        }

        let identity = identity.ok_or(AuthError::AuthenticationRequired)?;
        if self.required_roles.iter().any(|role| identity.has_role(role)) {
            Ok(())
        } else {
            Err(AuthError::InsufficientRole)
        }
    }
}

/// Role authorization middleware.
pub async fn authorize(
    State(requirement): State<RoleRequirement>,
    request: Request,
    next: Next,
) -> Response {
    match requirement.check(request.extensions().get::<TokenInfo>()) {
        Ok(()) => next.run(request).await,
        Err(e) => {
            tracing::debug!(
                reason = e.reason(),
                required = ?requirement.required_roles(),
                "request not authorized"
            );
            e.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::claims::ClaimSchema;
    use axum::{
        body::Body,
        http::{Request as HttpRequest, StatusCode},
        routing::get,
        Extension, Router,
    };
    use tower::ServiceExt;

    fn member(roles: &[&str]) -> TokenInfo {
        TokenInfo::new(ClaimSchema::Legacy)
            .with_handle("member")
            .with_roles(roles.iter().copied())
    }

    #[test]
    fn empty_requirement_admits_everyone() {
        let requirement = RoleRequirement::default();
        assert!(requirement.check(None).is_ok());
        assert!(requirement.check(Some(&member(&[]))).is_ok());
    }

    #[test]
    fn missing_identity_requires_authentication() {
        let requirement = RoleRequirement::any_of(["administrator"]);
        assert_eq!(requirement.check(None), Err(AuthError::AuthenticationRequired));
    }

    #[test]
    fn any_listed_role_is_enough() {
        let requirement = RoleRequirement::any_of(["Topcoder User", "administrator"]);
        assert!(requirement.check(Some(&member(&["administrator"]))).is_ok());
        assert!(requirement.check(Some(&member(&["Topcoder User"]))).is_ok());
        assert_eq!(
            requirement.check(Some(&member(&["copilot"]))),
            Err(AuthError::InsufficientRole)
        );
        assert_eq!(
            requirement.check(Some(&member(&[]))),
            Err(AuthError::InsufficientRole)
        );
    }

    #[test]
    fn role_match_is_case_insensitive() {
        let requirement = RoleRequirement::any_of(["ADMINISTRATOR"]);
        assert!(requirement.check(Some(&member(&["administrator"]))).is_ok());
    }

    fn guarded(identity: Option<TokenInfo>) -> Router {
        let router = Router::new()
            .route("/admin", get(|| async { "ok" }))
            .route_layer(axum::middleware::from_fn_with_state(
                RoleRequirement::any_of(["administrator"]),
                authorize,
            ));
        match identity {
            Some(info) => router.layer(Extension(info)),
            None => router,
        }
    }

    async fn status_of(router: Router) -> StatusCode {
        let request = HttpRequest::builder().uri("/admin").body(Body::empty()).unwrap();
        router.oneshot(request).await.unwrap().status()
    }

    #[tokio::test]
    async fn middleware_maps_outcomes_to_status_codes() {
        assert_eq!(status_of(guarded(None)).await, StatusCode::UNAUTHORIZED);
        assert_eq!(
            status_of(guarded(Some(member(&["Topcoder User"])))).await,
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            status_of(guarded(Some(member(&["Administrator"])))).await,
            StatusCode::OK
        );
    }

    #[tokio::test]
    async fn unmatched_routes_are_not_guarded() {
        let request = HttpRequest::builder().uri("/missing").body(Body::empty()).unwrap();
        let status = guarded(None).oneshot(request).await.unwrap().status();
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
