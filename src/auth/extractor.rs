// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractors for the identity attached by the authentication middleware.
//!
//! ```rust,ignore
//! async fn my_scores(CurrentUser(user): CurrentUser) -> impl IntoResponse {
//!     // user is the request's TokenInfo
//! }
//! ```

use std::convert::Infallible;

use axum::{extract::FromRequestParts, http::request::Parts};

use super::{AuthError, TokenInfo};

/// Identity of an authenticated request. Rejects with 401 when absent.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub TokenInfo);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<TokenInfo>()
            .cloned()
            .map(CurrentUser)
            .ok_or(AuthError::AuthenticationRequired)
    }
}

/// Identity of the request, if any. Never rejects.
#[derive(Debug, Clone)]
pub struct OptionalUser(pub Option<TokenInfo>);

impl<S> FromRequestParts<S> for OptionalUser
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(OptionalUser(parts.extensions.get::<TokenInfo>().cloned()))
    }
}
