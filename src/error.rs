// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Errors returned by the registry handlers.
//!
//! Authentication and role failures are [`crate::auth::AuthError`]; this
//! type covers request validation and missing records. Both render as
//! `{"error": message}`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    /// A required body field is absent or blank.
    #[error("{0} is required")]
    MissingField(&'static str),
    /// A field or path parameter has an unusable value.
    #[error("{0}")]
    Invalid(&'static str),
    /// The caller asked for a record that does not exist.
    #[error("{0}")]
    NotFound(&'static str),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::MissingField(_) | ApiError::Invalid(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }
}

/// A body field that must be present and non-blank.
pub fn required(value: Option<String>, field: &'static str) -> Result<String, ApiError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or(ApiError::MissingField(field))
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        tracing::debug!(status = status.as_u16(), error = %self, "request rejected");
        (status, Json(ErrorBody { error: self.to_string() })).into_response()
    }
}
