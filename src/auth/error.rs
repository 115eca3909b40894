// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication errors.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Message returned for every cryptographic or structural token failure.
pub const INVALID_TOKEN_MESSAGE: &str = "Invalid or expired token";

/// Authentication and authorization failures.
///
/// The first five variants describe why a token was rejected. They are kept
/// distinct for debug logging only. Callers always see a single
/// `invalid_token` response that does not name the failing step.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// Token is not three base64url segments of JSON.
    #[error("token is malformed")]
    Malformed,
    /// Declared algorithm is neither RS256 nor HS256.
    #[error("unsupported token algorithm: {0}")]
    UnsupportedAlgorithm(String),
    /// Signature did not verify, or no way to verify it is configured.
    #[error("token signature is invalid")]
    SignatureInvalid,
    /// Verification key could not be obtained (fetch failure, rate limit,
    /// unknown key id, unusable key material).
    #[error("verification key unavailable: {0}")]
    KeyUnavailable(String),
    /// `exp` is in the past or `nbf` in the future, beyond the leeway.
    #[error("token has expired")]
    Expired,
    /// Endpoint requires an identity and none is attached.
    #[error("Authentication required")]
    AuthenticationRequired,
    /// Identity holds none of the roles the endpoint requires.
    #[error("Insufficient permissions")]
    InsufficientRole,
}

#[derive(Serialize)]
struct AuthErrorBody {
    error: String,
    error_code: String,
}

impl AuthError {
    /// True for the failures that collapse into a single "invalid token"
    /// outcome at the request boundary.
    pub fn is_token_failure(&self) -> bool {
        !matches!(
            self,
            AuthError::AuthenticationRequired | AuthError::InsufficientRole
        )
    }

    /// Get the internal reason code, suitable for debug logs.
    pub fn reason(&self) -> &'static str {
        match self {
            AuthError::Malformed => "malformed",
            AuthError::UnsupportedAlgorithm(_) => "unsupported_algorithm",
            AuthError::SignatureInvalid => "signature_invalid",
            AuthError::KeyUnavailable(_) => "key_unavailable",
            AuthError::Expired => "expired",
            AuthError::AuthenticationRequired => "authentication_required",
            AuthError::InsufficientRole => "insufficient_permissions",
        }
    }

    /// Get the error code exposed to clients.
    pub fn error_code(&self) -> &'static str {
        if self.is_token_failure() {
            "invalid_token"
        } else {
            self.reason()
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::InsufficientRole => StatusCode::FORBIDDEN,
            _ => StatusCode::UNAUTHORIZED,
        }
    }

    /// Get the message exposed to clients.
    pub fn public_message(&self) -> String {
        if self.is_token_failure() {
            INVALID_TOKEN_MESSAGE.to_string()
        } else {
            self.to_string()
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(AuthErrorBody {
            error: self.public_message(),
            error_code: self.error_code().to_string(),
        });
        (status, body).into_response()
    }
}
