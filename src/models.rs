// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! Request and response bodies of the REST API. Field names are camelCase
//! on the wire. Response types derive `ToSchema` for the OpenAPI document.
//!
//! ## Model Categories
//!
//! - **Auth**: authentication status and member profiles
//! - **Scores**: submissions, leaderboards and ranks
//! - **Progress**: per-member checkpoints
//! - **Contestants**: competition registrations

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;

use crate::auth::TokenInfo;

// =============================================================================
// Auth Models
// =============================================================================

/// Public subset of the request identity. Email is never included.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MemberInfo {
    pub handle: Option<String>,
    pub user_id: Option<String>,
    pub roles: Vec<String>,
    /// Whether the token used the namespaced (v3) claim layout.
    pub is_v3_token: bool,
}

impl From<&TokenInfo> for MemberInfo {
    fn from(info: &TokenInfo) -> Self {
        Self {
            handle: info.handle().map(str::to_string),
            user_id: info.user_id().map(str::to_string),
            roles: info.roles().iter().cloned().collect(),
            is_v3_token: info.schema().is_v3(),
        }
    }
}

/// Successful `GET /api/auth/status` body.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuthStatus {
    pub authenticated: bool,
    pub member_info: MemberInfo,
}

/// Failed `GET /api/auth/status` body.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthStatusFailure {
    pub authenticated: bool,
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct MemberProfile {
    pub handle: String,
    pub status: String,
}

// =============================================================================
// Score Models
// =============================================================================

/// A submitted score.
#[derive(Debug, Clone, Serialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Score {
    pub id: String,
    pub competition_id: String,
    pub member_handle: Option<String>,
    /// Submitter's user id. Kept server-side only.
    #[serde(skip_serializing)]
    pub member_id: Option<String>,
    pub score: f64,
    #[schema(value_type = Object)]
    pub metadata: Map<String, Value>,
    pub submitted_at: DateTime<Utc>,
}

/// `POST /api/scores/submit` body.
///
/// `score` may be a number or a numeric string.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmitScoreRequest {
    pub competition_id: Option<String>,
    #[schema(value_type = f64)]
    pub score: Option<Value>,
    #[schema(value_type = Object)]
    pub metadata: Option<Map<String, Value>>,
}

/// One leaderboard row: a member's best score.
#[derive(Debug, Clone, Serialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    /// 1-based position on the full leaderboard.
    pub rank: usize,
    pub member_handle: String,
    pub score: f64,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Leaderboard {
    pub competition_id: String,
    pub entries: Vec<LeaderboardEntry>,
    pub limit: usize,
    pub offset: usize,
}

#[derive(Debug, Clone, Serialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RankInfo {
    pub rank: usize,
    pub score: f64,
    pub total_participants: usize,
    pub member_handle: String,
}

// =============================================================================
// Progress Models
// =============================================================================

/// A saved checkpoint.
#[derive(Debug, Clone, Serialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Progress {
    pub id: String,
    pub competition_id: String,
    pub checkpoint_id: String,
    pub member_handle: String,
    #[serde(skip_serializing)]
    pub member_id: Option<String>,
    #[schema(value_type = Object)]
    pub data: Map<String, Value>,
    pub saved_at: DateTime<Utc>,
}

/// `POST /api/progress/save` body.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SaveProgressRequest {
    pub competition_id: Option<String>,
    pub checkpoint_id: Option<String>,
    #[schema(value_type = Object)]
    pub data: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, Serialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ClearProgressResponse {
    /// Whether any checkpoint was removed.
    pub success: bool,
    pub competition_id: String,
}

#[derive(Debug, Clone, Serialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProgressStats {
    pub competitions_count: usize,
    pub checkpoints_count: usize,
    pub is_authenticated: bool,
}

// =============================================================================
// Contestant Models
// =============================================================================

/// A competition registration.
#[derive(Debug, Clone, Serialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Contestant {
    pub id: String,
    pub competition_id: String,
    pub member_handle: Option<String>,
    #[serde(skip_serializing)]
    pub member_id: Option<String>,
    pub display_name: String,
    /// Whether the registrant was identified by a validated token.
    pub authenticated: bool,
    pub registered_at: DateTime<Utc>,
}

/// `POST /api/contestants/register` body.
///
/// `memberHandle` and `memberId` are only read for unauthenticated
/// requests; an authenticated caller is always registered as itself.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub competition_id: Option<String>,
    pub member_handle: Option<String>,
    pub member_id: Option<String>,
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ContestantList {
    pub competition_id: String,
    pub contestants: Vec<Contestant>,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize, ToSchema, PartialEq, Eq)]
pub struct UnregisterResponse {
    pub success: bool,
}
