// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Arena Server - Competition platform API
//!
//! Authenticates requests carrying either legacy HS256 tokens or current
//! RS256 tokens with namespaced claims, enforces per-route role requirements
//! and serves in-memory score, progress and registration registries.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Token validation, identity extraction and role checks
//! - `config` - Environment configuration
//! - `store` - In-memory registries

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod state;
pub mod store;
