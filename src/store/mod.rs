// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-memory registries keyed by the authenticated member.
//!
//! Records live for the lifetime of the process. Each store is wrapped in a
//! `tokio::sync::RwLock` inside `AppState`.
//!
//! - `scores` - submitted scores, leaderboards and ranks
//! - `progress` - per-member checkpoints within a competition
//! - `contestants` - competition registrations

pub mod contestants;
pub mod progress;
pub mod scores;

pub use contestants::ContestantStore;
pub use progress::ProgressStore;
pub use scores::ScoreStore;
