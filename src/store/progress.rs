// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Progress checkpoints.
//!
//! A member has at most one checkpoint per `(competition, checkpoint id)`.
//! Saving again replaces the data but keeps the record id.

use std::collections::{HashMap, HashSet};

use chrono::Utc;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::models::{Progress, ProgressStats};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CheckpointKey {
    member_handle: String,
    competition_id: String,
    checkpoint_id: String,
}

impl CheckpointKey {
    fn new(member_handle: &str, competition_id: &str, checkpoint_id: &str) -> Self {
        Self {
            member_handle: member_handle.to_string(),
            competition_id: competition_id.to_string(),
            checkpoint_id: checkpoint_id.to_string(),
        }
    }
}

#[derive(Default)]
pub struct ProgressStore {
    checkpoints: HashMap<CheckpointKey, Progress>,
}

impl ProgressStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.checkpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checkpoints.is_empty()
    }

    /// Insert or replace a checkpoint.
    pub fn save(
        &mut self,
        competition_id: String,
        checkpoint_id: String,
        member_handle: String,
        member_id: Option<String>,
        data: Option<Map<String, Value>>,
    ) -> Progress {
        let key = CheckpointKey::new(&member_handle, &competition_id, &checkpoint_id);
        let id = self
            .checkpoints
            .get(&key)
            .map(|existing| existing.id.clone())
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let progress = Progress {
            id,
            competition_id,
            checkpoint_id,
            member_handle,
            member_id,
            data: data.unwrap_or_default(),
            saved_at: Utc::now(),
        };
        self.checkpoints.insert(key, progress.clone());
        progress
    }

    pub fn load(&self, competition_id: &str, checkpoint_id: &str, member_handle: &str) -> Option<Progress> {
        self.checkpoints
            .get(&CheckpointKey::new(member_handle, competition_id, checkpoint_id))
            .cloned()
    }

    /// All of a member's checkpoints in one competition, newest first.
    pub fn load_competition(&self, competition_id: &str, member_handle: &str) -> Vec<Progress> {
        newest_first(
            self.checkpoints
                .values()
                .filter(|p| p.member_handle == member_handle && p.competition_id == competition_id),
        )
    }

    /// Every checkpoint of a member, newest first.
    pub fn history(&self, member_handle: &str) -> Vec<Progress> {
        newest_first(
            self.checkpoints
                .values()
                .filter(|p| p.member_handle == member_handle),
        )
    }

    /// Remove a member's checkpoints in one competition, returning how many
    /// were removed.
    pub fn clear(&mut self, competition_id: &str, member_handle: &str) -> usize {
        let before = self.checkpoints.len();
        self.checkpoints
            .retain(|key, _| !(key.member_handle == member_handle && key.competition_id == competition_id));
        before - self.checkpoints.len()
    }

    pub fn stats(&self, member_handle: &str) -> ProgressStats {
        let mut competitions = HashSet::new();
        let mut checkpoints = 0;
        for progress in self.checkpoints.values().filter(|p| p.member_handle == member_handle) {
            competitions.insert(progress.competition_id.as_str());
            checkpoints += 1;
        }

        ProgressStats {
            competitions_count: competitions.len(),
            checkpoints_count: checkpoints,
            is_authenticated: true,
        }
    }
}

fn newest_first<'a>(records: impl Iterator<Item = &'a Progress>) -> Vec<Progress> {
    let mut records: Vec<Progress> = records.cloned().collect();
    records.sort_by(|a, b| b.saved_at.cmp(&a.saved_at));
    records
}
