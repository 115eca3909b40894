// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Score registry.

use std::cmp::Ordering;
use std::collections::HashMap;

use chrono::Utc;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::models::{LeaderboardEntry, RankInfo, Score};

/// Handle shown for scores submitted without one.
const ANONYMOUS_HANDLE: &str = "Anonymous";

#[derive(Default)]
pub struct ScoreStore {
    scores: HashMap<String, Score>,
}

impl ScoreStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    pub fn submit(
        &mut self,
        competition_id: String,
        member_handle: Option<String>,
        member_id: Option<String>,
        score: f64,
        metadata: Option<Map<String, Value>>,
    ) -> Score {
        let id = Uuid::new_v4().to_string();
        let entry = Score {
            id: id.clone(),
            competition_id,
            member_handle,
            member_id,
            score,
            metadata: metadata.unwrap_or_default(),
            submitted_at: Utc::now(),
        };
        self.scores.insert(id, entry.clone());
        entry
    }

    /// Best score per member in a competition, highest first.
    ///
    /// Ranks are positions on the full leaderboard, so a page starting at
    /// `offset` 10 begins with rank 11.
    pub fn leaderboard(&self, competition_id: &str, limit: usize, offset: usize) -> Vec<LeaderboardEntry> {
        self.ranked(competition_id)
            .into_iter()
            .enumerate()
            .skip(offset)
            .take(limit)
            .map(|(index, score)| LeaderboardEntry {
                rank: index + 1,
                member_handle: score
                    .member_handle
                    .clone()
                    .unwrap_or_else(|| ANONYMOUS_HANDLE.to_string()),
                score: score.score,
                submitted_at: score.submitted_at,
            })
            .collect()
    }

    /// A member's scores, newest first, optionally limited to one competition.
    pub fn scores_by_member(&self, member_handle: &str, competition_id: Option<&str>) -> Vec<Score> {
        let mut scores: Vec<Score> = self
            .scores
            .values()
            .filter(|s| s.member_handle.as_deref() == Some(member_handle))
            .filter(|s| competition_id.is_none_or(|id| s.competition_id == id))
            .cloned()
            .collect();
        scores.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));
        scores
    }

    pub fn member_rank(&self, competition_id: &str, member_handle: &str) -> Option<RankInfo> {
        let ranked = self.ranked(competition_id);
        let total = ranked.len();
        ranked
            .iter()
            .position(|s| s.member_handle.as_deref() == Some(member_handle))
            .map(|index| RankInfo {
                rank: index + 1,
                score: ranked[index].score,
                total_participants: total,
                member_handle: member_handle.to_string(),
            })
    }

    /// Remove every score, returning how many were removed.
    pub fn clear(&mut self) -> usize {
        let removed = self.scores.len();
        self.scores.clear();
        removed
    }

    /// Best score per member, sorted by score descending. Scores without a
    /// handle stand alone.
    fn ranked(&self, competition_id: &str) -> Vec<&Score> {
        let mut best: HashMap<&str, &Score> = HashMap::new();
        for score in self.scores.values().filter(|s| s.competition_id == competition_id) {
            let key = score.member_handle.as_deref().unwrap_or(score.id.as_str());
            best.entry(key)
                .and_modify(|current| {
                    if rank_order(score, current) == Ordering::Less {
                        *current = score;
                    }
                })
                .or_insert(score);
        }

        let mut ranked: Vec<&Score> = best.into_values().collect();
        ranked.sort_by(|a, b| rank_order(a, b));
        ranked
    }
}

/// Higher score first; equal scores go to the earlier submission.
fn rank_order(a: &Score, b: &Score) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| a.submitted_at.cmp(&b.submitted_at))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn submit(store: &mut ScoreStore, competition: &str, handle: Option<&str>, score: f64) -> Score {
        store.submit(
            competition.to_string(),
            handle.map(str::to_string),
            None,
            score,
            None,
        )
    }

    #[test]
    fn submit_assigns_id_and_defaults_metadata() {
        let mut store = ScoreStore::new();
        let score = submit(&mut store, "comp-1", Some("alice"), 90.5);

        assert!(!score.id.is_empty());
        assert!(score.metadata.is_empty());
        assert_eq!(store.len(), 1);

        let with_meta = store.submit(
            "comp-1".into(),
            Some("bob".into()),
            Some("42".into()),
            10.0,
            json!({"lang": "rust"}).as_object().cloned(),
        );
        assert_eq!(with_meta.metadata["lang"], "rust");
        assert_eq!(with_meta.member_id.as_deref(), Some("42"));
    }

    #[test]
    fn leaderboard_keeps_best_score_per_member() {
        let mut store = ScoreStore::new();
        submit(&mut store, "comp-1", Some("alice"), 50.0);
        submit(&mut store, "comp-1", Some("alice"), 80.0);
        submit(&mut store, "comp-1", Some("bob"), 70.0);
        submit(&mut store, "comp-1", Some("carol"), 90.0);
        submit(&mut store, "comp-2", Some("dave"), 100.0);

        let board = store.leaderboard("comp-1", 50, 0);
        let rows: Vec<(usize, &str, f64)> = board
            .iter()
            .map(|e| (e.rank, e.member_handle.as_str(), e.score))
            .collect();
        assert_eq!(rows, vec![(1, "carol", 90.0), (2, "alice", 80.0), (3, "bob", 70.0)]);
    }

    #[test]
    fn leaderboard_pagination_keeps_absolute_ranks() {
        let mut store = ScoreStore::new();
        for (i, handle) in ["a", "b", "c", "d", "e"].iter().enumerate() {
            submit(&mut store, "comp", Some(handle), 100.0 - i as f64);
        }

        let page = store.leaderboard("comp", 2, 2);
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].rank, 3);
        assert_eq!(page[0].member_handle, "c");
        assert_eq!(page[1].rank, 4);

        assert!(store.leaderboard("comp", 10, 10).is_empty());
        assert!(store.leaderboard("comp", 0, 0).is_empty());
    }

    #[test]
    fn equal_best_scores_keep_the_earliest_submission() {
        let mut store = ScoreStore::new();
        let first = submit(&mut store, "comp", Some("alice"), 75.0);
        let second = submit(&mut store, "comp", Some("alice"), 75.0);
        let third = submit(&mut store, "comp", Some("alice"), 75.0);

        let base = Utc::now();
        for (id, age_secs) in [(&first.id, 10), (&second.id, 30), (&third.id, 20)] {
            if let Some(score) = store.scores.get_mut(id) {
                score.submitted_at = base - chrono::TimeDelta::seconds(age_secs);
            }
        }

        let board = store.leaderboard("comp", 50, 0);
        assert_eq!(board.len(), 1);
        assert_eq!(board[0].submitted_at, base - chrono::TimeDelta::seconds(30));
    }

    #[test]
    fn anonymous_scores_are_ranked_individually() {
        let mut store = ScoreStore::new();
        submit(&mut store, "comp", None, 10.0);
        submit(&mut store, "comp", None, 20.0);

        let board = store.leaderboard("comp", 50, 0);
        assert_eq!(board.len(), 2);
        assert!(board.iter().all(|e| e.member_handle == ANONYMOUS_HANDLE));
    }

    #[test]
    fn scores_by_member_filters_by_competition() {
        let mut store = ScoreStore::new();
        submit(&mut store, "comp-1", Some("alice"), 1.0);
        submit(&mut store, "comp-2", Some("alice"), 2.0);
        submit(&mut store, "comp-1", Some("bob"), 3.0);

        assert_eq!(store.scores_by_member("alice", None).len(), 2);
        let filtered = store.scores_by_member("alice", Some("comp-2"));
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].score, 2.0);
        assert!(store.scores_by_member("nobody", None).is_empty());
    }

    #[test]
    fn member_rank_reports_position_and_total() {
        let mut store = ScoreStore::new();
        submit(&mut store, "comp", Some("alice"), 10.0);
        submit(&mut store, "comp", Some("bob"), 30.0);
        submit(&mut store, "comp", Some("carol"), 20.0);

        let rank = store.member_rank("comp", "carol").unwrap();
        assert_eq!(rank.rank, 2);
        assert_eq!(rank.score, 20.0);
        assert_eq!(rank.total_participants, 3);

        assert!(store.member_rank("comp", "dave").is_none());
        assert!(store.member_rank("other", "alice").is_none());
    }

    #[test]
    fn clear_removes_everything() {
        let mut store = ScoreStore::new();
        submit(&mut store, "comp", Some("alice"), 10.0);
        submit(&mut store, "comp", Some("bob"), 20.0);

        assert_eq!(store.clear(), 2);
        assert!(store.is_empty());
        assert!(store.leaderboard("comp", 50, 0).is_empty());
    }
}
