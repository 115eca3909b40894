// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Competition registrations.
//!
//! Authenticated members are registered at most once per competition under
//! their handle. Guest registrations are kept apart from member ones, so a
//! guest naming a member's handle never shadows the member's registration.

use std::collections::HashMap;

use chrono::Utc;
use uuid::Uuid;

use crate::models::Contestant;

/// Display name used when neither a display name nor a handle is given.
const ANONYMOUS_NAME: &str = "Anonymous";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum RegistrationKey {
    Member { competition_id: String, handle: String },
    /// `label` is the self-declared handle, or a fresh id when there is none.
    Guest { competition_id: String, label: String },
}

/// Identity details of a registration request.
#[derive(Debug, Clone, Default)]
pub struct Registrant {
    pub member_handle: Option<String>,
    pub member_id: Option<String>,
    pub display_name: Option<String>,
    /// Whether the handle came from a validated token.
    pub authenticated: bool,
}

#[derive(Default)]
pub struct ContestantStore {
    registrations: HashMap<RegistrationKey, Contestant>,
}

impl ContestantStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    /// Register for a competition. Returns the registration and whether it
    /// was created; an existing registration is returned unchanged.
    pub fn register(&mut self, competition_id: String, registrant: Registrant) -> (Contestant, bool) {
        let key = match (&registrant.member_handle, registrant.authenticated) {
            (Some(handle), true) => RegistrationKey::Member {
                competition_id: competition_id.clone(),
                handle: handle.clone(),
            },
            (handle, _) => RegistrationKey::Guest {
                competition_id: competition_id.clone(),
                label: handle.clone().unwrap_or_else(|| Uuid::new_v4().to_string()),
            },
        };

        if let Some(existing) = self.registrations.get(&key) {
            return (existing.clone(), false);
        }

        let display_name = registrant
            .display_name
            .filter(|name| !name.trim().is_empty())
            .or_else(|| registrant.member_handle.clone())
            .unwrap_or_else(|| ANONYMOUS_NAME.to_string());

        let contestant = Contestant {
            id: Uuid::new_v4().to_string(),
            competition_id,
            member_handle: registrant.member_handle,
            member_id: registrant.member_id,
            display_name,
            authenticated: registrant.authenticated,
            registered_at: Utc::now(),
        };
        self.registrations.insert(key, contestant.clone());
        (contestant, true)
    }

    /// A member's registration for one competition.
    pub fn registration(&self, competition_id: &str, handle: &str) -> Option<Contestant> {
        self.registrations.get(&member_key(competition_id, handle)).cloned()
    }

    /// A member's registrations, newest first. Guest registrations are not
    /// included even if they name the member's handle.
    pub fn registrations_by_member(&self, handle: &str) -> Vec<Contestant> {
        let mut registrations: Vec<Contestant> = self
            .registrations
            .values()
            .filter(|c| c.authenticated && c.member_handle.as_deref() == Some(handle))
            .cloned()
            .collect();
        registrations.sort_by(|a, b| b.registered_at.cmp(&a.registered_at));
        registrations
    }

    /// Everyone registered for a competition, in registration order.
    pub fn contestants(&self, competition_id: &str) -> Vec<Contestant> {
        let mut contestants: Vec<Contestant> = self
            .registrations
            .values()
            .filter(|c| c.competition_id == competition_id)
            .cloned()
            .collect();
        contestants.sort_by(|a, b| a.registered_at.cmp(&b.registered_at));
        contestants
    }

    /// Remove a member's registration. Returns whether one existed.
    pub fn unregister(&mut self, competition_id: &str, handle: &str) -> bool {
        self.registrations
            .remove(&member_key(competition_id, handle))
            .is_some()
    }
}

fn member_key(competition_id: &str, handle: &str) -> RegistrationKey {
    RegistrationKey::Member {
        competition_id: competition_id.to_string(),
        handle: handle.to_string(),
    }
}
