// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use tokio::sync::RwLock;

use crate::auth::{Authenticator, KeyCache, TokenValidator};
use crate::config::AppConfig;
use crate::store::{ContestantStore, ProgressStore, ScoreStore};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub auth: Arc<Authenticator>,
    pub scores: Arc<RwLock<ScoreStore>>,
    pub progress: Arc<RwLock<ProgressStore>>,
    pub contestants: Arc<RwLock<ContestantStore>>,
}

impl AppState {
    /// Build the shared state. Fails only if the HTTP client for the key
    /// set endpoint cannot be created.
    pub fn new(config: AppConfig) -> Result<Self, reqwest::Error> {
        let keys = KeyCache::new(&config.keys)?;
        let validator = TokenValidator::new(&config.auth, keys);
        let auth = Authenticator::new(&config.auth, validator);

        Ok(Self {
            config: Arc::new(config),
            auth: Arc::new(auth),
            scores: Arc::new(RwLock::new(ScoreStore::new())),
            progress: Arc::new(RwLock::new(ProgressStore::new())),
            contestants: Arc::new(RwLock::new(ContestantStore::new())),
        })
    }

    pub fn keys(&self) -> &KeyCache {
        self.auth.validator().keys()
    }
}
