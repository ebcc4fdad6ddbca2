// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Shared fixtures for in-crate tests.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tempfile::TempDir;

use crate::clock::{Clock, ManualClock};
use crate::config::{AppConfig, DATA_DIR_ENV, JWT_SECRET_ENV};
use crate::state::AppState;
use crate::storage::{seed_demo_users, GatewayDb};

pub const TEST_SECRET: &str = "test-secret-that-is-at-least-32-bytes!!";

/// Fully wired state over a throw-away database, with the demo users
/// seeded and time frozen until advanced.
pub struct TestContext {
    pub state: AppState,
    pub clock: Arc<ManualClock>,
    pub config: AppConfig,
    _dir: TempDir,
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_vars(&[])
    }

    /// Extra environment-style settings on top of the defaults.
    pub fn with_vars(vars: &[(&str, &str)]) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let mut env: HashMap<String, String> = HashMap::new();
        env.insert(JWT_SECRET_ENV.to_string(), TEST_SECRET.to_string());
        env.insert(
            DATA_DIR_ENV.to_string(),
            dir.path().to_string_lossy().into_owned(),
        );
        for (name, value) in vars {
            env.insert(name.to_string(), value.to_string());
        }
        let config = AppConfig::from_lookup(|name| env.get(name).cloned()).unwrap();

        let db = Arc::new(GatewayDb::open(&config.database_path()).unwrap());
        let clock = Arc::new(ManualClock::at_epoch_seconds(1_700_000_000));
        let state = AppState::new(&config, db, clock.clone()).unwrap();
        seed_demo_users(&state.users).unwrap();

        Self {
            state,
            clock,
            config,
            _dir: dir,
        }
    }

    pub fn clock_now(&self) -> DateTime<Utc> {
        self.clock.now()
    }
}
