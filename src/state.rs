// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::auth::{AccessTokenIssuer, SessionService};
use crate::catalog::{CatalogError, CatalogService};
use crate::clock::Clock;
use crate::config::AppConfig;
use crate::storage::{GatewayDb, RefreshTokenStore, UserRepository};

/// Shared, immutable handles passed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionService>,
    pub users: UserRepository,
    pub catalog: Arc<CatalogService>,
    pub db: Arc<GatewayDb>,
}

impl AppState {
    /// Wire every service from configuration and an opened database.
    pub fn new(
        config: &AppConfig,
        db: Arc<GatewayDb>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, CatalogError> {
        let users = UserRepository::new(db.clone(), clock.clone());
        let issuer = AccessTokenIssuer::new(config.tokens.clone(), clock.clone());
        let refresh_tokens = RefreshTokenStore::new(db.clone(), config.refresh_ttl, clock.clone());
        let sessions = SessionService::new(users.clone(), issuer, refresh_tokens, clock);
        let catalog = CatalogService::new(&config.catalog)?;

        Ok(Self {
            sessions: Arc::new(sessions),
            users,
            catalog: Arc::new(catalog),
            db,
        })
    }
}
