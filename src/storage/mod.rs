// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Storage Module
//!
//! Persistent state for identities and sessions, held in a single embedded
//! redb database file under `DATA_DIR`.
//!
//! ## Repositories
//!
//! - [`UserRepository`] - users, email index, role assignments
//! - [`RefreshTokenStore`] - opaque refresh tokens with expiry and atomic rotation
//!
//! ## Important Notes
//!
//! - Refresh tokens are stored as SHA-256 digests; the clear value only
//!   exists in the response that hands it to the client
//! - Rows are JSON-encoded so they stay readable with generic redb tooling
//! - Stale refresh-token rows are never deleted automatically

pub mod database;
pub mod repository;
pub mod seed;

pub use database::{GatewayDb, StorageError, StorageResult};
pub use seed::{seed_demo_users, SeedError, DEMO_PASSWORD};
pub use repository::{
    NewUser, RefreshError, RefreshTokenStore, StoredRefreshToken, StoredUser, UserId,
    UserRepository,
};
