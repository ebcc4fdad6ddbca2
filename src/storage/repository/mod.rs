// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Repository layer over the gateway database.

pub mod refresh_tokens;
pub mod users;

pub use refresh_tokens::{RefreshError, RefreshTokenStore, StoredRefreshToken};
pub use users::{NewUser, StoredUser, UserId, UserRepository};
