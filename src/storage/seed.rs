// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Demo accounts, one per role.

use crate::auth::{hash_password, PasswordError, Role};
use crate::storage::{NewUser, StorageError, UserRepository};

/// Password shared by every demo account.
pub const DEMO_PASSWORD: &str = "password";

const DEMO_USERS: [(&str, &str, Role); 3] = [
    ("Super Admin User", "superadmin@example.com", Role::SuperAdmin),
    ("Admin User", "admin@example.com", Role::Admin),
    ("Common User", "user@example.com", Role::User),
];

#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Password(#[from] PasswordError),
}

/// Create the demo accounts that do not exist yet. Returns how many were
/// created; running it again is a no-op.
pub fn seed_demo_users(users: &UserRepository) -> Result<usize, SeedError> {
    let mut created = 0;
    for (name, email, role) in DEMO_USERS {
        if users.find_by_email(email)?.is_some() {
            continue;
        }
        let password_hash = hash_password(DEMO_PASSWORD)?;
        users.create(
            NewUser {
                name: name.to_string(),
                email: email.to_string(),
                password_hash,
            },
            &[role],
        )?;
        created += 1;
    }

    if created > 0 {
        tracing::info!(created, "Seeded demo users");
    }
    Ok(created)
}
