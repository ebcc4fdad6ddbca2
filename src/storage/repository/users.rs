// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User repository: identities, the email uniqueness index and role
//! assignments.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use redb::{ReadableDatabase, ReadableTable};
use serde::{Deserialize, Serialize};

use super::refresh_tokens::purge_user_tokens;
use crate::auth::Role;
use crate::clock::Clock;
use crate::storage::database::{
    decode_row, GatewayDb, META, NEXT_USER_ID, REFRESH_TOKENS, USERS, USER_EMAILS, USER_ROLES,
};
use crate::storage::{StorageError, StorageResult};

/// Numeric user identifier, allocated sequentially from 1.
pub type UserId = u64;

/// User record as persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoredUser {
    pub id: UserId,
    /// Display name
    pub name: String,
    /// Unique, matched exactly (case-sensitive)
    pub email: String,
    /// Argon2 PHC string
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for [`UserRepository::create`].
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
}

/// Repository for user operations.
#[derive(Clone)]
pub struct UserRepository {
    db: Arc<GatewayDb>,
    clock: Arc<dyn Clock>,
}

impl UserRepository {
    pub fn new(db: Arc<GatewayDb>, clock: Arc<dyn Clock>) -> Self {
        Self { db, clock }
    }

    /// Create a user with the given roles.
    ///
    /// Fails with `AlreadyExists` when the email is taken.
    pub fn create(&self, new_user: NewUser, roles: &[Role]) -> StorageResult<StoredUser> {
        let now = self.clock.now();
        let write_txn = self.db.redb().begin_write()?;
        let user = {
            let mut emails = write_txn.open_table(USER_EMAILS)?;
            if emails.get(new_user.email.as_str())?.is_some() {
                return Err(StorageError::AlreadyExists(format!(
                    "User with email {}",
                    new_user.email
                )));
            }

            let mut meta = write_txn.open_table(META)?;
            let id = meta.get(NEXT_USER_ID)?.map(|v| v.value()).unwrap_or(1);
            meta.insert(NEXT_USER_ID, id + 1)?;

            let user = StoredUser {
                id,
                name: new_user.name,
                email: new_user.email,
                password_hash: new_user.password_hash,
                created_at: now,
                updated_at: now,
            };

            let mut users = write_txn.open_table(USERS)?;
            let json = serde_json::to_vec(&user)?;
            users.insert(id, json.as_slice())?;
            emails.insert(user.email.as_str(), id)?;

            let mut unique_roles: Vec<Role> = Vec::with_capacity(roles.len());
            for role in roles {
                if !unique_roles.contains(role) {
                    unique_roles.push(*role);
                }
            }
            let mut user_roles = write_txn.open_table(USER_ROLES)?;
            let roles_json = serde_json::to_vec(&unique_roles)?;
            user_roles.insert(id, roles_json.as_slice())?;

            user
        };
        write_txn.commit()?;

        tracing::info!(user_id = user.id, "Created user");
        Ok(user)
    }

    /// Look up a user by ID.
    pub fn get(&self, id: UserId) -> StorageResult<Option<StoredUser>> {
        let read_txn = self.db.redb().begin_read()?;
        let users = read_txn.open_table(USERS)?;
        load_user(&users, id)
    }

    /// Look up a user by exact email.
    pub fn find_by_email(&self, email: &str) -> StorageResult<Option<StoredUser>> {
        let read_txn = self.db.redb().begin_read()?;
        let emails = read_txn.open_table(USER_EMAILS)?;
        let id = match emails.get(email)? {
            Some(v) => v.value(),
            None => return Ok(None),
        };
        let users = read_txn.open_table(USERS)?;
        load_user(&users, id)
    }

    /// Roles assigned to a user (empty for unknown users).
    pub fn roles_of(&self, id: UserId) -> StorageResult<Vec<Role>> {
        let read_txn = self.db.redb().begin_read()?;
        let user_roles = read_txn.open_table(USER_ROLES)?;
        load_roles(&user_roles, id)
    }

    /// All users holding `role`, ordered by ID.
    pub fn with_role(&self, role: Role) -> StorageResult<Vec<StoredUser>> {
        let read_txn = self.db.redb().begin_read()?;
        let user_roles = read_txn.open_table(USER_ROLES)?;
        let users = read_txn.open_table(USERS)?;

        let mut matched = Vec::new();
        for entry in user_roles.iter()? {
            let (key, value) = entry?;
            let roles: Vec<Role> = decode_row(value.value())?;
            if !roles.contains(&role) {
                continue;
            }
            if let Some(user) = load_user(&users, key.value())? {
                matched.push(user);
            }
        }
        Ok(matched)
    }

    /// The user with `id`, only if it holds `role`.
    pub fn with_role_and_id(&self, role: Role, id: UserId) -> StorageResult<Option<StoredUser>> {
        let read_txn = self.db.redb().begin_read()?;
        let user_roles = read_txn.open_table(USER_ROLES)?;
        if !load_roles(&user_roles, id)?.contains(&role) {
            return Ok(None);
        }
        let users = read_txn.open_table(USERS)?;
        load_user(&users, id)
    }

    /// Delete a user together with its email index entry, role assignments
    /// and refresh tokens. Returns `false` if the user did not exist.
    pub fn delete(&self, id: UserId) -> StorageResult<bool> {
        let write_txn = self.db.redb().begin_write()?;
        let purged = {
            let mut users = write_txn.open_table(USERS)?;
            let user = match load_user(&users, id)? {
                Some(user) => user,
                None => return Ok(false),
            };
            users.remove(id)?;

            let mut emails = write_txn.open_table(USER_EMAILS)?;
            emails.remove(user.email.as_str())?;

            let mut user_roles = write_txn.open_table(USER_ROLES)?;
            user_roles.remove(id)?;

            let mut tokens = write_txn.open_table(REFRESH_TOKENS)?;
            purge_user_tokens(&mut tokens, id)?
        };
        write_txn.commit()?;

        tracing::info!(user_id = id, revoked_tokens = purged, "Deleted user");
        Ok(true)
    }
}

/// Read a user row from an open table.
pub(crate) fn load_user(
    users: &impl ReadableTable<u64, &'static [u8]>,
    id: UserId,
) -> StorageResult<Option<StoredUser>> {
    match users.get(id)? {
        Some(value) => Ok(Some(decode_row(value.value())?)),
        None => Ok(None),
    }
}

fn load_roles(
    user_roles: &impl ReadableTable<u64, &'static [u8]>,
    id: UserId,
) -> StorageResult<Vec<Role>> {
    match user_roles.get(id)? {
        Some(value) => decode_row(value.value()),
        None => Ok(Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::database::temp_db;
    use crate::clock::ManualClock;

    fn repository(db: Arc<GatewayDb>) -> UserRepository {
        UserRepository::new(db, Arc::new(ManualClock::at_epoch_seconds(1_700_000_000)))
    }

    fn new_user(email: &str) -> NewUser {
        NewUser {
            name: "Test User".to_string(),
            email: email.to_string(),
            password_hash: "$argon2id$placeholder".to_string(),
        }
    }

    #[test]
    fn create_assigns_sequential_ids() {
        let (db, _dir) = temp_db();
        let repo = repository(db);

        let first = repo.create(new_user("a@example.com"), &[Role::User]).unwrap();
        let second = repo.create(new_user("b@example.com"), &[Role::User]).unwrap();
        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
    }

    #[test]
    fn duplicate_email_rejected() {
        let (db, _dir) = temp_db();
        let repo = repository(db);

        repo.create(new_user("dup@example.com"), &[]).unwrap();
        let result = repo.create(new_user("dup@example.com"), &[]);
        assert!(matches!(result, Err(StorageError::AlreadyExists(_))));
    }

    #[test]
    fn find_by_email_is_case_sensitive() {
        let (db, _dir) = temp_db();
        let repo = repository(db);

        let created = repo.create(new_user("user@example.com"), &[]).unwrap();
        assert_eq!(repo.find_by_email("user@example.com").unwrap(), Some(created));
        assert_eq!(repo.find_by_email("USER@example.com").unwrap(), None);
    }

    #[test]
    fn roles_are_deduplicated() {
        let (db, _dir) = temp_db();
        let repo = repository(db);

        let user = repo
            .create(new_user("r@example.com"), &[Role::User, Role::Admin, Role::User])
            .unwrap();
        assert_eq!(repo.roles_of(user.id).unwrap(), vec![Role::User, Role::Admin]);
        assert!(repo.roles_of(999).unwrap().is_empty());
    }

    #[test]
    fn timestamps_come_from_the_clock() {
        let (db, _dir) = temp_db();
        let clock = Arc::new(ManualClock::at_epoch_seconds(1_700_000_000));
        let repo = UserRepository::new(db, clock.clone());

        let first = repo.create(new_user("t1@example.com"), &[]).unwrap();
        assert_eq!(first.created_at, clock.now());
        assert_eq!(first.updated_at, clock.now());

        clock.advance(chrono::Duration::seconds(90));
        let second = repo.create(new_user("t2@example.com"), &[]).unwrap();
        assert_eq!((second.created_at - first.created_at).num_seconds(), 90);
    }

    #[test]
    fn role_queries_filter_users() {
        let (db, _dir) = temp_db();
        let repo = repository(db);

        let admin = repo.create(new_user("admin@example.com"), &[Role::Admin]).unwrap();
        let user = repo.create(new_user("user@example.com"), &[Role::User]).unwrap();

        let admins = repo.with_role(Role::Admin).unwrap();
        assert_eq!(admins, vec![admin.clone()]);
        assert!(repo.with_role(Role::SuperAdmin).unwrap().is_empty());

        assert_eq!(
            repo.with_role_and_id(Role::Admin, admin.id).unwrap(),
            Some(admin)
        );
        assert_eq!(repo.with_role_and_id(Role::Admin, user.id).unwrap(), None);
        assert_eq!(repo.with_role_and_id(Role::User, 999).unwrap(), None);
    }

    #[test]
    fn delete_frees_email_and_roles() {
        let (db, _dir) = temp_db();
        let repo = repository(db);

        let user = repo.create(new_user("gone@example.com"), &[Role::User]).unwrap();
        assert!(repo.delete(user.id).unwrap());
        assert!(!repo.delete(user.id).unwrap());

        assert_eq!(repo.get(user.id).unwrap(), None);
        assert_eq!(repo.find_by_email("gone@example.com").unwrap(), None);
        assert!(repo.roles_of(user.id).unwrap().is_empty());

        // Email can be reused afterwards
        repo.create(new_user("gone@example.com"), &[]).unwrap();
    }
}
