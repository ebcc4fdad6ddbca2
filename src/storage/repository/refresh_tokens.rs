// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Refresh token store.
//!
//! Tokens are 256 random bits, base64url encoded, handed to the client once.
//! Rows are keyed by the SHA-256 digest of that value. A row is never
//! updated: it is either valid, expired, or gone (revoked or rotated).

use std::sync::Arc;

use base64ct::{Base64UrlUnpadded, Encoding};
use chrono::{DateTime, Duration, Utc};
use redb::{ReadableDatabase, ReadableTable, Table};
use ring::rand::{SecureRandom, SystemRandom};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use super::users::{load_user, StoredUser, UserId};
use crate::clock::Clock;
use crate::storage::database::{decode_row, GatewayDb, REFRESH_TOKENS, USERS};
use crate::storage::{StorageError, StorageResult};

const TOKEN_BYTES: usize = 32;
const MAX_INSERT_ATTEMPTS: usize = 3;

/// Persisted refresh token row. The clear token is not part of it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoredRefreshToken {
    pub id: Uuid,
    pub user_id: UserId,
    pub token_digest: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, thiserror::Error)]
pub enum RefreshError {
    #[error("refresh token not found")]
    NotFound,

    #[error("refresh token expired")]
    Expired,

    #[error(transparent)]
    Storage(#[from] StorageError),
}

enum Lookup<T> {
    Found(T),
    Missing,
    Expired,
}

impl<T> Lookup<T> {
    fn into_result(self) -> Result<T, RefreshError> {
        match self {
            Lookup::Found(value) => Ok(value),
            Lookup::Missing => Err(RefreshError::NotFound),
            Lookup::Expired => Err(RefreshError::Expired),
        }
    }
}

/// Creates, consumes, rotates and revokes refresh tokens.
pub struct RefreshTokenStore {
    db: Arc<GatewayDb>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
    rng: SystemRandom,
}

impl RefreshTokenStore {
    pub fn new(db: Arc<GatewayDb>, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            db,
            ttl,
            clock,
            rng: SystemRandom::new(),
        }
    }

    /// Mint a new refresh token for `user_id` and return its clear value.
    pub fn create(&self, user_id: UserId) -> StorageResult<String> {
        let now = self.clock.now();
        let write_txn = self.db.redb().begin_write()?;
        let token = {
            let mut tokens = write_txn.open_table(REFRESH_TOKENS)?;
            self.insert_new(&mut tokens, user_id, now)?
        };
        write_txn.commit()?;

        tracing::debug!(user_id, "Issued refresh token");
        Ok(token)
    }

    /// Resolve a token to its owner without changing anything.
    pub fn consume(&self, token: &str) -> Result<StoredUser, RefreshError> {
        let key = digest(token);
        self.read_owner(&key, self.clock.now())?.into_result()
    }

    /// Exchange a token for a fresh one.
    ///
    /// Lookup, insertion of the replacement and deletion of the presented
    /// row share one write transaction. Of several concurrent rotations of
    /// the same token exactly one succeeds; the others see `NotFound`.
    pub fn rotate(&self, token: &str) -> Result<(StoredUser, String), RefreshError> {
        let key = digest(token);
        let outcome = self.rotate_in_txn(&key, self.clock.now())?;
        if let Lookup::Found((user, _)) = &outcome {
            tracing::debug!(user_id = user.id, "Rotated refresh token");
        }
        outcome.into_result()
    }

    /// Delete the row for `token`. Unknown tokens are ignored.
    pub fn revoke(&self, token: &str) -> StorageResult<bool> {
        let key = digest(token);
        let write_txn = self.db.redb().begin_write()?;
        let removed = {
            let mut tokens = write_txn.open_table(REFRESH_TOKENS)?;
            let removed = tokens.remove(key.as_str())?.is_some();
            removed
        };
        write_txn.commit()?;
        Ok(removed)
    }

    /// Delete every refresh token owned by `user_id`.
    pub fn revoke_all_for_user(&self, user_id: UserId) -> StorageResult<usize> {
        let write_txn = self.db.redb().begin_write()?;
        let purged = {
            let mut tokens = write_txn.open_table(REFRESH_TOKENS)?;
            purge_user_tokens(&mut tokens, user_id)?
        };
        write_txn.commit()?;

        tracing::info!(user_id, purged, "Revoked all refresh tokens for user");
        Ok(purged)
    }

    fn read_owner(&self, key: &str, now: DateTime<Utc>) -> StorageResult<Lookup<StoredUser>> {
        let read_txn = self.db.redb().begin_read()?;
        let tokens = read_txn.open_table(REFRESH_TOKENS)?;
        let record = match lookup(&tokens, key, now)? {
            Lookup::Found(record) => record,
            Lookup::Missing => return Ok(Lookup::Missing),
            Lookup::Expired => return Ok(Lookup::Expired),
        };

        let users = read_txn.open_table(USERS)?;
        Ok(match load_user(&users, record.user_id)? {
            Some(user) => Lookup::Found(user),
            None => Lookup::Missing,
        })
    }

    fn rotate_in_txn(
        &self,
        key: &str,
        now: DateTime<Utc>,
    ) -> StorageResult<Lookup<(StoredUser, String)>> {
        let write_txn = self.db.redb().begin_write()?;
        let outcome = {
            let mut tokens = write_txn.open_table(REFRESH_TOKENS)?;
            let record = match lookup(&tokens, key, now)? {
                Lookup::Found(record) => record,
                Lookup::Missing => return Ok(Lookup::Missing),
                Lookup::Expired => return Ok(Lookup::Expired),
            };

            let users = write_txn.open_table(USERS)?;
            let user = match load_user(&users, record.user_id)? {
                Some(user) => user,
                None => return Ok(Lookup::Missing),
            };

            let replacement = self.insert_new(&mut tokens, user.id, now)?;
            tokens.remove(key)?;
            Lookup::Found((user, replacement))
        };
        write_txn.commit()?;
        Ok(outcome)
    }

    fn insert_new(
        &self,
        tokens: &mut Table<'_, &'static str, &'static [u8]>,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> StorageResult<String> {
        let expires_at = now
            .checked_add_signed(self.ttl)
            .ok_or(StorageError::TimestampOutOfRange)?;

        for _ in 0..MAX_INSERT_ATTEMPTS {
            let token = self.generate()?;
            let key = digest(&token);
            if tokens.get(key.as_str())?.is_some() {
                tracing::warn!(user_id, "Refresh token digest collision, regenerating");
                continue;
            }

            let record = StoredRefreshToken {
                id: Uuid::new_v4(),
                user_id,
                token_digest: key.clone(),
                expires_at,
                created_at: now,
                updated_at: now,
            };
            let json = serde_json::to_vec(&record)?;
            tokens.insert(key.as_str(), json.as_slice())?;
            return Ok(token);
        }

        Err(StorageError::AlreadyExists(
            "refresh token digest after repeated collisions".to_string(),
        ))
    }

    fn generate(&self) -> StorageResult<String> {
        let mut bytes = [0u8; TOKEN_BYTES];
        self.rng.fill(&mut bytes).map_err(|_| StorageError::Random)?;
        Ok(Base64UrlUnpadded::encode_string(&bytes))
    }
}

/// SHA-256 hex digest used as the storage key of a refresh token.
pub(crate) fn digest(token: &str) -> String {
    format!("{:x}", Sha256::digest(token.as_bytes()))
}

fn lookup(
    tokens: &impl ReadableTable<&'static str, &'static [u8]>,
    key: &str,
    now: DateTime<Utc>,
) -> StorageResult<Lookup<StoredRefreshToken>> {
    let record: StoredRefreshToken = match tokens.get(key)? {
        Some(value) => decode_row(value.value())?,
        None => return Ok(Lookup::Missing),
    };
    if record.expires_at <= now {
        return Ok(Lookup::Expired);
    }
    Ok(Lookup::Found(record))
}

/// Remove all rows owned by `user_id` inside an open write transaction.
pub(crate) fn purge_user_tokens(
    tokens: &mut Table<'_, &'static str, &'static [u8]>,
    user_id: UserId,
) -> StorageResult<usize> {
    let mut doomed = Vec::new();
    for entry in tokens.iter()? {
        let (key, value) = entry?;
        let record: StoredRefreshToken = decode_row(value.value())?;
        if record.user_id == user_id {
            doomed.push(key.value().to_string());
        }
    }
    for key in &doomed {
        tokens.remove(key.as_str())?;
    }
    Ok(doomed.len())
}
