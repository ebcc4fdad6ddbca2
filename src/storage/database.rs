// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedded identity and session database backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `users`: user_id → serialized StoredUser
//! - `user_emails`: exact email → user_id (uniqueness index)
//! - `user_roles`: user_id → serialized list of role names
//! - `refresh_tokens`: SHA-256 digest of the token → serialized StoredRefreshToken
//! - `meta`: key → u64 counters (e.g. "next_user_id")
//!
//! redb allows a single write transaction at a time. Every multi-step
//! mutation (user creation, refresh-token rotation) runs inside one write
//! transaction, which is what makes those steps atomic with respect to
//! concurrent requests.

use std::path::Path;

use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use serde::de::DeserializeOwned;

// =============================================================================
// Table Definitions
// =============================================================================

/// Primary table: user_id → serialized StoredUser (JSON bytes).
pub(crate) const USERS: TableDefinition<u64, &[u8]> = TableDefinition::new("users");

/// Index: exact email → user_id.
pub(crate) const USER_EMAILS: TableDefinition<&str, u64> = TableDefinition::new("user_emails");

/// Role assignments: user_id → JSON array of role names.
pub(crate) const USER_ROLES: TableDefinition<u64, &[u8]> = TableDefinition::new("user_roles");

/// Refresh tokens keyed by digest; the clear token is never stored.
pub(crate) const REFRESH_TOKENS: TableDefinition<&str, &[u8]> =
    TableDefinition::new("refresh_tokens");

/// Counters.
pub(crate) const META: TableDefinition<&str, u64> = TableDefinition::new("meta");

pub(crate) const NEXT_USER_ID: &str = "next_user_id";

// =============================================================================
// Error Type
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("secure random generator unavailable")]
    Random,

    #[error("timestamp out of range")]
    TimestampOutOfRange,
}

pub type StorageResult<T> = Result<T, StorageError>;

// =============================================================================
// GatewayDb
// =============================================================================

/// Embedded ACID database shared by the repositories.
pub struct GatewayDb {
    db: Database,
}

impl GatewayDb {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(path)?;

        // Pre-create all tables so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(USERS)?;
            let _ = write_txn.open_table(USER_EMAILS)?;
            let _ = write_txn.open_table(USER_ROLES)?;
            let _ = write_txn.open_table(REFRESH_TOKENS)?;
            let _ = write_txn.open_table(META)?;
        }
        write_txn.commit()?;

        tracing::info!(path = %path.display(), "Opened gateway database");
        Ok(Self { db })
    }

    pub(crate) fn redb(&self) -> &Database {
        &self.db
    }

    /// Open a read transaction and touch a table.
    pub fn health_check(&self) -> StorageResult<()> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(META)?;
        let _ = table.get(NEXT_USER_ID)?;
        Ok(())
    }
}

/// Decode a JSON row.
pub(crate) fn decode_row<T: DeserializeOwned>(bytes: &[u8]) -> StorageResult<T> {
    Ok(serde_json::from_slice(bytes)?)
}

#[cfg(test)]
pub(crate) fn temp_db() -> (std::sync::Arc<GatewayDb>, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let db = GatewayDb::open(&dir.path().join("test.redb")).unwrap();
    (std::sync::Arc::new(db), dir)
}
