// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Password hashing and credential verification (Argon2id).

use std::sync::OnceLock;

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use ring::rand::{SecureRandom, SystemRandom};

use super::error::AuthError;
use crate::storage::{StoredUser, UserRepository};

const SALT_BYTES: usize = 16;

#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("secure random generator unavailable")]
    Random,

    #[error("password hashing failed: {0}")]
    Hash(String),
}

/// Hash a password with a fresh random salt, returning a PHC string.
pub fn hash_password(plain: &str) -> Result<String, PasswordError> {
    let mut salt_bytes = [0u8; SALT_BYTES];
    SystemRandom::new()
        .fill(&mut salt_bytes)
        .map_err(|_| PasswordError::Random)?;
    let salt = SaltString::encode_b64(&salt_bytes).map_err(|e| PasswordError::Hash(e.to_string()))?;

    let hash = Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| PasswordError::Hash(e.to_string()))?;
    Ok(hash.to_string())
}

/// Check `plain` against a stored PHC string. Unparseable hashes never match.
pub fn verify_password(plain: &str, phc: &str) -> bool {
    let parsed = match PasswordHash::new(phc) {
        Ok(parsed) => parsed,
        Err(e) => {
            tracing::warn!(error = %e, "Stored password hash is not a valid PHC string");
            return false;
        }
    };
    Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok()
}

/// Hash verified when the email is unknown, so both failure paths cost the same.
fn dummy_hash() -> Option<&'static str> {
    static DUMMY: OnceLock<Option<String>> = OnceLock::new();
    DUMMY
        .get_or_init(|| hash_password("dummy-password-for-timing").ok())
        .as_deref()
}

/// Checks an email/password pair against the user store.
#[derive(Clone)]
pub struct CredentialVerifier {
    users: UserRepository,
}

impl CredentialVerifier {
    pub fn new(users: UserRepository) -> Self {
        Self { users }
    }

    pub fn verify(&self, email: &str, password: &str) -> Result<StoredUser, AuthError> {
        let user = match self.users.find_by_email(email)? {
            Some(user) => user,
            None => {
                if let Some(dummy) = dummy_hash() {
                    let _ = verify_password(password, dummy);
                }
                tracing::debug!("Login rejected: unknown email");
                return Err(AuthError::InvalidCredentials);
            }
        };

        if !verify_password(password, &user.password_hash) {
            tracing::debug!(user_id = user.id, "Login rejected: password mismatch");
            return Err(AuthError::InvalidCredentials);
        }
        Ok(user)
    }
}
