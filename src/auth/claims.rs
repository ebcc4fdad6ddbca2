// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! JWT claims and authenticated user representation.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::storage::UserId;

/// Claims carried by an access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Subject: user ID as a decimal string
    pub sub: String,

    /// Issued at (Unix seconds)
    pub iat: i64,

    /// Expiration (Unix seconds)
    pub exp: i64,

    /// Issuer
    pub iss: String,

    /// Token ID, unique per issuance
    pub jti: String,
}

/// Authenticated user information extracted from a validated access token.
///
/// This is the primary type used by handlers to represent the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub user_id: UserId,
    pub token_id: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl AuthenticatedUser {
    /// Build from decoded claims. `None` if the subject is not a user ID
    /// or a timestamp is out of range.
    pub fn from_claims(claims: &AccessClaims) -> Option<Self> {
        let user_id = claims.sub.parse::<UserId>().ok()?;
        let issued_at = Utc.timestamp_opt(claims.iat, 0).single()?;
        let expires_at = Utc.timestamp_opt(claims.exp, 0).single()?;
        Some(Self {
            user_id,
            token_id: claims.jti.clone(),
            issued_at,
            expires_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(sub: &str) -> AccessClaims {
        AccessClaims {
            sub: sub.to_string(),
            iat: 1_700_000_000,
            exp: 1_700_003_600,
            iss: "opendata-gateway".to_string(),
            jti: "abc".to_string(),
        }
    }

    #[test]
    fn from_claims_parses_numeric_subject() {
        let user = AuthenticatedUser::from_claims(&claims("42")).unwrap();
        assert_eq!(user.user_id, 42);
        assert_eq!(user.token_id, "abc");
        assert_eq!((user.expires_at - user.issued_at).num_seconds(), 3600);
    }

    #[test]
    fn from_claims_rejects_non_numeric_subject() {
        assert!(AuthenticatedUser::from_claims(&claims("user_2abc")).is_none());
        assert!(AuthenticatedUser::from_claims(&claims("-1")).is_none());
    }
}
