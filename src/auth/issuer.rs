// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Access token issuance and validation (HS256 JWT).
//!
//! Expiry is checked against the injected [`Clock`] with zero leeway:
//! a token whose `exp` is at or before "now" is expired.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use uuid::Uuid;

use super::claims::{AccessClaims, AuthenticatedUser};
use crate::clock::Clock;
use crate::storage::UserId;

/// Signing configuration for access tokens.
#[derive(Clone)]
pub struct TokenSettings {
    /// HS256 shared secret
    pub secret: Vec<u8>,
    /// Value of the `iss` claim
    pub issuer: String,
    /// Access token lifetime
    pub access_ttl: Duration,
}

impl std::fmt::Debug for TokenSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSettings")
            .field("secret", &"<redacted>")
            .field("issuer", &self.issuer)
            .field("access_ttl", &self.access_ttl)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("token expired")]
    Expired,

    #[error("token signature or issuer invalid")]
    Invalid,

    #[error("token malformed")]
    Malformed,

    #[error("token signing failed: {0}")]
    Signing(String),
}

/// A freshly minted access token.
#[derive(Debug, Clone)]
pub struct IssuedAccessToken {
    pub token: String,
    pub token_id: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

pub struct AccessTokenIssuer {
    settings: TokenSettings,
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    clock: Arc<dyn Clock>,
}

impl AccessTokenIssuer {
    pub fn new(settings: TokenSettings, clock: Arc<dyn Clock>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.set_issuer(&[settings.issuer.as_str()]);
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);

        Self {
            encoding: EncodingKey::from_secret(&settings.secret),
            decoding: DecodingKey::from_secret(&settings.secret),
            validation,
            settings,
            clock,
        }
    }

    /// Mint an access token for `user_id`, valid for the configured TTL.
    pub fn issue(&self, user_id: UserId) -> Result<IssuedAccessToken, TokenError> {
        let iat = self.clock.now().timestamp();
        let exp = iat + self.settings.access_ttl.num_seconds();
        let token_id = Uuid::new_v4().to_string();

        let claims = AccessClaims {
            sub: user_id.to_string(),
            iat,
            exp,
            iss: self.settings.issuer.clone(),
            jti: token_id.clone(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))?;

        let issued_at = DateTime::from_timestamp(iat, 0)
            .ok_or_else(|| TokenError::Signing(format!("iat out of range: {iat}")))?;
        let expires_at = DateTime::from_timestamp(exp, 0)
            .ok_or_else(|| TokenError::Signing(format!("exp out of range: {exp}")))?;

        Ok(IssuedAccessToken {
            token,
            token_id,
            issued_at,
            expires_at,
        })
    }

    /// Verify signature, issuer and expiry; return the claims.
    pub fn validate(&self, token: &str) -> Result<AccessClaims, TokenError> {
        let data = decode::<AccessClaims>(token, &self.decoding, &self.validation)
            .map_err(|e| classify(e.kind()))?;

        if data.claims.exp <= self.clock.now().timestamp() {
            return Err(TokenError::Expired);
        }
        Ok(data.claims)
    }

    /// Validate and convert to the caller identity used by handlers.
    pub fn authenticate(&self, token: &str) -> Result<AuthenticatedUser, TokenError> {
        let claims = self.validate(token)?;
        AuthenticatedUser::from_claims(&claims).ok_or(TokenError::Invalid)
    }
}

fn classify(kind: &ErrorKind) -> TokenError {
    match kind {
        ErrorKind::ExpiredSignature => TokenError::Expired,
        ErrorKind::InvalidSignature
        | ErrorKind::InvalidIssuer
        | ErrorKind::InvalidAudience
        | ErrorKind::InvalidSubject
        | ErrorKind::InvalidAlgorithm
        | ErrorKind::ImmatureSignature
        | ErrorKind::MissingRequiredClaim(_) => TokenError::Invalid,
        _ => TokenError::Malformed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};

    const SECRET: &[u8] = b"test-secret-that-is-at-least-32-bytes!!";

    fn settings(ttl_secs: i64) -> TokenSettings {
        TokenSettings {
            secret: SECRET.to_vec(),
            issuer: "opendata-gateway".to_string(),
            access_ttl: Duration::seconds(ttl_secs),
        }
    }

    fn issuer(ttl_secs: i64) -> (AccessTokenIssuer, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::at_epoch_seconds(1_700_000_000));
        (AccessTokenIssuer::new(settings(ttl_secs), clock.clone()), clock)
    }

    #[test]
    fn round_trip_preserves_subject() {
        let (issuer, _) = issuer(3600);
        let issued = issuer.issue(42).unwrap();

        let claims = issuer.validate(&issued.token).unwrap();
        assert_eq!(claims.sub, "42");
        assert_eq!(claims.iss, "opendata-gateway");
        assert_eq!(claims.jti, issued.token_id);
        assert_eq!(claims.exp - claims.iat, 3600);

        let user = issuer.authenticate(&issued.token).unwrap();
        assert_eq!(user.user_id, 42);
        assert_eq!(user.expires_at, issued.expires_at);
    }

    #[test]
    fn expires_exactly_after_ttl() {
        let (issuer, clock) = issuer(60);
        let issued = issuer.issue(7).unwrap();

        clock.advance(Duration::seconds(59));
        assert!(issuer.validate(&issued.token).is_ok());

        clock.advance(Duration::seconds(1));
        assert_eq!(issuer.validate(&issued.token), Err(TokenError::Expired));

        clock.advance(Duration::seconds(1));
        assert_eq!(issuer.validate(&issued.token), Err(TokenError::Expired));
    }

    #[test]
    fn each_token_has_unique_id() {
        let (issuer, _) = issuer(60);
        let a = issuer.issue(1).unwrap();
        let b = issuer.issue(1).unwrap();
        assert_ne!(a.token_id, b.token_id);
        assert_ne!(a.token, b.token);
    }

    #[test]
    fn tampered_payload_is_invalid() {
        let (issuer, _) = issuer(60);
        let issued = issuer.issue(1).unwrap();

        let parts: Vec<&str> = issued.token.split('.').collect();
        let payload = URL_SAFE_NO_PAD.decode(parts[1]).unwrap();
        let mut claims: serde_json::Value = serde_json::from_slice(&payload).unwrap();
        claims["sub"] = serde_json::Value::String("999".to_string());
        let forged_payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims).unwrap());
        let forged = format!("{}.{}.{}", parts[0], forged_payload, parts[2]);

        assert_eq!(issuer.validate(&forged), Err(TokenError::Invalid));
    }

    #[test]
    fn wrong_secret_is_invalid() {
        let (issuer, clock) = issuer(60);
        let mut other_settings = settings(60);
        other_settings.secret = b"another-secret-that-is-32-bytes-long!!".to_vec();
        let other = AccessTokenIssuer::new(other_settings, clock);

        let token = other.issue(1).unwrap().token;
        assert_eq!(issuer.validate(&token), Err(TokenError::Invalid));
    }

    #[test]
    fn wrong_issuer_is_invalid() {
        let (issuer, clock) = issuer(60);
        let mut other_settings = settings(60);
        other_settings.issuer = "someone-else".to_string();
        let other = AccessTokenIssuer::new(other_settings, clock);

        let token = other.issue(1).unwrap().token;
        assert_eq!(issuer.validate(&token), Err(TokenError::Invalid));
    }

    #[test]
    fn garbage_is_malformed() {
        let (issuer, _) = issuer(60);
        assert_eq!(issuer.validate("not-a-jwt"), Err(TokenError::Malformed));
        assert_eq!(issuer.validate(""), Err(TokenError::Malformed));
    }

    #[test]
    fn debug_redacts_secret() {
        let printed = format!("{:?}", settings(60));
        assert!(printed.contains("<redacted>"));
        assert!(!printed.contains("test-secret"));
    }
}
