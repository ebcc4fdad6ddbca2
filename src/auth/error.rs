// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication errors.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use super::issuer::TokenError;
use crate::storage::{RefreshError, StorageError};

/// Authentication error type.
///
/// Component errors (`TokenError`, `RefreshError`, `StorageError`) are
/// mapped into this taxonomy at the session boundary. Internal details are
/// logged there and never serialized.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Unknown email or wrong password
    #[error("Invalid email or password")]
    InvalidCredentials,
    /// Access token past its expiry
    #[error("Token has expired")]
    TokenExpired,
    /// Bad signature, wrong issuer or undecodable token
    #[error("Token is invalid")]
    TokenInvalid,
    /// No bearer token on the request
    #[error("Authorization token not found")]
    TokenAbsent,
    /// Refresh token unknown, revoked or already rotated
    #[error("Refresh token not found")]
    RefreshTokenNotFound,
    /// Refresh token past its expiry
    #[error("Refresh token has expired")]
    RefreshTokenExpired,
    /// Token subject no longer exists
    #[error("User not found")]
    UserNotFound,
    /// Request body failed validation
    #[error("{0}")]
    ValidationFailed(String),
    /// Anything unexpected; details are in the logs
    #[error("Internal server error")]
    Internal,
}

#[derive(Serialize)]
struct AuthErrorBody {
    error: String,
    error_code: String,
}

impl AuthError {
    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::InvalidCredentials => "invalid_credentials",
            AuthError::TokenExpired => "token_expired",
            AuthError::TokenInvalid => "token_invalid",
            AuthError::TokenAbsent => "token_absent",
            AuthError::RefreshTokenNotFound => "refresh_token_not_found",
            AuthError::RefreshTokenExpired => "refresh_token_expired",
            AuthError::UserNotFound => "user_not_found",
            AuthError::ValidationFailed(_) => "validation_failed",
            AuthError::Internal => "internal_error",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::InvalidCredentials
            | AuthError::TokenExpired
            | AuthError::TokenInvalid
            | AuthError::TokenAbsent
            | AuthError::RefreshTokenNotFound
            | AuthError::RefreshTokenExpired => StatusCode::UNAUTHORIZED,
            AuthError::UserNotFound => StatusCode::NOT_FOUND,
            AuthError::ValidationFailed(_) => StatusCode::BAD_REQUEST,
            AuthError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StorageError> for AuthError {
    fn from(e: StorageError) -> Self {
        tracing::error!(error = %e, "Storage failure during authentication");
        AuthError::Internal
    }
}

impl From<TokenError> for AuthError {
    fn from(e: TokenError) -> Self {
        match e {
            TokenError::Expired => AuthError::TokenExpired,
            TokenError::Invalid | TokenError::Malformed => AuthError::TokenInvalid,
            TokenError::Signing(msg) => {
                tracing::error!(error = %msg, "Failed to sign access token");
                AuthError::Internal
            }
        }
    }
}

impl From<RefreshError> for AuthError {
    fn from(e: RefreshError) -> Self {
        match e {
            RefreshError::NotFound => AuthError::RefreshTokenNotFound,
            RefreshError::Expired => AuthError::RefreshTokenExpired,
            RefreshError::Storage(e) => e.into(),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(AuthErrorBody {
            error: self.to_string(),
            error_code: self.error_code().to_string(),
        });
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[tokio::test]
    async fn token_absent_returns_401() {
        let response = AuthError::TokenAbsent.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();
        assert_eq!(body["error_code"], "token_absent");
    }

    #[tokio::test]
    async fn internal_body_is_opaque() {
        let err: AuthError = StorageError::NotFound("secret detail".to_string()).into();
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = String::from_utf8(body_bytes.to_vec()).unwrap();
        assert!(!body.contains("secret detail"));
        assert!(body.contains("internal_error"));
    }

    #[test]
    fn malformed_and_invalid_tokens_share_a_code() {
        assert_eq!(
            AuthError::from(TokenError::Malformed).error_code(),
            "token_invalid"
        );
        assert_eq!(
            AuthError::from(TokenError::Invalid).error_code(),
            "token_invalid"
        );
        assert_eq!(
            AuthError::from(TokenError::Expired).error_code(),
            "token_expired"
        );
    }

    #[test]
    fn refresh_errors_map_to_401() {
        let not_found = AuthError::from(RefreshError::NotFound);
        assert_eq!(not_found.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(not_found.error_code(), "refresh_token_not_found");

        let expired = AuthError::from(RefreshError::Expired);
        assert_eq!(expired.error_code(), "refresh_token_expired");
    }

    #[test]
    fn validation_message_is_surfaced() {
        let err = AuthError::ValidationFailed("The email field is required.".to_string());
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "The email field is required.");
    }

    #[test]
    fn user_not_found_is_404() {
        assert_eq!(AuthError::UserNotFound.status_code(), StatusCode::NOT_FOUND);
    }
}
