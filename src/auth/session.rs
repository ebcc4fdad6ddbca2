// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Session orchestration: login, register, refresh, logout and the
//! token introspection endpoints.
//!
//! ## State Machine
//!
//! `Anonymous --login/register--> Authenticated --refresh--> Authenticated`
//! and `Authenticated --logout--> LoggedOut`. Logout revokes the refresh
//! token when one is supplied; the access token stays valid until its own
//! expiry.

use std::sync::Arc;

use super::claims::AuthenticatedUser;
use super::error::AuthError;
use super::issuer::{AccessTokenIssuer, IssuedAccessToken};
use super::password::{hash_password, CredentialVerifier};
use super::roles::Role;
use crate::clock::Clock;
use crate::models::{
    RegisterRequest, TokenLifeResponse, TokenResponse, UserProfile, UserView,
    ValidateTokenResponse,
};
use crate::storage::{NewUser, RefreshTokenStore, StorageError, StoredUser, UserRepository};

const TOKEN_TYPE: &str = "bearer";
const MAX_NAME_LEN: usize = 255;
const MIN_PASSWORD_LEN: usize = 8;

pub struct SessionService {
    verifier: CredentialVerifier,
    issuer: AccessTokenIssuer,
    refresh_tokens: RefreshTokenStore,
    users: UserRepository,
    clock: Arc<dyn Clock>,
}

impl SessionService {
    pub fn new(
        users: UserRepository,
        issuer: AccessTokenIssuer,
        refresh_tokens: RefreshTokenStore,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            verifier: CredentialVerifier::new(users.clone()),
            issuer,
            refresh_tokens,
            users,
            clock,
        }
    }

    /// Exchange credentials for a token pair.
    pub fn login(&self, email: &str, password: &str) -> Result<TokenResponse, AuthError> {
        if email.trim().is_empty() {
            return Err(AuthError::ValidationFailed(
                "The email field is required.".to_string(),
            ));
        }
        if password.is_empty() {
            return Err(AuthError::ValidationFailed(
                "The password field is required.".to_string(),
            ));
        }

        let user = self.verifier.verify(email, password)?;
        let response = self.issue_pair(&user)?;
        tracing::info!(user_id = user.id, "User logged in");
        Ok(response)
    }

    /// Create a `user`-role account and log it in.
    pub fn register(&self, request: RegisterRequest) -> Result<TokenResponse, AuthError> {
        validate_registration(&request)?;
        if self.users.find_by_email(&request.email)?.is_some() {
            return Err(email_taken());
        }

        let password_hash = hash_password(&request.password).map_err(|e| {
            tracing::error!(error = %e, "Failed to hash password");
            AuthError::Internal
        })?;

        let user = self
            .users
            .create(
                NewUser {
                    name: request.name.trim().to_string(),
                    email: request.email,
                    password_hash,
                },
                &[Role::default()],
            )
            .map_err(|e| match e {
                StorageError::AlreadyExists(_) => email_taken(),
                other => other.into(),
            })?;

        let response = self.issue_pair(&user)?;
        tracing::info!(user_id = user.id, "User registered");
        Ok(response)
    }

    /// Rotate a refresh token and mint a new access token.
    pub fn refresh(&self, refresh_token: &str) -> Result<TokenResponse, AuthError> {
        if refresh_token.is_empty() {
            return Err(AuthError::ValidationFailed(
                "The refresh token field is required.".to_string(),
            ));
        }

        let (user, replacement) = self.refresh_tokens.rotate(refresh_token)?;
        let access = self.issuer.issue(user.id)?;
        self.token_response(&user, access, replacement)
    }

    /// Revoke the given refresh token, if any.
    pub fn logout(
        &self,
        caller: &AuthenticatedUser,
        refresh_token: Option<&str>,
    ) -> Result<(), AuthError> {
        let revoked = match refresh_token.filter(|t| !t.is_empty()) {
            Some(token) => self.refresh_tokens.revoke(token)?,
            None => false,
        };
        tracing::info!(user_id = caller.user_id, revoked, "User logged out");
        Ok(())
    }

    /// Resolve a bearer token to the caller. `None` means no token was sent.
    pub fn authenticate(&self, bearer: Option<&str>) -> Result<AuthenticatedUser, AuthError> {
        let token = bearer.ok_or(AuthError::TokenAbsent)?;
        Ok(self.issuer.authenticate(token)?)
    }

    pub fn validate(&self, caller: &AuthenticatedUser) -> Result<ValidateTokenResponse, AuthError> {
        let user = self.load_user(caller)?;
        Ok(ValidateTokenResponse {
            valid: true,
            user: UserView::from(&user),
        })
    }

    /// Remaining lifetime of the caller's access token.
    pub fn token_life(&self, caller: &AuthenticatedUser) -> TokenLifeResponse {
        let now = self.clock.now();
        let left = (caller.expires_at - now).num_seconds().max(0);
        TokenLifeResponse {
            time_left_in_seconds: left,
            expires_at: caller.expires_at,
            server_time: now,
        }
    }

    /// The caller with roles and permissions.
    pub fn profile(&self, caller: &AuthenticatedUser) -> Result<UserProfile, AuthError> {
        let user = self.load_user(caller)?;
        let roles = self.users.roles_of(user.id)?;
        Ok(UserProfile::new(&user, &roles))
    }

    fn load_user(&self, caller: &AuthenticatedUser) -> Result<StoredUser, AuthError> {
        self.users
            .get(caller.user_id)?
            .ok_or(AuthError::UserNotFound)
    }

    fn issue_pair(&self, user: &StoredUser) -> Result<TokenResponse, AuthError> {
        let access = self.issuer.issue(user.id)?;
        let refresh_token = self.refresh_tokens.create(user.id)?;
        self.token_response(user, access, refresh_token)
    }

    fn token_response(
        &self,
        user: &StoredUser,
        access: IssuedAccessToken,
        refresh_token: String,
    ) -> Result<TokenResponse, AuthError> {
        let roles = self.users.roles_of(user.id)?;
        tracing::debug!(
            user_id = user.id,
            token_id = %access.token_id,
            expires_at = %access.expires_at,
            "Issued token pair"
        );

        Ok(TokenResponse {
            expires_in: (access.expires_at - access.issued_at).num_seconds(),
            access_token: access.token,
            refresh_token,
            token_type: TOKEN_TYPE.to_string(),
            user: UserProfile::new(user, &roles),
        })
    }
}

fn email_taken() -> AuthError {
    AuthError::ValidationFailed("The email has already been taken.".to_string())
}

fn validate_registration(request: &RegisterRequest) -> Result<(), AuthError> {
    let fail = |msg: &str| -> Result<(), AuthError> {
        Err(AuthError::ValidationFailed(msg.to_string()))
    };

    let name = request.name.trim();
    if name.is_empty() {
        return fail("The name field is required.");
    }
    if name.chars().count() > MAX_NAME_LEN {
        return fail("The name may not be greater than 255 characters.");
    }
    if request.email.is_empty() {
        return fail("The email field is required.");
    }
    if !looks_like_email(&request.email) {
        return fail("The email must be a valid email address.");
    }
    if request.password.chars().count() < MIN_PASSWORD_LEN {
        return fail("The password must be at least 8 characters.");
    }
    if request.password != request.password_confirmation {
        return fail("The password confirmation does not match.");
    }
    Ok(())
}

fn looks_like_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    }
}
