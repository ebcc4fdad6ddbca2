// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Local JWT authentication with rotating refresh tokens.
//!
//! ## Auth Flow
//!
//! 1. Client posts email/password to `/auth/login`
//! 2. Server verifies the Argon2 hash and returns:
//!    - a short-lived HS256 access token (`sub` = user ID)
//!    - an opaque refresh token (stored server-side as a digest)
//! 3. Client sends `Authorization: Bearer <access token>` on protected calls
//! 4. When the access token expires, client posts the refresh token to
//!    `/auth/refresh` and receives a new pair; the old refresh token is dead
//!
//! ## Security
//!
//! - Zero clock-skew leeway on access-token expiry
//! - Refresh tokens are single use; replay yields `refresh_token_not_found`
//! - Unknown emails and wrong passwords are indistinguishable to the caller
//! - Logout revokes the refresh token only; access tokens live to expiry

pub mod claims;
pub mod error;
pub mod extractor;
pub mod issuer;
pub mod password;
pub mod roles;
pub mod session;

pub use claims::{AccessClaims, AuthenticatedUser};
pub use error::AuthError;
pub use extractor::{bearer_token, Auth};
pub use issuer::{AccessTokenIssuer, IssuedAccessToken, TokenError, TokenSettings};
pub use password::{hash_password, verify_password, CredentialVerifier, PasswordError};
pub use roles::{Permission, Role};
pub use session::SessionService;
