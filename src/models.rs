// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! Request and response bodies of the authentication and user endpoints.
//! All types derive `Serialize`, `Deserialize`, and `ToSchema` for JSON
//! handling and OpenAPI documentation. Catalog payloads live in
//! [`crate::catalog::dataset`].
//!
//! ## Model Categories
//!
//! - **Requests**: login, register, refresh, logout bodies
//! - **Users**: public user view and the profile with roles/permissions
//! - **Tokens**: token pair response, validation and remaining-lifetime views

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::{Permission, Role};
use crate::storage::{StoredUser, UserId};

// =============================================================================
// Requests
// =============================================================================

/// Login form. Missing fields deserialize as empty and fail validation.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Self-registration form.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct RegisterRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub password_confirmation: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct RefreshRequest {
    #[serde(default)]
    pub refresh_token: String,
}

/// Optional logout body; when a refresh token is given it is revoked.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct LogoutRequest {
    #[serde(default)]
    pub refresh_token: Option<String>,
}

// =============================================================================
// Users
// =============================================================================

/// Public view of a user (no password hash).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct UserView {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&StoredUser> for UserView {
    fn from(user: &StoredUser) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// A role together with the permissions it grants.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct RoleView {
    pub name: Role,
    pub permissions: Vec<Permission>,
}

impl From<Role> for RoleView {
    fn from(role: Role) -> Self {
        Self {
            name: role,
            permissions: role.permissions().to_vec(),
        }
    }
}

/// User with roles and permissions loaded.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct UserProfile {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub roles: Vec<RoleView>,
}

impl UserProfile {
    pub fn new(user: &StoredUser, roles: &[Role]) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            created_at: user.created_at,
            updated_at: user.updated_at,
            roles: roles.iter().copied().map(RoleView::from).collect(),
        }
    }
}

// =============================================================================
// Tokens
// =============================================================================

/// Returned by login, register and refresh.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    pub access_token: String,
    /// Opaque, single-use refresh token
    pub refresh_token: String,
    /// Always `bearer`
    pub token_type: String,
    /// Access token lifetime in seconds
    pub expires_in: i64,
    pub user: UserProfile,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ValidateTokenResponse {
    pub valid: bool,
    pub user: UserView,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct TokenLifeResponse {
    pub time_left_in_seconds: i64,
    pub expires_at: DateTime<Utc>,
    pub server_time: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_request_tolerates_missing_fields() {
        let req: LoginRequest = serde_json::from_str("{}").unwrap();
        assert!(req.email.is_empty());
        assert!(req.password.is_empty());
    }

    #[test]
    fn role_view_lists_permissions() {
        let json = serde_json::to_value(RoleView::from(Role::Admin)).unwrap();
        assert_eq!(json["name"], "admin");
        assert_eq!(
            json["permissions"],
            serde_json::json!(["view", "create", "edit"])
        );
    }

    #[test]
    fn user_view_omits_password_hash() {
        let now = Utc::now();
        let user = StoredUser {
            id: 1,
            name: "A".to_string(),
            email: "a@example.com".to_string(),
            password_hash: "$argon2id$secret".to_string(),
            created_at: now,
            updated_at: now,
        };
        let json = serde_json::to_string(&UserView::from(&user)).unwrap();
        assert!(!json.contains("argon2"));
    }
}
