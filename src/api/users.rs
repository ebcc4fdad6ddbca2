// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Role lookups.

use axum::{
    extract::{Path, State},
    Json,
};

use crate::{
    auth::Role,
    error::ApiError,
    models::UserView,
    state::AppState,
    storage::UserId,
};

fn parse_role(raw: &str) -> Result<Role, ApiError> {
    Role::from_str(raw).ok_or_else(|| ApiError::bad_request(format!("Unknown role: {raw}")))
}

/// List users holding a role.
#[utoipa::path(
    get,
    path = "/users/role/{role}",
    params(("role" = String, Path, description = "super_admin, admin or user")),
    tag = "Users",
    responses(
        (status = 200, description = "Users with the role", body = [UserView]),
        (status = 400, description = "Unknown role"),
        (status = 404, description = "No user holds the role"),
    )
)]
pub async fn users_with_role(
    State(state): State<AppState>,
    Path(role): Path<String>,
) -> Result<Json<Vec<UserView>>, ApiError> {
    let role = parse_role(&role)?;
    let users = state.users.with_role(role)?;
    if users.is_empty() {
        return Err(ApiError::not_found("No users found with the specified role"));
    }
    Ok(Json(users.iter().map(UserView::from).collect()))
}

/// A single user, only if it holds the role.
#[utoipa::path(
    get,
    path = "/users/role/{role}/{id}",
    params(
        ("role" = String, Path, description = "super_admin, admin or user"),
        ("id" = String, Path, description = "User ID"),
    ),
    tag = "Users",
    responses(
        (status = 200, description = "Matching user", body = UserView),
        (status = 400, description = "Unknown role"),
        (status = 404, description = "No user with this ID holds the role"),
    )
)]
pub async fn user_with_role(
    State(state): State<AppState>,
    Path((role, id)): Path<(String, String)>,
) -> Result<Json<UserView>, ApiError> {
    let role = parse_role(&role)?;
    let not_found = || ApiError::not_found("No user found with the specified role and ID");

    // A non-numeric ID can never match
    let id: UserId = id.parse().map_err(|_| not_found())?;
    let user = state.users.with_role_and_id(role, id)?.ok_or_else(not_found)?;
    Ok(Json(UserView::from(&user)))
}
