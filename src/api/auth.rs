// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Session endpoints under `/auth`.

use axum::{body::Bytes, extract::State, Json};

use crate::{
    auth::{Auth, AuthError},
    models::{
        LoginRequest, LogoutRequest, MessageResponse, RefreshRequest, RegisterRequest,
        TokenLifeResponse, TokenResponse, UserProfile, ValidateTokenResponse,
    },
    state::AppState,
};

#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    tag = "Auth",
    responses(
        (status = 200, description = "Token pair issued", body = TokenResponse),
        (status = 400, description = "Missing email or password"),
        (status = 401, description = "Invalid credentials"),
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, AuthError> {
    let tokens = state.sessions.login(&request.email, &request.password)?;
    Ok(Json(tokens))
}

#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterRequest,
    tag = "Auth",
    responses(
        (status = 200, description = "User created and logged in", body = TokenResponse),
        (status = 400, description = "Validation failed"),
    )
)]
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<Json<TokenResponse>, AuthError> {
    Ok(Json(state.sessions.register(request)?))
}

/// Exchange a refresh token for a new pair. The old refresh token stops
/// working immediately.
#[utoipa::path(
    post,
    path = "/auth/refresh",
    request_body = RefreshRequest,
    tag = "Auth",
    responses(
        (status = 200, description = "Rotated token pair", body = TokenResponse),
        (status = 401, description = "Refresh token unknown, used or expired"),
    )
)]
pub async fn refresh(
    State(state): State<AppState>,
    Json(request): Json<RefreshRequest>,
) -> Result<Json<TokenResponse>, AuthError> {
    Ok(Json(state.sessions.refresh(&request.refresh_token)?))
}

/// The body is optional; an empty body only checks the bearer token.
#[utoipa::path(
    post,
    path = "/auth/logout",
    request_body(content = LogoutRequest, description = "Refresh token to revoke"),
    tag = "Auth",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Logged out", body = MessageResponse),
        (status = 401, description = "Missing or invalid access token"),
    )
)]
pub async fn logout(
    Auth(user): Auth,
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<MessageResponse>, AuthError> {
    let request = if body.iter().all(u8::is_ascii_whitespace) {
        LogoutRequest::default()
    } else {
        serde_json::from_slice::<LogoutRequest>(&body)
            .map_err(|e| AuthError::ValidationFailed(format!("Invalid logout body: {e}")))?
    };

    state
        .sessions
        .logout(&user, request.refresh_token.as_deref())?;

    Ok(Json(MessageResponse {
        message: "Successfully logged out".to_string(),
    }))
}

#[utoipa::path(
    post,
    path = "/auth/me",
    tag = "Auth",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Current user with roles and permissions", body = UserProfile),
        (status = 401, description = "Missing or invalid access token"),
    )
)]
pub async fn me(
    Auth(user): Auth,
    State(state): State<AppState>,
) -> Result<Json<UserProfile>, AuthError> {
    Ok(Json(state.sessions.profile(&user)?))
}

#[utoipa::path(
    get,
    path = "/auth/validate-token",
    tag = "Auth",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Token is valid", body = ValidateTokenResponse),
        (status = 401, description = "Token absent, expired or invalid"),
        (status = 404, description = "Token subject no longer exists"),
    )
)]
pub async fn validate_token(
    Auth(user): Auth,
    State(state): State<AppState>,
) -> Result<Json<ValidateTokenResponse>, AuthError> {
    Ok(Json(state.sessions.validate(&user)?))
}

#[utoipa::path(
    get,
    path = "/auth/token-life",
    tag = "Auth",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Remaining access token lifetime", body = TokenLifeResponse),
        (status = 401, description = "Token absent, expired or invalid"),
    )
)]
pub async fn token_life(Auth(user): Auth, State(state): State<AppState>) -> Json<TokenLifeResponse> {
    Json(state.sessions.token_life(&user))
}
