// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    api::health::{HealthChecks, HealthResponse, ReadyResponse, VersionResponse},
    auth::{Permission, Role},
    catalog::{DatasetDetail, DatasetList, DatasetPage, DatasetSummary, Tag},
    models::{
        LoginRequest, LogoutRequest, MessageResponse, RefreshRequest, RegisterRequest, RoleView,
        TokenLifeResponse, TokenResponse, UserProfile, UserView, ValidateTokenResponse,
    },
    state::AppState,
};

pub mod auth;
pub mod catalog;
pub mod health;
pub mod users;

pub fn router(state: AppState) -> Router {
    let auth_routes = Router::new()
        .route("/login", post(auth::login))
        .route("/register", post(auth::register))
        .route("/refresh", post(auth::refresh))
        .route("/logout", post(auth::logout))
        .route("/me", post(auth::me))
        .route("/validate-token", get(auth::validate_token))
        .route("/token-life", get(auth::token_life));

    let app_routes = Router::new()
        .route("/", get(health::version))
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .nest("/auth", auth_routes)
        .route("/users/role/{role}", get(users::users_with_role))
        .route("/users/role/{role}/{id}", get(users::user_with_role))
        .route("/ckan-datasets", get(catalog::list_datasets))
        .route("/ckan-datasets/details/{id}", get(catalog::dataset_details))
        .route("/ckan-datasets-by-tag/{tag}", get(catalog::datasets_by_tag))
        .route(
            "/ckan-datasets/most_downloaded/{rows}",
            get(catalog::most_downloaded),
        )
        .route("/ckan-datasets/latest/{rows}", get(catalog::latest))
        .route(
            "/ckan-datasets/most_searched/{rows}",
            get(catalog::most_searched),
        )
        .route("/ckan-datasets/search", get(catalog::search))
        .with_state(state);

    Router::new()
        .merge(app_routes)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(CorsLayer::permissive())
}

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::login,
        auth::register,
        auth::refresh,
        auth::logout,
        auth::me,
        auth::validate_token,
        auth::token_life,
        users::users_with_role,
        users::user_with_role,
        catalog::list_datasets,
        catalog::dataset_details,
        catalog::datasets_by_tag,
        catalog::most_downloaded,
        catalog::latest,
        catalog::most_searched,
        catalog::search,
        health::health,
        health::liveness,
        health::readiness,
        health::version
    ),
    components(
        schemas(
            LoginRequest,
            RegisterRequest,
            RefreshRequest,
            LogoutRequest,
            TokenResponse,
            ValidateTokenResponse,
            TokenLifeResponse,
            MessageResponse,
            UserView,
            UserProfile,
            RoleView,
            Role,
            Permission,
            DatasetSummary,
            DatasetDetail,
            DatasetPage,
            DatasetList,
            Tag,
            ReadyResponse,
            HealthChecks,
            HealthResponse,
            VersionResponse
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "Auth", description = "Login, registration and token lifecycle"),
        (name = "Users", description = "Role lookups"),
        (name = "Catalog", description = "CKAN open-data catalog"),
        (name = "Health", description = "Liveness and readiness")
    )
)]
struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::TestContext;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, body)
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_with_bearer(uri: &str, token: Option<&str>) -> Request<Body> {
        let mut builder = Request::get(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        builder.body(Body::empty()).unwrap()
    }

    #[test]
    fn openapi_documents_bearer_scheme() {
        let doc = ApiDoc::openapi();
        let components = doc.components.unwrap();
        assert!(components.security_schemes.contains_key("bearer"));
        assert!(doc.paths.paths.contains_key("/auth/login"));
        assert!(doc.paths.paths.contains_key("/ckan-datasets/most_searched/{rows}"));
    }

    #[tokio::test]
    async fn login_refresh_and_replay() {
        let ctx = TestContext::new();
        let app = router(ctx.state.clone());

        let (status, tokens) = send(
            &app,
            post_json(
                "/auth/login",
                json!({"email": "user@example.com", "password": "password"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(tokens["token_type"], "bearer");
        let original = tokens["refresh_token"].as_str().unwrap().to_string();

        let (status, body) = send(
            &app,
            post_json(
                "/auth/login",
                json!({"email": "user@example.com", "password": "wrong"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error_code"], "invalid_credentials");

        let (status, rotated) = send(
            &app,
            post_json("/auth/refresh", json!({"refresh_token": original})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_ne!(rotated["refresh_token"].as_str().unwrap(), original);

        let (status, body) = send(
            &app,
            post_json("/auth/refresh", json!({"refresh_token": original})),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error_code"], "refresh_token_not_found");
    }

    #[tokio::test]
    async fn validate_token_rejects_absent_and_garbled() {
        let ctx = TestContext::new();
        let app = router(ctx.state.clone());

        let (status, body) = send(&app, get_with_bearer("/auth/validate-token", None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error_code"], "token_absent");

        let (status, body) = send(
            &app,
            get_with_bearer("/auth/validate-token", Some("not.a.jwt")),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error_code"], "token_invalid");
    }

    #[tokio::test]
    async fn validate_token_accepts_fresh_login() {
        let ctx = TestContext::new();
        let app = router(ctx.state.clone());
        let tokens = ctx
            .state
            .sessions
            .login("admin@example.com", "password")
            .unwrap();

        let (status, body) = send(
            &app,
            get_with_bearer("/auth/validate-token", Some(tokens.access_token.as_str())),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["valid"], true);
        assert_eq!(body["user"]["email"], "admin@example.com");
    }

    #[tokio::test]
    async fn expired_access_token_is_reported() {
        let ctx = TestContext::new();
        let app = router(ctx.state.clone());
        let tokens = ctx
            .state
            .sessions
            .login("user@example.com", "password")
            .unwrap();

        ctx.clock
            .advance(chrono::Duration::seconds(tokens.expires_in + 1));
        let (status, body) = send(
            &app,
            get_with_bearer("/auth/token-life", Some(tokens.access_token.as_str())),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error_code"], "token_expired");
    }

    #[tokio::test]
    async fn register_then_me() {
        let ctx = TestContext::new();
        let app = router(ctx.state.clone());

        let (status, tokens) = send(
            &app,
            post_json(
                "/auth/register",
                json!({
                    "name": "New User",
                    "email": "new@example.com",
                    "password": "longenough",
                    "password_confirmation": "longenough"
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let access = tokens["access_token"].as_str().unwrap();

        let request = Request::post("/auth/me")
            .header(header::AUTHORIZATION, format!("Bearer {access}"))
            .body(Body::empty())
            .unwrap();
        let (status, profile) = send(&app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(profile["email"], "new@example.com");
        assert_eq!(profile["roles"][0]["name"], "user");
    }

    #[tokio::test]
    async fn logout_revokes_supplied_refresh_token() {
        let ctx = TestContext::new();
        let app = router(ctx.state.clone());
        let tokens = ctx
            .state
            .sessions
            .login("user@example.com", "password")
            .unwrap();

        let request = Request::post("/auth/logout")
            .header(header::AUTHORIZATION, format!("Bearer {}", tokens.access_token))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                json!({"refresh_token": tokens.refresh_token}).to_string(),
            ))
            .unwrap();
        let (status, body) = send(&app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Successfully logged out");

        let (status, _) = send(
            &app,
            post_json("/auth/refresh", json!({"refresh_token": tokens.refresh_token})),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn role_lookup_routes() {
        let ctx = TestContext::new();
        let app = router(ctx.state.clone());

        let (status, users) = send(&app, get_with_bearer("/users/role/super_admin", None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(users[0]["email"], "superadmin@example.com");

        let (status, body) = send(&app, get_with_bearer("/users/role/owner", None)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn responses_carry_request_id() {
        let ctx = TestContext::new();
        let app = router(ctx.state.clone());

        let response = app
            .oneshot(get_with_bearer("/health/live", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
    }
}
