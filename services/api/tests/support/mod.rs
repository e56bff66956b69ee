//! Shared helpers for the API integration tests

#![allow(dead_code)]

use api::{AppState, create_router, repositories::InMemorySongRepository};
use auth::{
    AuthState,
    jwt::{JwtConfig, JwtService},
    models::{NewUser, Role},
    rate_limiter::{RateLimiter, RateLimiterConfig},
    repositories::{InMemoryRevocationRepository, InMemoryUserRepository, user::ensure_user},
};
use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use serde_json::Value;
use std::{path::PathBuf, sync::Arc};
use tower::util::ServiceExt; // for `oneshot` method

pub const ADMIN_USERNAME: &str = "admin";
pub const ADMIN_PASSWORD: &str = "Adm1n!pass";
pub const USER_USERNAME: &str = "listener";
pub const USER_PASSWORD: &str = "L1sten!pass";
pub const JWT_SECRET: &str = "test-secret";

/// Directory of the bundled frontend
pub fn frontend_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../frontend")
}

/// Test helper: app with in-memory stores, one admin and one regular user
pub async fn setup_app() -> Router {
    setup_app_with_rate_limit(RateLimiterConfig::default()).await
}

pub async fn setup_app_with_rate_limit(rate_limit: RateLimiterConfig) -> Router {
    let state = setup_state(rate_limit).await;
    create_router(state, &frontend_dir())
}

/// Test helper: the state behind [`setup_app`], for tests that also drive
/// the stores or the sweep directly
pub async fn setup_state(rate_limit: RateLimiterConfig) -> AppState {
    let users = Arc::new(InMemoryUserRepository::new());

    for (username, password, role) in [
        (ADMIN_USERNAME, ADMIN_PASSWORD, Role::Admin),
        (USER_USERNAME, USER_PASSWORD, Role::User),
    ] {
        let new_user = NewUser {
            username: username.to_string(),
            password: password.to_string(),
            role,
        };
        ensure_user(users.as_ref(), &new_user)
            .await
            .expect("Should create test user");
    }

    let jwt_service = JwtService::new(JwtConfig {
        secret: JWT_SECRET.to_string(),
        token_expiry: 3600,
    })
    .expect("Should create JWT service");

    let auth = AuthState {
        jwt_service,
        users,
        revocations: Arc::new(InMemoryRevocationRepository::default()),
        rate_limiter: RateLimiter::new(rate_limit.clone()),
    };

    AppState::new(Arc::new(InMemorySongRepository::new()), auth, rate_limit)
}

/// Test helper: send a request and return the status and the JSON body
/// (`Value::Null` when the body is not JSON)
pub async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);

    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }

    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Should read body");

    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

/// Test helper: log in and return the issued token
pub async fn login(app: &Router, username: &str, password: &str) -> String {
    let (status, body) = send(
        app,
        Method::POST,
        "/login",
        None,
        Some(serde_json::json!({ "username": username, "password": password })),
    )
    .await;

    assert_eq!(status, StatusCode::OK, "login failed: {}", body);
    body["token"]
        .as_str()
        .expect("Login response should carry a token")
        .to_string()
}

pub async fn admin_token(app: &Router) -> String {
    login(app, ADMIN_USERNAME, ADMIN_PASSWORD).await
}

pub async fn user_token(app: &Router) -> String {
    login(app, USER_USERNAME, USER_PASSWORD).await
}
