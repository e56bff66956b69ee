//! Authentication routes: login, logout and the admin placeholder

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use serde::Serialize;
use serde_json::json;
use tracing::{error, info, warn};

use crate::{
    AuthState,
    error::AuthError,
    jwt::decode_expiry_unverified,
    middleware::{authenticate, rate_limit, require_admin},
    models::{AuthUser, LoginCredentials},
    repositories::user::verify_password,
};

/// Response for user login
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub success: bool,
    pub token: String,
}

/// Create the router for the authentication routes
pub fn create_router(state: AuthState) -> Router {
    let login_routes = Router::new()
        .route("/login", post(login))
        .route_layer(middleware::from_fn_with_state(
            state.rate_limiter.clone(),
            rate_limit,
        ));

    let admin_routes = Router::new()
        .route("/admin", get(admin_panel))
        .route_layer(middleware::from_fn(require_admin))
        .route_layer(middleware::from_fn_with_state(state.clone(), authenticate));

    Router::new()
        .route("/logout", post(logout))
        .merge(login_routes)
        .merge(admin_routes)
        .with_state(state)
}

/// User login endpoint
pub async fn login(
    State(state): State<AuthState>,
    payload: Result<Json<LoginCredentials>, JsonRejection>,
) -> Result<impl IntoResponse, AuthError> {
    let Json(credentials) = payload.map_err(|e| AuthError::BadRequest(e.body_text()))?;
    info!("Login attempt for user: {}", credentials.username);

    let user = state
        .users
        .find_by_username(&credentials.username)
        .await
        .map_err(|e| {
            error!("Failed to look up user: {}", e);
            AuthError::Internal("Login failed")
        })?;

    let Some(user) = user else {
        warn!("Login failed for unknown user: {}", credentials.username);
        return Err(AuthError::InvalidCredentials);
    };

    let valid = verify_password(&user, &credentials.password).map_err(|e| {
        error!("Failed to verify password for {}: {}", user.username, e);
        AuthError::Internal("Login failed")
    })?;

    if !valid {
        warn!("Login failed for user: {}", user.username);
        return Err(AuthError::InvalidCredentials);
    }

    let token = state.jwt_service.generate_token(&user).map_err(|e| {
        error!("Failed to generate token: {}", e);
        AuthError::Internal("Login failed")
    })?;

    info!("User {} logged in", user.username);

    Ok(Json(LoginResponse {
        success: true,
        token,
    }))
}

/// Logout endpoint: revokes the presented token until its own expiry
pub async fn logout(
    State(state): State<AuthState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
) -> Result<impl IntoResponse, AuthError> {
    let TypedHeader(Authorization(bearer)) = bearer.ok_or(AuthError::NoTokenProvided)?;
    let token = bearer.token();

    match decode_expiry_unverified(token) {
        Some(expires_at) => {
            state
                .revocations
                .revoke(token, expires_at)
                .await
                .map_err(|e| {
                    error!("Failed to revoke token: {}", e);
                    AuthError::Internal("Logout failed")
                })?;
            info!("Token revoked until {}", expires_at);
        }
        // Without a readable expiry the token can never pass the gate
        None => warn!("Logout with an undecodable token, nothing to revoke"),
    }

    Ok(Json(json!({
        "success": true,
        "message": "Logged out successfully",
    })))
}

/// Admin-only placeholder endpoint
pub async fn admin_panel(user: AuthUser) -> impl IntoResponse {
    info!("Admin panel accessed by {}", user.id);

    Json(json!({
        "success": true,
        "message": "Welcome to admin panel",
    }))
}
