//! Middleware for JWT token validation, role checks and rate limiting

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use std::net::SocketAddr;
use tracing::{error, warn};

use crate::{
    AuthState,
    error::AuthError,
    models::{AuthUser, Role},
    rate_limiter::RateLimiter,
};

/// Authentication gate.
///
/// Rejects requests without a bearer token, with a revoked token, or with a
/// token whose signature or expiry does not verify. Accepted requests get an
/// [`AuthUser`] in their extensions.
pub async fn authenticate(
    State(state): State<AuthState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let TypedHeader(Authorization(bearer)) = bearer.ok_or(AuthError::MissingToken)?;
    let token = bearer.token();

    // The registry is consulted first: a revoked token stays rejected even
    // while its own expiry is in the future
    let revoked = state.revocations.is_revoked(token).await.map_err(|e| {
        error!("Failed to check token revocation: {}", e);
        AuthError::Internal("Authentication failed")
    })?;

    if revoked {
        warn!("Rejected revoked token");
        return Err(AuthError::TokenRevoked);
    }

    let claims = state.jwt_service.validate_token(token).map_err(|e| {
        warn!("Failed to validate token: {}", e);
        AuthError::InvalidToken
    })?;

    req.extensions_mut().insert(AuthUser::from(claims));

    Ok(next.run(req).await)
}

/// Role gate; must run after [`authenticate`]
pub async fn require_role(required: Role, req: Request, next: Next) -> Result<Response, AuthError> {
    let user = req
        .extensions()
        .get::<AuthUser>()
        .ok_or(AuthError::MissingToken)?;

    if !user.has_role(required) {
        warn!("User {} with role {} denied, {} required", user.id, user.role, required);
        return Err(AuthError::Forbidden);
    }

    Ok(next.run(req).await)
}

/// Role gate for administrators
pub async fn require_admin(req: Request, next: Next) -> Result<Response, AuthError> {
    require_role(Role::Admin, req, next).await
}

/// Per-client rate limit, keyed by the peer IP address.
///
/// The limiter is the middleware state, so independent limiters can guard
/// different route groups.
pub async fn rate_limit(
    State(limiter): State<RateLimiter>,
    req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let key = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string());

    if !limiter.is_allowed(&key).await {
        warn!("Rate limit exceeded for {}", key);
        return Err(AuthError::TooManyRequests);
    }

    Ok(next.run(req).await)
}
