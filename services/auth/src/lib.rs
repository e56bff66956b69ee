//! Authentication for the songbook API
//!
//! Issues HS256 bearer tokens on login, revokes them on logout, and provides
//! the authentication gate and role gate middleware used to protect routes.

pub mod error;
pub mod jwt;
pub mod middleware;
pub mod models;
pub mod rate_limiter;
pub mod repositories;
pub mod routes;
pub mod validation;

use std::sync::Arc;

use crate::{
    jwt::JwtService,
    rate_limiter::RateLimiter,
    repositories::{RevocationStore, UserStore},
};

/// State shared by the auth routes and middleware
#[derive(Clone)]
pub struct AuthState {
    pub jwt_service: JwtService,
    pub users: Arc<dyn UserStore>,
    pub revocations: Arc<dyn RevocationStore>,
    /// Guards the login route
    pub rate_limiter: RateLimiter,
}
