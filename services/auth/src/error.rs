//! Error type for the authentication gate and the auth routes

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// Custom error type for authentication errors
#[derive(Error, Debug)]
pub enum AuthError {
    /// No bearer token on a protected route
    #[error("Access token required")]
    MissingToken,

    /// Token found in the revocation registry
    #[error("Token revoked")]
    TokenRevoked,

    /// Signature or expiry check failed
    #[error("Invalid token")]
    InvalidToken,

    /// Authenticated, but the role does not match
    #[error("Admin access required")]
    Forbidden,

    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Logout called without a bearer token
    #[error("No token provided")]
    NoTokenProvided,

    #[error("Too many requests")]
    TooManyRequests,

    #[error("{0}")]
    BadRequest(String),

    /// Unexpected failure; the message is returned to the caller as is
    #[error("{0}")]
    Internal(&'static str),
}

impl AuthError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::MissingToken
            | AuthError::TokenRevoked
            | AuthError::InvalidCredentials
            | AuthError::NoTokenProvided => StatusCode::UNAUTHORIZED,
            AuthError::InvalidToken | AuthError::Forbidden => StatusCode::FORBIDDEN,
            AuthError::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
            AuthError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "success": false,
            "message": self.to_string(),
        }));

        (self.status_code(), body).into_response()
    }
}
