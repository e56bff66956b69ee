//! Authentication service models

pub mod revoked_token;
pub mod role;
pub mod user;

// Re-export for convenience
pub use revoked_token::RevokedToken;
pub use role::Role;
pub use user::{AuthUser, LoginCredentials, NewUser, User};
