//! Songbook API service
//!
//! Public song listing and search, admin-only song management, and the
//! login/logout routes from the `auth` crate, served next to the static
//! frontend.

pub mod config;
pub mod error;
pub mod models;
pub mod repositories;
pub mod routes;
pub mod state;
pub mod sweep;

pub use routes::create_router;
pub use state::AppState;
