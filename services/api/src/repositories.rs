//! Repositories for database operations

pub mod song;

pub use song::{InMemorySongRepository, SongRepository, SongStore};
