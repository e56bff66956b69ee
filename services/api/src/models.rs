//! API models for request and response payloads

pub mod song;

pub use song::{SearchQuery, Song, SongInput, SongPayload};
