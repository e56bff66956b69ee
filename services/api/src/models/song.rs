//! Song models for the API service

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Song record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Song {
    pub id: Uuid,
    pub title: String,
    pub author: String,
    /// Length in seconds
    pub length: Option<f64>,
    /// Cover image URL
    pub cover: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Body of POST /songs and PUT /songs/:id, before validation
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SongPayload {
    pub title: Option<String>,
    pub author: Option<String>,
    pub length: Option<f64>,
    pub cover: Option<String>,
}

/// Validated song fields handed to the repository.
///
/// On update, `None` optional fields keep their stored value.
#[derive(Debug, Clone, PartialEq)]
pub struct SongInput {
    pub title: String,
    pub author: String,
    pub length: Option<f64>,
    pub cover: Option<String>,
}

impl SongPayload {
    /// Check required fields and value ranges
    pub fn validate(self) -> Result<SongInput, String> {
        let title = non_blank(self.title);
        let author = non_blank(self.author);

        let (Some(title), Some(author)) = (title, author) else {
            return Err("Required fields missing".to_string());
        };

        if let Some(length) = self.length {
            if !length.is_finite() || length < 0.0 {
                return Err("Song length must be a non-negative number of seconds".to_string());
            }
        }

        Ok(SongInput {
            title,
            author,
            length: self.length,
            cover: non_blank(self.cover),
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Query parameters for GET /songs/search
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchQuery {
    /// Case-insensitive substring of the title
    pub q: Option<String>,
}

impl SearchQuery {
    pub fn term(&self) -> &str {
        self.q.as_deref().unwrap_or("")
    }
}
