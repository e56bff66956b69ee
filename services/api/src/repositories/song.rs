//! Song repository for database operations

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgPool, Row, postgres::PgRow};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::{Song, SongInput};

/// Storage for songs
#[async_trait]
pub trait SongStore: Send + Sync {
    /// Get all songs in creation order
    async fn get_all(&self) -> Result<Vec<Song>>;

    /// Songs whose title contains `term`, ignoring case
    async fn search_by_title(&self, term: &str) -> Result<Vec<Song>>;

    async fn get_by_id(&self, id: Uuid) -> Result<Option<Song>>;

    async fn create(&self, input: &SongInput) -> Result<Song>;

    /// Overwrite title and author and any optional field that is set.
    /// Returns `None` when no song has this id.
    async fn update(&self, id: Uuid, input: &SongInput) -> Result<Option<Song>>;

    /// Returns whether a song was removed
    async fn delete(&self, id: Uuid) -> Result<bool>;
}

/// Escape LIKE wildcards so the term matches literally
pub fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// PostgreSQL-backed song repository
#[derive(Clone)]
pub struct SongRepository {
    pool: PgPool,
}

impl SongRepository {
    /// Create a new song repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn song_from_row(row: &PgRow) -> Result<Song> {
    Ok(Song {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        author: row.try_get("author")?,
        length: row.try_get("length")?,
        cover: row.try_get("cover")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[async_trait]
impl SongStore for SongRepository {
    async fn get_all(&self) -> Result<Vec<Song>> {
        let rows = sqlx::query(
            r#"
            SELECT id, title, author, length, cover, created_at, updated_at
            FROM songs
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(song_from_row).collect()
    }

    async fn search_by_title(&self, term: &str) -> Result<Vec<Song>> {
        let rows = sqlx::query(
            r#"
            SELECT id, title, author, length, cover, created_at, updated_at
            FROM songs
            WHERE title ILIKE '%' || $1 || '%' ESCAPE '\'
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(escape_like(term))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(song_from_row).collect()
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<Song>> {
        let row = sqlx::query(
            r#"
            SELECT id, title, author, length, cover, created_at, updated_at
            FROM songs
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(song_from_row).transpose()
    }

    async fn create(&self, input: &SongInput) -> Result<Song> {
        let row = sqlx::query(
            r#"
            INSERT INTO songs (id, title, author, length, cover)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, title, author, length, cover, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&input.title)
        .bind(&input.author)
        .bind(input.length)
        .bind(&input.cover)
        .fetch_one(&self.pool)
        .await?;

        song_from_row(&row)
    }

    async fn update(&self, id: Uuid, input: &SongInput) -> Result<Option<Song>> {
        let row = sqlx::query(
            r#"
            UPDATE songs
            SET title = $2,
                author = $3,
                length = COALESCE($4, length),
                cover = COALESCE($5, cover),
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, title, author, length, cover, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(&input.title)
        .bind(&input.author)
        .bind(input.length)
        .bind(&input.cover)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(song_from_row).transpose()
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM songs WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

/// In-memory song repository; keeps insertion order
#[derive(Clone, Default)]
pub struct InMemorySongRepository {
    songs: Arc<RwLock<Vec<Song>>>,
}

impl InMemorySongRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SongStore for InMemorySongRepository {
    async fn get_all(&self) -> Result<Vec<Song>> {
        Ok(self.songs.read().await.clone())
    }

    async fn search_by_title(&self, term: &str) -> Result<Vec<Song>> {
        let needle = term.to_lowercase();
        let songs = self.songs.read().await;

        Ok(songs
            .iter()
            .filter(|song| song.title.to_lowercase().contains(&needle))
            .cloned()
            .collect())
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<Song>> {
        let songs = self.songs.read().await;
        Ok(songs.iter().find(|song| song.id == id).cloned())
    }

    async fn create(&self, input: &SongInput) -> Result<Song> {
        let now = Utc::now();
        let song = Song {
            id: Uuid::new_v4(),
            title: input.title.clone(),
            author: input.author.clone(),
            length: input.length,
            cover: input.cover.clone(),
            created_at: now,
            updated_at: now,
        };

        self.songs.write().await.push(song.clone());
        Ok(song)
    }

    async fn update(&self, id: Uuid, input: &SongInput) -> Result<Option<Song>> {
        let mut songs = self.songs.write().await;
        let Some(song) = songs.iter_mut().find(|song| song.id == id) else {
            return Ok(None);
        };

        song.title = input.title.clone();
        song.author = input.author.clone();
        if input.length.is_some() {
            song.length = input.length;
        }
        if input.cover.is_some() {
            song.cover = input.cover.clone();
        }
        song.updated_at = Utc::now();

        Ok(Some(song.clone()))
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let mut songs = self.songs.write().await;
        let before = songs.len();
        songs.retain(|song| song.id != id);
        Ok(songs.len() < before)
    }
}
