//! Revoked token registry
//!
//! Three backends share the [`RevocationStore`] trait: a PostgreSQL table, a
//! Redis keyspace with native TTLs and a bounded in-memory map. Expired
//! entries are dropped by `purge_expired`, which the sweep job calls.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::cache::RedisPool;
use sqlx::PgPool;
use std::{collections::HashMap, sync::Arc};
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::models::RevokedToken;

/// Default bound of the in-memory registry
pub const DEFAULT_MAX_ENTRIES: usize = 10_000;

/// Registry of tokens that must be rejected before their natural expiry
#[async_trait]
pub trait RevocationStore: Send + Sync {
    /// Record a token as revoked until `expires_at`. Revoking an already
    /// revoked token succeeds without changing anything.
    async fn revoke(&self, token: &str, expires_at: DateTime<Utc>) -> Result<()>;

    /// Check whether a token has been revoked
    async fn is_revoked(&self, token: &str) -> Result<bool>;

    /// Drop entries whose token has expired on its own; returns how many
    async fn purge_expired(&self) -> Result<u64>;
}

/// PostgreSQL-backed registry (`revoked_tokens` table)
#[derive(Clone)]
pub struct RevocationRepository {
    pool: PgPool,
}

impl RevocationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RevocationStore for RevocationRepository {
    async fn revoke(&self, token: &str, expires_at: DateTime<Utc>) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO revoked_tokens (token, expires_at)
            VALUES ($1, $2)
            ON CONFLICT (token) DO NOTHING
            "#,
        )
        .bind(token)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn is_revoked(&self, token: &str) -> Result<bool> {
        let revoked: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM revoked_tokens WHERE token = $1)")
                .bind(token)
                .fetch_one(&self.pool)
                .await?;

        Ok(revoked)
    }

    async fn purge_expired(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM revoked_tokens WHERE expires_at <= NOW()")
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

/// Redis-backed registry; keys expire together with the token
#[derive(Clone)]
pub struct RedisRevocationRepository {
    redis_pool: RedisPool,
}

impl RedisRevocationRepository {
    pub fn new(redis_pool: RedisPool) -> Self {
        Self { redis_pool }
    }

    fn key(token: &str) -> String {
        format!("revoked_token:{}", token)
    }
}

#[async_trait]
impl RevocationStore for RedisRevocationRepository {
    async fn revoke(&self, token: &str, expires_at: DateTime<Utc>) -> Result<()> {
        let remaining = (expires_at - Utc::now()).num_seconds();
        if remaining <= 0 {
            // Already unusable; SET EX rejects a zero TTL
            return Ok(());
        }

        self.redis_pool
            .set(&Self::key(token), "1", Some(remaining as u64))
            .await
    }

    async fn is_revoked(&self, token: &str) -> Result<bool> {
        self.redis_pool.exists(&Self::key(token)).await
    }

    async fn purge_expired(&self) -> Result<u64> {
        // Redis expires keys with TTL on its own
        Ok(0)
    }
}

/// Bounded in-memory registry.
///
/// A full registry refuses new entries instead of evicting live ones, since
/// an evicted token would become acceptable again.
#[derive(Clone)]
pub struct InMemoryRevocationRepository {
    entries: Arc<RwLock<HashMap<String, RevokedToken>>>,
    max_entries: usize,
}

impl InMemoryRevocationRepository {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            max_entries,
        }
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

impl Default for InMemoryRevocationRepository {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ENTRIES)
    }
}

fn purge_map(entries: &mut HashMap<String, RevokedToken>, now: DateTime<Utc>) -> u64 {
    let before = entries.len();
    entries.retain(|_, entry| !entry.is_expired_at(now));
    (before - entries.len()) as u64
}

#[async_trait]
impl RevocationStore for InMemoryRevocationRepository {
    async fn revoke(&self, token: &str, expires_at: DateTime<Utc>) -> Result<()> {
        let mut entries = self.entries.write().await;

        if entries.contains_key(token) {
            return Ok(());
        }

        if entries.len() >= self.max_entries {
            let purged = purge_map(&mut entries, Utc::now());
            if purged > 0 {
                info!("Purged {} expired revocations to make room", purged);
            }
        }

        if entries.len() >= self.max_entries {
            warn!(
                "Revocation registry full ({} entries), refusing new entry",
                self.max_entries
            );
            anyhow::bail!("Revocation registry is full");
        }

        entries.insert(token.to_string(), RevokedToken::new(token, expires_at));
        Ok(())
    }

    async fn is_revoked(&self, token: &str) -> Result<bool> {
        Ok(self.entries.read().await.contains_key(token))
    }

    async fn purge_expired(&self) -> Result<u64> {
        let mut entries = self.entries.write().await;
        Ok(purge_map(&mut entries, Utc::now()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[tokio::test]
    async fn test_revoke_then_lookup() {
        let store = InMemoryRevocationRepository::default();
        let expires_at = Utc::now() + Duration::hours(1);

        assert!(!store.is_revoked("token-a").await.unwrap());
        store.revoke("token-a", expires_at).await.unwrap();
        assert!(store.is_revoked("token-a").await.unwrap());
        assert!(!store.is_revoked("token-b").await.unwrap());
    }

    #[tokio::test]
    async fn test_revoke_twice_is_noop() {
        let store = InMemoryRevocationRepository::default();
        let expires_at = Utc::now() + Duration::hours(1);

        store.revoke("token-a", expires_at).await.unwrap();
        store.revoke("token-a", expires_at).await.unwrap();
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_purge_drops_only_expired_entries() {
        let store = InMemoryRevocationRepository::default();
        store
            .revoke("expired", Utc::now() - Duration::seconds(1))
            .await
            .unwrap();
        store
            .revoke("live", Utc::now() + Duration::hours(1))
            .await
            .unwrap();

        assert_eq!(store.purge_expired().await.unwrap(), 1);
        assert!(!store.is_revoked("expired").await.unwrap());
        assert!(store.is_revoked("live").await.unwrap());
    }

    #[tokio::test]
    async fn test_full_registry_purges_before_refusing() {
        let store = InMemoryRevocationRepository::new(2);
        store
            .revoke("expired", Utc::now() - Duration::seconds(1))
            .await
            .unwrap();
        store
            .revoke("live-1", Utc::now() + Duration::hours(1))
            .await
            .unwrap();

        // Room is made by dropping the expired entry
        store
            .revoke("live-2", Utc::now() + Duration::hours(1))
            .await
            .unwrap();
        assert_eq!(store.len().await, 2);

        // No expired entries left: live revocations are never evicted
        let result = store
            .revoke("live-3", Utc::now() + Duration::hours(1))
            .await;
        assert!(result.is_err());
        assert!(store.is_revoked("live-1").await.unwrap());
        assert!(store.is_revoked("live-2").await.unwrap());
    }
}
