//! Application state shared across handlers

use anyhow::Result;
use auth::{
    AuthState,
    jwt::JwtService,
    rate_limiter::{RateLimiter, RateLimiterConfig},
    repositories::{
        InMemoryRevocationRepository, InMemoryUserRepository, RedisRevocationRepository,
        RevocationRepository, RevocationStore, UserRepository, UserStore,
    },
};
use axum::extract::FromRef;
use common::{
    cache::RedisPool,
    database::{health_check, init_pool, run_migrations},
};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::info;

use crate::{
    config::{AppConfig, RevocationBackend, StorageBackend},
    repositories::{InMemorySongRepository, SongRepository, SongStore},
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub songs: Arc<dyn SongStore>,
    pub auth: AuthState,
    /// Applies to every request
    pub global_limiter: RateLimiter,
    /// Applies to the song routes on top of the global limit
    pub song_limiter: RateLimiter,
}

impl FromRef<AppState> for AuthState {
    fn from_ref(state: &AppState) -> Self {
        state.auth.clone()
    }
}

impl AppState {
    pub fn new(songs: Arc<dyn SongStore>, auth: AuthState, rate_limit: RateLimiterConfig) -> Self {
        Self {
            songs,
            auth,
            global_limiter: RateLimiter::new(rate_limit.clone()),
            song_limiter: RateLimiter::new(rate_limit),
        }
    }

    /// Every limiter whose stale entries the sweep purges
    pub fn rate_limiters(&self) -> Vec<RateLimiter> {
        vec![
            self.global_limiter.clone(),
            self.song_limiter.clone(),
            self.auth.rate_limiter.clone(),
        ]
    }

    /// Connect the configured backends and assemble the state
    pub async fn initialize(config: &AppConfig) -> Result<Self> {
        let pool = if config.needs_database() {
            Some(connect_database(config).await?)
        } else {
            None
        };

        let (songs, users): (Arc<dyn SongStore>, Arc<dyn UserStore>) = match (config.storage, &pool)
        {
            (StorageBackend::Postgres, Some(pool)) => (
                Arc::new(SongRepository::new(pool.clone())),
                Arc::new(UserRepository::new(pool.clone())),
            ),
            _ => {
                info!("Using in-memory song and user storage");
                (
                    Arc::new(InMemorySongRepository::new()),
                    Arc::new(InMemoryUserRepository::new()),
                )
            }
        };

        let revocations: Arc<dyn RevocationStore> = match (config.revocation.backend, &pool) {
            (RevocationBackend::Postgres, Some(pool)) => {
                Arc::new(RevocationRepository::new(pool.clone()))
            }
            (RevocationBackend::Redis, _) => {
                let redis_pool = RedisPool::new(&config.redis).await?;
                if !redis_pool.health_check().await? {
                    anyhow::bail!("Failed to connect to Redis");
                }
                info!("Revoked tokens are stored in Redis");
                Arc::new(RedisRevocationRepository::new(redis_pool))
            }
            _ => {
                info!(
                    "Revoked tokens are stored in memory (max {} entries)",
                    config.revocation.max_entries
                );
                Arc::new(InMemoryRevocationRepository::new(
                    config.revocation.max_entries,
                ))
            }
        };

        let auth = AuthState {
            jwt_service: JwtService::new(config.jwt.clone())?,
            users,
            revocations,
            rate_limiter: RateLimiter::new(config.rate_limit.clone()),
        };

        Ok(Self::new(songs, auth, config.rate_limit.clone()))
    }
}

async fn connect_database(config: &AppConfig) -> Result<PgPool> {
    let pool = init_pool(&config.database).await?;

    if health_check(&pool).await? {
        info!("Database connection successful");
    } else {
        anyhow::bail!("Failed to connect to database");
    }

    run_migrations(&pool).await?;
    Ok(pool)
}
