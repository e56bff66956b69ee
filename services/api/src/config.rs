//! Service configuration
//!
//! Everything is read from the environment once at startup and handed to
//! the components that need it; handlers never read the environment.

use anyhow::Result;
use auth::{jwt::JwtConfig, rate_limiter::RateLimiterConfig, repositories::revocation};
use common::{cache::RedisConfig, database::DatabaseConfig};
use std::{env, path::PathBuf, str::FromStr};

/// Where songs and users are stored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres,
    Memory,
}

impl FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "memory" => Ok(Self::Memory),
            other => anyhow::bail!("Unknown storage backend: {}", other),
        }
    }
}

/// Where revoked tokens are stored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevocationBackend {
    Postgres,
    Redis,
    Memory,
}

impl FromStr for RevocationBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "redis" => Ok(Self::Redis),
            "memory" => Ok(Self::Memory),
            other => anyhow::bail!("Unknown revocation backend: {}", other),
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Directory holding the built frontend
    pub static_dir: PathBuf,
}

impl ServerConfig {
    /// # Environment Variables
    /// - `SERVER_HOST` (default: 0.0.0.0)
    /// - `SERVER_PORT` (default: 5000)
    /// - `STATIC_DIR` (default: frontend)
    pub fn from_env() -> Result<Self> {
        let host = env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = match env::var("SERVER_PORT") {
            Ok(port) => port
                .parse()
                .map_err(|e| anyhow::anyhow!("Invalid SERVER_PORT {}: {}", port, e))?,
            Err(_) => 5000,
        };
        let static_dir = env::var("STATIC_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("frontend"));

        Ok(Self {
            host,
            port,
            static_dir,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Revocation registry configuration
#[derive(Debug, Clone)]
pub struct RevocationConfig {
    pub backend: RevocationBackend,
    /// Bound of the in-memory registry
    pub max_entries: usize,
    /// Cron expression (with seconds) of the expiry sweep
    pub sweep_schedule: String,
}

impl RevocationConfig {
    /// # Environment Variables
    /// - `REVOCATION_BACKEND`: postgres, redis or memory (default: postgres)
    /// - `REVOCATION_MAX_ENTRIES` (default: 10000)
    /// - `REVOCATION_SWEEP_SCHEDULE` (default: every minute)
    pub fn from_env() -> Result<Self> {
        let backend = env::var("REVOCATION_BACKEND")
            .unwrap_or_else(|_| "postgres".to_string())
            .parse()?;
        let max_entries = env::var("REVOCATION_MAX_ENTRIES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(revocation::DEFAULT_MAX_ENTRIES);
        let sweep_schedule =
            env::var("REVOCATION_SWEEP_SCHEDULE").unwrap_or_else(|_| "0 * * * * *".to_string());

        Ok(Self {
            backend,
            max_entries,
            sweep_schedule,
        })
    }
}

/// Admin account created at startup when missing
#[derive(Debug, Clone)]
pub struct BootstrapAdmin {
    pub username: String,
    pub password: String,
}

impl BootstrapAdmin {
    /// Read `BOOTSTRAP_ADMIN_USERNAME` / `BOOTSTRAP_ADMIN_PASSWORD`; both must be set
    pub fn from_env() -> Option<Self> {
        let username = env::var("BOOTSTRAP_ADMIN_USERNAME").ok()?;
        let password = env::var("BOOTSTRAP_ADMIN_PASSWORD").ok()?;
        Some(Self { username, password })
    }
}

/// Complete service configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub storage: StorageBackend,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub jwt: JwtConfig,
    pub revocation: RevocationConfig,
    pub rate_limit: RateLimiterConfig,
    pub bootstrap_admin: Option<BootstrapAdmin>,
}

impl AppConfig {
    /// Build the configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let storage = env::var("STORAGE_BACKEND")
            .unwrap_or_else(|_| "postgres".to_string())
            .parse()?;

        Ok(Self {
            server: ServerConfig::from_env()?,
            storage,
            database: DatabaseConfig::from_env()?,
            redis: RedisConfig::from_env()?,
            jwt: JwtConfig::from_env()?,
            revocation: RevocationConfig::from_env()?,
            rate_limit: RateLimiterConfig::from_env(),
            bootstrap_admin: BootstrapAdmin::from_env(),
        })
    }

    /// Whether any component needs the PostgreSQL pool
    pub fn needs_database(&self) -> bool {
        self.storage == StorageBackend::Postgres
            || self.revocation.backend == RevocationBackend::Postgres
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: [&str; 9] = [
        "SERVER_HOST",
        "SERVER_PORT",
        "STATIC_DIR",
        "STORAGE_BACKEND",
        "REVOCATION_BACKEND",
        "REVOCATION_MAX_ENTRIES",
        "REVOCATION_SWEEP_SCHEDULE",
        "BOOTSTRAP_ADMIN_USERNAME",
        "BOOTSTRAP_ADMIN_PASSWORD",
    ];

    fn clear_env() {
        unsafe {
            for var in VARS {
                env::remove_var(var);
            }
            env::remove_var("JWT_SECRET");
        }
    }

    #[test]
    #[serial]
    fn test_defaults() {
        clear_env();
        unsafe {
            env::set_var("JWT_SECRET", "secret");
        }

        let config = AppConfig::from_env().unwrap();
        assert_eq!(config.server.bind_address(), "0.0.0.0:5000");
        assert_eq!(config.server.static_dir, PathBuf::from("frontend"));
        assert_eq!(config.storage, StorageBackend::Postgres);
        assert_eq!(config.revocation.backend, RevocationBackend::Postgres);
        assert_eq!(config.revocation.max_entries, 10_000);
        assert_eq!(config.revocation.sweep_schedule, "0 * * * * *");
        assert!(config.bootstrap_admin.is_none());
        assert!(config.needs_database());

        clear_env();
    }

    #[test]
    #[serial]
    fn test_memory_backends_need_no_database() {
        clear_env();
        unsafe {
            env::set_var("JWT_SECRET", "secret");
            env::set_var("STORAGE_BACKEND", "memory");
            env::set_var("REVOCATION_BACKEND", "Memory");
            env::set_var("BOOTSTRAP_ADMIN_USERNAME", "admin");
            env::set_var("BOOTSTRAP_ADMIN_PASSWORD", "S3cret!pass");
        }

        let config = AppConfig::from_env().unwrap();
        assert_eq!(config.storage, StorageBackend::Memory);
        assert_eq!(config.revocation.backend, RevocationBackend::Memory);
        assert!(!config.needs_database());
        assert_eq!(config.bootstrap_admin.unwrap().username, "admin");

        clear_env();
    }

    #[test]
    #[serial]
    fn test_invalid_values_are_rejected() {
        clear_env();
        unsafe {
            env::set_var("JWT_SECRET", "secret");
            env::set_var("SERVER_PORT", "not-a-port");
        }
        assert!(AppConfig::from_env().is_err());

        unsafe {
            env::remove_var("SERVER_PORT");
            env::set_var("REVOCATION_BACKEND", "mongodb");
        }
        assert!(AppConfig::from_env().is_err());

        clear_env();
    }

    #[test]
    #[serial]
    fn test_missing_jwt_secret_is_an_error() {
        clear_env();
        assert!(AppConfig::from_env().is_err());
    }
}
