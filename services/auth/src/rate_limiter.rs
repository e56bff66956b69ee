//! Per-client rate limiting for the whole API, the song routes and login

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::info;

/// Rate limiter configuration
#[derive(Debug, Clone)]
pub struct RateLimiterConfig {
    /// Maximum number of attempts allowed per window
    pub max_attempts: u32,
    /// Time window in seconds
    pub window_seconds: u64,
    /// Ban duration in seconds
    pub ban_duration_seconds: u64,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            max_attempts: 1000,
            window_seconds: 600,       // 10 minutes
            ban_duration_seconds: 600, // 10 minutes
        }
    }
}

impl RateLimiterConfig {
    /// Create a new RateLimiterConfig from environment variables
    ///
    /// # Environment Variables
    /// - `RATE_LIMIT_MAX_ATTEMPTS`: Attempts per window (default: 1000)
    /// - `RATE_LIMIT_WINDOW_SECONDS`: Window length (default: 600)
    /// - `RATE_LIMIT_BAN_SECONDS`: Ban duration (default: 600)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            max_attempts: env_or("RATE_LIMIT_MAX_ATTEMPTS", defaults.max_attempts),
            window_seconds: env_or("RATE_LIMIT_WINDOW_SECONDS", defaults.window_seconds),
            ban_duration_seconds: env_or("RATE_LIMIT_BAN_SECONDS", defaults.ban_duration_seconds),
        }
    }
}

/// Parse an environment variable, falling back on a missing or invalid value
fn env_or<T: FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

#[derive(Debug)]
struct RateLimiterEntry {
    /// Attempts in the current window
    attempts: u32,
    window_start: Instant,
    ban_expires: Option<Instant>,
}

/// Fixed-window rate limiter keyed by an arbitrary string (client IP)
#[derive(Debug, Clone)]
pub struct RateLimiter {
    config: RateLimiterConfig,
    entries: Arc<Mutex<HashMap<String, RateLimiterEntry>>>,
}

impl RateLimiter {
    /// Create a new rate limiter
    pub fn new(config: RateLimiterConfig) -> Self {
        Self {
            config,
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Record an attempt for `key` and report whether it is allowed
    pub async fn is_allowed(&self, key: &str) -> bool {
        self.is_allowed_at(key, Instant::now()).await
    }

    async fn is_allowed_at(&self, key: &str, now: Instant) -> bool {
        let mut entries = self.entries.lock().await;

        let entry = entries.entry(key.to_string()).or_insert(RateLimiterEntry {
            attempts: 0,
            window_start: now,
            ban_expires: None,
        });

        if let Some(ban_expires) = entry.ban_expires {
            if now < ban_expires {
                return false;
            }
            entry.attempts = 0;
            entry.window_start = now;
            entry.ban_expires = None;
        }

        if now.duration_since(entry.window_start) >= self.window() {
            entry.attempts = 0;
            entry.window_start = now;
        }

        if entry.attempts >= self.config.max_attempts {
            entry.ban_expires = Some(now + Duration::from_secs(self.config.ban_duration_seconds));
            info!(
                "Banned key {} for {} seconds",
                key, self.config.ban_duration_seconds
            );
            return false;
        }

        entry.attempts += 1;
        true
    }

    /// Forget keys whose window and ban have both elapsed
    pub async fn purge_stale(&self) -> usize {
        self.purge_stale_at(Instant::now()).await
    }

    async fn purge_stale_at(&self, now: Instant) -> usize {
        let window = self.window();
        let mut entries = self.entries.lock().await;
        let before = entries.len();

        entries.retain(|_, entry| {
            let banned = entry.ban_expires.is_some_and(|expires| now < expires);
            banned || now.duration_since(entry.window_start) < window
        });

        before - entries.len()
    }

    fn window(&self) -> Duration {
        Duration::from_secs(self.config.window_seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn limiter(max_attempts: u32) -> RateLimiter {
        RateLimiter::new(RateLimiterConfig {
            max_attempts,
            window_seconds: 60,
            ban_duration_seconds: 120,
        })
    }

    #[tokio::test]
    async fn test_allows_up_to_max_attempts() {
        let limiter = limiter(3);
        let now = Instant::now();

        for _ in 0..3 {
            assert!(limiter.is_allowed_at("1.2.3.4", now).await);
        }
        assert!(!limiter.is_allowed_at("1.2.3.4", now).await);
        // Other keys are unaffected
        assert!(limiter.is_allowed_at("5.6.7.8", now).await);
    }

    #[tokio::test]
    async fn test_window_resets_attempts() {
        let limiter = limiter(1);
        let start = Instant::now();

        assert!(limiter.is_allowed_at("ip", start).await);
        assert!(
            limiter
                .is_allowed_at("ip", start + Duration::from_secs(61))
                .await
        );
    }

    #[tokio::test]
    async fn test_ban_outlasts_window() {
        let limiter = limiter(1);
        let start = Instant::now();

        assert!(limiter.is_allowed_at("ip", start).await);
        assert!(!limiter.is_allowed_at("ip", start).await);
        // Window over but still banned
        assert!(
            !limiter
                .is_allowed_at("ip", start + Duration::from_secs(90))
                .await
        );
        assert!(
            limiter
                .is_allowed_at("ip", start + Duration::from_secs(121))
                .await
        );
    }

    #[tokio::test]
    async fn test_purge_stale_keeps_active_entries() {
        let limiter = limiter(1);
        let start = Instant::now();

        limiter.is_allowed_at("old", start).await;
        limiter.is_allowed_at("banned", start).await;
        limiter.is_allowed_at("banned", start).await;
        limiter
            .is_allowed_at("fresh", start + Duration::from_secs(100))
            .await;

        let purged = limiter
            .purge_stale_at(start + Duration::from_secs(100))
            .await;
        assert_eq!(purged, 1);
    }

    #[test]
    #[serial]
    fn test_config_from_env_rejects_out_of_range_attempts() {
        unsafe {
            std::env::set_var("RATE_LIMIT_MAX_ATTEMPTS", "4294967296");
            std::env::set_var("RATE_LIMIT_WINDOW_SECONDS", "30");
            std::env::remove_var("RATE_LIMIT_BAN_SECONDS");
        }

        let config = RateLimiterConfig::from_env();
        assert_eq!(config.max_attempts, 1000);
        assert_eq!(config.window_seconds, 30);
        assert_eq!(config.ban_duration_seconds, 600);

        unsafe {
            std::env::set_var("RATE_LIMIT_MAX_ATTEMPTS", "5");
        }
        assert_eq!(RateLimiterConfig::from_env().max_attempts, 5);

        unsafe {
            std::env::remove_var("RATE_LIMIT_MAX_ATTEMPTS");
            std::env::remove_var("RATE_LIMIT_WINDOW_SECONDS");
        }
    }
}
