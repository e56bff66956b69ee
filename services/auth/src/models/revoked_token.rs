//! Revoked token model

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Entry of the revocation registry
#[derive(Debug, Clone, Serialize)]
pub struct RevokedToken {
    /// Raw token string as presented by the client
    #[serde(skip_serializing)]
    pub token: String,
    pub created_at: DateTime<Utc>,
    /// Mirrors the token's own `exp`; the sweep drops the entry afterwards
    pub expires_at: DateTime<Utc>,
}

impl RevokedToken {
    pub fn new(token: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            token: token.into(),
            created_at: Utc::now(),
            expires_at,
        }
    }

    /// Whether the underlying token would have expired on its own by `now`
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}
