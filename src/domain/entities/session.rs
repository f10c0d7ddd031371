//! Stored web session entity and repository trait.
//!
//! Maps to the `sessions` table. Web clients authenticate with a
//! cookie-backed session; the cookie value is hashed before lookup so raw
//! credentials never reach the store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::shared::error::AppError;

/// A server-side web session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredSession {
    /// SHA-256 hash of the session cookie value (primary key)
    pub token_hash: String,

    /// Owning username
    pub username: String,

    /// Expiry timestamp
    pub expires_at: DateTime<Utc>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl StoredSession {
    /// Check whether the session is still valid at the given instant.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}

/// Repository trait for session lookups.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Find a non-expired session by its token hash.
    async fn find_valid(&self, token_hash: &str) -> Result<Option<StoredSession>, AppError>;
}
