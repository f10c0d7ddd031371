//! Session Lookup Cache
//!
//! Redis read-through cache in front of the session store. Session rows
//! change rarely relative to how often connections resolve them, so hits
//! skip PostgreSQL entirely. Entries carry the session expiry, and the
//! Redis TTL is clamped to it so a cached session can never outlive the
//! stored one.
//!
//! Redis failures degrade to the underlying store rather than failing the
//! handshake.

use async_trait::async_trait;
use chrono::Utc;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::sync::Arc;

use super::keys;
use crate::domain::{SessionRepository, StoredSession};
use crate::shared::error::AppError;

/// Read-through session cache implementing the session store trait.
pub struct CachedSessionRepository {
    inner: Arc<dyn SessionRepository>,
    redis: ConnectionManager,
    ttl: u64,
}

impl CachedSessionRepository {
    pub fn new(inner: Arc<dyn SessionRepository>, redis: ConnectionManager, ttl: u64) -> Self {
        Self { inner, redis, ttl }
    }

    async fn cached(&self, token_hash: &str) -> Option<StoredSession> {
        let mut conn = self.redis.clone();
        let value: Option<String> = match conn.get(keys::session(token_hash)).await {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(error = %e, "Session cache read failed");
                return None;
            }
        };
        let session: StoredSession = serde_json::from_str(&value?).ok()?;
        // Expiry may have passed while the entry sat in cache
        session.is_valid_at(Utc::now()).then_some(session)
    }

    async fn store(&self, session: &StoredSession) {
        let Ok(value) = serde_json::to_string(session) else {
            return;
        };
        let until_expiry = (session.expires_at - Utc::now()).num_seconds().max(0) as u64;
        let ttl = self.ttl.min(until_expiry);
        if ttl == 0 {
            return;
        }
        let mut conn = self.redis.clone();
        if let Err(e) = conn
            .set_ex::<_, _, ()>(keys::session(&session.token_hash), value, ttl)
            .await
        {
            tracing::warn!(error = %e, "Session cache write failed");
        }
    }
}

#[async_trait]
impl SessionRepository for CachedSessionRepository {
    async fn find_valid(&self, token_hash: &str) -> Result<Option<StoredSession>, AppError> {
        if let Some(session) = self.cached(token_hash).await {
            return Ok(Some(session));
        }
        let session = self.inner.find_valid(token_hash).await?;
        if let Some(ref session) = session {
            self.store(session).await;
        }
        Ok(session)
    }
}
