//! Cache Module
//!
//! Redis connection management and the session lookup cache.

mod session_cache;

pub use session_cache::CachedSessionRepository;

use redis::aio::ConnectionManager;
use redis::Client;
use tracing::{info, instrument};

use crate::config::RedisSettings;

/// Creates a Redis connection manager with automatic reconnection.
#[instrument(skip(settings), fields(url = %settings.url))]
pub async fn create_redis_client(
    settings: &RedisSettings,
) -> Result<ConnectionManager, redis::RedisError> {
    info!("Connecting to Redis...");
    let client = Client::open(settings.url.as_str())?;
    let manager = ConnectionManager::new(client).await?;
    info!("Redis connection established");
    Ok(manager)
}

/// Cache key prefixes.
pub mod keys {
    /// Prefix for cached web sessions, keyed by token hash
    pub const SESSION: &str = "session:";

    /// Generates a session key for a token hash
    #[inline]
    pub fn session(token_hash: &str) -> String {
        format!("{}{}", SESSION, token_hash)
    }
}
