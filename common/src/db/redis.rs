// Redis cache client

use crate::config::RedisConfig;
use crate::errors::CacheError;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use tracing::{info, instrument};

/// Shared cache client handle
///
/// Wraps a multiplexed [`ConnectionManager`] that reconnects on its own; clones
/// share the same connection. Values are exchanged as decoded UTF-8 text.
#[derive(Clone)]
pub struct CacheClient {
    manager: ConnectionManager,
}

impl std::fmt::Debug for CacheClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheClient").finish_non_exhaustive()
    }
}

impl CacheClient {
    /// Connect to the cache endpoint
    #[instrument(skip(config))]
    pub async fn connect(config: &RedisConfig) -> Result<Self, CacheError> {
        info!("Connecting cache client");

        let client = Client::open(config.url.as_str())
            .map_err(|e| CacheError::InvalidUrl(e.to_string()))?;

        let manager = ConnectionManager::new(client)
            .await
            .map_err(|e| CacheError::ConnectionFailed(e.to_string()))?;

        info!("Cache client connected");
        Ok(Self { manager })
    }

    /// Get a handle to the shared connection
    pub fn connection(&self) -> ConnectionManager {
        self.manager.clone()
    }

    /// Read a text value
    ///
    /// Text accessors for template handlers; the service itself never reads the cache.
    pub async fn get_text(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.connection();
        conn.get(key)
            .await
            .map_err(|e| CacheError::CommandFailed(e.to_string()))
    }

    /// Write a text value that expires after `ttl_seconds`, for template handlers
    pub async fn set_text(&self, key: &str, value: &str, ttl_seconds: u64) -> Result<(), CacheError> {
        let mut conn = self.connection();
        conn.set_ex(key, value, ttl_seconds)
            .await
            .map_err(|e| CacheError::CommandFailed(e.to_string()))
    }

    /// Release this handle's connection
    ///
    /// The connection closes once every clone handed out to handlers is dropped too.
    #[instrument(skip(self))]
    pub async fn close(self) {
        drop(self.manager);
        info!("Cache client closed");
    }
}
