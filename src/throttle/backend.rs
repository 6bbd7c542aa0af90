use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::time::Duration;
use thiserror::Error;

/// Errors raised by a shared counter backend
///
/// The limiter never surfaces these to callers; it falls back to local counting.
#[derive(Debug, Error)]
pub enum ThrottleError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Counter backend timed out after {0:?}")]
    Timeout(Duration),

    #[error("Counter backend unavailable: {0}")]
    Unavailable(String),
}

/// Shared fixed-window counter
#[async_trait]
pub trait CounterBackend: Send + Sync {
    /// Atomically increments `key` and returns the new count
    ///
    /// The key expires `window_secs` after its first increment.
    async fn incr_with_ttl(&self, key: &str, window_secs: u64) -> Result<u64, ThrottleError>;
}

/// Redis-backed counters shared by every process behind the same Redis
#[derive(Clone)]
pub struct RedisCounter {
    connection: ConnectionManager,
    prefix: String,
    timeout: Duration,
}

impl RedisCounter {
    /// Connects to Redis at `redis_url`
    ///
    /// # Arguments
    ///
    /// * `redis_url` - Connection URL (`redis://` or `rediss://`)
    /// * `prefix` - Namespace prepended to every counter key
    pub async fn connect(redis_url: &str, prefix: &str) -> Result<Self, ThrottleError> {
        let client = redis::Client::open(redis_url)?;
        let timeout = Duration::from_millis(750);
        let connection = tokio::time::timeout(timeout, ConnectionManager::new(client))
            .await
            .map_err(|_| ThrottleError::Timeout(timeout))??;

        Ok(Self {
            connection,
            prefix: prefix.to_string(),
            timeout,
        })
    }

    async fn incr_inner(&self, key: &str, window_secs: u64) -> Result<u64, ThrottleError> {
        let mut con = self.connection.clone();
        let count: u64 = con.incr(key, 1u64).await?;
        if count == 1 {
            let ttl = i64::try_from(window_secs).unwrap_or(i64::MAX);
            let _: () = con.expire(key, ttl).await?;
        }
        Ok(count)
    }
}

#[async_trait]
impl CounterBackend for RedisCounter {
    async fn incr_with_ttl(&self, key: &str, window_secs: u64) -> Result<u64, ThrottleError> {
        let full_key = format!("{}:{}", self.prefix, key);
        tokio::time::timeout(self.timeout, self.incr_inner(&full_key, window_secs))
            .await
            .map_err(|_| ThrottleError::Timeout(self.timeout))?
    }
}
