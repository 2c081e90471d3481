//! Redis-backed auth-token cache.
//!
//! Maps auth token to decimal product id with a 15-minute TTL. The cache
//! is best-effort on both sides: a read error is a miss and a write error
//! is logged and dropped, so cache trouble never fails ingestion.

use std::time::Duration;

use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use snafu::ResultExt;
use tracing::{debug, warn};

use crate::error::{CacheConnectSnafu, MissingEnvSnafu, Result};

const TOKEN_TTL: Duration = Duration::from_secs(15 * 60);

fn required_env(name: &'static str) -> Result<String> {
    match std::env::var(name) {
        Ok(value) if !value.is_empty() => Ok(value),
        _ => MissingEnvSnafu { name }.fail(),
    }
}

/// Cache connection options, read from the `REDIS_*` environment.
#[derive(Debug, Clone)]
pub struct CacheOptions {
    pub host: String,
    pub port: String,
    pub password: String,
    pub db: u32,
    pub ttl: Duration,
}

impl CacheOptions {
    pub fn from_env() -> Result<Self> {
        let host = required_env("REDIS_HOST")?;
        let port = required_env("REDIS_PORT")?;
        let password = std::env::var("REDIS_PASSWORD").unwrap_or_default();
        let db = std::env::var("REDIS_DB")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(0);

        Ok(Self {
            host,
            port,
            password,
            db,
            ttl: TOKEN_TTL,
        })
    }

    fn url(&self) -> String {
        if self.password.is_empty() {
            format!("redis://{}:{}/{}", self.host, self.port, self.db)
        } else {
            format!(
                "redis://:{}@{}:{}/{}",
                self.password, self.host, self.port, self.db
            )
        }
    }
}

/// Auth token to product id map with TTL.
#[derive(Clone)]
pub struct TokenCache {
    connection: Option<ConnectionManager>,
    ttl: Duration,
}

impl TokenCache {
    /// Connect to the cache. The connection manager reconnects on broken
    /// connections, so a transient outage degrades to cache misses.
    pub async fn connect(options: &CacheOptions) -> Result<Self> {
        let client = redis::Client::open(options.url()).context(CacheConnectSnafu)?;
        let connection = client
            .get_connection_manager()
            .await
            .context(CacheConnectSnafu)?;

        Ok(Self {
            connection: Some(connection),
            ttl: options.ttl,
        })
    }

    /// A cache that always misses, for tests and local development.
    pub fn disabled() -> Self {
        Self {
            connection: None,
            ttl: TOKEN_TTL,
        }
    }

    /// Look up the product id for a token. Any error is a miss.
    pub async fn get(&self, token: &str) -> Option<String> {
        let mut connection = self.connection.clone()?;

        match connection.get::<_, Option<String>>(token).await {
            Ok(value) => value,
            Err(error) => {
                debug!(error = %error, "token cache read failed; treating as miss");
                None
            }
        }
    }

    /// Record a token to product-id mapping. Fire-and-forget.
    pub async fn set(&self, token: &str, product_id: &str) {
        let Some(mut connection) = self.connection.clone() else {
            return;
        };

        let ttl_secs = self.ttl.as_secs();
        if let Err(error) = connection
            .set_ex::<_, _, ()>(token, product_id, ttl_secs)
            .await
        {
            warn!(error = %error, "failed to cache auth token");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_with_and_without_password() {
        let mut options = CacheOptions {
            host: "cache.internal".to_string(),
            port: "6379".to_string(),
            password: String::new(),
            db: 2,
            ttl: TOKEN_TTL,
        };
        assert_eq!(options.url(), "redis://cache.internal:6379/2");

        options.password = "hunter2".to_string();
        assert_eq!(options.url(), "redis://:hunter2@cache.internal:6379/2");
    }

    #[tokio::test]
    async fn disabled_cache_always_misses() {
        let cache = TokenCache::disabled();
        cache.set("token", "7").await;
        assert_eq!(cache.get("token").await, None);
    }
}
