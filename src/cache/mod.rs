//! Filter result caching.
//!
//! The engine talks to a [`FilterCache`] trait object; the default
//! implementation is a two-tier layer with Moka (L1, in-process) over Redis
//! (L2, shared). Cache failures degrade to a miss, never to an error.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;
use redis::AsyncCommands;
use redis::Client as RedisClient;
use tracing::{debug, warn};

/// TTL for the L1 tier; short on purpose, the L2 TTL is authoritative.
const L1_TTL_SECS: u64 = 60;

/// Maximum L1 cache capacity.
const L1_MAX_CAPACITY: u64 = 10_000;

/// Injected cache backend for filter results.
///
/// All operations are infallible at the trait boundary: a backend that
/// cannot serve a request logs and behaves as a miss.
#[async_trait]
pub trait FilterCache: Send + Sync {
    async fn get(&self, key: &str) -> Option<String>;

    async fn set(&self, key: &str, value: &str, ttl_secs: u64);

    async fn delete(&self, key: &str);
}

/// Two-tier cache: Moka in front of Redis.
///
/// L1 absorbs repeat reads on one instance; L2 shares results across
/// instances and carries the real TTL.
#[derive(Clone)]
pub struct TieredCache {
    inner: Arc<TieredCacheInner>,
}

struct TieredCacheInner {
    local: Cache<String, String>,
    redis: RedisClient,
}

impl TieredCache {
    pub fn new(redis: RedisClient) -> Self {
        let local = Cache::builder()
            .max_capacity(L1_MAX_CAPACITY)
            .time_to_live(Duration::from_secs(L1_TTL_SECS))
            .build();

        Self {
            inner: Arc::new(TieredCacheInner { local, redis }),
        }
    }
}

#[async_trait]
impl FilterCache for TieredCache {
    /// Checks L1 first, then L2. On L2 hit, populates L1.
    async fn get(&self, key: &str) -> Option<String> {
        if let Some(val) = self.inner.local.get(key).await {
            debug!(key = %key, "cache L1 hit");
            return Some(val);
        }

        let mut conn = match self.inner.redis.get_multiplexed_async_connection().await {
            Ok(c) => c,
            Err(e) => {
                warn!(error = %e, "failed to get Redis connection for cache");
                return None;
            }
        };

        let val: Option<String> = conn.get(key).await.ok()?;

        if let Some(ref v) = val {
            debug!(key = %key, "cache L2 hit, populating L1");
            self.inner.local.insert(key.to_string(), v.clone()).await;
        }

        val
    }

    /// Writes to both tiers; `ttl_secs` applies to L2.
    async fn set(&self, key: &str, value: &str, ttl_secs: u64) {
        self.inner
            .local
            .insert(key.to_string(), value.to_string())
            .await;

        let Ok(mut conn) = self.inner.redis.get_multiplexed_async_connection().await else {
            warn!("failed to get Redis connection for cache set");
            return;
        };

        if let Err(e) = conn.set_ex::<_, _, ()>(key, value, ttl_secs).await {
            warn!(error = %e, key = %key, "failed to set cache value in Redis");
            return;
        }

        debug!(key = %key, ttl = %ttl_secs, "cache set");
    }

    async fn delete(&self, key: &str) {
        self.inner.local.invalidate(key).await;

        let Ok(mut conn) = self.inner.redis.get_multiplexed_async_connection().await else {
            warn!("failed to get Redis connection for cache delete");
            return;
        };

        if let Err(e) = conn.del::<_, ()>(key).await {
            warn!(error = %e, key = %key, "failed to delete cache key from Redis");
        }

        debug!(key = %key, "cache key deleted");
    }
}

impl std::fmt::Debug for TieredCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TieredCache").finish()
    }
}

/// In-process cache, used in tests and single-instance deployments.
///
/// Moka applies the TTL at construction time, so per-entry TTLs collapse to
/// the configured one.
#[derive(Clone)]
pub struct MemoryCache {
    local: Cache<String, String>,
}

impl MemoryCache {
    pub fn new(ttl_secs: u64) -> Self {
        Self {
            local: Cache::builder()
                .max_capacity(L1_MAX_CAPACITY)
                .time_to_live(Duration::from_secs(ttl_secs))
                .build(),
        }
    }
}

#[async_trait]
impl FilterCache for MemoryCache {
    async fn get(&self, key: &str) -> Option<String> {
        self.local.get(key).await
    }

    async fn set(&self, key: &str, value: &str, _ttl_secs: u64) {
        self.local.insert(key.to_string(), value.to_string()).await;
    }

    async fn delete(&self, key: &str) {
        self.local.invalidate(key).await;
    }
}

impl std::fmt::Debug for MemoryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryCache").finish()
    }
}
