//! Cache layer
//!
//! In-process caching for data that every form page needs, such as the
//! category and tag select options. The driver comes from configuration:
//! `memory` (moka) or `none`, in which case every read misses.
//!
//! ```rust,ignore
//! use inkpad::cache::{create_cache, CacheLayer};
//!
//! let cache = create_cache(&config.cache);
//! cache.set("key", &"value", Duration::from_secs(60)).await?;
//! ```

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::config::{CacheConfig, CacheDriver};

pub use memory::MemoryCache;

/// Cache layer trait
///
/// The methods are generic, so the trait is not object safe; `Cache` is the
/// runtime-polymorphic handle.
#[async_trait]
pub trait CacheLayer: Send + Sync {
    async fn get<T: DeserializeOwned + Send>(&self, key: &str) -> Result<Option<T>>;

    /// Store a value that expires after `ttl`
    async fn set<T: Serialize + Send + Sync>(&self, key: &str, value: &T, ttl: Duration) -> Result<()>;

    async fn delete(&self, key: &str) -> Result<()>;

    /// Delete every key matching a glob pattern (`*` and `?`)
    async fn delete_pattern(&self, pattern: &str) -> Result<()>;

    async fn clear(&self) -> Result<()>;
}

#[derive(Debug)]
pub enum Cache {
    Memory(MemoryCache),
    /// Caching switched off: reads miss, writes are dropped
    Disabled,
}

impl Cache {
    /// TTL to use when the caller has no specific one
    pub fn default_ttl(&self) -> Duration {
        match self {
            Cache::Memory(cache) => cache.default_ttl(),
            Cache::Disabled => Duration::ZERO,
        }
    }
}

#[async_trait]
impl CacheLayer for Cache {
    async fn get<T: DeserializeOwned + Send>(&self, key: &str) -> Result<Option<T>> {
        match self {
            Cache::Memory(cache) => cache.get(key).await,
            Cache::Disabled => Ok(None),
        }
    }

    async fn set<T: Serialize + Send + Sync>(&self, key: &str, value: &T, ttl: Duration) -> Result<()> {
        match self {
            Cache::Memory(cache) => cache.set(key, value, ttl).await,
            Cache::Disabled => Ok(()),
        }
    }

    async fn delete(&self, key: &str) -> Result<()> {
        match self {
            Cache::Memory(cache) => cache.delete(key).await,
            Cache::Disabled => Ok(()),
        }
    }

    async fn delete_pattern(&self, pattern: &str) -> Result<()> {
        match self {
            Cache::Memory(cache) => cache.delete_pattern(pattern).await,
            Cache::Disabled => Ok(()),
        }
    }

    async fn clear(&self) -> Result<()> {
        match self {
            Cache::Memory(cache) => cache.clear().await,
            Cache::Disabled => Ok(()),
        }
    }
}

/// Create the cache selected by configuration
pub fn create_cache(config: &CacheConfig) -> Arc<Cache> {
    match config.driver {
        CacheDriver::Memory => {
            let ttl = Duration::from_secs(config.ttl_seconds);
            let cache = MemoryCache::with_capacity_and_ttl(config.max_capacity, ttl);
            Arc::new(Cache::Memory(cache))
        }
        CacheDriver::None => Arc::new(Cache::Disabled),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_memory_cache() {
        let cache = create_cache(&CacheConfig::default());
        assert!(matches!(*cache, Cache::Memory(_)));

        cache
            .set("test_key", &"test_value".to_string(), cache.default_ttl())
            .await
            .unwrap();
        let result: Option<String> = cache.get("test_key").await.unwrap();
        assert_eq!(result, Some("test_value".to_string()));
    }

    #[tokio::test]
    async fn test_disabled_cache_always_misses() {
        let config = CacheConfig {
            driver: CacheDriver::None,
            ..CacheConfig::default()
        };
        let cache = create_cache(&config);

        cache
            .set("key", &"value".to_string(), Duration::from_secs(60))
            .await
            .unwrap();
        let result: Option<String> = cache.get("key").await.unwrap();
        assert!(result.is_none());
        cache.delete_pattern("*").await.unwrap();
        cache.clear().await.unwrap();
    }
}
