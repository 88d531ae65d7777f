//! In-memory cache backed by moka
//!
//! Values are stored as JSON so one cache instance can hold any
//! serializable type. Every entry carries its own TTL.

use super::CacheLayer;
use anyhow::{Context, Result};
use async_trait::async_trait;
use moka::future::Cache;
use moka::Expiry;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};

const DEFAULT_MAX_CAPACITY: u64 = 10_000;
const DEFAULT_TTL: Duration = Duration::from_secs(300);

#[derive(Clone)]
struct CacheEntry {
    data: Arc<String>,
    ttl: Duration,
}

impl CacheEntry {
    fn new<T: Serialize>(value: &T, ttl: Duration) -> Result<Self> {
        let json = serde_json::to_string(value).context("Failed to serialize cache value")?;
        Ok(Self {
            data: Arc::new(json),
            ttl,
        })
    }

    fn deserialize<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_str(&self.data).context("Failed to deserialize cache value")
    }
}

/// Expire each entry after the TTL it was inserted with
struct EntryTtl;

impl Expiry<String, CacheEntry> for EntryTtl {
    fn expire_after_create(&self, _key: &String, value: &CacheEntry, _created_at: Instant) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &CacheEntry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

pub struct MemoryCache {
    cache: Cache<String, CacheEntry>,
    default_ttl: Duration,
}

impl std::fmt::Debug for MemoryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryCache")
            .field("entry_count", &self.cache.entry_count())
            .field("default_ttl", &self.default_ttl)
            .finish()
    }
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::with_capacity_and_ttl(DEFAULT_MAX_CAPACITY, DEFAULT_TTL)
    }

    /// Build a cache holding at most `max_capacity` entries. `default_ttl`
    /// is what callers should pass when they have no better TTL.
    pub fn with_capacity_and_ttl(max_capacity: u64, default_ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_capacity)
            .expire_after(EntryTtl)
            .build();

        Self { cache, default_ttl }
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Glob match where `*` spans any run of characters and `?` exactly one
pub(crate) fn pattern_matches(pattern: &str, key: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let key: Vec<char> = key.chars().collect();

    let (mut p, mut k) = (0, 0);
    let mut star: Option<usize> = None;
    let mut resume = 0;

    while k < key.len() {
        if p < pattern.len() && (pattern[p] == '?' || pattern[p] == key[k]) {
            p += 1;
            k += 1;
        } else if p < pattern.len() && pattern[p] == '*' {
            star = Some(p);
            resume = k;
            p += 1;
        } else if let Some(star_at) = star {
            p = star_at + 1;
            resume += 1;
            k = resume;
        } else {
            return false;
        }
    }

    pattern[p..].iter().all(|c| *c == '*')
}

#[async_trait]
impl CacheLayer for MemoryCache {
    async fn get<T: DeserializeOwned + Send>(&self, key: &str) -> Result<Option<T>> {
        match self.cache.get(key).await {
            Some(entry) => Ok(Some(entry.deserialize()?)),
            None => Ok(None),
        }
    }

    async fn set<T: Serialize + Send + Sync>(&self, key: &str, value: &T, ttl: Duration) -> Result<()> {
        let entry = CacheEntry::new(value, ttl)?;
        self.cache.insert(key.to_string(), entry).await;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.cache.invalidate(key).await;
        Ok(())
    }

    async fn delete_pattern(&self, pattern: &str) -> Result<()> {
        let doomed: Vec<String> = self
            .cache
            .iter()
            .filter(|(key, _)| pattern_matches(pattern, key.as_str()))
            .map(|(key, _)| key.as_ref().clone())
            .collect();

        for key in doomed {
            self.cache.invalidate(&key).await;
        }
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.cache.invalidate_all();
        self.cache.run_pending_tasks().await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_and_get() {
        let cache = MemoryCache::new();
        cache
            .set("key1", &vec![1, 2, 3], Duration::from_secs(60))
            .await
            .unwrap();

        let result: Option<Vec<i32>> = cache.get("key1").await.unwrap();
        assert_eq!(result, Some(vec![1, 2, 3]));
    }

    #[tokio::test]
    async fn test_get_missing_key() {
        let cache = MemoryCache::new();
        let result: Option<String> = cache.get("missing").await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_entry_expires_after_its_ttl() {
        let cache = MemoryCache::new();
        cache
            .set("short", &"v".to_string(), Duration::from_millis(20))
            .await
            .unwrap();
        cache
            .set("long", &"v".to_string(), Duration::from_secs(60))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(80)).await;
        cache.cache.run_pending_tasks().await;

        let short: Option<String> = cache.get("short").await.unwrap();
        let long: Option<String> = cache.get("long").await.unwrap();
        assert!(short.is_none());
        assert!(long.is_some());
    }

    #[tokio::test]
    async fn test_delete_pattern() {
        let cache = MemoryCache::new();
        let ttl = Duration::from_secs(60);
        cache.set("category:all", &1, ttl).await.unwrap();
        cache.set("category:author:1", &2, ttl).await.unwrap();
        cache.set("tag:all", &3, ttl).await.unwrap();
        cache.cache.run_pending_tasks().await;

        cache.delete_pattern("category:*").await.unwrap();

        assert!(cache.get::<i32>("category:all").await.unwrap().is_none());
        assert!(cache.get::<i32>("category:author:1").await.unwrap().is_none());
        assert_eq!(cache.get::<i32>("tag:all").await.unwrap(), Some(3));
    }

    #[tokio::test]
    async fn test_clear() {
        let cache = MemoryCache::new();
        cache.set("a", &1, Duration::from_secs(60)).await.unwrap();
        cache.clear().await.unwrap();
        assert!(cache.get::<i32>("a").await.unwrap().is_none());
    }

    #[test]
    fn test_pattern_matches() {
        assert!(pattern_matches("tag:*", "tag:all"));
        assert!(pattern_matches("*", ""));
        assert!(pattern_matches("a?c", "abc"));
        assert!(pattern_matches("a*b*c", "axxbyyc"));
        assert!(!pattern_matches("tag:*", "category:all"));
        assert!(!pattern_matches("a?c", "ac"));
        assert!(!pattern_matches("abc", "abcd"));
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(50))]

        #[test]
        fn literal_pattern_matches_only_itself(key in "[a-z:]{0,12}", other in "[a-z:]{0,12}") {
            prop_assert!(pattern_matches(&key, &key));
            prop_assert_eq!(pattern_matches(&key, &other), key == other);
        }

        #[test]
        fn prefix_star_matches_every_extension(prefix in "[a-z:]{0,8}", rest in "[a-z0-9:]{0,8}") {
            let pattern = format!("{}*", prefix);
            let key = format!("{}{}", prefix, rest);
            prop_assert!(pattern_matches(&pattern, &key));
        }
    }
}
