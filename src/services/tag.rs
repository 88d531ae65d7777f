//! Tag service
//!
//! Tags are global and managed by admins. Like categories, the full list
//! is cached for the entry forms.

use crate::cache::{Cache, CacheLayer};
use crate::db::repositories::TagRepository;
use crate::models::{ListParams, PagedResult, Tag};
use crate::services::validation::check_length;
use anyhow::Context;
use std::sync::Arc;
use std::time::Duration;

const TITLE_MIN_LEN: usize = 3;
const TITLE_MAX_LEN: usize = 64;

const CACHE_KEY_TAG_ALL: &str = "tag:all";
const CACHE_PATTERN_TAG: &str = "tag:*";

/// Error types for tag service operations
#[derive(Debug, thiserror::Error)]
pub enum TagServiceError {
    #[error("Tag not found: {0}")]
    NotFound(i64),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

pub struct TagService {
    repo: Arc<dyn TagRepository>,
    cache: Arc<Cache>,
    cache_ttl: Duration,
}

impl TagService {
    pub fn new(repo: Arc<dyn TagRepository>, cache: Arc<Cache>) -> Self {
        let cache_ttl = cache.default_ttl();
        Self {
            repo,
            cache,
            cache_ttl,
        }
    }

    pub async fn create(&self, title: &str) -> Result<Tag, TagServiceError> {
        let title = validate_title(title)?;
        let tag = self.repo.create(&title).await.context("Failed to create tag")?;

        self.invalidate_cache().await;
        Ok(tag)
    }

    pub async fn get(&self, id: i64) -> Result<Option<Tag>, TagServiceError> {
        let tag = self.repo.get_by_id(id).await.context("Failed to get tag")?;
        Ok(tag)
    }

    /// Tags for the given ids; unknown ids are skipped
    pub async fn get_many(&self, ids: &[i64]) -> Result<Vec<Tag>, TagServiceError> {
        let tags = self
            .repo
            .get_by_ids(ids)
            .await
            .context("Failed to get tags")?;
        Ok(tags)
    }

    /// Rename a tag
    ///
    /// # Errors
    ///
    /// - `ValidationError` for a title outside 3..=64 chars
    /// - `NotFound` if there is no tag with `id`
    pub async fn update(&self, id: i64, title: &str) -> Result<Tag, TagServiceError> {
        let title = validate_title(title)?;

        if self.get(id).await?.is_none() {
            return Err(TagServiceError::NotFound(id));
        }

        let tag = self
            .repo
            .update(id, &title)
            .await
            .context("Failed to update tag")?;

        self.invalidate_cache().await;
        Ok(tag)
    }

    /// Delete a tag; links to posts and notes go with it
    pub async fn delete(&self, id: i64) -> Result<(), TagServiceError> {
        if self.get(id).await?.is_none() {
            return Err(TagServiceError::NotFound(id));
        }

        self.repo.delete(id).await.context("Failed to delete tag")?;

        self.invalidate_cache().await;
        Ok(())
    }

    pub async fn list(&self, params: &ListParams) -> Result<PagedResult<Tag>, TagServiceError> {
        let items = self.repo.list(params).await.context("Failed to list tags")?;
        let total = self.repo.count().await.context("Failed to count tags")?;

        Ok(PagedResult::new(items, total, params))
    }

    /// Every tag, for select options (cached)
    pub async fn all(&self) -> Result<Vec<Tag>, TagServiceError> {
        if let Some(cached) = self
            .cache
            .get::<Vec<Tag>>(CACHE_KEY_TAG_ALL)
            .await
            .ok()
            .flatten()
        {
            return Ok(cached);
        }

        let tags = self.repo.list_all().await.context("Failed to list all tags")?;
        let _ = self.cache.set(CACHE_KEY_TAG_ALL, &tags, self.cache_ttl).await;

        Ok(tags)
    }

    async fn invalidate_cache(&self) {
        let _ = self.cache.delete_pattern(CACHE_PATTERN_TAG).await;
    }
}

fn validate_title(title: &str) -> Result<String, TagServiceError> {
    check_length("Title", title, TITLE_MIN_LEN, TITLE_MAX_LEN).map_err(TagServiceError::ValidationError)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::db::repositories::SqlxTagRepository;
    use crate::db::{create_test_pool, migrations};

    async fn setup_test_service() -> TagService {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        TagService::new(
            SqlxTagRepository::boxed(pool),
            Arc::new(Cache::Memory(MemoryCache::new())),
        )
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let service = setup_test_service().await;
        let tag = service.create(" rust ").await.unwrap();
        assert_eq!(tag.title, "rust");
        assert_eq!(service.get(tag.id).await.unwrap(), Some(tag));
    }

    #[tokio::test]
    async fn test_title_bounds() {
        let service = setup_test_service().await;
        assert!(matches!(
            service.create("go").await,
            Err(TagServiceError::ValidationError(_))
        ));
        assert!(matches!(
            service.create(&"t".repeat(65)).await,
            Err(TagServiceError::ValidationError(_))
        ));
        assert!(service.create(&"t".repeat(64)).await.is_ok());
    }

    #[tokio::test]
    async fn test_all_tracks_writes() {
        let service = setup_test_service().await;
        let tag = service.create("first").await.unwrap();
        assert_eq!(service.all().await.unwrap().len(), 1);

        service.create("second").await.unwrap();
        assert_eq!(service.all().await.unwrap().len(), 2);

        service.delete(tag.id).await.unwrap();
        let titles: Vec<_> = service.all().await.unwrap().into_iter().map(|t| t.title).collect();
        assert_eq!(titles, vec!["second"]);
    }

    #[tokio::test]
    async fn test_update_and_delete_missing() {
        let service = setup_test_service().await;
        assert!(matches!(
            service.update(42, "valid").await,
            Err(TagServiceError::NotFound(42))
        ));
        assert!(matches!(service.delete(42).await, Err(TagServiceError::NotFound(42))));
    }

    #[tokio::test]
    async fn test_list_pages() {
        let service = setup_test_service().await;
        for title in ["delta", "alpha", "charlie", "bravo"] {
            service.create(title).await.unwrap();
        }

        let page = service.list(&ListParams::new(2, 3)).await.unwrap();
        assert_eq!(page.total, 4);
        let titles: Vec<_> = page.items.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["delta"]);
    }
}
