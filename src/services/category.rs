//! Category service
//!
//! Categories belong to the user who created them. The full list feeds the
//! category select on the post and note forms, so it is cached and the
//! cache is dropped on every write.

use crate::cache::{Cache, CacheLayer};
use crate::db::repositories::{CategoryRepository, EntryRepository};
use crate::models::{Category, CreateCategoryInput, ListParams, PagedResult};
use crate::services::validation::check_length;
use anyhow::Context;
use std::sync::Arc;
use std::time::Duration;

const TITLE_MIN_LEN: usize = 3;
const TITLE_MAX_LEN: usize = 64;

const CACHE_KEY_CATEGORY_ALL: &str = "category:all";
const CACHE_PATTERN_CATEGORY: &str = "category:*";

/// Error types for category service operations
#[derive(Debug, thiserror::Error)]
pub enum CategoryServiceError {
    #[error("Category not found: {0}")]
    NotFound(i64),

    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Posts or notes are still filed under the category
    #[error("Category {0} still contains entries")]
    InUse(i64),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

pub struct CategoryService {
    repo: Arc<dyn CategoryRepository>,
    entry_repos: Vec<Arc<dyn EntryRepository>>,
    cache: Arc<Cache>,
    cache_ttl: Duration,
}

impl CategoryService {
    /// `entry_repos` are consulted before a delete; pass both the post and
    /// the note repository.
    pub fn new(
        repo: Arc<dyn CategoryRepository>,
        entry_repos: Vec<Arc<dyn EntryRepository>>,
        cache: Arc<Cache>,
    ) -> Self {
        let cache_ttl = cache.default_ttl();
        Self::with_cache_ttl(repo, entry_repos, cache, cache_ttl)
    }

    pub fn with_cache_ttl(
        repo: Arc<dyn CategoryRepository>,
        entry_repos: Vec<Arc<dyn EntryRepository>>,
        cache: Arc<Cache>,
        cache_ttl: Duration,
    ) -> Self {
        Self {
            repo,
            entry_repos,
            cache,
            cache_ttl,
        }
    }

    /// # Errors
    ///
    /// Returns `ValidationError` for a title outside 3..=64 chars.
    pub async fn create(&self, author_id: i64, title: &str) -> Result<Category, CategoryServiceError> {
        let title = validate_title(title)?;

        let category = self
            .repo
            .create(&CreateCategoryInput::new(author_id, title))
            .await
            .context("Failed to create category")?;

        self.invalidate_cache().await;
        Ok(category)
    }

    pub async fn get(&self, id: i64) -> Result<Option<Category>, CategoryServiceError> {
        let category = self
            .repo
            .get_by_id(id)
            .await
            .context("Failed to get category")?;

        Ok(category)
    }

    pub async fn update(&self, id: i64, title: &str) -> Result<Category, CategoryServiceError> {
        let title = validate_title(title)?;

        if self.get(id).await?.is_none() {
            return Err(CategoryServiceError::NotFound(id));
        }

        let category = self
            .repo
            .update(id, &title)
            .await
            .context("Failed to update category")?;

        self.invalidate_cache().await;
        Ok(category)
    }

    /// Delete a category that nothing references.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the category does not exist
    /// - `InUse` if `can_be_deleted` says no
    pub async fn delete(&self, id: i64) -> Result<(), CategoryServiceError> {
        let category = self
            .get(id)
            .await?
            .ok_or(CategoryServiceError::NotFound(id))?;

        if !self.can_be_deleted(&category).await {
            return Err(CategoryServiceError::InUse(id));
        }

        self.repo
            .delete(id)
            .await
            .context("Failed to delete category")?;

        self.invalidate_cache().await;
        Ok(())
    }

    /// One page of the author's categories, by title
    pub async fn list_for_author(
        &self,
        author_id: i64,
        params: &ListParams,
    ) -> Result<PagedResult<Category>, CategoryServiceError> {
        let items = self
            .repo
            .list_by_author(author_id, params)
            .await
            .context("Failed to list categories")?;
        let total = self
            .repo
            .count_by_author(author_id)
            .await
            .context("Failed to count categories")?;

        Ok(PagedResult::new(items, total, params))
    }

    /// Every category, for select options (cached)
    pub async fn all(&self) -> Result<Vec<Category>, CategoryServiceError> {
        if let Some(cached) = self
            .cache
            .get::<Vec<Category>>(CACHE_KEY_CATEGORY_ALL)
            .await
            .ok()
            .flatten()
        {
            return Ok(cached);
        }

        let categories = self
            .repo
            .list_all()
            .await
            .context("Failed to list all categories")?;

        let _ = self
            .cache
            .set(CACHE_KEY_CATEGORY_ALL, &categories, self.cache_ttl)
            .await;

        Ok(categories)
    }

    /// False when any post or note is filed under the category, and also
    /// when the check itself fails.
    pub async fn can_be_deleted(&self, category: &Category) -> bool {
        for repo in &self.entry_repos {
            match repo.count_by_category(category.id).await {
                Ok(0) => continue,
                Ok(_) => return false,
                Err(e) => {
                    tracing::warn!(
                        category_id = category.id,
                        kind = %repo.kind(),
                        "failed to count entries in category: {:#}",
                        e
                    );
                    return false;
                }
            }
        }
        true
    }

    async fn invalidate_cache(&self) {
        let _ = self.cache.delete_pattern(CACHE_PATTERN_CATEGORY).await;
    }
}

fn validate_title(title: &str) -> Result<String, CategoryServiceError> {
    check_length("Title", title, TITLE_MIN_LEN, TITLE_MAX_LEN)
        .map_err(CategoryServiceError::ValidationError)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::db::repositories::{SqlxCategoryRepository, SqlxEntryRepository};
    use crate::db::{create_test_pool, migrations, DynDatabasePool};
    use crate::models::{CreateEntryInput, EntryKind};

    async fn setup_test_service() -> (DynDatabasePool, CategoryService, i64) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let author_id = sqlx::query("INSERT INTO users (email, password, roles) VALUES ('cat@example.com', 'hash', '[]')")
            .execute(pool.as_sqlite().unwrap())
            .await
            .unwrap()
            .last_insert_rowid();

        let service = CategoryService::new(
            SqlxCategoryRepository::boxed(pool.clone()),
            EntryKind::ALL
                .iter()
                .map(|kind| SqlxEntryRepository::boxed(pool.clone(), *kind))
                .collect(),
            Arc::new(Cache::Memory(MemoryCache::new())),
        );

        (pool, service, author_id)
    }

    #[tokio::test]
    async fn test_create_trims_and_validates() {
        let (_pool, service, author_id) = setup_test_service().await;

        let category = service.create(author_id, "  Travel  ").await.unwrap();
        assert_eq!(category.title, "Travel");
        assert_eq!(category.author_id, author_id);

        let short = service.create(author_id, "ab").await;
        assert!(matches!(short, Err(CategoryServiceError::ValidationError(_))));

        let long = service.create(author_id, &"x".repeat(65)).await;
        assert!(matches!(long, Err(CategoryServiceError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_update_missing_category() {
        let (_pool, service, _) = setup_test_service().await;
        let result = service.update(999, "Renamed").await;
        assert!(matches!(result, Err(CategoryServiceError::NotFound(999))));
    }

    #[tokio::test]
    async fn test_all_is_refreshed_after_writes() {
        let (_pool, service, author_id) = setup_test_service().await;

        assert!(service.all().await.unwrap().is_empty());

        let category = service.create(author_id, "Work").await.unwrap();
        assert_eq!(service.all().await.unwrap().len(), 1);

        service.update(category.id, "Office").await.unwrap();
        assert_eq!(service.all().await.unwrap()[0].title, "Office");

        service.delete(category.id).await.unwrap();
        assert!(service.all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_blocked_while_entries_reference_it() {
        let (pool, service, author_id) = setup_test_service().await;
        let category = service.create(author_id, "Busy").await.unwrap();

        let notes = SqlxEntryRepository::new(pool.clone(), EntryKind::Note);
        let note = notes
            .create(&CreateEntryInput::new("A note", category.id, author_id))
            .await
            .unwrap();

        assert!(!service.can_be_deleted(&category).await);
        let result = service.delete(category.id).await;
        assert!(matches!(result, Err(CategoryServiceError::InUse(_))));

        notes.delete(note.id).await.unwrap();
        assert!(service.can_be_deleted(&category).await);
        service.delete(category.id).await.unwrap();
        assert!(service.get(category.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_for_author_pages() {
        let (_pool, service, author_id) = setup_test_service().await;
        for title in ["Gamma", "Alpha", "Beta"] {
            service.create(author_id, title).await.unwrap();
        }

        let page = service
            .list_for_author(author_id, &ListParams::new(1, 2))
            .await
            .unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.total_pages(), 2);
        let titles: Vec<_> = page.items.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, vec!["Alpha", "Beta"]);

        let other = service
            .list_for_author(author_id + 1, &ListParams::new(1, 2))
            .await
            .unwrap();
        assert!(other.is_empty());
    }
}
