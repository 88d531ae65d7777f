//! Entry service
//!
//! Business rules for posts and notes. The application builds one
//! `EntryService` per `EntryKind`; apart from the table they touch, the two
//! instances behave identically.

use crate::db::repositories::{CategoryRepository, EntryRepository, TagRepository};
use crate::models::{
    CreateEntryInput, Entry, EntryFilters, EntryKind, FilterRequest, ListParams, PagedResult,
    UpdateEntryInput,
};
use crate::services::validation::{check_length, check_optional};
use anyhow::Context;
use std::collections::BTreeSet;
use std::sync::Arc;

const TITLE_MIN_LEN: usize = 3;
const TITLE_MAX_LEN: usize = 255;
const CONTENT_MAX_LEN: usize = 65535;
const DEFAULT_PER_PAGE: u32 = 10;

/// Error types for entry service operations
#[derive(Debug, thiserror::Error)]
pub enum EntryServiceError {
    #[error("Entry not found: {0}")]
    NotFound(i64),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Submitted post/note form, before validation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntryDraft {
    pub title: String,
    pub content: Option<String>,
    pub category_id: Option<i64>,
    pub tag_ids: Vec<i64>,
}

impl EntryDraft {
    pub fn new(title: impl Into<String>, category_id: Option<i64>) -> Self {
        Self {
            title: title.into(),
            category_id,
            ..Self::default()
        }
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn with_tags(mut self, tag_ids: Vec<i64>) -> Self {
        self.tag_ids = tag_ids;
        self
    }

    /// Prefill a form from an existing entry
    pub fn from_entry(entry: &Entry) -> Self {
        Self {
            title: entry.title.clone(),
            content: entry.content.clone(),
            category_id: Some(entry.category.id),
            tag_ids: entry.tag_ids(),
        }
    }
}

/// A draft that passed validation
struct ValidDraft {
    title: String,
    content: Option<String>,
    category_id: i64,
    tag_ids: Vec<i64>,
}

pub struct EntryService {
    repo: Arc<dyn EntryRepository>,
    category_repo: Arc<dyn CategoryRepository>,
    tag_repo: Arc<dyn TagRepository>,
    per_page: u32,
}

impl EntryService {
    pub fn new(
        repo: Arc<dyn EntryRepository>,
        category_repo: Arc<dyn CategoryRepository>,
        tag_repo: Arc<dyn TagRepository>,
    ) -> Self {
        Self {
            repo,
            category_repo,
            tag_repo,
            per_page: DEFAULT_PER_PAGE,
        }
    }

    pub fn with_per_page(mut self, per_page: u32) -> Self {
        self.per_page = per_page;
        self
    }

    pub fn kind(&self) -> EntryKind {
        self.repo.kind()
    }

    /// Validate `draft` and store it with its tag links.
    ///
    /// # Arguments
    ///
    /// * `author_id` - The logged-in user who becomes the owner
    /// * `draft` - Submitted title, content, category and tags
    ///
    /// # Errors
    ///
    /// - `ValidationError` for a title outside 3..=255 chars, content over
    ///   65535 chars, a missing or unknown category, or an unknown tag
    /// - `InternalError` if the database write fails
    pub async fn create(&self, author_id: i64, draft: &EntryDraft) -> Result<Entry, EntryServiceError> {
        let valid = self.validate(draft).await?;

        let mut input = CreateEntryInput::new(valid.title, valid.category_id, author_id)
            .with_tags(valid.tag_ids);
        input.content = valid.content;

        let entry = self
            .repo
            .create(&input)
            .await
            .with_context(|| format!("Failed to create {}", self.kind()))?;

        tracing::debug!(kind = %self.kind(), id = entry.id, author_id, "entry created");
        Ok(entry)
    }

    pub async fn get(&self, id: i64) -> Result<Option<Entry>, EntryServiceError> {
        let entry = self
            .repo
            .get_by_id(id)
            .await
            .with_context(|| format!("Failed to get {}", self.kind()))?;

        Ok(entry)
    }

    /// Replace title, content, category and tags of an existing entry
    ///
    /// # Errors
    ///
    /// - `NotFound` if there is no entry with `id`
    /// - `ValidationError` under the same rules as `create`
    pub async fn update(&self, id: i64, draft: &EntryDraft) -> Result<Entry, EntryServiceError> {
        if self.get(id).await?.is_none() {
            return Err(EntryServiceError::NotFound(id));
        }
        let valid = self.validate(draft).await?;

        let mut input = UpdateEntryInput::new(valid.title, valid.category_id).with_tags(valid.tag_ids);
        input.content = valid.content;

        let entry = self
            .repo
            .update(id, &input)
            .await
            .with_context(|| format!("Failed to update {}", self.kind()))?;

        Ok(entry)
    }

    /// Delete an entry together with its tag links and comments
    pub async fn delete(&self, id: i64) -> Result<(), EntryServiceError> {
        if self.get(id).await?.is_none() {
            return Err(EntryServiceError::NotFound(id));
        }

        self.repo
            .delete(id)
            .await
            .with_context(|| format!("Failed to delete {}", self.kind()))?;

        Ok(())
    }

    /// One page of entries, most recently updated first
    pub async fn paginated_list(
        &self,
        page: u32,
        filters: &EntryFilters,
    ) -> Result<PagedResult<Entry>, EntryServiceError> {
        let params = ListParams::new(page, self.per_page);

        let items = self
            .repo
            .list(&params, filters)
            .await
            .with_context(|| format!("Failed to list {}s", self.kind()))?;
        let total = self
            .repo
            .count(filters)
            .await
            .with_context(|| format!("Failed to count {}s", self.kind()))?;

        Ok(PagedResult::new(items, total, &params))
    }

    /// Resolve raw query filters to records.
    ///
    /// Ids that are not positive integers, or that name nothing, are dropped
    /// without error.
    pub async fn prepare_filters(&self, raw: &FilterRequest) -> Result<EntryFilters, EntryServiceError> {
        let mut filters = EntryFilters::default();

        if let Some(id) = raw.category_id.as_deref().and_then(parse_id) {
            filters.category = self
                .category_repo
                .get_by_id(id)
                .await
                .context("Failed to resolve category filter")?;
        }

        if let Some(id) = raw.tag_id.as_deref().and_then(parse_id) {
            filters.tag = self
                .tag_repo
                .get_by_id(id)
                .await
                .context("Failed to resolve tag filter")?;
        }

        Ok(filters)
    }

    async fn validate(&self, draft: &EntryDraft) -> Result<ValidDraft, EntryServiceError> {
        let title = check_length("Title", &draft.title, TITLE_MIN_LEN, TITLE_MAX_LEN)
            .map_err(EntryServiceError::ValidationError)?;
        let content = check_optional("Content", draft.content.as_deref(), CONTENT_MAX_LEN)
            .map_err(EntryServiceError::ValidationError)?;

        let category_id = draft.category_id.ok_or_else(|| {
            EntryServiceError::ValidationError("Category should not be blank.".to_string())
        })?;
        if self
            .category_repo
            .get_by_id(category_id)
            .await
            .context("Failed to check category")?
            .is_none()
        {
            return Err(EntryServiceError::ValidationError(
                "The selected category does not exist.".to_string(),
            ));
        }

        let tag_ids: Vec<i64> = draft
            .tag_ids
            .iter()
            .copied()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let found = self
            .tag_repo
            .get_by_ids(&tag_ids)
            .await
            .context("Failed to check tags")?;
        if found.len() != tag_ids.len() {
            return Err(EntryServiceError::ValidationError(
                "One of the selected tags does not exist.".to_string(),
            ));
        }

        Ok(ValidDraft {
            title,
            content,
            category_id,
            tag_ids,
        })
    }
}

/// Parse a record id from user input: a positive integer, nothing else
pub fn parse_id(raw: &str) -> Option<i64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    trimmed.parse::<i64>().ok().filter(|id| *id > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{SqlxCategoryRepository, SqlxEntryRepository, SqlxTagRepository};
    use crate::db::{create_test_pool, migrations, DynDatabasePool};
    use crate::models::CreateCategoryInput;

    struct Fixture {
        _pool: DynDatabasePool,
        posts: EntryService,
        notes: EntryService,
        author_id: i64,
        category_id: i64,
        tag_ids: Vec<i64>,
    }

    async fn setup_test_service() -> Fixture {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let author_id = sqlx::query("INSERT INTO users (email, password, roles) VALUES ('writer@example.com', 'hash', '[]')")
            .execute(pool.as_sqlite().unwrap())
            .await
            .unwrap()
            .last_insert_rowid();

        let category_repo = SqlxCategoryRepository::boxed(pool.clone());
        let tag_repo = SqlxTagRepository::boxed(pool.clone());
        let category_id = category_repo
            .create(&CreateCategoryInput::new(author_id, "General"))
            .await
            .unwrap()
            .id;
        let mut tag_ids = Vec::new();
        for title in ["rust", "web"] {
            tag_ids.push(tag_repo.create(title).await.unwrap().id);
        }

        let service = |kind| {
            EntryService::new(
                SqlxEntryRepository::boxed(pool.clone(), kind),
                category_repo.clone(),
                tag_repo.clone(),
            )
            .with_per_page(2)
        };

        Fixture {
            posts: service(EntryKind::Post),
            notes: service(EntryKind::Note),
            _pool: pool,
            author_id,
            category_id,
            tag_ids,
        }
    }

    // ========================================================================
    // Create / update tests
    // ========================================================================

    #[tokio::test]
    async fn test_create_entry() {
        let fx = setup_test_service().await;
        let draft = EntryDraft::new("  Hello world ", Some(fx.category_id))
            .with_content("Body")
            .with_tags(vec![fx.tag_ids[1], fx.tag_ids[0], fx.tag_ids[1]]);

        let entry = fx.posts.create(fx.author_id, &draft).await.unwrap();

        assert_eq!(entry.kind, EntryKind::Post);
        assert_eq!(entry.title, "Hello world");
        assert_eq!(entry.content.as_deref(), Some("Body"));
        assert_eq!(entry.category.id, fx.category_id);
        assert_eq!(entry.tags.len(), 2);
        assert_eq!(entry.author_email, "writer@example.com");
    }

    #[tokio::test]
    async fn test_blank_content_is_stored_as_none() {
        let fx = setup_test_service().await;
        let draft = EntryDraft::new("Untitled note", Some(fx.category_id)).with_content("   ");

        let entry = fx.notes.create(fx.author_id, &draft).await.unwrap();
        assert!(entry.content.is_none());
    }

    #[tokio::test]
    async fn test_create_validation_errors() {
        let fx = setup_test_service().await;

        let cases = vec![
            EntryDraft::new("ab", Some(fx.category_id)),
            EntryDraft::new("x".repeat(256), Some(fx.category_id)),
            EntryDraft::new("Valid", Some(fx.category_id)).with_content("c".repeat(65536)),
            EntryDraft::new("Valid", None),
            EntryDraft::new("Valid", Some(9999)),
            EntryDraft::new("Valid", Some(fx.category_id)).with_tags(vec![9999]),
        ];

        for draft in cases {
            let result = fx.posts.create(fx.author_id, &draft).await;
            assert!(
                matches!(result, Err(EntryServiceError::ValidationError(_))),
                "draft {:?} should be rejected",
                draft.title
            );
        }
    }

    #[tokio::test]
    async fn test_update_entry() {
        let fx = setup_test_service().await;
        let entry = fx
            .posts
            .create(
                fx.author_id,
                &EntryDraft::new("Original", Some(fx.category_id)).with_tags(fx.tag_ids.clone()),
            )
            .await
            .unwrap();

        let mut draft = EntryDraft::from_entry(&entry);
        draft.title = "Edited".to_string();
        draft.tag_ids = vec![fx.tag_ids[0]];

        let updated = fx.posts.update(entry.id, &draft).await.unwrap();
        assert_eq!(updated.title, "Edited");
        assert_eq!(updated.tag_ids(), vec![fx.tag_ids[0]]);
        assert!(updated.updated_at >= entry.updated_at);
    }

    #[tokio::test]
    async fn test_update_and_delete_missing_entry() {
        let fx = setup_test_service().await;
        let draft = EntryDraft::new("Valid", Some(fx.category_id));

        assert!(matches!(
            fx.posts.update(77, &draft).await,
            Err(EntryServiceError::NotFound(77))
        ));
        assert!(matches!(fx.posts.delete(77).await, Err(EntryServiceError::NotFound(77))));
    }

    #[tokio::test]
    async fn test_posts_and_notes_are_separate() {
        let fx = setup_test_service().await;
        let post = fx
            .posts
            .create(fx.author_id, &EntryDraft::new("A post", Some(fx.category_id)))
            .await
            .unwrap();

        let page = fx.notes.paginated_list(1, &EntryFilters::default()).await.unwrap();
        assert!(page.is_empty());
        assert!(fx.posts.get(post.id).await.unwrap().is_some());
    }

    // ========================================================================
    // Listing / filter tests
    // ========================================================================

    #[tokio::test]
    async fn test_paginated_list_respects_per_page() {
        let fx = setup_test_service().await;
        for title in ["One", "Two", "Three"] {
            fx.posts
                .create(fx.author_id, &EntryDraft::new(title, Some(fx.category_id)))
                .await
                .unwrap();
        }

        let first = fx.posts.paginated_list(1, &EntryFilters::default()).await.unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(first.total, 3);
        assert!(first.has_next());

        let second = fx.posts.paginated_list(2, &EntryFilters::default()).await.unwrap();
        assert_eq!(second.len(), 1);
        assert!(!second.has_next());

        // most recently updated first
        assert_eq!(first.items[0].title, "Three");
    }

    #[tokio::test]
    async fn test_prepare_filters_resolves_known_ids() {
        let fx = setup_test_service().await;
        let raw = FilterRequest {
            category_id: Some(fx.category_id.to_string()),
            tag_id: Some(fx.tag_ids[0].to_string()),
        };

        let filters = fx.posts.prepare_filters(&raw).await.unwrap();
        assert_eq!(filters.category_id(), Some(fx.category_id));
        assert_eq!(filters.tag_id(), Some(fx.tag_ids[0]));
    }

    #[tokio::test]
    async fn test_prepare_filters_drops_unknown_ids() {
        let fx = setup_test_service().await;

        for (category, tag) in [("9999", "9999"), ("abc", "-1"), ("", "0"), ("1.5", " ")] {
            let raw = FilterRequest {
                category_id: Some(category.to_string()),
                tag_id: Some(tag.to_string()),
            };
            let filters = fx.posts.prepare_filters(&raw).await.unwrap();
            assert!(filters.is_empty(), "{:?}/{:?} should be dropped", category, tag);
        }
    }

    #[tokio::test]
    async fn test_tag_filter_narrows_list() {
        let fx = setup_test_service().await;
        fx.posts
            .create(
                fx.author_id,
                &EntryDraft::new("Tagged", Some(fx.category_id)).with_tags(vec![fx.tag_ids[0]]),
            )
            .await
            .unwrap();
        fx.posts
            .create(fx.author_id, &EntryDraft::new("Plain", Some(fx.category_id)))
            .await
            .unwrap();

        let raw = FilterRequest {
            category_id: None,
            tag_id: Some(fx.tag_ids[0].to_string()),
        };
        let filters = fx.posts.prepare_filters(&raw).await.unwrap();
        let page = fx.posts.paginated_list(1, &filters).await.unwrap();

        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].title, "Tagged");
    }

    #[test]
    fn test_parse_id() {
        assert_eq!(parse_id("42"), Some(42));
        assert_eq!(parse_id(" 7 "), Some(7));
        assert_eq!(parse_id("0"), None);
        assert_eq!(parse_id("-3"), None);
        assert_eq!(parse_id("+3"), None);
        assert_eq!(parse_id("abc"), None);
        assert_eq!(parse_id(""), None);
        assert_eq!(parse_id("99999999999999999999"), None);
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn parse_id_accepts_every_positive_i64(id in 1i64..=i64::MAX) {
            prop_assert_eq!(parse_id(&id.to_string()), Some(id));
        }

        #[test]
        fn parse_id_rejects_non_digits(raw in "[a-zA-Z_.-]{1,8}") {
            prop_assert_eq!(parse_id(&raw), None);
        }
    }
}
