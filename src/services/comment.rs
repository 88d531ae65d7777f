//! Comment service
//!
//! Any logged-in user may comment on any post or note. Callers load the
//! target entry first, so this service only validates and stores.

use crate::db::repositories::CommentRepository;
use crate::models::{Comment, CommentTarget, CreateCommentInput, User};
use crate::services::validation::check_length;
use anyhow::Context;
use std::sync::Arc;

const CONTENT_MIN_LEN: usize = 3;
const CONTENT_MAX_LEN: usize = 15000;

/// Error types for comment service operations
#[derive(Debug, thiserror::Error)]
pub enum CommentServiceError {
    #[error("Comment not found: {0}")]
    NotFound(i64),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

pub struct CommentService {
    repo: Arc<dyn CommentRepository>,
}

impl CommentService {
    pub fn new(repo: Arc<dyn CommentRepository>) -> Self {
        Self { repo }
    }

    /// Attach a comment to a post or a note.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` for content outside 3..=15000 chars.
    pub async fn create(
        &self,
        author: &User,
        target: CommentTarget,
        content: &str,
    ) -> Result<Comment, CommentServiceError> {
        let content = check_length("Content", content, CONTENT_MIN_LEN, CONTENT_MAX_LEN)
            .map_err(CommentServiceError::ValidationError)?;

        let comment = self
            .repo
            .create(&CreateCommentInput::new(target, author.id, content))
            .await
            .context("Failed to create comment")?;

        Ok(comment)
    }

    /// Comments on one post or note, oldest first
    pub async fn list_for(&self, target: CommentTarget) -> Result<Vec<Comment>, CommentServiceError> {
        let comments = self
            .repo
            .list_for(target)
            .await
            .context("Failed to list comments")?;

        Ok(comments)
    }

    pub async fn delete(&self, id: i64) -> Result<(), CommentServiceError> {
        if self
            .repo
            .get_by_id(id)
            .await
            .context("Failed to get comment")?
            .is_none()
        {
            return Err(CommentServiceError::NotFound(id));
        }

        self.repo.delete(id).await.context("Failed to delete comment")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{SqlxCommentRepository, SqlxUserRepository, UserRepository};
    use crate::db::{create_test_pool, migrations};
    use crate::models::UserRole;

    async fn setup_test_service() -> (CommentService, User, i64) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let users = SqlxUserRepository::new(pool.clone());
        let user = users
            .create(&User::new("commenter@example.com", "hash", vec![UserRole::User]))
            .await
            .unwrap();

        let sqlite = pool.as_sqlite().unwrap();
        let category_id = sqlx::query("INSERT INTO category (author_id, title) VALUES (?, 'General')")
            .bind(user.id)
            .execute(sqlite)
            .await
            .unwrap()
            .last_insert_rowid();
        let post_id = sqlx::query("INSERT INTO posts (category_id, author_id, title) VALUES (?, ?, 'Post')")
            .bind(category_id)
            .bind(user.id)
            .execute(sqlite)
            .await
            .unwrap()
            .last_insert_rowid();

        (CommentService::new(SqlxCommentRepository::boxed(pool)), user, post_id)
    }

    #[tokio::test]
    async fn test_create_and_list() {
        let (service, user, post_id) = setup_test_service().await;
        let target = CommentTarget::Post(post_id);

        service.create(&user, target, "First!").await.unwrap();
        service.create(&user, target, " Second ").await.unwrap();

        let comments = service.list_for(target).await.unwrap();
        let contents: Vec<_> = comments.iter().map(|c| c.content.as_str()).collect();
        assert_eq!(contents, vec!["First!", "Second"]);
        assert!(comments.iter().all(|c| c.user_id == user.id));
    }

    #[tokio::test]
    async fn test_content_bounds() {
        let (service, user, post_id) = setup_test_service().await;
        let target = CommentTarget::Post(post_id);

        assert!(matches!(
            service.create(&user, target, "hi").await,
            Err(CommentServiceError::ValidationError(_))
        ));
        assert!(matches!(
            service.create(&user, target, &"c".repeat(15001)).await,
            Err(CommentServiceError::ValidationError(_))
        ));
        assert!(service.create(&user, target, &"c".repeat(15000)).await.is_ok());
    }

    #[tokio::test]
    async fn test_delete() {
        let (service, user, post_id) = setup_test_service().await;
        let comment = service
            .create(&user, CommentTarget::Post(post_id), "temporary")
            .await
            .unwrap();

        service.delete(comment.id).await.unwrap();
        assert!(matches!(
            service.delete(comment.id).await,
            Err(CommentServiceError::NotFound(_))
        ));
    }
}
