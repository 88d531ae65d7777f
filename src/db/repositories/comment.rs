//! Comment repository

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{Comment, CommentTarget, CreateCommentInput};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Comment repository trait
#[async_trait]
pub trait CommentRepository: Send + Sync {
    async fn create(&self, input: &CreateCommentInput) -> Result<Comment>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Comment>>;

    /// Comments on one entry, oldest first
    async fn list_for(&self, target: CommentTarget) -> Result<Vec<Comment>>;

    async fn delete(&self, id: i64) -> Result<()>;
}

pub struct SqlxCommentRepository {
    pool: DynDatabasePool,
}

impl SqlxCommentRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn CommentRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl CommentRepository for SqlxCommentRepository {
    async fn create(&self, input: &CreateCommentInput) -> Result<Comment> {
        let id = match self.pool.driver() {
            DatabaseDriver::Sqlite => create_comment_sqlite(self.pool.as_sqlite().unwrap(), input).await?,
            DatabaseDriver::Mysql => create_comment_mysql(self.pool.as_mysql().unwrap(), input).await?,
        };

        self.get_by_id(id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Comment not found after create"))
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Comment>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_comment_by_id_sqlite(self.pool.as_sqlite().unwrap(), id).await
            }
            DatabaseDriver::Mysql => get_comment_by_id_mysql(self.pool.as_mysql().unwrap(), id).await,
        }
    }

    async fn list_for(&self, target: CommentTarget) -> Result<Vec<Comment>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                list_comments_sqlite(self.pool.as_sqlite().unwrap(), target).await
            }
            DatabaseDriver::Mysql => list_comments_mysql(self.pool.as_mysql().unwrap(), target).await,
        }
    }

    async fn delete(&self, id: i64) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query("DELETE FROM comments WHERE id = ?")
                    .bind(id)
                    .execute(self.pool.as_sqlite().unwrap())
                    .await
                    .context("Failed to delete comment")?;
            }
            DatabaseDriver::Mysql => {
                sqlx::query("DELETE FROM comments WHERE id = ?")
                    .bind(id)
                    .execute(self.pool.as_mysql().unwrap())
                    .await
                    .context("Failed to delete comment")?;
            }
        }
        Ok(())
    }
}

const INSERT_COMMENT: &str = r#"
    INSERT INTO comments (post_id, note_id, user_id, content, created_at)
    VALUES (?, ?, ?, ?, ?)
"#;

const SELECT_COMMENT: &str = r#"
    SELECT cm.id, cm.post_id, cm.note_id, cm.user_id, cm.content, cm.created_at,
           u.email AS author_email
    FROM comments cm
    INNER JOIN users u ON u.id = cm.user_id
"#;

fn list_sql(target: CommentTarget) -> String {
    format!(
        "{} WHERE cm.{} = ? ORDER BY cm.created_at ASC, cm.id ASC",
        SELECT_COMMENT,
        target.kind().fk_column()
    )
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_comment_sqlite(pool: &SqlitePool, input: &CreateCommentInput) -> Result<i64> {
    let (post_id, note_id) = input.target.columns();
    let result = sqlx::query(INSERT_COMMENT)
        .bind(post_id)
        .bind(note_id)
        .bind(input.user_id)
        .bind(&input.content)
        .bind(Utc::now())
        .execute(pool)
        .await
        .context("Failed to create comment")?;

    Ok(result.last_insert_rowid())
}

async fn get_comment_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<Comment>> {
    let row = sqlx::query(&format!("{} WHERE cm.id = ?", SELECT_COMMENT))
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get comment by ID")?;

    row.as_ref().map(row_to_comment_sqlite).transpose()
}

async fn list_comments_sqlite(pool: &SqlitePool, target: CommentTarget) -> Result<Vec<Comment>> {
    let rows = sqlx::query(&list_sql(target))
        .bind(target.id())
        .fetch_all(pool)
        .await
        .context("Failed to list comments")?;

    rows.iter().map(row_to_comment_sqlite).collect()
}

fn row_to_comment_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Comment> {
    let post_id: Option<i64> = row.get("post_id");
    let note_id: Option<i64> = row.get("note_id");
    let target = CommentTarget::from_columns(post_id, note_id)
        .ok_or_else(|| anyhow::anyhow!("Comment without a single target"))?;

    Ok(Comment {
        id: row.get("id"),
        target,
        user_id: row.get("user_id"),
        author_email: row.get("author_email"),
        content: row.get("content"),
        created_at: row.get("created_at"),
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_comment_mysql(pool: &MySqlPool, input: &CreateCommentInput) -> Result<i64> {
    let (post_id, note_id) = input.target.columns();
    let result = sqlx::query(INSERT_COMMENT)
        .bind(post_id)
        .bind(note_id)
        .bind(input.user_id)
        .bind(&input.content)
        .bind(Utc::now())
        .execute(pool)
        .await
        .context("Failed to create comment")?;

    Ok(result.last_insert_id() as i64)
}

async fn get_comment_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<Comment>> {
    let row = sqlx::query(&format!("{} WHERE cm.id = ?", SELECT_COMMENT))
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get comment by ID")?;

    row.as_ref().map(row_to_comment_mysql).transpose()
}

async fn list_comments_mysql(pool: &MySqlPool, target: CommentTarget) -> Result<Vec<Comment>> {
    let rows = sqlx::query(&list_sql(target))
        .bind(target.id())
        .fetch_all(pool)
        .await
        .context("Failed to list comments")?;

    rows.iter().map(row_to_comment_mysql).collect()
}

fn row_to_comment_mysql(row: &sqlx::mysql::MySqlRow) -> Result<Comment> {
    let post_id: Option<i64> = row.get("post_id");
    let note_id: Option<i64> = row.get("note_id");
    let target = CommentTarget::from_columns(post_id, note_id)
        .ok_or_else(|| anyhow::anyhow!("Comment without a single target"))?;

    Ok(Comment {
        id: row.get("id"),
        target,
        user_id: row.get("user_id"),
        author_email: row.get("author_email"),
        content: row.get("content"),
        created_at: row.get("created_at"),
    })
}
