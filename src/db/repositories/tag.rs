//! Tag repository

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{ListParams, Tag};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Tag repository trait
#[async_trait]
pub trait TagRepository: Send + Sync {
    async fn create(&self, title: &str) -> Result<Tag>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Tag>>;

    /// Fetch several tags at once; unknown ids are skipped
    async fn get_by_ids(&self, ids: &[i64]) -> Result<Vec<Tag>>;

    async fn update(&self, id: i64, title: &str) -> Result<Tag>;

    async fn delete(&self, id: i64) -> Result<()>;

    /// One page of tags ordered by title
    async fn list(&self, params: &ListParams) -> Result<Vec<Tag>>;

    async fn count(&self) -> Result<i64>;

    async fn list_all(&self) -> Result<Vec<Tag>>;
}

pub struct SqlxTagRepository {
    pool: DynDatabasePool,
}

impl SqlxTagRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn TagRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl TagRepository for SqlxTagRepository {
    async fn create(&self, title: &str) -> Result<Tag> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_tag_sqlite(self.pool.as_sqlite().unwrap(), title).await,
            DatabaseDriver::Mysql => create_tag_mysql(self.pool.as_mysql().unwrap(), title).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Tag>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_tag_by_id_sqlite(self.pool.as_sqlite().unwrap(), id).await,
            DatabaseDriver::Mysql => get_tag_by_id_mysql(self.pool.as_mysql().unwrap(), id).await,
        }
    }

    async fn get_by_ids(&self, ids: &[i64]) -> Result<Vec<Tag>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_tags_by_ids_sqlite(self.pool.as_sqlite().unwrap(), ids).await,
            DatabaseDriver::Mysql => get_tags_by_ids_mysql(self.pool.as_mysql().unwrap(), ids).await,
        }
    }

    async fn update(&self, id: i64, title: &str) -> Result<Tag> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => update_tag_sqlite(self.pool.as_sqlite().unwrap(), id, title).await,
            DatabaseDriver::Mysql => update_tag_mysql(self.pool.as_mysql().unwrap(), id, title).await,
        }
    }

    async fn delete(&self, id: i64) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => delete_tag_sqlite(self.pool.as_sqlite().unwrap(), id).await,
            DatabaseDriver::Mysql => delete_tag_mysql(self.pool.as_mysql().unwrap(), id).await,
        }
    }

    async fn list(&self, params: &ListParams) -> Result<Vec<Tag>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => list_tags_sqlite(self.pool.as_sqlite().unwrap(), params).await,
            DatabaseDriver::Mysql => list_tags_mysql(self.pool.as_mysql().unwrap(), params).await,
        }
    }

    async fn count(&self) -> Result<i64> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => count_tags_sqlite(self.pool.as_sqlite().unwrap()).await,
            DatabaseDriver::Mysql => count_tags_mysql(self.pool.as_mysql().unwrap()).await,
        }
    }

    async fn list_all(&self) -> Result<Vec<Tag>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => list_all_tags_sqlite(self.pool.as_sqlite().unwrap()).await,
            DatabaseDriver::Mysql => list_all_tags_mysql(self.pool.as_mysql().unwrap()).await,
        }
    }
}

/// `SELECT ... WHERE id IN (?, ?, ...)` with one placeholder per id
fn select_by_ids_sql(count: usize) -> String {
    let placeholders = vec!["?"; count].join(", ");
    format!(
        "SELECT id, title FROM tag WHERE id IN ({}) ORDER BY title ASC, id ASC",
        placeholders
    )
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_tag_sqlite(pool: &SqlitePool, title: &str) -> Result<Tag> {
    let result = sqlx::query("INSERT INTO tag (title) VALUES (?)")
        .bind(title)
        .execute(pool)
        .await
        .context("Failed to create tag")?;

    Ok(Tag::new(result.last_insert_rowid(), title))
}

async fn get_tag_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<Tag>> {
    let row = sqlx::query("SELECT id, title FROM tag WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get tag by ID")?;

    Ok(row.as_ref().map(row_to_tag_sqlite))
}

async fn get_tags_by_ids_sqlite(pool: &SqlitePool, ids: &[i64]) -> Result<Vec<Tag>> {
    let sql = select_by_ids_sql(ids.len());
    let mut query = sqlx::query(&sql);
    for id in ids {
        query = query.bind(*id);
    }

    let rows = query
        .fetch_all(pool)
        .await
        .context("Failed to get tags by IDs")?;

    Ok(rows.iter().map(row_to_tag_sqlite).collect())
}

async fn update_tag_sqlite(pool: &SqlitePool, id: i64, title: &str) -> Result<Tag> {
    sqlx::query("UPDATE tag SET title = ? WHERE id = ?")
        .bind(title)
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to update tag")?;

    get_tag_by_id_sqlite(pool, id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Tag not found after update"))
}

async fn delete_tag_sqlite(pool: &SqlitePool, id: i64) -> Result<()> {
    sqlx::query("DELETE FROM tag WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete tag")?;

    Ok(())
}

async fn list_tags_sqlite(pool: &SqlitePool, params: &ListParams) -> Result<Vec<Tag>> {
    let rows = sqlx::query("SELECT id, title FROM tag ORDER BY title ASC, id ASC LIMIT ? OFFSET ?")
        .bind(params.limit())
        .bind(params.offset())
        .fetch_all(pool)
        .await
        .context("Failed to list tags")?;

    Ok(rows.iter().map(row_to_tag_sqlite).collect())
}

async fn count_tags_sqlite(pool: &SqlitePool) -> Result<i64> {
    let row = sqlx::query("SELECT COUNT(*) as count FROM tag")
        .fetch_one(pool)
        .await
        .context("Failed to count tags")?;

    Ok(row.get("count"))
}

async fn list_all_tags_sqlite(pool: &SqlitePool) -> Result<Vec<Tag>> {
    let rows = sqlx::query("SELECT id, title FROM tag ORDER BY title ASC, id ASC")
        .fetch_all(pool)
        .await
        .context("Failed to list tags")?;

    Ok(rows.iter().map(row_to_tag_sqlite).collect())
}

fn row_to_tag_sqlite(row: &sqlx::sqlite::SqliteRow) -> Tag {
    Tag {
        id: row.get("id"),
        title: row.get("title"),
    }
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_tag_mysql(pool: &MySqlPool, title: &str) -> Result<Tag> {
    let result = sqlx::query("INSERT INTO tag (title) VALUES (?)")
        .bind(title)
        .execute(pool)
        .await
        .context("Failed to create tag")?;

    Ok(Tag::new(result.last_insert_id() as i64, title))
}

async fn get_tag_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<Tag>> {
    let row = sqlx::query("SELECT id, title FROM tag WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get tag by ID")?;

    Ok(row.as_ref().map(row_to_tag_mysql))
}

async fn get_tags_by_ids_mysql(pool: &MySqlPool, ids: &[i64]) -> Result<Vec<Tag>> {
    let sql = select_by_ids_sql(ids.len());
    let mut query = sqlx::query(&sql);
    for id in ids {
        query = query.bind(*id);
    }

    let rows = query
        .fetch_all(pool)
        .await
        .context("Failed to get tags by IDs")?;

    Ok(rows.iter().map(row_to_tag_mysql).collect())
}

async fn update_tag_mysql(pool: &MySqlPool, id: i64, title: &str) -> Result<Tag> {
    sqlx::query("UPDATE tag SET title = ? WHERE id = ?")
        .bind(title)
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to update tag")?;

    get_tag_by_id_mysql(pool, id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Tag not found after update"))
}

async fn delete_tag_mysql(pool: &MySqlPool, id: i64) -> Result<()> {
    sqlx::query("DELETE FROM tag WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete tag")?;

    Ok(())
}

async fn list_tags_mysql(pool: &MySqlPool, params: &ListParams) -> Result<Vec<Tag>> {
    let rows = sqlx::query("SELECT id, title FROM tag ORDER BY title ASC, id ASC LIMIT ? OFFSET ?")
        .bind(params.limit())
        .bind(params.offset())
        .fetch_all(pool)
        .await
        .context("Failed to list tags")?;

    Ok(rows.iter().map(row_to_tag_mysql).collect())
}

async fn count_tags_mysql(pool: &MySqlPool) -> Result<i64> {
    let row = sqlx::query("SELECT COUNT(*) as count FROM tag")
        .fetch_one(pool)
        .await
        .context("Failed to count tags")?;

    Ok(row.get("count"))
}

async fn list_all_tags_mysql(pool: &MySqlPool) -> Result<Vec<Tag>> {
    let rows = sqlx::query("SELECT id, title FROM tag ORDER BY title ASC, id ASC")
        .fetch_all(pool)
        .await
        .context("Failed to list tags")?;

    Ok(rows.iter().map(row_to_tag_mysql).collect())
}

fn row_to_tag_mysql(row: &sqlx::mysql::MySqlRow) -> Tag {
    Tag {
        id: row.get("id"),
        title: row.get("title"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    async fn setup_test_repo() -> (DynDatabasePool, SqlxTagRepository) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        let repo = SqlxTagRepository::new(pool.clone());
        (pool, repo)
    }

    #[tokio::test]
    async fn test_create_and_get_tag() {
        let (_pool, repo) = setup_test_repo().await;

        let tag = repo.create("rust").await.expect("Failed to create tag");
        assert!(tag.id > 0);
        assert_eq!(repo.get_by_id(tag.id).await.unwrap(), Some(tag));
    }

    #[tokio::test]
    async fn test_get_tag_by_id_not_found() {
        let (_pool, repo) = setup_test_repo().await;
        assert!(repo.get_by_id(42).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_get_by_ids_skips_unknown() {
        let (_pool, repo) = setup_test_repo().await;
        let zeta = repo.create("zeta").await.unwrap();
        let alpha = repo.create("alpha").await.unwrap();

        let found = repo.get_by_ids(&[zeta.id, 999, alpha.id]).await.unwrap();
        assert_eq!(found, vec![alpha, zeta]);
        assert!(repo.get_by_ids(&[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_and_delete_tag() {
        let (_pool, repo) = setup_test_repo().await;
        let tag = repo.create("old").await.unwrap();

        let updated = repo.update(tag.id, "new").await.unwrap();
        assert_eq!(updated.title, "new");

        repo.delete(tag.id).await.unwrap();
        assert!(repo.get_by_id(tag.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_tags_ordered_by_title() {
        let (_pool, repo) = setup_test_repo().await;
        for title in ["gamma", "alpha", "beta"] {
            repo.create(title).await.unwrap();
        }

        let page = repo.list(&ListParams::new(1, 2)).await.unwrap();
        let titles: Vec<_> = page.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["alpha", "beta"]);
        assert_eq!(repo.count().await.unwrap(), 3);
        assert_eq!(repo.list_all().await.unwrap().len(), 3);
    }

    #[test]
    fn test_select_by_ids_sql() {
        let sql = select_by_ids_sql(3);
        assert!(sql.contains("IN (?, ?, ?)"));
    }
}
