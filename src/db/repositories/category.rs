//! Category repository

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{Category, CreateCategoryInput, ListParams};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Category repository trait
#[async_trait]
pub trait CategoryRepository: Send + Sync {
    async fn create(&self, input: &CreateCategoryInput) -> Result<Category>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Category>>;

    /// Rename a category
    async fn update(&self, id: i64, title: &str) -> Result<Category>;

    async fn delete(&self, id: i64) -> Result<()>;

    /// One page of an author's categories, ordered by title
    async fn list_by_author(&self, author_id: i64, params: &ListParams) -> Result<Vec<Category>>;

    async fn count_by_author(&self, author_id: i64) -> Result<i64>;

    /// Every category, ordered by title (form select options)
    async fn list_all(&self) -> Result<Vec<Category>>;
}

pub struct SqlxCategoryRepository {
    pool: DynDatabasePool,
}

impl SqlxCategoryRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn CategoryRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl CategoryRepository for SqlxCategoryRepository {
    async fn create(&self, input: &CreateCategoryInput) -> Result<Category> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                create_category_sqlite(self.pool.as_sqlite().unwrap(), input).await
            }
            DatabaseDriver::Mysql => {
                create_category_mysql(self.pool.as_mysql().unwrap(), input).await
            }
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Category>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_category_by_id_sqlite(self.pool.as_sqlite().unwrap(), id).await
            }
            DatabaseDriver::Mysql => {
                get_category_by_id_mysql(self.pool.as_mysql().unwrap(), id).await
            }
        }
    }

    async fn update(&self, id: i64, title: &str) -> Result<Category> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                update_category_sqlite(self.pool.as_sqlite().unwrap(), id, title).await
            }
            DatabaseDriver::Mysql => {
                update_category_mysql(self.pool.as_mysql().unwrap(), id, title).await
            }
        }
    }

    async fn delete(&self, id: i64) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                delete_category_sqlite(self.pool.as_sqlite().unwrap(), id).await
            }
            DatabaseDriver::Mysql => delete_category_mysql(self.pool.as_mysql().unwrap(), id).await,
        }
    }

    async fn list_by_author(&self, author_id: i64, params: &ListParams) -> Result<Vec<Category>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                list_categories_by_author_sqlite(self.pool.as_sqlite().unwrap(), author_id, params)
                    .await
            }
            DatabaseDriver::Mysql => {
                list_categories_by_author_mysql(self.pool.as_mysql().unwrap(), author_id, params)
                    .await
            }
        }
    }

    async fn count_by_author(&self, author_id: i64) -> Result<i64> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                count_categories_by_author_sqlite(self.pool.as_sqlite().unwrap(), author_id).await
            }
            DatabaseDriver::Mysql => {
                count_categories_by_author_mysql(self.pool.as_mysql().unwrap(), author_id).await
            }
        }
    }

    async fn list_all(&self) -> Result<Vec<Category>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => list_all_categories_sqlite(self.pool.as_sqlite().unwrap()).await,
            DatabaseDriver::Mysql => list_all_categories_mysql(self.pool.as_mysql().unwrap()).await,
        }
    }
}

const LIST_BY_AUTHOR: &str = r#"
    SELECT id, author_id, title
    FROM category
    WHERE author_id = ?
    ORDER BY title ASC, id ASC
    LIMIT ? OFFSET ?
"#;

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_category_sqlite(pool: &SqlitePool, input: &CreateCategoryInput) -> Result<Category> {
    let result = sqlx::query("INSERT INTO category (author_id, title) VALUES (?, ?)")
        .bind(input.author_id)
        .bind(&input.title)
        .execute(pool)
        .await
        .context("Failed to create category")?;

    Ok(Category {
        id: result.last_insert_rowid(),
        author_id: input.author_id,
        title: input.title.clone(),
    })
}

async fn get_category_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<Category>> {
    let row = sqlx::query("SELECT id, author_id, title FROM category WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get category by ID")?;

    Ok(row.as_ref().map(row_to_category_sqlite))
}

async fn update_category_sqlite(pool: &SqlitePool, id: i64, title: &str) -> Result<Category> {
    sqlx::query("UPDATE category SET title = ? WHERE id = ?")
        .bind(title)
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to update category")?;

    get_category_by_id_sqlite(pool, id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Category not found after update"))
}

async fn delete_category_sqlite(pool: &SqlitePool, id: i64) -> Result<()> {
    sqlx::query("DELETE FROM category WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete category")?;

    Ok(())
}

async fn list_categories_by_author_sqlite(
    pool: &SqlitePool,
    author_id: i64,
    params: &ListParams,
) -> Result<Vec<Category>> {
    let rows = sqlx::query(LIST_BY_AUTHOR)
        .bind(author_id)
        .bind(params.limit())
        .bind(params.offset())
        .fetch_all(pool)
        .await
        .context("Failed to list categories")?;

    Ok(rows.iter().map(row_to_category_sqlite).collect())
}

async fn count_categories_by_author_sqlite(pool: &SqlitePool, author_id: i64) -> Result<i64> {
    let row = sqlx::query("SELECT COUNT(*) as count FROM category WHERE author_id = ?")
        .bind(author_id)
        .fetch_one(pool)
        .await
        .context("Failed to count categories")?;

    Ok(row.get("count"))
}

async fn list_all_categories_sqlite(pool: &SqlitePool) -> Result<Vec<Category>> {
    let rows = sqlx::query("SELECT id, author_id, title FROM category ORDER BY title ASC, id ASC")
        .fetch_all(pool)
        .await
        .context("Failed to list categories")?;

    Ok(rows.iter().map(row_to_category_sqlite).collect())
}

fn row_to_category_sqlite(row: &sqlx::sqlite::SqliteRow) -> Category {
    Category {
        id: row.get("id"),
        author_id: row.get("author_id"),
        title: row.get("title"),
    }
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_category_mysql(pool: &MySqlPool, input: &CreateCategoryInput) -> Result<Category> {
    let result = sqlx::query("INSERT INTO category (author_id, title) VALUES (?, ?)")
        .bind(input.author_id)
        .bind(&input.title)
        .execute(pool)
        .await
        .context("Failed to create category")?;

    Ok(Category {
        id: result.last_insert_id() as i64,
        author_id: input.author_id,
        title: input.title.clone(),
    })
}

async fn get_category_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<Category>> {
    let row = sqlx::query("SELECT id, author_id, title FROM category WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get category by ID")?;

    Ok(row.as_ref().map(row_to_category_mysql))
}

async fn update_category_mysql(pool: &MySqlPool, id: i64, title: &str) -> Result<Category> {
    sqlx::query("UPDATE category SET title = ? WHERE id = ?")
        .bind(title)
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to update category")?;

    get_category_by_id_mysql(pool, id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Category not found after update"))
}

async fn delete_category_mysql(pool: &MySqlPool, id: i64) -> Result<()> {
    sqlx::query("DELETE FROM category WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete category")?;

    Ok(())
}

async fn list_categories_by_author_mysql(
    pool: &MySqlPool,
    author_id: i64,
    params: &ListParams,
) -> Result<Vec<Category>> {
    let rows = sqlx::query(LIST_BY_AUTHOR)
        .bind(author_id)
        .bind(params.limit())
        .bind(params.offset())
        .fetch_all(pool)
        .await
        .context("Failed to list categories")?;

    Ok(rows.iter().map(row_to_category_mysql).collect())
}

async fn count_categories_by_author_mysql(pool: &MySqlPool, author_id: i64) -> Result<i64> {
    let row = sqlx::query("SELECT COUNT(*) as count FROM category WHERE author_id = ?")
        .bind(author_id)
        .fetch_one(pool)
        .await
        .context("Failed to count categories")?;

    Ok(row.get("count"))
}

async fn list_all_categories_mysql(pool: &MySqlPool) -> Result<Vec<Category>> {
    let rows = sqlx::query("SELECT id, author_id, title FROM category ORDER BY title ASC, id ASC")
        .fetch_all(pool)
        .await
        .context("Failed to list categories")?;

    Ok(rows.iter().map(row_to_category_mysql).collect())
}

fn row_to_category_mysql(row: &sqlx::mysql::MySqlRow) -> Category {
    Category {
        id: row.get("id"),
        author_id: row.get("author_id"),
        title: row.get("title"),
    }
}
