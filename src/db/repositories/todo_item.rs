//! Todo item repository

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{CreateTodoItemInput, ListParams, TodoItem, UpdateTodoItemInput};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Todo item repository trait
#[async_trait]
pub trait TodoItemRepository: Send + Sync {
    async fn create(&self, input: &CreateTodoItemInput) -> Result<TodoItem>;

    async fn get_by_id(&self, id: i64) -> Result<Option<TodoItem>>;

    async fn update(&self, id: i64, input: &UpdateTodoItemInput) -> Result<TodoItem>;

    async fn delete(&self, id: i64) -> Result<()>;

    /// One page of an author's items ordered by title
    async fn list_by_author(&self, author_id: i64, params: &ListParams) -> Result<Vec<TodoItem>>;

    async fn count_by_author(&self, author_id: i64) -> Result<i64>;
}

pub struct SqlxTodoItemRepository {
    pool: DynDatabasePool,
}

impl SqlxTodoItemRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn TodoItemRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl TodoItemRepository for SqlxTodoItemRepository {
    async fn create(&self, input: &CreateTodoItemInput) -> Result<TodoItem> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_todo_sqlite(self.pool.as_sqlite().unwrap(), input).await,
            DatabaseDriver::Mysql => create_todo_mysql(self.pool.as_mysql().unwrap(), input).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<TodoItem>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_todo_by_id_sqlite(self.pool.as_sqlite().unwrap(), id).await,
            DatabaseDriver::Mysql => get_todo_by_id_mysql(self.pool.as_mysql().unwrap(), id).await,
        }
    }

    async fn update(&self, id: i64, input: &UpdateTodoItemInput) -> Result<TodoItem> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                update_todo_sqlite(self.pool.as_sqlite().unwrap(), id, input).await
            }
            DatabaseDriver::Mysql => update_todo_mysql(self.pool.as_mysql().unwrap(), id, input).await,
        }
    }

    async fn delete(&self, id: i64) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query("DELETE FROM todo_item WHERE id = ?")
                    .bind(id)
                    .execute(self.pool.as_sqlite().unwrap())
                    .await
                    .context("Failed to delete todo item")?;
            }
            DatabaseDriver::Mysql => {
                sqlx::query("DELETE FROM todo_item WHERE id = ?")
                    .bind(id)
                    .execute(self.pool.as_mysql().unwrap())
                    .await
                    .context("Failed to delete todo item")?;
            }
        }
        Ok(())
    }

    async fn list_by_author(&self, author_id: i64, params: &ListParams) -> Result<Vec<TodoItem>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                list_todos_sqlite(self.pool.as_sqlite().unwrap(), author_id, params).await
            }
            DatabaseDriver::Mysql => {
                list_todos_mysql(self.pool.as_mysql().unwrap(), author_id, params).await
            }
        }
    }

    async fn count_by_author(&self, author_id: i64) -> Result<i64> {
        let sql = "SELECT COUNT(*) as count FROM todo_item WHERE author_id = ?";
        let count: i64 = match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let row = sqlx::query(sql)
                    .bind(author_id)
                    .fetch_one(self.pool.as_sqlite().unwrap())
                    .await
                    .context("Failed to count todo items")?;
                row.get("count")
            }
            DatabaseDriver::Mysql => {
                let row = sqlx::query(sql)
                    .bind(author_id)
                    .fetch_one(self.pool.as_mysql().unwrap())
                    .await
                    .context("Failed to count todo items")?;
                row.get("count")
            }
        };
        Ok(count)
    }
}

const INSERT_TODO: &str = r#"
    INSERT INTO todo_item (author_id, title, completed, created_at, updated_at)
    VALUES (?, ?, ?, ?, ?)
"#;
const SELECT_TODO: &str =
    "SELECT id, author_id, title, completed, created_at, updated_at FROM todo_item WHERE id = ?";
const UPDATE_TODO: &str =
    "UPDATE todo_item SET title = ?, completed = ?, updated_at = ? WHERE id = ?";
const LIST_TODOS: &str = r#"
    SELECT id, author_id, title, completed, created_at, updated_at
    FROM todo_item
    WHERE author_id = ?
    ORDER BY title ASC, id ASC
    LIMIT ? OFFSET ?
"#;

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_todo_sqlite(pool: &SqlitePool, input: &CreateTodoItemInput) -> Result<TodoItem> {
    let now = Utc::now();
    let result = sqlx::query(INSERT_TODO)
        .bind(input.author_id)
        .bind(&input.title)
        .bind(input.completed)
        .bind(now)
        .bind(now)
        .execute(pool)
        .await
        .context("Failed to create todo item")?;

    Ok(TodoItem {
        id: result.last_insert_rowid(),
        author_id: input.author_id,
        title: input.title.clone(),
        completed: input.completed,
        created_at: now,
        updated_at: now,
    })
}

async fn get_todo_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<TodoItem>> {
    let row = sqlx::query(SELECT_TODO)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get todo item by ID")?;

    Ok(row.as_ref().map(row_to_todo_sqlite))
}

async fn update_todo_sqlite(pool: &SqlitePool, id: i64, input: &UpdateTodoItemInput) -> Result<TodoItem> {
    sqlx::query(UPDATE_TODO)
        .bind(&input.title)
        .bind(input.completed)
        .bind(Utc::now())
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to update todo item")?;

    get_todo_by_id_sqlite(pool, id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Todo item not found after update"))
}

async fn list_todos_sqlite(pool: &SqlitePool, author_id: i64, params: &ListParams) -> Result<Vec<TodoItem>> {
    let rows = sqlx::query(LIST_TODOS)
        .bind(author_id)
        .bind(params.limit())
        .bind(params.offset())
        .fetch_all(pool)
        .await
        .context("Failed to list todo items")?;

    Ok(rows.iter().map(row_to_todo_sqlite).collect())
}

fn row_to_todo_sqlite(row: &sqlx::sqlite::SqliteRow) -> TodoItem {
    TodoItem {
        id: row.get("id"),
        author_id: row.get("author_id"),
        title: row.get("title"),
        completed: row.get("completed"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_todo_mysql(pool: &MySqlPool, input: &CreateTodoItemInput) -> Result<TodoItem> {
    let now = Utc::now();
    let result = sqlx::query(INSERT_TODO)
        .bind(input.author_id)
        .bind(&input.title)
        .bind(input.completed)
        .bind(now)
        .bind(now)
        .execute(pool)
        .await
        .context("Failed to create todo item")?;

    Ok(TodoItem {
        id: result.last_insert_id() as i64,
        author_id: input.author_id,
        title: input.title.clone(),
        completed: input.completed,
        created_at: now,
        updated_at: now,
    })
}

async fn get_todo_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<TodoItem>> {
    let row = sqlx::query(SELECT_TODO)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get todo item by ID")?;

    Ok(row.as_ref().map(row_to_todo_mysql))
}

async fn update_todo_mysql(pool: &MySqlPool, id: i64, input: &UpdateTodoItemInput) -> Result<TodoItem> {
    sqlx::query(UPDATE_TODO)
        .bind(&input.title)
        .bind(input.completed)
        .bind(Utc::now())
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to update todo item")?;

    get_todo_by_id_mysql(pool, id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Todo item not found after update"))
}

async fn list_todos_mysql(pool: &MySqlPool, author_id: i64, params: &ListParams) -> Result<Vec<TodoItem>> {
    let rows = sqlx::query(LIST_TODOS)
        .bind(author_id)
        .bind(params.limit())
        .bind(params.offset())
        .fetch_all(pool)
        .await
        .context("Failed to list todo items")?;

    Ok(rows.iter().map(row_to_todo_mysql).collect())
}

fn row_to_todo_mysql(row: &sqlx::mysql::MySqlRow) -> TodoItem {
    TodoItem {
        id: row.get("id"),
        author_id: row.get("author_id"),
        title: row.get("title"),
        completed: row.get("completed"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}
