//! Entry repository
//!
//! Posts and notes live in twin tables (`posts`/`posts_tags` and
//! `notes`/`notes_tags`). One `SqlxEntryRepository` serves either, picked by
//! the `EntryKind` it was built with.
//!
//! Entries are always returned with their category, author email and tags.
//! Creating or updating an entry writes the row and its tag links in one
//! transaction.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{
    Category, CreateEntryInput, Entry, EntryFilters, EntryKind, ListParams, Tag, UpdateEntryInput,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySql, MySqlPool, Row, Sqlite, SqlitePool, Transaction};
use std::collections::HashMap;
use std::sync::Arc;

/// Entry repository trait
#[async_trait]
pub trait EntryRepository: Send + Sync {
    /// Which table this repository reads and writes
    fn kind(&self) -> EntryKind;

    async fn create(&self, input: &CreateEntryInput) -> Result<Entry>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Entry>>;

    /// Replace title, content, category and tags; refreshes `updated_at`
    async fn update(&self, id: i64, input: &UpdateEntryInput) -> Result<Entry>;

    async fn delete(&self, id: i64) -> Result<()>;

    /// One page of entries, newest update first
    async fn list(&self, params: &ListParams, filters: &EntryFilters) -> Result<Vec<Entry>>;

    async fn count(&self, filters: &EntryFilters) -> Result<i64>;

    /// Number of entries filed under a category
    async fn count_by_category(&self, category_id: i64) -> Result<i64>;
}

pub struct SqlxEntryRepository {
    pool: DynDatabasePool,
    kind: EntryKind,
}

impl SqlxEntryRepository {
    pub fn new(pool: DynDatabasePool, kind: EntryKind) -> Self {
        Self { pool, kind }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool, kind: EntryKind) -> Arc<dyn EntryRepository> {
        Arc::new(Self::new(pool, kind))
    }
}

#[async_trait]
impl EntryRepository for SqlxEntryRepository {
    fn kind(&self) -> EntryKind {
        self.kind
    }

    async fn create(&self, input: &CreateEntryInput) -> Result<Entry> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                create_entry_sqlite(self.pool.as_sqlite().unwrap(), self.kind, input).await
            }
            DatabaseDriver::Mysql => {
                create_entry_mysql(self.pool.as_mysql().unwrap(), self.kind, input).await
            }
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Entry>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_entry_by_id_sqlite(self.pool.as_sqlite().unwrap(), self.kind, id).await
            }
            DatabaseDriver::Mysql => {
                get_entry_by_id_mysql(self.pool.as_mysql().unwrap(), self.kind, id).await
            }
        }
    }

    async fn update(&self, id: i64, input: &UpdateEntryInput) -> Result<Entry> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                update_entry_sqlite(self.pool.as_sqlite().unwrap(), self.kind, id, input).await
            }
            DatabaseDriver::Mysql => {
                update_entry_mysql(self.pool.as_mysql().unwrap(), self.kind, id, input).await
            }
        }
    }

    async fn delete(&self, id: i64) -> Result<()> {
        let sql = format!("DELETE FROM {} WHERE id = ?", self.kind.table());
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query(&sql)
                    .bind(id)
                    .execute(self.pool.as_sqlite().unwrap())
                    .await
                    .with_context(|| format!("Failed to delete {}", self.kind))?;
            }
            DatabaseDriver::Mysql => {
                sqlx::query(&sql)
                    .bind(id)
                    .execute(self.pool.as_mysql().unwrap())
                    .await
                    .with_context(|| format!("Failed to delete {}", self.kind))?;
            }
        }
        Ok(())
    }

    async fn list(&self, params: &ListParams, filters: &EntryFilters) -> Result<Vec<Entry>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                list_entries_sqlite(self.pool.as_sqlite().unwrap(), self.kind, params, filters).await
            }
            DatabaseDriver::Mysql => {
                list_entries_mysql(self.pool.as_mysql().unwrap(), self.kind, params, filters).await
            }
        }
    }

    async fn count(&self, filters: &EntryFilters) -> Result<i64> {
        let (where_sql, binds) = filter_clause(self.kind, filters);
        let sql = format!("SELECT COUNT(*) as count FROM {} e{}", self.kind.table(), where_sql);
        self.count_with(&sql, &binds).await
    }

    async fn count_by_category(&self, category_id: i64) -> Result<i64> {
        let sql = format!(
            "SELECT COUNT(*) as count FROM {} WHERE category_id = ?",
            self.kind.table()
        );
        self.count_with(&sql, &[category_id]).await
    }
}

impl SqlxEntryRepository {
    async fn count_with(&self, sql: &str, binds: &[i64]) -> Result<i64> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let mut query = sqlx::query(sql);
                for value in binds {
                    query = query.bind(*value);
                }
                let row = query
                    .fetch_one(self.pool.as_sqlite().unwrap())
                    .await
                    .with_context(|| format!("Failed to count {} entries", self.kind))?;
                Ok(row.get("count"))
            }
            DatabaseDriver::Mysql => {
                let mut query = sqlx::query(sql);
                for value in binds {
                    query = query.bind(*value);
                }
                let row = query
                    .fetch_one(self.pool.as_mysql().unwrap())
                    .await
                    .with_context(|| format!("Failed to count {} entries", self.kind))?;
                Ok(row.get("count"))
            }
        }
    }
}

// ============================================================================
// SQL builders (shared by both drivers)
// ============================================================================

fn select_sql(kind: EntryKind) -> String {
    format!(
        r#"
        SELECT e.id, e.title, e.content, e.category_id, e.author_id, e.created_at, e.updated_at,
               c.author_id AS category_author_id, c.title AS category_title,
               u.email AS author_email
        FROM {table} e
        INNER JOIN category c ON c.id = e.category_id
        INNER JOIN users u ON u.id = e.author_id
        "#,
        table = kind.table()
    )
}

/// WHERE clause for the list filters plus its bind values, in order.
///
/// The tag filter is an EXISTS subquery so matching entries still carry
/// their complete tag list.
fn filter_clause(kind: EntryKind, filters: &EntryFilters) -> (String, Vec<i64>) {
    let mut conditions = Vec::new();
    let mut binds = Vec::new();

    if let Some(category_id) = filters.category_id() {
        conditions.push("e.category_id = ?".to_string());
        binds.push(category_id);
    }
    if let Some(tag_id) = filters.tag_id() {
        conditions.push(format!(
            "EXISTS (SELECT 1 FROM {jt} ft WHERE ft.{fk} = e.id AND ft.tag_id = ?)",
            jt = kind.tag_table(),
            fk = kind.fk_column()
        ));
        binds.push(tag_id);
    }

    if conditions.is_empty() {
        (String::new(), binds)
    } else {
        (format!(" WHERE {}", conditions.join(" AND ")), binds)
    }
}

fn list_sql(kind: EntryKind, where_sql: &str) -> String {
    format!(
        "{}{} ORDER BY e.updated_at DESC, e.id DESC LIMIT ? OFFSET ?",
        select_sql(kind),
        where_sql
    )
}

fn insert_sql(kind: EntryKind) -> String {
    format!(
        "INSERT INTO {} (category_id, author_id, title, content, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?)",
        kind.table()
    )
}

fn update_sql(kind: EntryKind) -> String {
    format!(
        "UPDATE {} SET title = ?, content = ?, category_id = ?, updated_at = ? WHERE id = ?",
        kind.table()
    )
}

fn link_tag_sql(kind: EntryKind) -> String {
    format!(
        "INSERT INTO {} ({}, tag_id) VALUES (?, ?)",
        kind.tag_table(),
        kind.fk_column()
    )
}

fn unlink_tags_sql(kind: EntryKind) -> String {
    format!("DELETE FROM {} WHERE {} = ?", kind.tag_table(), kind.fk_column())
}

fn tags_for_sql(kind: EntryKind, count: usize) -> String {
    format!(
        r#"
        SELECT jt.{fk} AS entry_id, t.id, t.title
        FROM {jt} jt
        INNER JOIN tag t ON t.id = jt.tag_id
        WHERE jt.{fk} IN ({placeholders})
        ORDER BY t.title ASC, t.id ASC
        "#,
        fk = kind.fk_column(),
        jt = kind.tag_table(),
        placeholders = vec!["?"; count].join(", ")
    )
}

fn unique_ids(ids: &[i64]) -> Vec<i64> {
    let mut ids = ids.to_vec();
    ids.sort_unstable();
    ids.dedup();
    ids
}

fn attach_tags(entries: &mut [Entry], links: Vec<(i64, Tag)>) {
    let mut by_entry: HashMap<i64, Vec<Tag>> = HashMap::new();
    for (entry_id, tag) in links {
        by_entry.entry(entry_id).or_default().push(tag);
    }
    for entry in entries.iter_mut() {
        entry.tags = by_entry.remove(&entry.id).unwrap_or_default();
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_entry_sqlite(
    pool: &SqlitePool,
    kind: EntryKind,
    input: &CreateEntryInput,
) -> Result<Entry> {
    let now = Utc::now();
    let mut tx = pool.begin().await.context("Failed to start transaction")?;

    let result = sqlx::query(&insert_sql(kind))
        .bind(input.category_id)
        .bind(input.author_id)
        .bind(&input.title)
        .bind(&input.content)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await
        .with_context(|| format!("Failed to create {}", kind))?;
    let id = result.last_insert_rowid();

    link_tags_sqlite(&mut tx, kind, id, &input.tag_ids).await?;
    tx.commit().await.context("Failed to commit transaction")?;

    get_entry_by_id_sqlite(pool, kind, id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("{} not found after create", kind.label()))
}

async fn update_entry_sqlite(
    pool: &SqlitePool,
    kind: EntryKind,
    id: i64,
    input: &UpdateEntryInput,
) -> Result<Entry> {
    let mut tx = pool.begin().await.context("Failed to start transaction")?;

    sqlx::query(&update_sql(kind))
        .bind(&input.title)
        .bind(&input.content)
        .bind(input.category_id)
        .bind(Utc::now())
        .bind(id)
        .execute(&mut *tx)
        .await
        .with_context(|| format!("Failed to update {}", kind))?;

    sqlx::query(&unlink_tags_sql(kind))
        .bind(id)
        .execute(&mut *tx)
        .await
        .context("Failed to clear tag links")?;

    link_tags_sqlite(&mut tx, kind, id, &input.tag_ids).await?;
    tx.commit().await.context("Failed to commit transaction")?;

    get_entry_by_id_sqlite(pool, kind, id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("{} not found after update", kind.label()))
}

async fn link_tags_sqlite(
    tx: &mut Transaction<'_, Sqlite>,
    kind: EntryKind,
    entry_id: i64,
    tag_ids: &[i64],
) -> Result<()> {
    let sql = link_tag_sql(kind);
    for tag_id in unique_ids(tag_ids) {
        sqlx::query(&sql)
            .bind(entry_id)
            .bind(tag_id)
            .execute(&mut **tx)
            .await
            .with_context(|| format!("Failed to link tag {}", tag_id))?;
    }
    Ok(())
}

async fn get_entry_by_id_sqlite(pool: &SqlitePool, kind: EntryKind, id: i64) -> Result<Option<Entry>> {
    let sql = format!("{} WHERE e.id = ?", select_sql(kind));
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
        .with_context(|| format!("Failed to get {} by ID", kind))?;

    let Some(row) = row else {
        return Ok(None);
    };

    let mut entries = vec![row_to_entry_sqlite(&row, kind)];
    let links = load_tags_sqlite(pool, kind, &[id]).await?;
    attach_tags(&mut entries, links);
    Ok(entries.pop())
}

async fn list_entries_sqlite(
    pool: &SqlitePool,
    kind: EntryKind,
    params: &ListParams,
    filters: &EntryFilters,
) -> Result<Vec<Entry>> {
    let (where_sql, binds) = filter_clause(kind, filters);
    let sql = list_sql(kind, &where_sql);

    let mut query = sqlx::query(&sql);
    for value in &binds {
        query = query.bind(*value);
    }
    let rows = query
        .bind(params.limit())
        .bind(params.offset())
        .fetch_all(pool)
        .await
        .with_context(|| format!("Failed to list {} entries", kind))?;

    let mut entries: Vec<Entry> = rows.iter().map(|row| row_to_entry_sqlite(row, kind)).collect();
    let ids: Vec<i64> = entries.iter().map(|e| e.id).collect();
    let links = load_tags_sqlite(pool, kind, &ids).await?;
    attach_tags(&mut entries, links);
    Ok(entries)
}

async fn load_tags_sqlite(pool: &SqlitePool, kind: EntryKind, ids: &[i64]) -> Result<Vec<(i64, Tag)>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let sql = tags_for_sql(kind, ids.len());
    let mut query = sqlx::query(&sql);
    for id in ids {
        query = query.bind(*id);
    }
    let rows = query
        .fetch_all(pool)
        .await
        .context("Failed to load entry tags")?;

    Ok(rows
        .iter()
        .map(|row| {
            (
                row.get("entry_id"),
                Tag {
                    id: row.get("id"),
                    title: row.get("title"),
                },
            )
        })
        .collect())
}

fn row_to_entry_sqlite(row: &sqlx::sqlite::SqliteRow, kind: EntryKind) -> Entry {
    Entry {
        id: row.get("id"),
        kind,
        title: row.get("title"),
        content: row.get("content"),
        category: Category {
            id: row.get("category_id"),
            author_id: row.get("category_author_id"),
            title: row.get("category_title"),
        },
        author_id: row.get("author_id"),
        author_email: row.get("author_email"),
        tags: Vec::new(),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_entry_mysql(
    pool: &MySqlPool,
    kind: EntryKind,
    input: &CreateEntryInput,
) -> Result<Entry> {
    let now = Utc::now();
    let mut tx = pool.begin().await.context("Failed to start transaction")?;

    let result = sqlx::query(&insert_sql(kind))
        .bind(input.category_id)
        .bind(input.author_id)
        .bind(&input.title)
        .bind(&input.content)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await
        .with_context(|| format!("Failed to create {}", kind))?;
    let id = result.last_insert_id() as i64;

    link_tags_mysql(&mut tx, kind, id, &input.tag_ids).await?;
    tx.commit().await.context("Failed to commit transaction")?;

    get_entry_by_id_mysql(pool, kind, id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("{} not found after create", kind.label()))
}

async fn update_entry_mysql(
    pool: &MySqlPool,
    kind: EntryKind,
    id: i64,
    input: &UpdateEntryInput,
) -> Result<Entry> {
    let mut tx = pool.begin().await.context("Failed to start transaction")?;

    sqlx::query(&update_sql(kind))
        .bind(&input.title)
        .bind(&input.content)
        .bind(input.category_id)
        .bind(Utc::now())
        .bind(id)
        .execute(&mut *tx)
        .await
        .with_context(|| format!("Failed to update {}", kind))?;

    sqlx::query(&unlink_tags_sql(kind))
        .bind(id)
        .execute(&mut *tx)
        .await
        .context("Failed to clear tag links")?;

    link_tags_mysql(&mut tx, kind, id, &input.tag_ids).await?;
    tx.commit().await.context("Failed to commit transaction")?;

    get_entry_by_id_mysql(pool, kind, id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("{} not found after update", kind.label()))
}

async fn link_tags_mysql(
    tx: &mut Transaction<'_, MySql>,
    kind: EntryKind,
    entry_id: i64,
    tag_ids: &[i64],
) -> Result<()> {
    let sql = link_tag_sql(kind);
    for tag_id in unique_ids(tag_ids) {
        sqlx::query(&sql)
            .bind(entry_id)
            .bind(tag_id)
            .execute(&mut **tx)
            .await
            .with_context(|| format!("Failed to link tag {}", tag_id))?;
    }
    Ok(())
}

async fn get_entry_by_id_mysql(pool: &MySqlPool, kind: EntryKind, id: i64) -> Result<Option<Entry>> {
    let sql = format!("{} WHERE e.id = ?", select_sql(kind));
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
        .with_context(|| format!("Failed to get {} by ID", kind))?;

    let Some(row) = row else {
        return Ok(None);
    };

    let mut entries = vec![row_to_entry_mysql(&row, kind)];
    let links = load_tags_mysql(pool, kind, &[id]).await?;
    attach_tags(&mut entries, links);
    Ok(entries.pop())
}

async fn list_entries_mysql(
    pool: &MySqlPool,
    kind: EntryKind,
    params: &ListParams,
    filters: &EntryFilters,
) -> Result<Vec<Entry>> {
    let (where_sql, binds) = filter_clause(kind, filters);
    let sql = list_sql(kind, &where_sql);

    let mut query = sqlx::query(&sql);
    for value in &binds {
        query = query.bind(*value);
    }
    let rows = query
        .bind(params.limit())
        .bind(params.offset())
        .fetch_all(pool)
        .await
        .with_context(|| format!("Failed to list {} entries", kind))?;

    let mut entries: Vec<Entry> = rows.iter().map(|row| row_to_entry_mysql(row, kind)).collect();
    let ids: Vec<i64> = entries.iter().map(|e| e.id).collect();
    let links = load_tags_mysql(pool, kind, &ids).await?;
    attach_tags(&mut entries, links);
    Ok(entries)
}

async fn load_tags_mysql(pool: &MySqlPool, kind: EntryKind, ids: &[i64]) -> Result<Vec<(i64, Tag)>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let sql = tags_for_sql(kind, ids.len());
    let mut query = sqlx::query(&sql);
    for id in ids {
        query = query.bind(*id);
    }
    let rows = query
        .fetch_all(pool)
        .await
        .context("Failed to load entry tags")?;

    Ok(rows
        .iter()
        .map(|row| {
            (
                row.get("entry_id"),
                Tag {
                    id: row.get("id"),
                    title: row.get("title"),
                },
            )
        })
        .collect())
}

fn row_to_entry_mysql(row: &sqlx::mysql::MySqlRow, kind: EntryKind) -> Entry {
    Entry {
        id: row.get("id"),
        kind,
        title: row.get("title"),
        content: row.get("content"),
        category: Category {
            id: row.get("category_id"),
            author_id: row.get("category_author_id"),
            title: row.get("category_title"),
        },
        author_id: row.get("author_id"),
        author_email: row.get("author_email"),
        tags: Vec::new(),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    struct Fixture {
        pool: DynDatabasePool,
        posts: SqlxEntryRepository,
        notes: SqlxEntryRepository,
        author_id: i64,
        category_id: i64,
    }

    async fn setup_test_repo() -> Fixture {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let sqlite = pool.as_sqlite().unwrap();
        let author_id = sqlx::query("INSERT INTO users (email, password, roles) VALUES ('writer@example.com', 'hash', '[]')")
            .execute(sqlite)
            .await
            .expect("Failed to create test user")
            .last_insert_rowid();
        let category_id = create_test_category(sqlite, author_id, "General").await;

        Fixture {
            posts: SqlxEntryRepository::new(pool.clone(), EntryKind::Post),
            notes: SqlxEntryRepository::new(pool.clone(), EntryKind::Note),
            pool,
            author_id,
            category_id,
        }
    }

    async fn create_test_category(pool: &SqlitePool, author_id: i64, title: &str) -> i64 {
        sqlx::query("INSERT INTO category (author_id, title) VALUES (?, ?)")
            .bind(author_id)
            .bind(title)
            .execute(pool)
            .await
            .expect("Failed to create test category")
            .last_insert_rowid()
    }

    async fn create_test_tag(pool: &SqlitePool, title: &str) -> i64 {
        sqlx::query("INSERT INTO tag (title) VALUES (?)")
            .bind(title)
            .execute(pool)
            .await
            .expect("Failed to create test tag")
            .last_insert_rowid()
    }

    #[tokio::test]
    async fn test_create_entry_with_tags() {
        let fx = setup_test_repo().await;
        let sqlite = fx.pool.as_sqlite().unwrap();
        let rust = create_test_tag(sqlite, "rust").await;
        let axum = create_test_tag(sqlite, "axum").await;

        let input = CreateEntryInput::new("Hello world", fx.category_id, fx.author_id)
            .with_content("First post")
            .with_tags(vec![rust, axum, rust]);
        let created = fx.posts.create(&input).await.expect("Failed to create post");

        assert!(created.id > 0);
        assert_eq!(created.kind, EntryKind::Post);
        assert_eq!(created.title, "Hello world");
        assert_eq!(created.content.as_deref(), Some("First post"));
        assert_eq!(created.category.title, "General");
        assert_eq!(created.author_email, "writer@example.com");

        let tag_titles: Vec<_> = created.tags.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(tag_titles, vec!["axum", "rust"]);
    }

    #[tokio::test]
    async fn test_create_with_unknown_tag_rolls_back() {
        let fx = setup_test_repo().await;

        let input = CreateEntryInput::new("Broken", fx.category_id, fx.author_id).with_tags(vec![999]);
        assert!(fx.posts.create(&input).await.is_err());
        assert_eq!(fx.posts.count(&EntryFilters::default()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_posts_and_notes_are_separate() {
        let fx = setup_test_repo().await;

        fx.posts
            .create(&CreateEntryInput::new("A post", fx.category_id, fx.author_id))
            .await
            .unwrap();
        let note = fx
            .notes
            .create(&CreateEntryInput::new("A note", fx.category_id, fx.author_id))
            .await
            .unwrap();

        assert_eq!(note.kind, EntryKind::Note);
        assert_eq!(fx.posts.count(&EntryFilters::default()).await.unwrap(), 1);
        assert_eq!(fx.notes.count(&EntryFilters::default()).await.unwrap(), 1);
        assert_eq!(fx.posts.kind(), EntryKind::Post);
    }

    #[tokio::test]
    async fn test_update_replaces_tags() {
        let fx = setup_test_repo().await;
        let sqlite = fx.pool.as_sqlite().unwrap();
        let first = create_test_tag(sqlite, "first").await;
        let second = create_test_tag(sqlite, "second").await;
        let other_category = create_test_category(sqlite, fx.author_id, "Other").await;

        let created = fx
            .notes
            .create(&CreateEntryInput::new("Draft", fx.category_id, fx.author_id).with_tags(vec![first]))
            .await
            .unwrap();

        let input = UpdateEntryInput::new("Final", other_category).with_tags(vec![second]);
        let updated = fx.notes.update(created.id, &input).await.unwrap();

        assert_eq!(updated.title, "Final");
        assert_eq!(updated.content, None);
        assert_eq!(updated.category.id, other_category);
        assert_eq!(updated.tag_ids(), vec![second]);
        assert!(updated.updated_at >= created.updated_at);
    }

    #[tokio::test]
    async fn test_delete_entry() {
        let fx = setup_test_repo().await;
        let created = fx
            .posts
            .create(&CreateEntryInput::new("Bye", fx.category_id, fx.author_id))
            .await
            .unwrap();

        fx.posts.delete(created.id).await.unwrap();
        assert!(fx.posts.get_by_id(created.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_orders_by_most_recent_update() {
        let fx = setup_test_repo().await;

        let mut ids = Vec::new();
        for title in ["one", "two", "three"] {
            let entry = fx
                .posts
                .create(&CreateEntryInput::new(title, fx.category_id, fx.author_id))
                .await
                .unwrap();
            ids.push(entry.id);
        }
        fx.posts
            .update(ids[0], &UpdateEntryInput::new("one again", fx.category_id))
            .await
            .unwrap();

        let listed = fx
            .posts
            .list(&ListParams::new(1, 10), &EntryFilters::default())
            .await
            .unwrap();
        let titles: Vec<_> = listed.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["one again", "three", "two"]);

        let page = fx
            .posts
            .list(&ListParams::new(2, 2), &EntryFilters::default())
            .await
            .unwrap();
        assert_eq!(page.len(), 1);
    }

    #[tokio::test]
    async fn test_list_with_filters_keeps_all_tags() {
        let fx = setup_test_repo().await;
        let sqlite = fx.pool.as_sqlite().unwrap();
        let red = create_test_tag(sqlite, "red").await;
        let blue = create_test_tag(sqlite, "blue").await;
        let other_category = create_test_category(sqlite, fx.author_id, "Other").await;

        fx.posts
            .create(&CreateEntryInput::new("both", fx.category_id, fx.author_id).with_tags(vec![red, blue]))
            .await
            .unwrap();
        fx.posts
            .create(&CreateEntryInput::new("blue only", other_category, fx.author_id).with_tags(vec![blue]))
            .await
            .unwrap();
        fx.posts
            .create(&CreateEntryInput::new("none", fx.category_id, fx.author_id))
            .await
            .unwrap();

        let by_red = EntryFilters {
            category: None,
            tag: Some(Tag::new(red, "red")),
        };
        let listed = fx.posts.list(&ListParams::default(), &by_red).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].title, "both");
        assert_eq!(listed[0].tags.len(), 2);
        assert_eq!(fx.posts.count(&by_red).await.unwrap(), 1);

        let by_blue_in_other = EntryFilters {
            category: Some(Category {
                id: other_category,
                author_id: fx.author_id,
                title: "Other".to_string(),
            }),
            tag: Some(Tag::new(blue, "blue")),
        };
        let listed = fx.posts.list(&ListParams::default(), &by_blue_in_other).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].title, "blue only");

        assert_eq!(fx.posts.count_by_category(fx.category_id).await.unwrap(), 2);
        assert_eq!(fx.notes.count_by_category(fx.category_id).await.unwrap(), 0);
    }

    #[test]
    fn test_filter_clause() {
        let (sql, binds) = filter_clause(EntryKind::Note, &EntryFilters::default());
        assert!(sql.is_empty());
        assert!(binds.is_empty());

        let filters = EntryFilters {
            category: Some(Category {
                id: 3,
                author_id: 1,
                title: "c".to_string(),
            }),
            tag: Some(Tag::new(8, "t")),
        };
        let (sql, binds) = filter_clause(EntryKind::Note, &filters);
        assert!(sql.starts_with(" WHERE e.category_id = ?"));
        assert!(sql.contains("FROM notes_tags ft WHERE ft.note_id = e.id"));
        assert_eq!(binds, vec![3, 8]);
    }
}
