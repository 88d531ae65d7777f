//! Session repository
//!
//! Login sessions keyed by their random token.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::Session;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Session repository trait
#[async_trait]
pub trait SessionRepository: Send + Sync {
    async fn create(&self, session: &Session) -> Result<Session>;

    /// Look up a session by token
    async fn get_by_id(&self, id: &str) -> Result<Option<Session>>;

    async fn delete(&self, id: &str) -> Result<()>;

    /// Delete every session of a user, returning how many were removed
    async fn delete_by_user(&self, user_id: i64) -> Result<u64>;

    /// Delete sessions that expired before `now`
    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64>;
}

pub struct SqlxSessionRepository {
    pool: DynDatabasePool,
}

impl SqlxSessionRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn SessionRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl SessionRepository for SqlxSessionRepository {
    async fn create(&self, session: &Session) -> Result<Session> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                create_session_sqlite(self.pool.as_sqlite().unwrap(), session).await
            }
            DatabaseDriver::Mysql => {
                create_session_mysql(self.pool.as_mysql().unwrap(), session).await
            }
        }
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<Session>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_session_by_id_sqlite(self.pool.as_sqlite().unwrap(), id).await
            }
            DatabaseDriver::Mysql => {
                get_session_by_id_mysql(self.pool.as_mysql().unwrap(), id).await
            }
        }
    }

    async fn delete(&self, id: &str) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                delete_session_sqlite(self.pool.as_sqlite().unwrap(), id).await
            }
            DatabaseDriver::Mysql => delete_session_mysql(self.pool.as_mysql().unwrap(), id).await,
        }
    }

    async fn delete_by_user(&self, user_id: i64) -> Result<u64> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                delete_sessions_by_user_sqlite(self.pool.as_sqlite().unwrap(), user_id).await
            }
            DatabaseDriver::Mysql => {
                delete_sessions_by_user_mysql(self.pool.as_mysql().unwrap(), user_id).await
            }
        }
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                delete_expired_sessions_sqlite(self.pool.as_sqlite().unwrap(), now).await
            }
            DatabaseDriver::Mysql => {
                delete_expired_sessions_mysql(self.pool.as_mysql().unwrap(), now).await
            }
        }
    }
}

const INSERT_SESSION: &str =
    "INSERT INTO sessions (id, user_id, expires_at, created_at) VALUES (?, ?, ?, ?)";
const SELECT_SESSION: &str =
    "SELECT id, user_id, expires_at, created_at FROM sessions WHERE id = ?";

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_session_sqlite(pool: &SqlitePool, session: &Session) -> Result<Session> {
    sqlx::query(INSERT_SESSION)
        .bind(&session.id)
        .bind(session.user_id)
        .bind(session.expires_at)
        .bind(session.created_at)
        .execute(pool)
        .await
        .context("Failed to create session")?;

    Ok(session.clone())
}

async fn get_session_by_id_sqlite(pool: &SqlitePool, id: &str) -> Result<Option<Session>> {
    let row = sqlx::query(SELECT_SESSION)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get session")?;

    Ok(row.map(|row| Session {
        id: row.get("id"),
        user_id: row.get("user_id"),
        expires_at: row.get("expires_at"),
        created_at: row.get("created_at"),
    }))
}

async fn delete_session_sqlite(pool: &SqlitePool, id: &str) -> Result<()> {
    sqlx::query("DELETE FROM sessions WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete session")?;

    Ok(())
}

async fn delete_sessions_by_user_sqlite(pool: &SqlitePool, user_id: i64) -> Result<u64> {
    let result = sqlx::query("DELETE FROM sessions WHERE user_id = ?")
        .bind(user_id)
        .execute(pool)
        .await
        .context("Failed to delete user sessions")?;

    Ok(result.rows_affected())
}

async fn delete_expired_sessions_sqlite(pool: &SqlitePool, now: DateTime<Utc>) -> Result<u64> {
    let result = sqlx::query("DELETE FROM sessions WHERE expires_at < ?")
        .bind(now)
        .execute(pool)
        .await
        .context("Failed to delete expired sessions")?;

    Ok(result.rows_affected())
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_session_mysql(pool: &MySqlPool, session: &Session) -> Result<Session> {
    sqlx::query(INSERT_SESSION)
        .bind(&session.id)
        .bind(session.user_id)
        .bind(session.expires_at)
        .bind(session.created_at)
        .execute(pool)
        .await
        .context("Failed to create session")?;

    Ok(session.clone())
}

async fn get_session_by_id_mysql(pool: &MySqlPool, id: &str) -> Result<Option<Session>> {
    let row = sqlx::query(SELECT_SESSION)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get session")?;

    Ok(row.map(|row| Session {
        id: row.get("id"),
        user_id: row.get("user_id"),
        expires_at: row.get("expires_at"),
        created_at: row.get("created_at"),
    }))
}

async fn delete_session_mysql(pool: &MySqlPool, id: &str) -> Result<()> {
    sqlx::query("DELETE FROM sessions WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete session")?;

    Ok(())
}

async fn delete_sessions_by_user_mysql(pool: &MySqlPool, user_id: i64) -> Result<u64> {
    let result = sqlx::query("DELETE FROM sessions WHERE user_id = ?")
        .bind(user_id)
        .execute(pool)
        .await
        .context("Failed to delete user sessions")?;

    Ok(result.rows_affected())
}

async fn delete_expired_sessions_mysql(pool: &MySqlPool, now: DateTime<Utc>) -> Result<u64> {
    let result = sqlx::query("DELETE FROM sessions WHERE expires_at < ?")
        .bind(now)
        .execute(pool)
        .await
        .context("Failed to delete expired sessions")?;

    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};
    use chrono::Duration;

    async fn setup_test_repo() -> (DynDatabasePool, SqlxSessionRepository, i64) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let user_id = sqlx::query("INSERT INTO users (email, password, roles) VALUES (?, ?, ?)")
            .bind("session@example.com")
            .bind("hash")
            .bind(r#"["ROLE_USER"]"#)
            .execute(pool.as_sqlite().unwrap())
            .await
            .expect("Failed to create test user")
            .last_insert_rowid();

        let repo = SqlxSessionRepository::new(pool.clone());
        (pool, repo, user_id)
    }

    #[tokio::test]
    async fn test_create_and_get_session() {
        let (_pool, repo, user_id) = setup_test_repo().await;

        let session = Session::start(user_id, 7);
        repo.create(&session).await.expect("Failed to create session");

        let found = repo.get_by_id(&session.id).await.unwrap().expect("missing session");
        assert_eq!(found.user_id, user_id);
        assert_eq!(found.expires_at, session.expires_at);
    }

    #[tokio::test]
    async fn test_delete_session() {
        let (_pool, repo, user_id) = setup_test_repo().await;
        let session = repo.create(&Session::start(user_id, 7)).await.unwrap();

        repo.delete(&session.id).await.unwrap();
        assert!(repo.get_by_id(&session.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_by_user() {
        let (_pool, repo, user_id) = setup_test_repo().await;
        repo.create(&Session::start(user_id, 7)).await.unwrap();
        repo.create(&Session::start(user_id, 7)).await.unwrap();

        assert_eq!(repo.delete_by_user(user_id).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_delete_expired_keeps_live_sessions() {
        let (_pool, repo, user_id) = setup_test_repo().await;

        let live = repo.create(&Session::start(user_id, 7)).await.unwrap();
        let mut stale = Session::start(user_id, 7);
        stale.expires_at = Utc::now() - Duration::hours(1);
        repo.create(&stale).await.unwrap();

        let removed = repo.delete_expired(Utc::now()).await.unwrap();
        assert_eq!(removed, 1);
        assert!(repo.get_by_id(&live.id).await.unwrap().is_some());
        assert!(repo.get_by_id(&stale.id).await.unwrap().is_none());
    }
}
