//! User repository
//!
//! - `UserRepository` trait defining the interface for user data access
//! - `SqlxUserRepository` implementing the trait for SQLite and MySQL

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{decode_roles, encode_roles, User, UserRole};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// User repository trait
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a user; the password must already be hashed
    async fn create(&self, user: &User) -> Result<User>;

    async fn get_by_id(&self, id: i64) -> Result<Option<User>>;

    async fn get_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Replace the stored role list
    async fn update_roles(&self, id: i64, roles: &[UserRole]) -> Result<()>;

    /// Replace the stored password hash
    async fn update_password(&self, id: i64, password_hash: &str) -> Result<()>;

    async fn count(&self) -> Result<i64>;
}

/// SQLx-based user repository implementation
pub struct SqlxUserRepository {
    pool: DynDatabasePool,
}

impl SqlxUserRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn UserRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl UserRepository for SqlxUserRepository {
    async fn create(&self, user: &User) -> Result<User> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_user_sqlite(self.pool.as_sqlite().unwrap(), user).await,
            DatabaseDriver::Mysql => create_user_mysql(self.pool.as_mysql().unwrap(), user).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<User>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_user_by_id_sqlite(self.pool.as_sqlite().unwrap(), id).await,
            DatabaseDriver::Mysql => get_user_by_id_mysql(self.pool.as_mysql().unwrap(), id).await,
        }
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_user_by_email_sqlite(self.pool.as_sqlite().unwrap(), email).await
            }
            DatabaseDriver::Mysql => {
                get_user_by_email_mysql(self.pool.as_mysql().unwrap(), email).await
            }
        }
    }

    async fn update_roles(&self, id: i64, roles: &[UserRole]) -> Result<()> {
        let encoded = encode_roles(roles);
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                update_column_sqlite(self.pool.as_sqlite().unwrap(), UPDATE_ROLES, id, &encoded).await
            }
            DatabaseDriver::Mysql => {
                update_column_mysql(self.pool.as_mysql().unwrap(), UPDATE_ROLES, id, &encoded).await
            }
        }
    }

    async fn update_password(&self, id: i64, password_hash: &str) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                update_column_sqlite(self.pool.as_sqlite().unwrap(), UPDATE_PASSWORD, id, password_hash)
                    .await
            }
            DatabaseDriver::Mysql => {
                update_column_mysql(self.pool.as_mysql().unwrap(), UPDATE_PASSWORD, id, password_hash)
                    .await
            }
        }
    }

    async fn count(&self) -> Result<i64> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => count_users_sqlite(self.pool.as_sqlite().unwrap()).await,
            DatabaseDriver::Mysql => count_users_mysql(self.pool.as_mysql().unwrap()).await,
        }
    }
}

const SELECT_USER: &str = "SELECT id, email, password, roles, created_at FROM users";
const UPDATE_ROLES: &str = "UPDATE users SET roles = ? WHERE id = ?";
const UPDATE_PASSWORD: &str = "UPDATE users SET password = ? WHERE id = ?";

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_user_sqlite(pool: &SqlitePool, user: &User) -> Result<User> {
    let result = sqlx::query(
        r#"
        INSERT INTO users (email, password, roles, created_at)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(&user.email)
    .bind(&user.password_hash)
    .bind(encode_roles(&user.roles))
    .bind(user.created_at)
    .execute(pool)
    .await
    .context("Failed to create user")?;

    Ok(User {
        id: result.last_insert_rowid(),
        ..user.clone()
    })
}

async fn get_user_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<User>> {
    let row = sqlx::query(&format!("{} WHERE id = ?", SELECT_USER))
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get user by ID")?;

    row.as_ref().map(row_to_user_sqlite).transpose()
}

async fn get_user_by_email_sqlite(pool: &SqlitePool, email: &str) -> Result<Option<User>> {
    let row = sqlx::query(&format!("{} WHERE email = ?", SELECT_USER))
        .bind(email)
        .fetch_optional(pool)
        .await
        .context("Failed to get user by email")?;

    row.as_ref().map(row_to_user_sqlite).transpose()
}

async fn update_column_sqlite(pool: &SqlitePool, sql: &str, id: i64, value: &str) -> Result<()> {
    sqlx::query(sql)
        .bind(value)
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to update user")?;

    Ok(())
}

async fn count_users_sqlite(pool: &SqlitePool) -> Result<i64> {
    let row = sqlx::query("SELECT COUNT(*) as count FROM users")
        .fetch_one(pool)
        .await
        .context("Failed to count users")?;

    Ok(row.get("count"))
}

fn row_to_user_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<User> {
    let roles_raw: String = row.get("roles");
    let roles = decode_roles(&roles_raw)
        .with_context(|| format!("Invalid roles in database: {}", roles_raw))?;

    Ok(User {
        id: row.get("id"),
        email: row.get("email"),
        password_hash: row.get("password"),
        roles,
        created_at: row.get("created_at"),
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_user_mysql(pool: &MySqlPool, user: &User) -> Result<User> {
    let result = sqlx::query(
        r#"
        INSERT INTO users (email, password, roles, created_at)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(&user.email)
    .bind(&user.password_hash)
    .bind(encode_roles(&user.roles))
    .bind(user.created_at)
    .execute(pool)
    .await
    .context("Failed to create user")?;

    Ok(User {
        id: result.last_insert_id() as i64,
        ..user.clone()
    })
}

async fn get_user_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<User>> {
    let row = sqlx::query(&format!("{} WHERE id = ?", SELECT_USER))
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get user by ID")?;

    row.as_ref().map(row_to_user_mysql).transpose()
}

async fn get_user_by_email_mysql(pool: &MySqlPool, email: &str) -> Result<Option<User>> {
    let row = sqlx::query(&format!("{} WHERE email = ?", SELECT_USER))
        .bind(email)
        .fetch_optional(pool)
        .await
        .context("Failed to get user by email")?;

    row.as_ref().map(row_to_user_mysql).transpose()
}

async fn update_column_mysql(pool: &MySqlPool, sql: &str, id: i64, value: &str) -> Result<()> {
    sqlx::query(sql)
        .bind(value)
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to update user")?;

    Ok(())
}

async fn count_users_mysql(pool: &MySqlPool) -> Result<i64> {
    let row = sqlx::query("SELECT COUNT(*) as count FROM users")
        .fetch_one(pool)
        .await
        .context("Failed to count users")?;

    Ok(row.get("count"))
}

fn row_to_user_mysql(row: &sqlx::mysql::MySqlRow) -> Result<User> {
    let roles_raw: String = row.get("roles");
    let roles = decode_roles(&roles_raw)
        .with_context(|| format!("Invalid roles in database: {}", roles_raw))?;

    Ok(User {
        id: row.get("id"),
        email: row.get("email"),
        password_hash: row.get("password"),
        roles,
        created_at: row.get("created_at"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    async fn setup_test_repo() -> (DynDatabasePool, SqlxUserRepository) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        let repo = SqlxUserRepository::new(pool.clone());
        (pool, repo)
    }

    #[tokio::test]
    async fn test_create_and_get_user() {
        let (_pool, repo) = setup_test_repo().await;

        let user = User::new("alice@example.com", "hash", vec![UserRole::User]);
        let created = repo.create(&user).await.expect("Failed to create user");
        assert!(created.id > 0);

        let by_id = repo.get_by_id(created.id).await.unwrap().expect("missing user");
        assert_eq!(by_id.email, "alice@example.com");
        assert_eq!(by_id.password_hash, "hash");
        assert_eq!(by_id.roles, vec![UserRole::User]);

        let by_email = repo.get_by_email("alice@example.com").await.unwrap();
        assert_eq!(by_email.map(|u| u.id), Some(created.id));
    }

    #[tokio::test]
    async fn test_get_user_not_found() {
        let (_pool, repo) = setup_test_repo().await;
        assert!(repo.get_by_id(999).await.unwrap().is_none());
        assert!(repo.get_by_email("nobody@example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let (_pool, repo) = setup_test_repo().await;
        let user = User::new("dup@example.com", "hash", vec![UserRole::User]);

        repo.create(&user).await.expect("first insert");
        assert!(repo.create(&user).await.is_err());
    }

    #[tokio::test]
    async fn test_update_roles_and_password() {
        let (_pool, repo) = setup_test_repo().await;
        let created = repo
            .create(&User::new("bob@example.com", "old", vec![UserRole::User]))
            .await
            .unwrap();

        repo.update_roles(created.id, &[UserRole::User, UserRole::Admin])
            .await
            .unwrap();
        repo.update_password(created.id, "new").await.unwrap();

        let reloaded = repo.get_by_id(created.id).await.unwrap().unwrap();
        assert!(reloaded.is_admin());
        assert_eq!(reloaded.password_hash, "new");
    }

    #[tokio::test]
    async fn test_count_users() {
        let (_pool, repo) = setup_test_repo().await;
        assert_eq!(repo.count().await.unwrap(), 0);

        repo.create(&User::new("a@example.com", "h", vec![])).await.unwrap();
        repo.create(&User::new("b@example.com", "h", vec![])).await.unwrap();
        assert_eq!(repo.count().await.unwrap(), 2);
    }
}
