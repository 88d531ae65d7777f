//! Database layer
//!
//! Supports SQLite (default, single file next to the binary) and MySQL.
//! The driver is chosen in `config.yml`; everything above this module talks
//! to the `DatabasePool` trait and never to a concrete backend.
//!
//! ```ignore
//! use inkpad::config::DatabaseConfig;
//! use inkpad::db::{create_pool, migrations};
//!
//! let pool = create_pool(&DatabaseConfig::default()).await?;
//! migrations::run_migrations(&pool).await?;
//! ```

pub mod migrations;
pub mod pool;
pub mod repositories;

pub use pool::{
    create_pool, create_test_pool, DatabasePool, DynDatabasePool, MysqlDatabase, SqliteDatabase,
};
