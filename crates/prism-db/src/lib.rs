//! Prism Task Store
//!
//! Persists scan tasks, their per-file work items and scan results in `SQLite`
//! through `SQLx`, and exposes them to the scan engine through the
//! [`TaskStore`] trait.
//!
//! # Architecture
//!
//! - **Migrations**: SQL migrations are embedded with `sqlx::migrate!` and run on open
//! - **Atomic claim**: one guarded `UPDATE ... RETURNING` hands each file to one worker
//! - **Single writer**: the default pool has one connection, so multi-statement
//!   writes never contend for `SQLite` locks
//!
//! # Example
//!
//! ```ignore
//! use prism_db::{Database, TaskStore};
//!
//! let db = Database::open("prism.db", 1).await?;
//! for task in db.list_tasks().await? {
//!     println!("{} {}", task.id, task.state);
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod connection;
pub mod error;
pub mod migrations;
pub mod scan_results;
pub mod store;
pub mod task_files;
pub mod tasks;

pub use error::{DatabaseError, Result};
pub use store::{Recovery, TaskStore};

use sqlx::{Pool, Sqlite};
use std::path::Path;

/// `SQLite`-backed task store.
#[derive(Debug, Clone)]
pub struct Database {
    pool: Pool<Sqlite>,
}

impl Database {
    /// Open (creating if missing) the database at `path` and migrate it.
    pub async fn open(path: impl AsRef<Path>, max_connections: u32) -> Result<Self> {
        let pool = connection::connect(path, max_connections).await?;
        let db = Self { pool };
        db.run_migrations().await?;
        Ok(db)
    }

    /// Open a private, migrated in-memory database.
    pub async fn in_memory() -> Result<Self> {
        let pool = connection::connect_in_memory().await?;
        let db = Self { pool };
        db.run_migrations().await?;
        Ok(db)
    }

    /// Apply pending migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        migrations::run_migrations(&self.pool).await
    }

    /// Highest applied migration version.
    pub async fn get_schema_version(&self) -> Result<i64> {
        migrations::get_schema_version(&self.pool).await
    }

    /// The underlying `SQLx` pool.
    #[must_use]
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    /// Close all connections.
    pub async fn close(self) {
        self.pool.close().await;
        tracing::debug!("Database pool closed");
    }
}
