//! Embedded schema migrations.

use crate::error::{DatabaseError, Result};
use sqlx::{Pool, Sqlite};

/// Apply every migration under `migrations/` that has not run yet.
///
/// # Errors
/// Returns `DatabaseError::Migration` if any migration fails to execute.
pub async fn run_migrations(pool: &Pool<Sqlite>) -> Result<()> {
    tracing::debug!("Running database migrations");

    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| DatabaseError::Migration(format!("migration execution failed: {e}")))?;

    tracing::debug!("Database migrations completed");
    Ok(())
}

/// Highest applied migration version, or 0 before the first run.
pub async fn get_schema_version(pool: &Pool<Sqlite>) -> Result<i64> {
    let table_exists = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='_sqlx_migrations'",
    )
    .fetch_one(pool)
    .await?
        > 0;

    if !table_exists {
        return Ok(0);
    }

    let version =
        sqlx::query_scalar::<_, i64>("SELECT COALESCE(MAX(version), 0) FROM _sqlx_migrations")
            .fetch_one(pool)
            .await?;
    Ok(version)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::connect_in_memory;

    #[tokio::test]
    async fn test_run_migrations() {
        let pool = connect_in_memory().await.expect("open database");
        assert_eq!(get_schema_version(&pool).await.expect("version"), 0);

        run_migrations(&pool).await.expect("run migrations");

        let tables: Vec<String> = sqlx::query_scalar(
            "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%' AND name != '_sqlx_migrations' ORDER BY name",
        )
        .fetch_all(&pool)
        .await
        .expect("query tables");
        assert_eq!(tables, vec!["scan_results", "task_files", "tasks"]);
        assert_eq!(get_schema_version(&pool).await.expect("version"), 3);
    }

    #[tokio::test]
    async fn test_migrations_idempotent() {
        let pool = connect_in_memory().await.expect("open database");
        run_migrations(&pool).await.expect("first run");
        run_migrations(&pool).await.expect("second run");
        assert_eq!(get_schema_version(&pool).await.expect("version"), 3);
    }
}
