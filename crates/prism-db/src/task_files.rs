//! Per-file work items: enumeration inserts, the atomic claim, and progress.

use crate::error::{DatabaseError, Result};
use crate::tasks::{to_i64, to_u64};
use prism_core::{FileId, FileState, TaskFile, TaskId, TaskProgress};
use sqlx::sqlite::SqliteRow;
use sqlx::{Pool, Row, Sqlite};
use std::path::PathBuf;

fn file_from_row(row: &SqliteRow) -> Result<TaskFile> {
    let id: String = row.try_get("id")?;
    let task_id: String = row.try_get("task_id")?;
    let path: String = row.try_get("path")?;
    let state: String = row.try_get("state")?;

    Ok(TaskFile {
        id: FileId::new(id).map_err(|e| DatabaseError::Decode(e.to_string()))?,
        task_id: TaskId::new(task_id).map_err(|e| DatabaseError::Decode(e.to_string()))?,
        path: PathBuf::from(path),
        size_bytes: to_u64(row.try_get("size_bytes")?),
        state: state
            .parse()
            .map_err(|e: prism_core::PrismError| DatabaseError::Decode(e.to_string()))?,
    })
}

/// Insert enumerated files in one transaction.
pub async fn insert_files(pool: &Pool<Sqlite>, files: &[TaskFile]) -> Result<u64> {
    let mut tx = pool.begin().await?;
    for file in files {
        sqlx::query(
            "INSERT INTO task_files (id, task_id, path, size_bytes, state) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(file.id.as_str())
        .bind(file.task_id.as_str())
        .bind(file.path.to_string_lossy().into_owned())
        .bind(to_i64(file.size_bytes))
        .bind(file.state.as_str())
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;
    Ok(files.len() as u64)
}

/// Drop every file (and result) of a task and zero its counters.
pub async fn reset_files(pool: &Pool<Sqlite>, task_id: &TaskId) -> Result<u64> {
    let mut tx = pool.begin().await?;
    let deleted = sqlx::query("DELETE FROM task_files WHERE task_id = ?")
        .bind(task_id.as_str())
        .execute(&mut *tx)
        .await?
        .rows_affected();
    sqlx::query(
        "UPDATE tasks SET total_files = 0, selected_files = 0, found_files = 0 WHERE id = ?",
    )
    .bind(task_id.as_str())
    .execute(&mut *tx)
    .await?;
    tx.commit().await?;

    tracing::debug!(task_id = %task_id, deleted, "Task files reset");
    Ok(deleted)
}

/// Claim one pending file of a scanning task.
///
/// The select and the state flip happen in one statement, and the update is
/// guarded on `Pending`, so a file is handed to at most one caller.
pub async fn claim_file(pool: &Pool<Sqlite>, task_id: &TaskId) -> Result<Option<TaskFile>> {
    let row = sqlx::query(
        "UPDATE task_files SET state = 'Scanning'
         WHERE id = (
             SELECT f.id FROM task_files f
             JOIN tasks t ON t.id = f.task_id
             WHERE f.task_id = ? AND f.state = 'Pending' AND t.state = 'Scanning'
             LIMIT 1
         ) AND state = 'Pending'
         RETURNING id, task_id, path, size_bytes, state",
    )
    .bind(task_id.as_str())
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(file_from_row).transpose()
}

/// Hand a claimed file back to the queue.
///
/// Returns `false` if the file was no longer `Scanning`.
pub async fn release_file(pool: &Pool<Sqlite>, file_id: &FileId) -> Result<bool> {
    let result =
        sqlx::query("UPDATE task_files SET state = 'Pending' WHERE id = ? AND state = 'Scanning'")
            .bind(file_id.as_str())
            .execute(pool)
            .await?;
    Ok(result.rows_affected() > 0)
}

/// Move every file of a task in state `from` to `to`.
pub async fn mark_files(
    pool: &Pool<Sqlite>,
    task_id: &TaskId,
    from: FileState,
    to: FileState,
) -> Result<u64> {
    let result = sqlx::query("UPDATE task_files SET state = ? WHERE task_id = ? AND state = ?")
        .bind(to.as_str())
        .bind(task_id.as_str())
        .bind(from.as_str())
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

/// Files of a task, ordered by path.
pub async fn list_files(pool: &Pool<Sqlite>, task_id: &TaskId) -> Result<Vec<TaskFile>> {
    let rows = sqlx::query(
        "SELECT id, task_id, path, size_bytes, state FROM task_files
         WHERE task_id = ? ORDER BY path",
    )
    .bind(task_id.as_str())
    .fetch_all(pool)
    .await?;
    rows.iter().map(file_from_row).collect()
}

/// Snapshot of a task's file counts by state.
pub async fn progress(pool: &Pool<Sqlite>, task_id: &TaskId) -> Result<TaskProgress> {
    let counters: Option<(i64, i64)> =
        sqlx::query_as("SELECT selected_files, found_files FROM tasks WHERE id = ?")
            .bind(task_id.as_str())
            .fetch_optional(pool)
            .await?;
    let (selected, found) = counters
        .ok_or_else(|| DatabaseError::NotFound(format!("task '{task_id}' not found")))?;

    let rows: Vec<(String, i64)> = sqlx::query_as(
        "SELECT state, COUNT(*) FROM task_files WHERE task_id = ? GROUP BY state",
    )
    .bind(task_id.as_str())
    .fetch_all(pool)
    .await?;

    let mut progress = TaskProgress {
        selected: to_u64(selected),
        found: to_u64(found),
        ..TaskProgress::default()
    };
    for (state, count) in rows {
        let count = to_u64(count);
        match state
            .parse()
            .map_err(|e: prism_core::PrismError| DatabaseError::Decode(e.to_string()))?
        {
            FileState::Pending => progress.pending = count,
            FileState::Scanning => progress.scanning = count,
            FileState::Completed => progress.completed = count,
            FileState::Failed => progress.failed = count,
            FileState::Stopped => progress.stopped = count,
        }
    }
    Ok(progress)
}

/// Return files left mid-scan by a dead process to `Pending`, across all tasks.
pub async fn requeue_interrupted(pool: &Pool<Sqlite>) -> Result<u64> {
    let result = sqlx::query("UPDATE task_files SET state = 'Pending' WHERE state = 'Scanning'")
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::{create_task, set_enumeration_totals, transition};
    use crate::Database;
    use prism_core::{DetectorId, NewTask, ScanParams, TaskState};

    async fn scanning_task(db: &Database, files: usize) -> TaskId {
        let detectors = [DetectorId::new("Email").expect("valid detector ID")];
        let task = create_task(
            db.pool(),
            &NewTask {
                root_path: PathBuf::from("/data"),
                params: ScanParams::new(["txt"], detectors, false).expect("valid params"),
            },
        )
        .await
        .expect("create task");
        transition(db.pool(), &task.id, TaskState::Searching)
            .await
            .expect("search");

        let rows: Vec<TaskFile> = (0..files)
            .map(|i| TaskFile {
                id: FileId::generate(),
                task_id: task.id.clone(),
                path: PathBuf::from(format!("/data/{i}.txt")),
                size_bytes: 10,
                state: FileState::Pending,
            })
            .collect();
        insert_files(db.pool(), &rows).await.expect("insert files");
        set_enumeration_totals(db.pool(), &task.id, files as u64, files as u64)
            .await
            .expect("totals");
        transition(db.pool(), &task.id, TaskState::Scanning)
            .await
            .expect("scan");
        task.id
    }

    #[tokio::test]
    async fn test_claim_hands_out_each_file_once() {
        let db = Database::in_memory().await.expect("open database");
        let task_id = scanning_task(&db, 3).await;

        let mut claimed = Vec::new();
        while let Some(file) = claim_file(db.pool(), &task_id).await.expect("claim") {
            assert_eq!(file.state, FileState::Scanning);
            claimed.push(file.id);
        }
        claimed.sort();
        claimed.dedup();
        assert_eq!(claimed.len(), 3);

        let progress = progress(db.pool(), &task_id).await.expect("progress");
        assert_eq!(progress.scanning, 3);
        assert_eq!(progress.pending, 0);
    }

    #[tokio::test]
    async fn test_claim_requires_scanning_task() {
        let db = Database::in_memory().await.expect("open database");
        let task_id = scanning_task(&db, 2).await;
        transition(db.pool(), &task_id, TaskState::Stopped)
            .await
            .expect("stop");

        assert!(claim_file(db.pool(), &task_id).await.expect("claim").is_none());
    }

    #[tokio::test]
    async fn test_mark_and_requeue() {
        let db = Database::in_memory().await.expect("open database");
        let task_id = scanning_task(&db, 4).await;
        claim_file(db.pool(), &task_id)
            .await
            .expect("claim")
            .expect("a pending file");

        let stopped = mark_files(db.pool(), &task_id, FileState::Pending, FileState::Stopped)
            .await
            .expect("mark");
        assert_eq!(stopped, 3);

        assert_eq!(requeue_interrupted(db.pool()).await.expect("requeue"), 1);
        let progress = progress(db.pool(), &task_id).await.expect("progress");
        assert_eq!(progress.pending, 1);
        assert_eq!(progress.stopped, 3);
        assert_eq!(progress.selected, 4);
    }

    #[tokio::test]
    async fn test_release_returns_claim_to_queue() {
        let db = Database::in_memory().await.expect("open database");
        let task_id = scanning_task(&db, 1).await;
        let file = claim_file(db.pool(), &task_id)
            .await
            .expect("claim")
            .expect("a pending file");

        assert!(release_file(db.pool(), &file.id).await.expect("release"));
        assert!(!release_file(db.pool(), &file.id).await.expect("release again"));

        let progress = progress(db.pool(), &task_id).await.expect("progress");
        assert_eq!(progress.pending, 1);
        assert_eq!(progress.scanning, 0);

        let again = claim_file(db.pool(), &task_id)
            .await
            .expect("claim")
            .expect("released file is claimable");
        assert_eq!(again.id, file.id);
    }

    #[tokio::test]
    async fn test_reset_files_clears_counters() {
        let db = Database::in_memory().await.expect("open database");
        let task_id = scanning_task(&db, 2).await;

        assert_eq!(reset_files(db.pool(), &task_id).await.expect("reset"), 2);
        assert!(list_files(db.pool(), &task_id).await.expect("list").is_empty());
        assert_eq!(
            progress(db.pool(), &task_id).await.expect("progress"),
            TaskProgress::default()
        );
    }

    #[tokio::test]
    async fn test_progress_unknown_task() {
        let db = Database::in_memory().await.expect("open database");
        let err = progress(db.pool(), &TaskId::generate())
            .await
            .expect_err("unknown task");
        assert!(matches!(err, DatabaseError::NotFound(_)));
    }
}
