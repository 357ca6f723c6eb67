//! Scan results and the file-finish write path.

use crate::error::{DatabaseError, Result};
use prism_core::{DetectorId, FileId, FileState, ScanResult, TaskId};
use sqlx::{Pool, Sqlite};

/// Record the outcome of a claimed file.
///
/// Results, the terminal file state and the task's found-file counter are
/// written in one transaction. Returns `false` without writing anything if the
/// file is no longer `Scanning` (for example after crash recovery requeued it).
/// Result rows are append-only: a second row for the same (file, detector)
/// pair fails the whole transaction.
pub async fn finish_file(
    pool: &Pool<Sqlite>,
    file_id: &FileId,
    state: FileState,
    results: &[ScanResult],
) -> Result<bool> {
    if !state.is_terminal() {
        return Err(DatabaseError::Invalid(format!(
            "file {file_id} cannot finish as {state}"
        )));
    }

    let mut tx = pool.begin().await?;
    let updated = sqlx::query("UPDATE task_files SET state = ? WHERE id = ? AND state = 'Scanning'")
        .bind(state.as_str())
        .bind(file_id.as_str())
        .execute(&mut *tx)
        .await?
        .rows_affected();
    if updated == 0 {
        tx.rollback().await?;
        return Ok(false);
    }

    let mut found = false;
    for result in results.iter().filter(|r| r.count > 0) {
        sqlx::query(
            "INSERT INTO scan_results (file_id, detector_id, count) VALUES (?, ?, ?)",
        )
        .bind(file_id.as_str())
        .bind(result.detector_id.as_str())
        .bind(result.count)
        .execute(&mut *tx)
        .await?;
        found = true;
    }

    if found {
        sqlx::query(
            "UPDATE tasks SET found_files = found_files + 1
             WHERE id = (SELECT task_id FROM task_files WHERE id = ?)",
        )
        .bind(file_id.as_str())
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(true)
}

/// Results of every file of a task, ordered by file path then detector.
pub async fn results_for_task(pool: &Pool<Sqlite>, task_id: &TaskId) -> Result<Vec<ScanResult>> {
    let rows: Vec<(String, String, u32)> = sqlx::query_as(
        "SELECT r.file_id, r.detector_id, r.count FROM scan_results r
         JOIN task_files f ON f.id = r.file_id
         WHERE f.task_id = ? ORDER BY f.path, r.detector_id",
    )
    .bind(task_id.as_str())
    .fetch_all(pool)
    .await?;
    rows.into_iter().map(result_from_row).collect()
}

fn result_from_row((file_id, detector_id, count): (String, String, u32)) -> Result<ScanResult> {
    Ok(ScanResult {
        file_id: FileId::new(file_id).map_err(|e| DatabaseError::Decode(e.to_string()))?,
        detector_id: DetectorId::new(detector_id)
            .map_err(|e| DatabaseError::Decode(e.to_string()))?,
        count,
    })
}
