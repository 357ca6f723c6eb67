//! Task rows and conditional state transitions.

use crate::error::{DatabaseError, Result};
use prism_core::{DetectorId, NewTask, ScanParams, Task, TaskId, TaskState, Timestamp};
use sqlx::sqlite::SqliteRow;
use sqlx::{Pool, Row, Sqlite};
use std::collections::BTreeSet;
use std::path::PathBuf;

const TASK_COLUMNS: &str = "id, root_path, extensions, detectors, fast_scan, state, created_at, \
     started_at, finished_at, total_files, selected_files, found_files";

pub(crate) fn to_i64(n: u64) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

pub(crate) fn to_u64(n: i64) -> u64 {
    u64::try_from(n).unwrap_or_default()
}

fn decode<T, E: std::fmt::Display>(value: std::result::Result<T, E>, what: &str) -> Result<T> {
    value.map_err(|e| DatabaseError::Decode(format!("{what}: {e}")))
}

fn task_from_row(row: &SqliteRow) -> Result<Task> {
    let id: String = row.try_get("id")?;
    let extensions: String = row.try_get("extensions")?;
    let detectors: String = row.try_get("detectors")?;
    let state: String = row.try_get("state")?;
    let created_at: String = row.try_get("created_at")?;
    let started_at: Option<String> = row.try_get("started_at")?;
    let finished_at: Option<String> = row.try_get("finished_at")?;

    let extensions: BTreeSet<String> = decode(serde_json::from_str(&extensions), "extensions")?;
    let detectors: BTreeSet<DetectorId> = decode(serde_json::from_str(&detectors), "detectors")?;

    Ok(Task {
        id: decode(TaskId::new(id), "task id")?,
        root_path: PathBuf::from(row.try_get::<String, _>("root_path")?),
        params: ScanParams {
            extensions,
            detectors,
            fast_scan: row.try_get::<i64, _>("fast_scan")? != 0,
        },
        state: decode(state.parse(), "task state")?,
        created_at: decode(Timestamp::from_rfc3339(&created_at), "created_at")?,
        started_at: started_at
            .map(|s| decode(Timestamp::from_rfc3339(&s), "started_at"))
            .transpose()?,
        finished_at: finished_at
            .map(|s| decode(Timestamp::from_rfc3339(&s), "finished_at"))
            .transpose()?,
        total_files: to_u64(row.try_get("total_files")?),
        selected_files: to_u64(row.try_get("selected_files")?),
        found_files: to_u64(row.try_get("found_files")?),
    })
}

/// Insert a task in `Loading` and promote it to `Pending`.
///
/// A crash between the two steps leaves a `Loading` row that recovery promotes.
pub async fn create_task(pool: &Pool<Sqlite>, new: &NewTask) -> Result<Task> {
    let id = TaskId::generate();
    let created_at = Timestamp::now();

    sqlx::query(
        "INSERT INTO tasks (id, root_path, extensions, detectors, fast_scan, state, created_at)
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(id.as_str())
    .bind(new.root_path.to_string_lossy().into_owned())
    .bind(serde_json::to_string(&new.params.extensions)?)
    .bind(serde_json::to_string(&new.params.detectors)?)
    .bind(i64::from(new.params.fast_scan))
    .bind(TaskState::Loading.as_str())
    .bind(created_at.to_rfc3339())
    .execute(pool)
    .await?;

    transition(pool, &id, TaskState::Pending).await
}

/// Fetch one task.
pub async fn get_task(pool: &Pool<Sqlite>, id: &TaskId) -> Result<Option<Task>> {
    let row = sqlx::query(&format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?"))
        .bind(id.as_str())
        .fetch_optional(pool)
        .await?;
    row.as_ref().map(task_from_row).transpose()
}

/// Fetch one task, failing if it does not exist.
pub async fn require_task(pool: &Pool<Sqlite>, id: &TaskId) -> Result<Task> {
    get_task(pool, id)
        .await?
        .ok_or_else(|| DatabaseError::NotFound(format!("task '{id}' not found")))
}

/// All tasks, oldest first.
pub async fn list_tasks(pool: &Pool<Sqlite>) -> Result<Vec<Task>> {
    let rows = sqlx::query(&format!(
        "SELECT {TASK_COLUMNS} FROM tasks ORDER BY created_at, id"
    ))
    .fetch_all(pool)
    .await?;
    rows.iter().map(task_from_row).collect()
}

/// IDs of tasks currently in `state`.
pub async fn tasks_in_state(pool: &Pool<Sqlite>, state: TaskState) -> Result<Vec<TaskId>> {
    let ids: Vec<String> = sqlx::query_scalar("SELECT id FROM tasks WHERE state = ? ORDER BY id")
        .bind(state.as_str())
        .fetch_all(pool)
        .await?;
    ids.into_iter()
        .map(|id| decode(TaskId::new(id), "task id"))
        .collect()
}

/// Delete a task together with its files and results.
///
/// Returns `false` if the task did not exist.
pub async fn delete_task(pool: &Pool<Sqlite>, id: &TaskId) -> Result<bool> {
    let result = sqlx::query("DELETE FROM tasks WHERE id = ?")
        .bind(id.as_str())
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Move a task to `to` if its stored state allows it.
///
/// The update is conditional on the state read, so two concurrent callers can
/// never both apply a transition out of the same state.
pub async fn transition(pool: &Pool<Sqlite>, id: &TaskId, to: TaskState) -> Result<Task> {
    let task = require_task(pool, id).await?;
    apply_transition(pool, task, to).await
}

/// Move a task from `from` to `to`, failing if it is in any other state.
///
/// Used where a legal transition out of a different state would undo a
/// concurrent change, such as a stop landing while a search was running.
pub async fn transition_from(
    pool: &Pool<Sqlite>,
    id: &TaskId,
    from: TaskState,
    to: TaskState,
) -> Result<Task> {
    let task = require_task(pool, id).await?;
    if task.state != from {
        return Err(invalid_transition(id, task.state, to));
    }
    apply_transition(pool, task, to).await
}

async fn apply_transition(pool: &Pool<Sqlite>, task: Task, to: TaskState) -> Result<Task> {
    let id = &task.id;
    let from = task.state;
    if !from.can_transition_to(to) {
        return Err(invalid_transition(id, from, to));
    }

    let now = Timestamp::now().to_rfc3339();
    let restarts = matches!(to, TaskState::Searching)
        || (to == TaskState::Scanning && from != TaskState::Searching);
    let finishes = matches!(to, TaskState::Completed | TaskState::Stopped);

    let started_at = if restarts {
        Some(now.clone())
    } else {
        task.started_at.map(|t| t.to_rfc3339())
    };
    let finished_at = if finishes {
        Some(now)
    } else if restarts {
        None
    } else {
        task.finished_at.map(|t| t.to_rfc3339())
    };

    let result = sqlx::query(
        "UPDATE tasks SET state = ?, started_at = ?, finished_at = ? WHERE id = ? AND state = ?",
    )
    .bind(to.as_str())
    .bind(started_at)
    .bind(finished_at)
    .bind(id.as_str())
    .bind(from.as_str())
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        // Lost a race: report the state that won
        let current = require_task(pool, id).await?;
        return Err(invalid_transition(id, current.state, to));
    }

    tracing::info!(task_id = %id, from = %from, to = %to, "Task state changed");
    require_task(pool, id).await
}

/// Complete a `Scanning` task whose selected files all reached COMPLETED or FAILED.
///
/// Returns `true` if this call performed the transition.
pub async fn complete_if_drained(pool: &Pool<Sqlite>, id: &TaskId) -> Result<bool> {
    let result = sqlx::query(
        "UPDATE tasks SET state = 'Completed', finished_at = ?
         WHERE id = ? AND state = 'Scanning'
           AND selected_files = (
               SELECT COUNT(*) FROM task_files
               WHERE task_id = ? AND state IN ('Completed', 'Failed')
           )",
    )
    .bind(Timestamp::now().to_rfc3339())
    .bind(id.as_str())
    .bind(id.as_str())
    .execute(pool)
    .await?;

    let completed = result.rows_affected() > 0;
    if completed {
        tracing::info!(task_id = %id, "Task completed");
    }
    Ok(completed)
}

/// Record enumeration totals: every file seen and the ones selected.
pub async fn set_enumeration_totals(
    pool: &Pool<Sqlite>,
    id: &TaskId,
    total_files: u64,
    selected_files: u64,
) -> Result<()> {
    let result = sqlx::query("UPDATE tasks SET total_files = ?, selected_files = ? WHERE id = ?")
        .bind(to_i64(total_files))
        .bind(to_i64(selected_files))
        .bind(id.as_str())
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound(format!("task '{id}' not found")));
    }
    Ok(())
}

fn invalid_transition(id: &TaskId, from: TaskState, to: TaskState) -> DatabaseError {
    DatabaseError::InvalidTransition {
        task_id: id.to_string(),
        from: from.to_string(),
        to: to.to_string(),
    }
}
