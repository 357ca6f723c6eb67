//! Concurrent claims against a file-backed store.

use prism_core::{
    DetectorId, FileId, FileState, NewTask, ScanParams, ScanResult, TaskFile, TaskState,
};
use prism_db::{Database, TaskStore};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

const FILES: usize = 60;
const WORKERS: usize = 8;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_claims_never_overlap() {
    let tmp = TempDir::new().expect("create temp dir");
    let db = Arc::new(
        Database::open(tmp.path().join("prism.db"), 4)
            .await
            .expect("open database"),
    );

    let email = DetectorId::new("Email").expect("valid detector ID");
    let task = db
        .create_task(&NewTask {
            root_path: PathBuf::from("/data"),
            params: ScanParams::new(["txt"], [email.clone()], false).expect("valid params"),
        })
        .await
        .expect("create task");
    db.transition(&task.id, TaskState::Searching)
        .await
        .expect("search");

    let files: Vec<TaskFile> = (0..FILES)
        .map(|i| TaskFile {
            id: FileId::generate(),
            task_id: task.id.clone(),
            path: PathBuf::from(format!("/data/{i:03}.txt")),
            size_bytes: 1,
            state: FileState::Pending,
        })
        .collect();
    db.insert_files(&files).await.expect("insert files");
    db.set_enumeration_totals(&task.id, FILES as u64, FILES as u64)
        .await
        .expect("totals");
    db.transition(&task.id, TaskState::Scanning)
        .await
        .expect("scan");

    let mut handles = Vec::new();
    for _ in 0..WORKERS {
        let db = Arc::clone(&db);
        let task_id = task.id.clone();
        let email = email.clone();
        handles.push(tokio::spawn(async move {
            let mut claimed = Vec::new();
            loop {
                // Store errors mean "nothing this round", same as the workers
                let Ok(next) = db.claim_file(&task_id).await else {
                    tokio::task::yield_now().await;
                    continue;
                };
                let Some(file) = next else { break };
                let results = [ScanResult {
                    file_id: file.id.clone(),
                    detector_id: email.clone(),
                    count: 1,
                }];
                while db
                    .finish_file(&file.id, FileState::Completed, &results)
                    .await
                    .is_err()
                {
                    tokio::task::yield_now().await;
                }
                claimed.push(file.id);
            }
            claimed
        }));
    }

    let mut seen = HashSet::new();
    let mut total = 0;
    for handle in handles {
        for id in handle.await.expect("worker task") {
            total += 1;
            seen.insert(id);
        }
    }
    assert_eq!(total, FILES);
    assert_eq!(seen.len(), FILES);

    let progress = db.progress(&task.id).await.expect("progress");
    assert_eq!(progress.completed, FILES as u64);
    assert_eq!(progress.found, FILES as u64);
    assert!(db.complete_if_drained(&task.id).await.expect("complete"));
    assert_eq!(
        db.get_task(&task.id)
            .await
            .expect("get task")
            .expect("task exists")
            .state,
        TaskState::Completed
    );
    assert_eq!(
        db.results_for_task(&task.id).await.expect("results").len(),
        FILES
    );
}
