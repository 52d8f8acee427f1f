use crate::modules::import_jobs::{
    ImportPhase, ImportSnapshot, ImportTracker, JobHandleStore, StartOutcome, UploadFile,
};
use crate::shared::errors::AppError;
use crate::{log_debug, log_info};
use serde::Serialize;
use std::path::Path;

/// Persisted handle as shown by `siga-import status`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportStatusView {
    pub process_id: Option<String>,
    pub is_importing: bool,
    pub resumable: bool,
}

pub async fn start_import<F>(
    tracker: &ImportTracker,
    path: &Path,
    on_update: F,
) -> Result<ImportSnapshot, String>
where
    F: FnMut(&ImportSnapshot),
{
    let file = UploadFile::from_path(path)
        .await
        .map_err(|e| AppError::from(e).to_string())?;

    match tracker.start_import(file).await {
        StartOutcome::Started(process_id) => {
            log_debug!("start_import command following {}", process_id);
            Ok(follow(tracker, on_update).await)
        }
        StartOutcome::Rejected(failure) => Err(failure.message),
        StartOutcome::Busy => Err("Another import is already in progress".to_string()),
        StartOutcome::Superseded => Ok(tracker.snapshot()),
    }
}

pub async fn resume_import<F>(tracker: &ImportTracker, on_update: F) -> Result<ImportSnapshot, String>
where
    F: FnMut(&ImportSnapshot),
{
    match tracker.resume().await {
        Some(process_id) => {
            log_info!("Following resumed import {}", process_id);
            Ok(follow(tracker, on_update).await)
        }
        None => Err("No import in progress to resume".to_string()),
    }
}

/// Cancel the persisted (or currently tracked) import.
pub async fn cancel_import(tracker: &ImportTracker) -> Result<ImportSnapshot, String> {
    if tracker.resume().await.is_none() {
        return Err("No import in progress to cancel".to_string());
    }
    Ok(tracker.cancel_import().await)
}

pub async fn reset_import(tracker: &ImportTracker) -> ImportSnapshot {
    tracker.reset_import().await;
    tracker.snapshot()
}

pub async fn import_status(store: &dyn JobHandleStore) -> Result<ImportStatusView, String> {
    let stored = store.load().await.map_err(|e| e.to_string())?;
    Ok(ImportStatusView {
        resumable: stored.resumable().is_some(),
        is_importing: stored.importing_marker.is_some(),
        process_id: stored.process_id,
    })
}

/// Forward every snapshot to `on_update` until the tracker stops importing.
pub async fn follow<F>(tracker: &ImportTracker, mut on_update: F) -> ImportSnapshot
where
    F: FnMut(&ImportSnapshot),
{
    let mut rx = tracker.subscribe();
    loop {
        let snapshot = rx.borrow_and_update().clone();
        on_update(&snapshot);
        if !snapshot.is_importing() {
            return snapshot;
        }
        if rx.changed().await.is_err() {
            return tracker.snapshot();
        }
    }
}

/// One-line human summary of a snapshot.
pub fn render_summary(snapshot: &ImportSnapshot) -> String {
    let id = snapshot
        .process_id
        .as_ref()
        .map(|p| p.to_string())
        .unwrap_or_else(|| "-".to_string());

    match snapshot.phase {
        ImportPhase::Idle => match (&snapshot.error, &snapshot.notice) {
            (Some(failure), _) => format!("Import not running: {}", failure),
            (None, Some(notice)) => format!("Import {}: {}", id, notice),
            (None, None) => "No import in progress".to_string(),
        },
        ImportPhase::Uploading => format!(
            "Uploading {}...",
            snapshot.file_name.as_deref().unwrap_or("file")
        ),
        ImportPhase::Polling => format!("Import {}: {}%", id, snapshot.progress),
        ImportPhase::Completed => match snapshot.stats() {
            Some(stats) => format!(
                "Import {} completed: {} rows, {} imported, {} updated, {} errors",
                id, stats.total_rows, stats.imported, stats.updated, stats.errors
            ),
            None => format!("Import {} completed", id),
        },
        ImportPhase::Errored => format!(
            "Import {} failed: {}",
            id,
            snapshot
                .error
                .as_ref()
                .map(|f| f.message.as_str())
                .unwrap_or("unknown error")
        ),
        ImportPhase::Cancelled => format!(
            "Import {}: {}",
            id,
            snapshot.notice.as_deref().unwrap_or("cancelled")
        ),
    }
}
