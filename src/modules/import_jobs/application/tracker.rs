/// Import job tracker
///
/// Drives one server-side import at a time through
/// `Idle → Uploading → Polling → {Completed | Errored | Cancelled}`.
///
/// Every run gets a generation number; cancel, reset, session loss and
/// shutdown bump it, and any response (upload or poll) that comes back
/// carrying an older generation is discarded. Poll requests additionally carry
/// a sequence number so a slow response never overwrites a newer one.
use crate::modules::import_jobs::domain::entities::{CANCELLED_NOTICE, PAUSED_NOTICE};
use crate::modules::import_jobs::domain::{
    ImportApi, ImportFailure, ImportPhase, ImportSnapshot, JobHandleStore, JobOutcome, JobStatus,
    ProcessId, UploadFile,
};
use crate::shared::config::AppConfig;
use crate::shared::errors::ApiError;
use crate::shared::utils::LogContext;
use crate::{log_debug, log_error, log_info, log_warn};
use chrono::Utc;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::{watch, Mutex, Semaphore};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone)]
pub struct TrackerSettings {
    pub poll_interval: Duration,
    /// Ticks that find this many polls still in flight are skipped.
    pub max_in_flight_polls: usize,
}

impl Default for TrackerSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(200),
            max_in_flight_polls: 4,
        }
    }
}

impl From<&AppConfig> for TrackerSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            poll_interval: config.poll_interval,
            max_in_flight_polls: config.max_in_flight_polls,
        }
    }
}

/// Result of [`ImportTracker::start_import`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartOutcome {
    /// Upload accepted; the tracker is polling this job.
    Started(ProcessId),
    /// Upload failed; the failure is also in the snapshot.
    Rejected(ImportFailure),
    /// Another import is uploading or polling; nothing changed.
    Busy,
    /// The import was cancelled or reset while the upload was in flight.
    Superseded,
}

#[derive(Default)]
struct TrackerState {
    snapshot: ImportSnapshot,
    generation: u64,
    next_seq: u64,
    last_applied_seq: u64,
    poller: Option<CancellationToken>,
}

impl TrackerState {
    fn stop_polling(&mut self) {
        if let Some(token) = self.poller.take() {
            token.cancel();
        }
    }

    /// Stop the timer and invalidate every response from the current run.
    fn next_generation(&mut self) -> u64 {
        self.stop_polling();
        self.generation += 1;
        self.last_applied_seq = 0;
        self.generation
    }
}

struct TrackerInner {
    api: Arc<dyn ImportApi>,
    store: Arc<dyn JobHandleStore>,
    settings: TrackerSettings,
    state: Mutex<TrackerState>,
    snapshots: watch::Sender<ImportSnapshot>,
    poll_permits: Arc<Semaphore>,
}

/// Cloneable handle; all clones drive the same tracker.
#[derive(Clone)]
pub struct ImportTracker {
    inner: Arc<TrackerInner>,
}

impl ImportTracker {
    pub fn new(
        api: Arc<dyn ImportApi>,
        store: Arc<dyn JobHandleStore>,
        settings: TrackerSettings,
    ) -> Self {
        let (snapshots, _) = watch::channel(ImportSnapshot::default());
        let permits = settings.max_in_flight_polls.max(1);
        Self {
            inner: Arc::new(TrackerInner {
                api,
                store,
                settings,
                state: Mutex::new(TrackerState::default()),
                snapshots,
                poll_permits: Arc::new(Semaphore::new(permits)),
            }),
        }
    }

    /// Receiver that observes every state transition.
    pub fn subscribe(&self) -> watch::Receiver<ImportSnapshot> {
        self.inner.snapshots.subscribe()
    }

    pub fn snapshot(&self) -> ImportSnapshot {
        self.inner.snapshots.borrow().clone()
    }

    /// Upload `file` and start polling the job the server creates for it.
    pub async fn start_import(&self, file: UploadFile) -> StartOutcome {
        let generation = {
            let mut state = self.inner.state.lock().await;
            if state.snapshot.phase.is_active() {
                log_warn!(
                    "Rejecting import of '{}': another import is {}",
                    file.file_name,
                    state.snapshot.phase
                );
                return StartOutcome::Busy;
            }

            let generation = state.next_generation();
            let mut snapshot = ImportSnapshot {
                file_name: Some(file.file_name.clone()),
                started_at: Some(Utc::now()),
                ..Default::default()
            };

            if file.is_empty() {
                let failure = ImportFailure::upload_rejected(Some("The selected file is empty"));
                snapshot.error = Some(failure.clone());
                snapshot.finished_at = Some(Utc::now());
                state.snapshot = snapshot;
                self.inner.publish(&state);
                return StartOutcome::Rejected(failure);
            }

            snapshot.phase = ImportPhase::Uploading;
            state.snapshot = snapshot;
            self.inner.publish(&state);
            generation
        };

        log_info!(
            "Uploading '{}' ({} bytes) for import",
            file.file_name,
            file.bytes.len()
        );
        let result = self.inner.api.upload(file).await;

        let mut state = self.inner.state.lock().await;
        if state.generation != generation {
            drop(state);
            if let Ok(process_id) = result {
                log_warn!(
                    "Upload accepted as {} after the import was abandoned, requesting cancellation",
                    process_id
                );
                if let Err(e) = self.inner.api.cancel(&process_id).await {
                    log_warn!("Cancellation of orphaned import {} failed: {}", process_id, e);
                }
            }
            return StartOutcome::Superseded;
        }

        match result {
            Ok(process_id) => {
                if let Err(e) = self.inner.store.save(&process_id).await {
                    log_error!("Could not persist import handle {}: {}", process_id, e);
                }
                state.snapshot.phase = ImportPhase::Polling;
                state.snapshot.process_id = Some(process_id.clone());
                state.snapshot.progress = 0;
                TrackerInner::begin_polling(&self.inner, &mut state, process_id.clone());
                self.inner.publish(&state);
                log_info!("Import {} accepted, polling for progress", process_id);
                StartOutcome::Started(process_id)
            }
            Err(e) if e.is_session_expired() => {
                self.inner.invalidate_session(&mut state).await;
                StartOutcome::Rejected(ImportFailure::session_invalid())
            }
            Err(e) => {
                log_warn!("Import upload failed: {}", e);
                let failure = ImportFailure::upload_rejected(e.server_message());
                state.snapshot.phase = ImportPhase::Idle;
                state.snapshot.error = Some(failure.clone());
                state.snapshot.finished_at = Some(Utc::now());
                self.inner.publish(&state);
                StartOutcome::Rejected(failure)
            }
        }
    }

    /// Stop tracking the active import and ask the server to stop it.
    ///
    /// The local state moves to `Cancelled` whatever the server answers.
    pub async fn cancel_import(&self) -> ImportSnapshot {
        let (process_id, snapshot) = {
            let mut state = self.inner.state.lock().await;
            if !state.snapshot.phase.is_active() {
                log_debug!("No active import to cancel ({})", state.snapshot.phase);
                return state.snapshot.clone();
            }

            state.next_generation();
            if let Err(e) = self.inner.store.clear().await {
                log_error!("Could not clear persisted import handle: {}", e);
            }
            state.snapshot.phase = ImportPhase::Cancelled;
            state.snapshot.error = None;
            state.snapshot.notice = Some(CANCELLED_NOTICE.to_string());
            state.snapshot.finished_at = Some(Utc::now());
            self.inner.publish(&state);
            (state.snapshot.process_id.clone(), state.snapshot.clone())
        };

        if let Some(process_id) = process_id {
            match self.inner.api.cancel(&process_id).await {
                Ok(()) => log_info!("Cancellation requested for import {}", process_id),
                Err(e) => log_warn!("Cancellation request for import {} failed: {}", process_id, e),
            }
        }
        snapshot
    }

    /// Forget everything, in memory and persisted. Safe to call repeatedly.
    pub async fn reset_import(&self) {
        let mut state = self.inner.state.lock().await;
        state.next_generation();
        if let Err(e) = self.inner.store.clear().await {
            log_error!("Could not clear persisted import handle: {}", e);
        }
        state.snapshot = ImportSnapshot::default();
        self.inner.publish(&state);
        log_debug!("Import tracker reset");
    }

    /// Pick up a job persisted by an earlier run and resume polling it.
    ///
    /// Returns the resumed id. A partial persisted record is cleared.
    pub async fn resume(&self) -> Option<ProcessId> {
        let mut state = self.inner.state.lock().await;
        if state.snapshot.phase.is_active() {
            return state.snapshot.process_id.clone();
        }

        let stored = match self.inner.store.load().await {
            Ok(stored) => stored,
            Err(e) => {
                log_error!("Could not read persisted import handle: {}", e);
                return None;
            }
        };

        match stored.resumable() {
            Some(process_id) => {
                state.next_generation();
                state.snapshot = ImportSnapshot {
                    phase: ImportPhase::Polling,
                    process_id: Some(process_id.clone()),
                    started_at: Some(Utc::now()),
                    ..Default::default()
                };
                TrackerInner::begin_polling(&self.inner, &mut state, process_id.clone());
                self.inner.publish(&state);
                log_info!("Resuming import {} from persisted state", process_id);
                Some(process_id)
            }
            None => {
                if !stored.is_empty() {
                    log_warn!("Discarding incomplete persisted import handle: {:?}", stored);
                    if let Err(e) = self.inner.store.clear().await {
                        log_error!("Could not clear persisted import handle: {}", e);
                    }
                }
                None
            }
        }
    }

    /// Stop polling without touching persisted state, so a later `resume` picks the job up.
    ///
    /// An active import drops back to `Idle`: no phase outlives its poll timer.
    pub async fn shutdown(&self) {
        let mut state = self.inner.state.lock().await;
        state.next_generation();
        if state.snapshot.phase.is_active() {
            state.snapshot.phase = ImportPhase::Idle;
            state.snapshot.notice = Some(PAUSED_NOTICE.to_string());
            self.inner.publish(&state);
        }
        log_debug!("Import tracker shut down");
    }
}

impl TrackerInner {
    fn publish(&self, state: &TrackerState) {
        self.snapshots.send_replace(state.snapshot.clone());
    }

    fn begin_polling(inner: &Arc<Self>, state: &mut TrackerState, process_id: ProcessId) {
        state.stop_polling();
        let token = CancellationToken::new();
        state.poller = Some(token.clone());
        tokio::spawn(poll_loop(
            Arc::downgrade(inner),
            process_id,
            state.generation,
            token,
            inner.settings.poll_interval,
        ));
    }

    /// Sequence number for the next poll, or `None` once this run is over.
    async fn reserve_poll(&self, generation: u64) -> Option<u64> {
        let mut state = self.state.lock().await;
        if state.generation != generation || state.snapshot.phase != ImportPhase::Polling {
            return None;
        }
        state.next_seq += 1;
        Some(state.next_seq)
    }

    async fn apply_poll(
        &self,
        generation: u64,
        seq: u64,
        process_id: &ProcessId,
        result: Result<JobStatus, ApiError>,
    ) {
        let mut state = self.state.lock().await;
        if state.generation != generation || state.snapshot.phase != ImportPhase::Polling {
            log_debug!(
                "Discarding poll #{} for import {}: tracker moved on",
                seq,
                process_id
            );
            return;
        }

        let status = match result {
            Ok(status) => status,
            Err(e) if e.is_session_expired() => {
                self.invalidate_session(&mut state).await;
                return;
            }
            Err(e) => {
                log_warn!(
                    "Transient poll failure for import {} (poll #{}): {}",
                    process_id,
                    seq,
                    e
                );
                return;
            }
        };

        if seq <= state.last_applied_seq {
            log_debug!(
                "Discarding out-of-order poll #{} for import {} (already applied #{})",
                seq,
                process_id,
                state.last_applied_seq
            );
            return;
        }
        state.last_applied_seq = seq;
        state.snapshot.progress = status.progress;
        LogContext::import_progress(process_id.as_str(), status.progress, seq);

        match status.outcome() {
            JobOutcome::Running => {}
            JobOutcome::Succeeded(result) => {
                self.finish(&mut state).await;
                state.snapshot.phase = ImportPhase::Completed;
                state.snapshot.result = result;
                state.snapshot.error = None;
                match result {
                    Some(stats) => log_info!(
                        "Import {} completed: {} rows ({} imported, {} updated, {} errors)",
                        process_id,
                        stats.total_rows,
                        stats.imported,
                        stats.updated,
                        stats.errors
                    ),
                    None => log_info!("Import {} completed without a summary", process_id),
                }
            }
            JobOutcome::Failed(message) => {
                self.finish(&mut state).await;
                log_warn!("Import {} failed: {}", process_id, message);
                state.snapshot.phase = ImportPhase::Errored;
                state.snapshot.result = None;
                state.snapshot.error = Some(ImportFailure::job_failed(message));
            }
        }
        self.publish(&state);
    }

    async fn finish(&self, state: &mut TrackerState) {
        state.stop_polling();
        state.snapshot.finished_at = Some(Utc::now());
        if let Err(e) = self.store.clear().await {
            log_error!("Could not clear persisted import handle: {}", e);
        }
    }

    /// 401/403: the job may be fine, but this client can no longer observe it.
    async fn invalidate_session(&self, state: &mut TrackerState) {
        state.next_generation();
        if let Err(e) = self.store.clear().await {
            log_error!("Could not clear persisted import handle: {}", e);
        }
        state.snapshot = ImportSnapshot {
            phase: ImportPhase::Idle,
            file_name: state.snapshot.file_name.take(),
            error: Some(ImportFailure::session_invalid()),
            finished_at: Some(Utc::now()),
            ..Default::default()
        };
        self.publish(state);
        log_warn!("Session rejected while tracking an import, local import state cleared");
    }
}

async fn poll_loop(
    inner: Weak<TrackerInner>,
    process_id: ProcessId,
    generation: u64,
    token: CancellationToken,
    period: Duration,
) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let Some(tracker) = inner.upgrade() else {
            break;
        };
        let permit = match tracker.poll_permits.clone().try_acquire_owned() {
            Ok(permit) => permit,
            Err(_) => {
                log_debug!(
                    "Skipping poll tick for import {}: too many requests in flight",
                    process_id
                );
                continue;
            }
        };
        let Some(seq) = tracker.reserve_poll(generation).await else {
            break;
        };

        let process_id = process_id.clone();
        tokio::spawn(async move {
            let _permit = permit;
            let result = tracker.api.poll(&process_id).await;
            tracker.apply_poll(generation, seq, &process_id, result).await;
        });
    }

    log_debug!("Poll loop for import {} stopped", process_id);
}
