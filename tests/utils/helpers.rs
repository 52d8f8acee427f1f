use siga_lib::modules::import_jobs::{
    ImportApi, ImportSnapshot, ImportTracker, InMemoryJobHandleStore, JobHandleStore,
    TrackerSettings,
};
use std::sync::Arc;
use std::time::Duration;

pub const POLL_INTERVAL: Duration = Duration::from_millis(10);
const WAIT_LIMIT: Duration = Duration::from_secs(3);

pub fn fast_settings(max_in_flight_polls: usize) -> TrackerSettings {
    TrackerSettings {
        poll_interval: POLL_INTERVAL,
        max_in_flight_polls,
    }
}

pub fn build_tracker<A>(api: Arc<A>, store: Arc<InMemoryJobHandleStore>) -> ImportTracker
where
    A: ImportApi + 'static,
{
    build_tracker_with(api, store, fast_settings(1))
}

pub fn build_tracker_with<A>(
    api: Arc<A>,
    store: Arc<InMemoryJobHandleStore>,
    settings: TrackerSettings,
) -> ImportTracker
where
    A: ImportApi + 'static,
{
    let api: Arc<dyn ImportApi> = api;
    let store: Arc<dyn JobHandleStore> = store;
    ImportTracker::new(api, store, settings)
}

/// Wait until a snapshot satisfies `predicate`, panicking after a few seconds.
pub async fn wait_for<F>(tracker: &ImportTracker, predicate: F) -> ImportSnapshot
where
    F: Fn(&ImportSnapshot) -> bool,
{
    let mut rx = tracker.subscribe();
    let result = tokio::time::timeout(WAIT_LIMIT, rx.wait_for(|s| predicate(s))).await;
    match result {
        Ok(Ok(snapshot)) => snapshot.clone(),
        _ => panic!(
            "condition not reached; last snapshot: {:?}",
            tracker.snapshot()
        ),
    }
}

pub async fn wait_for_terminal(tracker: &ImportTracker) -> ImportSnapshot {
    wait_for(tracker, |s| s.phase.is_terminal()).await
}

/// Poll a counter until it reaches `expected`.
pub async fn wait_for_count<F>(read: F, expected: usize)
where
    F: Fn() -> usize,
{
    let deadline = tokio::time::Instant::now() + WAIT_LIMIT;
    while read() < expected {
        assert!(
            tokio::time::Instant::now() < deadline,
            "counter stuck at {} (expected {})",
            read(),
            expected
        );
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
}
