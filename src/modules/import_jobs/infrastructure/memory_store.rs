use crate::modules::import_jobs::domain::store::{
    JobHandleStore, StoredHandle, IMPORTING_KEY, IMPORTING_SENTINEL, PROCESS_ID_KEY,
};
use crate::modules::import_jobs::domain::ProcessId;
use crate::shared::errors::{AppError, AppResult};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Mutex;

/// Process-local job handle store. Nothing survives a restart.
#[derive(Default)]
pub struct InMemoryJobHandleStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl InMemoryJobHandleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed raw keys, e.g. to simulate state left behind by an earlier run.
    pub fn with_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            entries: Mutex::new(
                entries
                    .into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
        }
    }

    /// Copy of the raw keys currently stored.
    pub fn entries(&self) -> BTreeMap<String, String> {
        self.entries
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }

    fn with_lock<T>(&self, f: impl FnOnce(&mut BTreeMap<String, String>) -> T) -> AppResult<T> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| AppError::StorageError("In-memory store lock poisoned".to_string()))?;
        Ok(f(&mut entries))
    }
}

#[async_trait]
impl JobHandleStore for InMemoryJobHandleStore {
    async fn load(&self) -> AppResult<StoredHandle> {
        self.with_lock(|entries| StoredHandle {
            process_id: entries.get(PROCESS_ID_KEY).cloned(),
            importing_marker: entries.get(IMPORTING_KEY).cloned(),
        })
    }

    async fn save(&self, process_id: &ProcessId) -> AppResult<()> {
        self.with_lock(|entries| {
            entries.insert(PROCESS_ID_KEY.to_string(), process_id.to_string());
            entries.insert(IMPORTING_KEY.to_string(), IMPORTING_SENTINEL.to_string());
        })
    }

    async fn clear(&self) -> AppResult<()> {
        self.with_lock(|entries| {
            entries.remove(PROCESS_ID_KEY);
            entries.remove(IMPORTING_KEY);
        })
    }
}
