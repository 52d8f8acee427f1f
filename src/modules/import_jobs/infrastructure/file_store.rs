//! Durable job handle store backed by a small JSON key-value file
//!
//! The file holds a flat string map shared with other client settings; only
//! the two import keys are touched here. Writes go through a temp file and a
//! rename so both keys land (or vanish) together.

use crate::log_warn;
use crate::modules::import_jobs::domain::store::{
    JobHandleStore, StoredHandle, IMPORTING_KEY, IMPORTING_SENTINEL, PROCESS_ID_KEY,
};
use crate::modules::import_jobs::domain::ProcessId;
use crate::shared::errors::AppResult;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

type Entries = BTreeMap<String, String>;

pub struct FileJobHandleStore {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process.
    write_lock: Mutex<()>,
}

impl FileJobHandleStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_entries(&self) -> AppResult<Entries> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Entries::new()),
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_str::<Entries>(&raw) {
            Ok(entries) => Ok(entries),
            Err(e) => {
                // Unreadable state means there is nothing to resume.
                log_warn!(
                    "Ignoring corrupt client state file {}: {}",
                    self.path.display(),
                    e
                );
                Ok(Entries::new())
            }
        }
    }

    async fn write_entries(&self, entries: &Entries) -> AppResult<()> {
        if entries.is_empty() {
            return match tokio::fs::remove_file(&self.path).await {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(e.into()),
            };
        }

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let tmp = self.path.with_extension("tmp");
        let json = serde_json::to_vec_pretty(entries)?;
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl JobHandleStore for FileJobHandleStore {
    async fn load(&self) -> AppResult<StoredHandle> {
        let entries = self.read_entries().await?;
        Ok(StoredHandle {
            process_id: entries.get(PROCESS_ID_KEY).cloned(),
            importing_marker: entries.get(IMPORTING_KEY).cloned(),
        })
    }

    async fn save(&self, process_id: &ProcessId) -> AppResult<()> {
        let _guard = self.write_lock.lock().await;
        let mut entries = self.read_entries().await?;
        entries.insert(PROCESS_ID_KEY.to_string(), process_id.to_string());
        entries.insert(IMPORTING_KEY.to_string(), IMPORTING_SENTINEL.to_string());
        self.write_entries(&entries).await
    }

    async fn clear(&self) -> AppResult<()> {
        let _guard = self.write_lock.lock().await;
        let mut entries = self.read_entries().await?;
        let had_process = entries.remove(PROCESS_ID_KEY).is_some();
        let had_marker = entries.remove(IMPORTING_KEY).is_some();
        if !had_process && !had_marker {
            return Ok(());
        }
        self.write_entries(&entries).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_in(dir: &tempfile::TempDir) -> FileJobHandleStore {
        FileJobHandleStore::new(dir.path().join("nested").join("state.json"))
    }

    #[tokio::test]
    async fn missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        assert!(store.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn save_writes_both_keys_and_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let id = ProcessId::parse("abc123").unwrap();
        store_in(&dir).save(&id).await.unwrap();

        let reopened = store_in(&dir);
        let handle = reopened.load().await.unwrap();
        assert_eq!(handle.resumable(), Some(id));

        let raw = std::fs::read_to_string(reopened.path()).unwrap();
        let entries: Entries = serde_json::from_str(&raw).unwrap();
        assert_eq!(entries.get("import_processId").map(String::as_str), Some("abc123"));
        assert_eq!(entries.get("import_isImporting").map(String::as_str), Some("true"));
    }

    #[tokio::test]
    async fn clear_keeps_unrelated_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        std::fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        std::fs::write(
            store.path(),
            r#"{"theme":"dark","import_processId":"x","import_isImporting":"true"}"#,
        )
        .unwrap();

        store.clear().await.unwrap();
        store.clear().await.unwrap();

        assert!(store.load().await.unwrap().is_empty());
        let raw = std::fs::read_to_string(store.path()).unwrap();
        assert!(raw.contains("theme"));
    }

    #[tokio::test]
    async fn clear_removes_file_when_nothing_else_is_stored() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.save(&ProcessId::parse("p1").unwrap()).await.unwrap();
        store.clear().await.unwrap();
        assert!(!store.path().exists());
    }

    #[tokio::test]
    async fn corrupt_file_is_treated_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        std::fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        std::fs::write(store.path(), "{not json").unwrap();
        assert!(store.load().await.unwrap().is_empty());
    }
}
