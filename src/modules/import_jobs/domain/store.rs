/// Persisted single-slot job handle
///
/// The handle is what survives a restart: the active process id plus the
/// "importing" marker that gates auto-resume. Both keys are always written and
/// removed together.
use super::value_objects::ProcessId;
use crate::shared::errors::AppResult;
use async_trait::async_trait;

pub const PROCESS_ID_KEY: &str = "import_processId";
pub const IMPORTING_KEY: &str = "import_isImporting";
pub const IMPORTING_SENTINEL: &str = "true";

/// Raw contents of the two storage keys, as found on load.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoredHandle {
    pub process_id: Option<String>,
    pub importing_marker: Option<String>,
}

impl StoredHandle {
    pub fn active(process_id: &ProcessId) -> Self {
        Self {
            process_id: Some(process_id.to_string()),
            importing_marker: Some(IMPORTING_SENTINEL.to_string()),
        }
    }

    /// The id to resume polling for: requires the `"true"` sentinel and a non-blank id.
    pub fn resumable(&self) -> Option<ProcessId> {
        if self.importing_marker.as_deref() != Some(IMPORTING_SENTINEL) {
            return None;
        }
        self.process_id.as_deref().and_then(ProcessId::parse)
    }

    pub fn is_empty(&self) -> bool {
        self.process_id.is_none() && self.importing_marker.is_none()
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait JobHandleStore: Send + Sync {
    async fn load(&self) -> AppResult<StoredHandle>;

    /// Persist `process_id` together with the importing marker.
    async fn save(&self, process_id: &ProcessId) -> AppResult<()>;

    /// Remove both keys. Clearing an empty store is not an error.
    async fn clear(&self) -> AppResult<()>;
}
