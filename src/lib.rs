pub mod modules;
pub mod shared;

use modules::import_jobs::{
    FileJobHandleStore, ImportApi, ImportApiClient, ImportTracker, JobHandleStore, TrackerSettings,
};
use shared::{AppConfig, AppResult, SessionEventBus};
use std::sync::Arc;

/// Wired services for one client instance
pub struct ClientContext {
    pub config: Arc<AppConfig>,
    pub session_events: Arc<SessionEventBus>,
    pub store: Arc<dyn JobHandleStore>,
    pub tracker: ImportTracker,
}

impl ClientContext {
    /// Build the HTTP client, durable store and tracker from `config`.
    pub fn initialize(config: AppConfig) -> AppResult<Self> {
        let config = Arc::new(config);
        let session_events = Arc::new(SessionEventBus::default());

        let api: Arc<dyn ImportApi> = Arc::new(ImportApiClient::new(
            Arc::clone(&config),
            Arc::clone(&session_events),
        )?);
        let store: Arc<dyn JobHandleStore> =
            Arc::new(FileJobHandleStore::new(config.state_file.clone()));
        let tracker = ImportTracker::new(
            api,
            Arc::clone(&store),
            TrackerSettings::from(config.as_ref()),
        );

        log_info!(
            "SIGA client ready (state file: {})",
            config.state_file.display()
        );

        Ok(Self {
            config,
            session_events,
            store,
            tracker,
        })
    }
}
