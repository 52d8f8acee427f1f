/// Import job tracking module
///
/// Follows one long-running server-side bulk import from the client:
/// upload, poll for progress, cancel, and resume after a restart.
///
/// Architecture:
/// - Domain: entities, the `ImportApi` port and the `JobHandleStore` port
/// - Infrastructure: reqwest client, file-backed and in-memory stores
/// - Application: the tracker state machine
/// - Commands: entry points used by the CLI
pub mod application;
pub mod commands;
pub mod domain;
pub mod infrastructure;

// Re-exports for easy access
pub use application::{ImportTracker, StartOutcome, TrackerSettings};
pub use domain::{
    entities::{
        ImportFailure, ImportFailureKind, ImportPhase, ImportSnapshot, ImportStats, JobStatus,
        UploadFile,
    },
    store::{JobHandleStore, StoredHandle},
    value_objects::ProcessId,
    ImportApi,
};
pub use infrastructure::{FileJobHandleStore, ImportApiClient, InMemoryJobHandleStore};
