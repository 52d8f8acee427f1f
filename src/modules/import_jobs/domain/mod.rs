pub mod api;
pub mod entities;
pub mod store;
pub mod value_objects;

pub use api::ImportApi;
pub use entities::{
    ImportFailure, ImportFailureKind, ImportPhase, ImportSnapshot, ImportStats, JobOutcome,
    JobStatus, UploadFile,
};
pub use store::{JobHandleStore, StoredHandle};
pub use value_objects::ProcessId;
