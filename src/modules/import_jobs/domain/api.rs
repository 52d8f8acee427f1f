/// Port for the backend import contract
///
/// Implemented over HTTP by `ImportApiClient`; tests substitute scripted fakes.
use super::entities::{JobStatus, UploadFile};
use super::value_objects::ProcessId;
use crate::shared::errors::ApiError;
use async_trait::async_trait;

#[async_trait]
pub trait ImportApi: Send + Sync {
    /// Upload the file and return the server-assigned process id.
    async fn upload(&self, file: UploadFile) -> Result<ProcessId, ApiError>;

    /// Read-only status query for one job.
    async fn poll(&self, process_id: &ProcessId) -> Result<JobStatus, ApiError>;

    /// Ask the server to stop the job. The acknowledgement carries no data.
    async fn cancel(&self, process_id: &ProcessId) -> Result<(), ApiError>;
}
