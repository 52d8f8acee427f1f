/// Domain entities for import job tracking
///
/// An import job lives on the server; the client only keeps a view of it
/// (the [`ImportSnapshot`]) that is mutated by poll responses.
use super::value_objects::ProcessId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Tracker state machine phases
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ImportPhase {
    #[default]
    Idle,
    Uploading,
    Polling,
    Completed,
    Errored,
    Cancelled,
}

impl ImportPhase {
    /// Uploading or polling: a job is in progress for this client.
    pub fn is_active(&self) -> bool {
        matches!(self, ImportPhase::Uploading | ImportPhase::Polling)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ImportPhase::Completed | ImportPhase::Errored | ImportPhase::Cancelled
        )
    }
}

impl std::fmt::Display for ImportPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImportPhase::Idle => write!(f, "idle"),
            ImportPhase::Uploading => write!(f, "uploading"),
            ImportPhase::Polling => write!(f, "polling"),
            ImportPhase::Completed => write!(f, "completed"),
            ImportPhase::Errored => write!(f, "errored"),
            ImportPhase::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Summary reported by the server once a job succeeds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ImportStats {
    pub total_rows: u64,
    pub imported: u64,
    pub updated: u64,
    pub errors: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportFailureKind {
    /// The server refused the file, or it never reached the server.
    UploadRejected,
    /// Processing failed server-side after acceptance.
    JobFailed,
    /// 401/403: the client can no longer observe the job.
    SessionInvalid,
}

/// User-facing failure carried by the snapshot's single `error` slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportFailure {
    pub kind: ImportFailureKind,
    pub message: String,
}

pub const GENERIC_UPLOAD_ERROR: &str = "Failed to upload the import file";
pub const SESSION_EXPIRED_MESSAGE: &str = "Session expired, please reload and sign in again";
pub const CANCELLED_NOTICE: &str = "Import cancelled by user";
pub const PAUSED_NOTICE: &str = "Import tracking paused, resume to continue";

impl ImportFailure {
    pub fn upload_rejected(message: Option<&str>) -> Self {
        let message = message
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or(GENERIC_UPLOAD_ERROR);
        Self {
            kind: ImportFailureKind::UploadRejected,
            message: message.to_string(),
        }
    }

    pub fn job_failed(message: impl Into<String>) -> Self {
        Self {
            kind: ImportFailureKind::JobFailed,
            message: message.into(),
        }
    }

    pub fn session_invalid() -> Self {
        Self {
            kind: ImportFailureKind::SessionInvalid,
            message: SESSION_EXPIRED_MESSAGE.to_string(),
        }
    }
}

impl std::fmt::Display for ImportFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

/// Client-side view of the tracked job, published on every transition
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSnapshot {
    pub phase: ImportPhase,
    pub process_id: Option<ProcessId>,
    pub file_name: Option<String>,
    pub progress: u8,
    pub result: Option<ImportStats>,
    pub error: Option<ImportFailure>,
    /// Informational message that is not an error (cancellation, pause).
    pub notice: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl ImportSnapshot {
    pub fn is_importing(&self) -> bool {
        self.phase.is_active()
    }

    pub fn stats(&self) -> Option<&ImportStats> {
        self.result.as_ref()
    }
}

/// Status returned by one poll round-trip
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct JobStatus {
    pub progress: u8,
    pub completed: bool,
    pub error: Option<String>,
    pub result: Option<ImportStats>,
}

/// What a poll response means for the tracker
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Running,
    Succeeded(Option<ImportStats>),
    Failed(String),
}

impl JobStatus {
    pub fn running(progress: u8) -> Self {
        Self {
            progress,
            ..Default::default()
        }
    }

    pub fn succeeded(result: ImportStats) -> Self {
        Self {
            progress: 100,
            completed: true,
            error: None,
            result: Some(result),
        }
    }

    pub fn failed(progress: u8, error: impl Into<String>) -> Self {
        Self {
            progress,
            completed: true,
            error: Some(error.into()),
            result: None,
        }
    }

    /// An error wins over a result; the two are never reported together.
    pub fn outcome(&self) -> JobOutcome {
        if !self.completed {
            return JobOutcome::Running;
        }
        match &self.error {
            Some(error) => JobOutcome::Failed(error.clone()),
            None => JobOutcome::Succeeded(self.result),
        }
    }
}

/// File payload sent to the upload endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let file_name = file_name.into();
        let content_type = content_type_for(&file_name).map(str::to_string);
        Self {
            file_name,
            content_type,
            bytes,
        }
    }

    /// Read a file from disk, keeping only its base name for the multipart part.
    pub async fn from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        Ok(Self::new(file_name, bytes))
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

fn content_type_for(file_name: &str) -> Option<&'static str> {
    let extension = Path::new(file_name)
        .extension()?
        .to_str()?
        .to_ascii_lowercase();
    match extension.as_str() {
        "xlsx" => Some("application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"),
        "xls" => Some("application/vnd.ms-excel"),
        "csv" => Some("text/csv"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_import_phase_display() {
        assert_eq!(ImportPhase::Idle.to_string(), "idle");
        assert_eq!(ImportPhase::Polling.to_string(), "polling");
        assert_eq!(ImportPhase::Cancelled.to_string(), "cancelled");
    }

    #[test]
    fn test_active_and_terminal_phases() {
        assert!(ImportPhase::Uploading.is_active());
        assert!(ImportPhase::Polling.is_active());
        assert!(!ImportPhase::Idle.is_active());
        assert!(ImportPhase::Errored.is_terminal());
        assert!(!ImportPhase::Polling.is_terminal());
    }

    #[test]
    fn test_outcome_error_excludes_result() {
        let status = JobStatus {
            progress: 100,
            completed: true,
            error: Some("Missing DNI column".to_string()),
            result: Some(ImportStats::default()),
        };
        assert_eq!(
            status.outcome(),
            JobOutcome::Failed("Missing DNI column".to_string())
        );
    }

    #[test]
    fn test_outcome_running_until_completed() {
        assert_eq!(JobStatus::running(70).outcome(), JobOutcome::Running);

        let stats = ImportStats {
            total_rows: 500,
            imported: 480,
            updated: 20,
            errors: 0,
        };
        assert_eq!(
            JobStatus::succeeded(stats).outcome(),
            JobOutcome::Succeeded(Some(stats))
        );
    }

    #[test]
    fn test_upload_failure_falls_back_to_generic_message() {
        assert_eq!(
            ImportFailure::upload_rejected(None).message,
            GENERIC_UPLOAD_ERROR
        );
        assert_eq!(
            ImportFailure::upload_rejected(Some("  ")).message,
            GENERIC_UPLOAD_ERROR
        );
        assert_eq!(
            ImportFailure::upload_rejected(Some("Unsupported file format")).message,
            "Unsupported file format"
        );
    }

    #[test]
    fn test_upload_file_content_type() {
        let file = UploadFile::new("padron.XLSX", vec![1, 2, 3]);
        assert_eq!(
            file.content_type.as_deref(),
            Some("application/vnd.openxmlformats-officedocument.spreadsheetml.sheet")
        );
        assert!(UploadFile::new("notes.txt", vec![]).content_type.is_none());
        assert!(UploadFile::new("notes.txt", vec![]).is_empty());
    }

    #[test]
    fn test_snapshot_serializes_camel_case() {
        let snapshot = ImportSnapshot {
            phase: ImportPhase::Completed,
            process_id: ProcessId::parse("abc123"),
            result: Some(ImportStats {
                total_rows: 500,
                ..Default::default()
            }),
            ..Default::default()
        };
        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["phase"], "completed");
        assert_eq!(json["processId"], "abc123");
        assert_eq!(json["result"]["totalRows"], 500);
    }
}
