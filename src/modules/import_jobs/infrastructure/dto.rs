//! Wire shapes of the import endpoints

use crate::modules::import_jobs::domain::value_objects::clamp_progress;
use crate::modules::import_jobs::domain::{ImportStats, JobStatus, ProcessId};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponseDto {
    pub process_id: Option<String>,
}

impl UploadResponseDto {
    pub fn process_id(&self) -> Option<ProcessId> {
        self.process_id.as_deref().and_then(ProcessId::parse)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportStatsDto {
    #[serde(default)]
    pub total_rows: u64,
    #[serde(default)]
    pub imported: u64,
    #[serde(default)]
    pub updated: u64,
    #[serde(default)]
    pub errors: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponseDto {
    #[serde(default)]
    pub progress: Option<f64>,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub result: Option<ImportStatsDto>,
}

/// Error body of a rejected request; the backend uses either field.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorBodyDto {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ErrorBodyDto {
    pub fn into_message(self) -> Option<String> {
        self.message
            .or(self.error)
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
    }
}

impl From<ImportStatsDto> for ImportStats {
    fn from(dto: ImportStatsDto) -> Self {
        ImportStats {
            total_rows: dto.total_rows,
            imported: dto.imported,
            updated: dto.updated,
            errors: dto.errors,
        }
    }
}

impl From<StatusResponseDto> for JobStatus {
    fn from(dto: StatusResponseDto) -> Self {
        // Blank error strings are treated as absent.
        let error = dto.error.filter(|e| !e.trim().is_empty());
        // A finished job that omits progress is done.
        let default_progress = if dto.completed && error.is_none() { 100 } else { 0 };
        JobStatus {
            progress: dto.progress.map(clamp_progress).unwrap_or(default_progress),
            completed: dto.completed,
            result: if error.is_some() {
                None
            } else {
                dto.result.map(ImportStats::from)
            },
            error,
        }
    }
}
