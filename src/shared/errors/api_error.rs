use thiserror::Error;

/// Classification of a failed call against the SIGA backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// 401/403: the bearer credential is no longer accepted.
    #[error("Session expired (HTTP {status})")]
    SessionExpired { status: u16 },

    /// Any other non-success status. `message` is the server-provided text when present.
    #[error("Request rejected (HTTP {status}): {}", message.as_deref().unwrap_or("no details"))]
    Rejected { status: u16, message: Option<String> },

    #[error("Transport failure: {message}")]
    Transport { message: String },

    #[error("Invalid API response: {message}")]
    InvalidResponse { message: String },
}

impl ApiError {
    pub fn is_session_expired(&self) -> bool {
        matches!(self, ApiError::SessionExpired { .. })
    }

    /// Server-provided message, if the backend sent one.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            ApiError::Rejected { message, .. } => message.as_deref(),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            if matches!(status.as_u16(), 401 | 403) {
                return ApiError::SessionExpired {
                    status: status.as_u16(),
                };
            }
        }
        if err.is_decode() {
            ApiError::InvalidResponse {
                message: err.to_string(),
            }
        } else {
            ApiError::Transport {
                message: err.to_string(),
            }
        }
    }
}
