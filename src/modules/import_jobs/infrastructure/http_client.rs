//! HTTP client for the SIGA import endpoints
//!
//! Attaches the bearer credential to every request, classifies failures into
//! [`ApiError`] and publishes a session-expiry event on 401/403.

use super::dto::{ErrorBodyDto, StatusResponseDto, UploadResponseDto};
use crate::modules::import_jobs::domain::{ImportApi, JobStatus, ProcessId, UploadFile};
use crate::shared::config::AppConfig;
use crate::shared::errors::{ApiError, AppResult};
use crate::shared::events::{SessionEvent, SessionEventBus};
use crate::shared::utils::TimedOperation;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use std::sync::Arc;
use tracing::{debug, warn};

const USER_AGENT: &str = concat!("siga-client/", env!("CARGO_PKG_VERSION"));
const MULTIPART_FIELD: &str = "file";

pub struct ImportApiClient {
    client: Client,
    config: Arc<AppConfig>,
    session_events: Arc<SessionEventBus>,
}

impl ImportApiClient {
    pub fn new(config: Arc<AppConfig>, session_events: Arc<SessionEventBus>) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(config.http_timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            client,
            config,
            session_events,
        })
    }

    /// Attach credentials, send, and turn non-success statuses into errors.
    async fn send(&self, request: RequestBuilder, path: &str) -> Result<Response, ApiError> {
        let request = match &self.config.api_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        };

        let response = request
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(ApiError::from)?;
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            warn!("SIGA backend rejected credentials on {} ({})", path, status);
            self.session_events
                .publish(SessionEvent::expired(status.as_u16(), path));
            return Err(ApiError::SessionExpired {
                status: status.as_u16(),
            });
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBodyDto>(&body)
                .ok()
                .and_then(ErrorBodyDto::into_message);
            debug!("SIGA backend returned {} on {}: {}", status, path, body);
            return Err(ApiError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response)
    }

    async fn parse_response<T>(response: Response) -> Result<T, ApiError>
    where
        T: serde::de::DeserializeOwned,
    {
        let text = response.text().await.map_err(ApiError::from)?;
        serde_json::from_str(&text).map_err(|e| ApiError::InvalidResponse {
            message: format!(
                "{}. Response: {}",
                e,
                if text.len() > 200 {
                    format!("{}...", text.chars().take(200).collect::<String>())
                } else {
                    text
                }
            ),
        })
    }
}

#[async_trait]
impl ImportApi for ImportApiClient {
    async fn upload(&self, file: UploadFile) -> Result<ProcessId, ApiError> {
        let path = self.config.endpoints.upload_path().to_string();
        let timer = TimedOperation::new(&format!("POST {}", path));

        let mut part = Part::bytes(file.bytes).file_name(file.file_name.clone());
        if let Some(content_type) = &file.content_type {
            part = part.mime_str(content_type).map_err(ApiError::from)?;
        }
        let form = Form::new().part(MULTIPART_FIELD, part);

        let request = self.client.post(self.config.url(&path)).multipart(form);
        let result = self.send(request, &path).await;
        let response = match result {
            Ok(response) => response,
            Err(e) => {
                timer.finish("failed");
                return Err(e);
            }
        };

        let body: UploadResponseDto = Self::parse_response(response).await?;
        timer.finish("accepted");
        body.process_id().ok_or_else(|| ApiError::InvalidResponse {
            message: "Upload response did not include a processId".to_string(),
        })
    }

    async fn poll(&self, process_id: &ProcessId) -> Result<JobStatus, ApiError> {
        let path = self.config.endpoints.status_path(process_id.as_str());
        let request = self.client.get(self.config.url(&path));
        let response = self.send(request, &path).await?;
        let body: StatusResponseDto = Self::parse_response(response).await?;
        Ok(body.into())
    }

    async fn cancel(&self, process_id: &ProcessId) -> Result<(), ApiError> {
        let path = self.config.endpoints.cancel_path(process_id.as_str());
        let timer = TimedOperation::new(&format!("POST {}", path));
        let request = self.client.post(self.config.url(&path));
        let result = self.send(request, &path).await.map(|_| ());
        timer.finish(if result.is_ok() { "acknowledged" } else { "failed" });
        result
    }
}
