//! Client configuration loaded from the environment (and an optional `.env`).

use crate::log_info;
use crate::shared::errors::{AppError, AppResult};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_POLL_INTERVAL_MS: u64 = 200;
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
const DEFAULT_MAX_IN_FLIGHT_POLLS: usize = 4;
const DEFAULT_STATE_FILE: &str = ".siga/import_state.json";

/// Placeholder substituted with the url-encoded process id.
pub const PROCESS_ID_PLACEHOLDER: &str = "{processId}";

/// Endpoint templates for the import contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportEndpoints {
    pub upload: String,
    pub status: String,
    pub cancel: String,
}

impl Default for ImportEndpoints {
    fn default() -> Self {
        Self {
            upload: "/import/upload".to_string(),
            status: "/import/status/{processId}".to_string(),
            cancel: "/import/cancel/{processId}".to_string(),
        }
    }
}

impl ImportEndpoints {
    pub fn upload_path(&self) -> &str {
        &self.upload
    }

    pub fn status_path(&self, process_id: &str) -> String {
        Self::scoped(&self.status, process_id)
    }

    pub fn cancel_path(&self, process_id: &str) -> String {
        Self::scoped(&self.cancel, process_id)
    }

    fn scoped(template: &str, process_id: &str) -> String {
        template.replace(PROCESS_ID_PLACEHOLDER, &urlencoding::encode(process_id))
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Base URL of the SIGA backend, without trailing slash.
    pub api_url: String,
    pub api_token: Option<String>,
    pub poll_interval: Duration,
    pub http_timeout: Duration,
    pub state_file: PathBuf,
    pub max_in_flight_polls: usize,
    pub endpoints: ImportEndpoints,
}

impl AppConfig {
    /// Build a config with defaults for everything but the backend URL.
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into().trim_end_matches('/').to_string(),
            api_token: None,
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            state_file: PathBuf::from(DEFAULT_STATE_FILE),
            max_in_flight_polls: DEFAULT_MAX_IN_FLIGHT_POLLS,
            endpoints: ImportEndpoints::default(),
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.api_token = Some(token.into());
        self
    }

    /// Load `.env` (if present) and read the `SIGA_*` variables.
    pub fn from_env() -> AppResult<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Read configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_url = lookup("SIGA_API_URL").ok_or_else(|| {
            AppError::ConfigError("SIGA_API_URL environment variable not found".to_string())
        })?;

        if !api_url.starts_with("http://") && !api_url.starts_with("https://") {
            return Err(AppError::ConfigError(format!(
                "SIGA_API_URL must start with http:// or https://, got '{}'",
                api_url
            )));
        }

        let mut config = Self::new(api_url);
        config.api_token = lookup("SIGA_API_TOKEN").filter(|t| !t.trim().is_empty());

        if let Some(ms) = parse_var::<u64>(&lookup, "SIGA_POLL_INTERVAL_MS")? {
            if ms == 0 {
                return Err(AppError::ConfigError(
                    "SIGA_POLL_INTERVAL_MS must be greater than zero".to_string(),
                ));
            }
            config.poll_interval = Duration::from_millis(ms);
        }
        if let Some(secs) = parse_var::<u64>(&lookup, "SIGA_HTTP_TIMEOUT_SECS")? {
            config.http_timeout = Duration::from_secs(secs);
        }
        if let Some(limit) = parse_var::<usize>(&lookup, "SIGA_MAX_IN_FLIGHT_POLLS")? {
            config.max_in_flight_polls = limit.max(1);
        }
        if let Some(path) = lookup("SIGA_STATE_FILE") {
            config.state_file = PathBuf::from(path);
        }
        if let Some(path) = lookup("SIGA_UPLOAD_PATH") {
            config.endpoints.upload = path;
        }
        if let Some(path) = lookup("SIGA_STATUS_PATH") {
            config.endpoints.status = path;
        }
        if let Some(path) = lookup("SIGA_CANCEL_PATH") {
            config.endpoints.cancel = path;
        }

        // Log target without exposing the credential
        log_info!(
            "SIGA client configured for {} (token: {}, poll every {:?})",
            config.api_url,
            if config.api_token.is_some() { "set" } else { "none" },
            config.poll_interval
        );

        Ok(config)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.api_url, path.trim_start_matches('/'))
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> AppResult<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| AppError::ConfigError(format!("Invalid {}='{}': {}", key, raw, e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_only_url_is_set() {
        let config =
            AppConfig::from_lookup(lookup_from(&[("SIGA_API_URL", "https://siga.test/api/")]))
                .unwrap();

        assert_eq!(config.api_url, "https://siga.test/api");
        assert_eq!(config.poll_interval, Duration::from_millis(200));
        assert_eq!(config.max_in_flight_polls, 4);
        assert!(config.api_token.is_none());
        assert_eq!(config.url("/import/upload"), "https://siga.test/api/import/upload");
    }

    #[test]
    fn missing_url_is_a_config_error() {
        let err = AppConfig::from_lookup(lookup_from(&[])).unwrap_err();
        assert!(matches!(err, AppError::ConfigError(_)));
    }

    #[test]
    fn rejects_garbage_numbers_and_zero_interval() {
        let bad = AppConfig::from_lookup(lookup_from(&[
            ("SIGA_API_URL", "http://localhost:3000"),
            ("SIGA_POLL_INTERVAL_MS", "fast"),
        ]));
        assert!(matches!(bad, Err(AppError::ConfigError(_))));

        let zero = AppConfig::from_lookup(lookup_from(&[
            ("SIGA_API_URL", "http://localhost:3000"),
            ("SIGA_POLL_INTERVAL_MS", "0"),
        ]));
        assert!(matches!(zero, Err(AppError::ConfigError(_))));
    }

    #[test]
    fn overrides_are_read() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("SIGA_API_URL", "http://localhost:3000"),
            ("SIGA_API_TOKEN", "tok"),
            ("SIGA_POLL_INTERVAL_MS", "50"),
            ("SIGA_STATE_FILE", "/tmp/siga.json"),
            ("SIGA_STATUS_PATH", "/v2/imports/{processId}"),
        ]))
        .unwrap();

        assert_eq!(config.api_token.as_deref(), Some("tok"));
        assert_eq!(config.poll_interval, Duration::from_millis(50));
        assert_eq!(config.state_file, PathBuf::from("/tmp/siga.json"));
        assert_eq!(config.endpoints.status_path("a b"), "/v2/imports/a%20b");
    }

    #[test]
    fn endpoint_templates_scope_by_process_id() {
        let endpoints = ImportEndpoints::default();
        assert_eq!(endpoints.status_path("abc123"), "/import/status/abc123");
        assert_eq!(endpoints.cancel_path("abc123"), "/import/cancel/abc123");
        assert_eq!(endpoints.upload_path(), "/import/upload");
    }
}
