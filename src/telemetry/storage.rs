use super::{ErrorLogger, LogEntry, LogError};
use crate::config::ApiConfig;
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Remote error-log backend (`{errors_url}/log`, `/logs`, `/stats`).
pub struct HttpErrorLog {
    client: reqwest::Client,
    errors_url: String,
}

impl HttpErrorLog {
    pub fn new(config: &ApiConfig) -> Result<Self, LogError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            errors_url: config.errors_url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.errors_url, path)
    }

    async fn read_json(response: reqwest::Response) -> Result<Value, LogError> {
        let status = response.status();
        if !status.is_success() {
            return Err(LogError::StatusError(status.as_u16()));
        }

        let text = response.text().await?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(|e| LogError::ParseError(e.to_string()))
    }

    pub async fn recent_errors(&self) -> Result<Value, LogError> {
        let response = self.client.get(self.endpoint("logs")).send().await?;
        Self::read_json(response).await
    }

    pub async fn stats(&self) -> Result<Value, LogError> {
        let response = self.client.get(self.endpoint("stats")).send().await?;
        Self::read_json(response).await
    }
}

#[async_trait]
impl ErrorLogger for HttpErrorLog {
    async fn log_error(&self, entry: &LogEntry) -> Result<Value, LogError> {
        debug!("Logging error to backend: {}", entry.error_message);
        let response = self
            .client
            .post(self.endpoint("log"))
            .json(entry)
            .send()
            .await?;
        Self::read_json(response).await
    }
}
