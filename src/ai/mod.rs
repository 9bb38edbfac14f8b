use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};

mod error;
mod fallback;
pub mod response;

pub use error::FixError;
pub use fallback::{compute_fallback, GENERIC_TIP};
pub use response::{extract_code, normalize, FixResponse, NormalizedFix, UNEXPECTED_FORMAT};
use crate::config::ApiConfig;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FixRequest {
    pub error: String,
    pub code_context: String,
}

/// Outcome of a fix request: either whatever the endpoint answered, or a
/// locally computed tip when the endpoint could not be used.
#[derive(Debug, Clone, PartialEq)]
pub enum FixReply {
    Answered(FixResponse),
    Fallback(String),
}

impl FixReply {
    pub fn success(&self) -> bool {
        matches!(self, Self::Answered(_))
    }

    pub fn normalized(&self) -> NormalizedFix {
        match self {
            Self::Answered(response) => normalize(response),
            Self::Fallback(tip) => NormalizedFix {
                solution: tip.clone(),
                code: String::new(),
            },
        }
    }
}

#[async_trait]
pub trait FixClient: Send + Sync {
    /// Never fails: transport problems resolve to [`FixReply::Fallback`].
    async fn request_fix(&self, error: &str, context: &str) -> FixReply;

    async fn health(&self) -> bool;
}

pub struct HttpFixClient {
    client: reqwest::Client,
    api_url: String,
    api_key: Option<String>,
}

impl HttpFixClient {
    pub fn new(config: &ApiConfig) -> Result<Self, FixError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(key) = config.api_key.as_deref() {
            let value = HeaderValue::from_str(&format!("Bearer {}", key))
                .map_err(|e| FixError::ValidationError(format!("Invalid API key: {}", e)))?;
            headers.insert(AUTHORIZATION, value);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.api_url, path)
    }

    async fn send_fix_request(&self, request: &FixRequest) -> Result<FixResponse, FixError> {
        let response = self
            .client
            .post(self.endpoint("fix-error"))
            .json(request)
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => (),
            StatusCode::UNAUTHORIZED => {
                return Err(FixError::ValidationError("Invalid API key".to_string()));
            }
            status => {
                let error_body = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Could not read error response".to_string());
                return Err(FixError::StatusError(status.as_u16(), error_body));
            }
        }

        let response_text = response
            .text()
            .await
            .map_err(|e| FixError::NetworkError(format!("Failed to read response body: {}", e)))?;

        debug!("Raw fix response: {}", response_text);

        let value: Value = serde_json::from_str(&response_text)?;
        Ok(FixResponse::decode(value))
    }
}

#[async_trait]
impl FixClient for HttpFixClient {
    async fn request_fix(&self, error: &str, context: &str) -> FixReply {
        let request = FixRequest {
            error: error.to_string(),
            code_context: context.to_string(),
        };

        match self.send_fix_request(&request).await {
            Ok(response) => {
                debug!("Fix endpoint answered with a {} response", response.shape());
                FixReply::Answered(response)
            }
            Err(e) => {
                warn!("Backend error, using fallback: {}", e);
                FixReply::Fallback(compute_fallback(error))
            }
        }
    }

    async fn health(&self) -> bool {
        match self.client.get(self.endpoint("health")).send().await {
            Ok(response) if response.status().is_success() => {
                info!("Backend connected");
                true
            }
            Ok(response) => {
                warn!("Backend not connected: status {}", response.status());
                false
            }
            Err(e) => {
                warn!("Backend not connected: {}", e);
                false
            }
        }
    }
}
