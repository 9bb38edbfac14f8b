use crate::ai::{FixClient, HttpFixClient};
use crate::capture::{CaptureLayer, ErrorChannel};
use crate::config::Config;
use crate::interceptor::{HttpFailure, Interceptor, Pipeline};
use crate::notify::NotificationCenter;
use crate::telemetry::HttpErrorLog;
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;

/// Everything needed to capture errors against the configured backends.
pub struct Fixit {
    pub channel: ErrorChannel,
    pub interceptor: Interceptor,
    pub notifications: Arc<NotificationCenter>,
    pub fix_client: Arc<HttpFixClient>,
    pub error_log: Arc<HttpErrorLog>,
    http: reqwest::Client,
}

impl Fixit {
    /// Builds the HTTP collaborators and activates the interceptor on a
    /// fresh channel. Must be called inside a tokio runtime.
    pub fn from_config(config: &Config) -> Result<Self> {
        let fix_client = Arc::new(HttpFixClient::new(&config.api)?);
        let error_log = Arc::new(HttpErrorLog::new(&config.api)?);
        let notifications = Arc::new(NotificationCenter::new(&config.notifications));

        let fixer: Arc<dyn FixClient> = fix_client.clone();
        let pipeline = Pipeline::new(fixer, Arc::clone(&notifications), config)
            .with_logger(error_log.clone());
        let interceptor = Interceptor::new(Arc::new(pipeline));

        let channel = ErrorChannel::default();
        interceptor.activate(&channel);

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.api.request_timeout_secs))
            .build()?;

        Ok(Self {
            channel,
            interceptor,
            notifications,
            fix_client,
            error_log,
            http,
        })
    }

    /// Client for application requests passed to [`Fixit::execute`].
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Sends `request`. A non-success answer is escalated as a backend
    /// failure and comes back as `None`.
    pub async fn execute(&self, request: reqwest::Request) -> Result<Option<reqwest::Response>> {
        let method = request.method().to_string();
        let response = self.http.execute(request).await?;
        if response.status().is_success() {
            return Ok(Some(response));
        }

        let failure = HttpFailure::from_response(&method, response).await;
        self.interceptor.report_backend_failure(failure);
        Ok(None)
    }

    pub fn capture_layer(&self) -> CaptureLayer {
        CaptureLayer::new(self.channel.clone())
    }

    pub async fn settle(&self) {
        self.interceptor.pipeline().settle().await;
    }
}
