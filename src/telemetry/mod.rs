use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

mod storage;
pub use storage::HttpErrorLog;

use crate::config::LoggingConfig;

pub const NO_SOLUTION: &str = "No AI solution generated";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorType {
    Frontend,
    Backend,
}

/// One error/solution pair as stored by the error-log backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub error_type: ErrorType,
    pub error_message: String,
    pub error_stack: String,
    pub ai_solution: String,
    pub component: String,
    pub timestamp: DateTime<Utc>,
    pub user_agent: String,
    pub url: String,
}

impl LogEntry {
    pub fn new(
        error_type: ErrorType,
        error_message: &str,
        error_stack: &str,
        ai_solution: Option<&str>,
        component: &str,
        config: &LoggingConfig,
    ) -> Self {
        Self {
            error_type,
            error_message: error_message.to_string(),
            error_stack: error_stack.to_string(),
            ai_solution: ai_solution.unwrap_or(NO_SOLUTION).to_string(),
            component: component.to_string(),
            timestamp: Utc::now(),
            user_agent: config.user_agent.clone(),
            url: config.page_url.clone(),
        }
    }
}

#[derive(Debug)]
pub enum LogError {
    NetworkError(String),
    StatusError(u16),
    ParseError(String),
}

impl fmt::Display for LogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NetworkError(msg) => write!(f, "Network error: {}", msg),
            Self::StatusError(status) => write!(f, "Unexpected status code: {}", status),
            Self::ParseError(msg) => write!(f, "Parse error: {}", msg),
        }
    }
}

impl std::error::Error for LogError {}

impl From<reqwest::Error> for LogError {
    fn from(error: reqwest::Error) -> Self {
        LogError::NetworkError(error.to_string())
    }
}

/// Destination for error/solution pairs. Callers treat it as best-effort.
#[async_trait]
pub trait ErrorLogger: Send + Sync {
    async fn log_error(&self, entry: &LogEntry) -> Result<Value, LogError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_entry_wire_shape() {
        let config = LoggingConfig {
            enabled: true,
            user_agent: "fixit/test".into(),
            page_url: "http://localhost:4200/users".into(),
        };
        let entry = LogEntry::new(
            ErrorType::Frontend,
            "TypeError: x",
            "at UserComponent.ngOnInit",
            None,
            "UserComponent",
            &config,
        );

        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["errorType"], "frontend");
        assert_eq!(value["errorMessage"], "TypeError: x");
        assert_eq!(value["errorStack"], "at UserComponent.ngOnInit");
        assert_eq!(value["aiSolution"], NO_SOLUTION);
        assert_eq!(value["component"], "UserComponent");
        assert_eq!(value["userAgent"], "fixit/test");
        assert_eq!(value["url"], "http://localhost:4200/users");
        assert!(value["timestamp"].is_string());
    }
}
