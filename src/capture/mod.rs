mod channel;
pub mod classifier;
pub mod context;
mod layer;

pub use channel::{ErrorChannel, ErrorObserver, ReportSink, Subscription, TracingSink};
pub use classifier::{is_framework_error, matched_family, ErrorFamily};
pub use context::{extract_component_name, extract_context, CodeContext};
pub use layer::CaptureLayer;

use chrono::{DateTime, Utc};
use serde_json::Value;

/// One argument handed to [`ErrorChannel::report`].
#[derive(Debug, Clone, PartialEq)]
pub enum ReportArg {
    Text(String),
    Error {
        name: String,
        message: String,
        stack: Option<String>,
    },
    Json(Value),
}

impl ReportArg {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    pub fn error(name: impl Into<String>, message: impl Into<String>, stack: Option<String>) -> Self {
        Self::Error {
            name: name.into(),
            message: message.into(),
            stack,
        }
    }

    /// Text form used when joining arguments into a single message.
    pub fn describe(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Error { name, message, .. } => {
                if !message.is_empty() {
                    message.clone()
                } else {
                    serde_json::json!({ "name": name }).to_string()
                }
            }
            Self::Json(value) => match value.get("message").and_then(Value::as_str) {
                Some(message) if !message.is_empty() => message.to_string(),
                _ => match value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                },
            },
        }
    }

    /// Stack trace carried by this argument, if it behaves like an error object.
    pub fn stack(&self) -> Option<&str> {
        match self {
            Self::Error { stack, .. } => stack.as_deref().filter(|s| !s.is_empty()),
            Self::Json(value) => value
                .get("stack")
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty()),
            Self::Text(_) => None,
        }
    }
}

impl From<&str> for ReportArg {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for ReportArg {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<Value> for ReportArg {
    fn from(value: Value) -> Self {
        Self::Json(value)
    }
}

#[derive(Debug, Clone)]
pub struct CapturedError {
    pub args: Vec<ReportArg>,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl CapturedError {
    pub fn new(args: Vec<ReportArg>) -> Self {
        let message = args
            .iter()
            .map(ReportArg::describe)
            .collect::<Vec<_>>()
            .join(" ");

        Self {
            args,
            message,
            timestamp: Utc::now(),
        }
    }
}
