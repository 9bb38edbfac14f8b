use serde_json::Error as JsonError;
use std::fmt;

/// Why a remote fix request did not produce a usable response. Never leaves
/// the requester: every variant is turned into a local fallback suggestion.
#[derive(Debug)]
pub enum FixError {
    NetworkError(String),
    StatusError(u16, String),
    ParseError(String),
    ValidationError(String),
}

impl fmt::Display for FixError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NetworkError(msg) => write!(f, "Network error: {}", msg),
            Self::StatusError(status, body) => {
                write!(f, "Unexpected status code: {} - Response: {}", status, body)
            }
            Self::ParseError(msg) => write!(f, "Parse error: {}", msg),
            Self::ValidationError(msg) => write!(f, "Validation error: {}", msg),
        }
    }
}

impl std::error::Error for FixError {}

impl From<JsonError> for FixError {
    fn from(error: JsonError) -> Self {
        FixError::ParseError(format!("JSON deserialization error: {}", error))
    }
}

impl From<reqwest::Error> for FixError {
    fn from(error: reqwest::Error) -> Self {
        FixError::NetworkError(error.to_string())
    }
}
