use anyhow::{anyhow, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use validator::Validate;

pub const API_URL_ENV: &str = "FIXIT_API_URL";
pub const ERRORS_URL_ENV: &str = "FIXIT_ERRORS_URL";
pub const API_KEY_ENV: &str = "FIXIT_API_KEY";

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Config {
    pub api: ApiConfig,
    pub notifications: NotificationConfig,
    pub logging: LoggingConfig,
    pub history: HistoryConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone, Validate)]
pub struct ApiConfig {
    /// Base URL of the fix-it backend (`/fix-error` and `/health` live under it).
    #[validate(url(message = "api_url must be a valid URL"))]
    pub api_url: String,
    /// Base URL of the error-log backend (`/log`, `/logs`, `/stats`).
    #[validate(url(message = "errors_url must be a valid URL"))]
    pub errors_url: String,
    /// Bearer token, only needed when talking to the AI provider directly.
    pub api_key: Option<String>,
    #[validate(range(min = 1, max = 600, message = "request timeout must be 1..=600 seconds"))]
    pub request_timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:3000/api".to_string(),
            errors_url: "http://localhost:3000/api/errors".to_string(),
            api_key: None,
            request_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Validate)]
pub struct NotificationConfig {
    #[validate(range(min = 1, max = 3600, message = "display timeout must be 1..=3600 seconds"))]
    pub display_timeout_secs: u64,
    #[validate(range(max = 5000, message = "minimum processing delay must be at most 5000ms"))]
    pub min_processing_ms: u64,
    #[validate(range(min = 10, message = "solution preview must keep at least 10 characters"))]
    pub max_solution_chars: usize,
    #[validate(range(min = 10, message = "error preview must keep at least 10 characters"))]
    pub max_error_chars: usize,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            display_timeout_secs: 15,
            min_processing_ms: 300,
            max_solution_chars: 150,
            max_error_chars: 100,
        }
    }
}

impl NotificationConfig {
    pub fn display_timeout(&self) -> Duration {
        Duration::from_secs(self.display_timeout_secs)
    }

    pub fn min_processing(&self) -> Duration {
        Duration::from_millis(self.min_processing_ms)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LoggingConfig {
    /// Forward error/solution pairs to the error-log backend.
    pub enabled: bool,
    pub user_agent: String,
    /// Reported as the `url` of every log entry.
    pub page_url: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            user_agent: format!("fixit/{}", env!("CARGO_PKG_VERSION")),
            page_url: "cli://fixit".to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Validate)]
pub struct HistoryConfig {
    #[validate(range(min = 1, max = 10000, message = "history capacity must be 1..=10000"))]
    pub capacity: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self { capacity: 50 }
    }
}

impl Config {
    pub fn create_default(path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(&Config::default())?;
        let parent = path
            .parent()
            .ok_or_else(|| anyhow!("Config path {:?} has no parent directory", path))?;
        fs::create_dir_all(parent)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads the config file when it exists, then applies environment overrides.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            Self::load(path)?
        } else {
            Config::default()
        };
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    pub fn apply_env(&mut self) {
        dotenv::dotenv().ok();
        if let Ok(url) = std::env::var(API_URL_ENV) {
            self.api.api_url = url;
        }
        if let Ok(url) = std::env::var(ERRORS_URL_ENV) {
            self.api.errors_url = url;
        }
        if let Ok(key) = std::env::var(API_KEY_ENV) {
            if !key.trim().is_empty() {
                self.api.api_key = Some(key);
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.api
            .validate()
            .map_err(|e| anyhow!("Invalid [api] config: {}", e))?;
        self.notifications
            .validate()
            .map_err(|e| anyhow!("Invalid [notifications] config: {}", e))?;
        self.history
            .validate()
            .map_err(|e| anyhow!("Invalid [history] config: {}", e))?;
        Ok(())
    }
}

pub fn get_config_path() -> Result<PathBuf> {
    let proj_dirs = ProjectDirs::from("com", "fixit", "fixit")
        .ok_or_else(|| anyhow!("Could not determine config directory"))?;

    Ok(proj_dirs.config_dir().join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_round_trips_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        Config::create_default(&path).unwrap();
        let config = Config::load(&path).unwrap();

        assert_eq!(config.api.api_url, "http://localhost:3000/api");
        assert_eq!(config.notifications.display_timeout_secs, 15);
        assert_eq!(config.notifications.min_processing_ms, 300);
        assert!(config.logging.enabled);
    }

    #[test]
    fn test_invalid_url_rejected() {
        let mut config = Config::default();
        config.api.api_url = "not a url".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut config = Config::default();
        config.notifications.display_timeout_secs = 0;
        fs::write(&path, toml::to_string_pretty(&config).unwrap()).unwrap();

        assert!(Config::load(&path).is_err());
    }
}
