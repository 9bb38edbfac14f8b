use crate::ai::{compute_fallback, FixClient, FixReply, FixResponse};
use crate::config::Config;
use crate::interceptor::{Interceptor, Pipeline};
use crate::notify::NotificationCenter;
use crate::telemetry::{ErrorLogger, LogEntry, LogError};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;


/// Fix client answering from a table, with an optional delay per error.
#[derive(Default)]
pub(crate) struct ScriptedFixClient {
    answers: HashMap<String, (Value, Duration)>,
    pub calls: Mutex<Vec<(String, String)>>,
}

impl ScriptedFixClient {
    pub fn answer(mut self, error: &str, body: Value, delay: Duration) -> Self {
        self.answers.insert(error.to_string(), (body, delay));
        self
    }
}

#[async_trait]
impl FixClient for ScriptedFixClient {
    async fn request_fix(&self, error: &str, context: &str) -> FixReply {
        self.calls
            .lock()
            .unwrap()
            .push((error.to_string(), context.to_string()));

        match self.answers.get(error) {
            Some((body, delay)) => {
                tokio::time::sleep(*delay).await;
                FixReply::Answered(FixResponse::decode(body.clone()))
            }
            None => FixReply::Fallback(compute_fallback(error)),
        }
    }

    async fn health(&self) -> bool {
        true
    }
}

#[derive(Default)]
pub(crate) struct MemoryLogger {
    pub entries: Mutex<Vec<LogEntry>>,
    pub fail: bool,
}

#[async_trait]
impl ErrorLogger for MemoryLogger {
    async fn log_error(&self, entry: &LogEntry) -> Result<Value, LogError> {
        self.entries.lock().unwrap().push(entry.clone());
        if self.fail {
            return Err(LogError::StatusError(503));
        }
        Ok(json!({ "stored": true }))
    }
}

pub(crate) struct TestUtils;

impl TestUtils {
    pub fn config() -> Config {
        let mut config = Config::default();
        config.notifications.min_processing_ms = 0;
        config
    }

    pub fn interceptor(
        fixer: Arc<dyn FixClient>,
        logger: Arc<dyn ErrorLogger>,
        config: &Config,
    ) -> (Interceptor, Arc<NotificationCenter>) {
        let notifications = Arc::new(NotificationCenter::new(&config.notifications));
        let pipeline = Pipeline::new(fixer, Arc::clone(&notifications), config).with_logger(logger);
        (Interceptor::new(Arc::new(pipeline)), notifications)
    }
}
