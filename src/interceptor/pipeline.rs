use crate::ai::{FixClient, FixReply};
use crate::capture::{matched_family, CapturedError, CodeContext, ErrorObserver};
use crate::config::{Config, LoggingConfig};
use crate::history::FixHistory;
use crate::notify::{truncate, FixStatus, NotificationCenter, NotificationKind, NotificationPayload};
use crate::telemetry::{ErrorLogger, ErrorType, LogEntry};
use futures::FutureExt;
use serde_json::Value;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

pub const FAILED_MESSAGE: &str = "Failed to get AI solution. Please try again.";
pub const AI_UNAVAILABLE: &str = "AI unavailable";

/// A failed HTTP exchange observed by the application.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpFailure {
    pub method: String,
    pub url: String,
    pub status: u16,
    pub message: String,
    pub body: Value,
}

impl HttpFailure {
    pub async fn from_response(method: &str, response: reqwest::Response) -> Self {
        let url = response.url().to_string();
        let status = response.status();
        let message = status
            .canonical_reason()
            .map(str::to_string)
            .unwrap_or_else(|| format!("Http failure response for {}", url));
        let body = match response.text().await {
            Ok(text) => serde_json::from_str(&text).unwrap_or(Value::String(text)),
            Err(_) => Value::Null,
        };

        Self {
            method: method.to_uppercase(),
            url,
            status: status.as_u16(),
            message,
            body,
        }
    }

    /// Failures of the error-log endpoints themselves are never escalated.
    pub fn is_error_log_call(&self) -> bool {
        self.url.contains("/api/errors")
    }

    pub fn summary(&self) -> String {
        format!(
            "{} {} - Status: {} - {}",
            self.method, self.url, self.status, self.message
        )
    }

    pub fn context(&self) -> String {
        format!("Response: {}", self.body)
    }
}

struct FixJob {
    session: u64,
    error_type: ErrorType,
    message: String,
    context: String,
    component: String,
    detail: Option<String>,
}

/// Classify → extract → request → normalize → present → log.
pub struct Pipeline {
    fixer: Arc<dyn FixClient>,
    logger: Option<Arc<dyn ErrorLogger>>,
    notifications: Arc<NotificationCenter>,
    history: Mutex<FixHistory>,
    next_session: AtomicU64,
    latest_frontend: AtomicU64,
    latest_backend: AtomicU64,
    min_processing: Duration,
    max_error_chars: usize,
    logging: LoggingConfig,
    runtime: Option<Handle>,
    pending: Mutex<Vec<JoinHandle<()>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

impl Pipeline {
    pub fn new(
        fixer: Arc<dyn FixClient>,
        notifications: Arc<NotificationCenter>,
        config: &Config,
    ) -> Self {
        Self {
            fixer,
            logger: None,
            notifications,
            history: Mutex::new(FixHistory::new(config.history.capacity)),
            next_session: AtomicU64::new(0),
            latest_frontend: AtomicU64::new(0),
            latest_backend: AtomicU64::new(0),
            min_processing: config.notifications.min_processing(),
            max_error_chars: config.notifications.max_error_chars,
            logging: config.logging.clone(),
            runtime: Handle::try_current().ok(),
            pending: Mutex::new(Vec::new()),
        }
    }

    pub fn with_logger(mut self, logger: Arc<dyn ErrorLogger>) -> Self {
        if self.logging.enabled {
            self.logger = Some(logger);
        }
        self
    }

    pub fn notifications(&self) -> &Arc<NotificationCenter> {
        &self.notifications
    }

    pub fn history(&self) -> MutexGuard<'_, FixHistory> {
        lock(&self.history)
    }

    fn latest(&self, error_type: ErrorType) -> &AtomicU64 {
        match error_type {
            ErrorType::Frontend => &self.latest_frontend,
            ErrorType::Backend => &self.latest_backend,
        }
    }

    fn open_session(&self, error_type: ErrorType) -> u64 {
        let session = self.next_session.fetch_add(1, Ordering::SeqCst) + 1;
        self.latest(error_type).store(session, Ordering::SeqCst);
        session
    }

    fn is_current(&self, error_type: ErrorType, session: u64) -> bool {
        self.latest(error_type).load(Ordering::SeqCst) == session
    }

    /// Escalates a captured error when it matches a known family. Returns the
    /// session token of the spawned request.
    pub fn handle(self: &Arc<Self>, captured: &CapturedError) -> Option<u64> {
        let family = matched_family(&captured.message)?;
        info!(
            "AI detected {} error: {}",
            family,
            truncate(&captured.message, self.max_error_chars)
        );

        let context = CodeContext::from_args(&captured.args);
        let session = self.open_session(ErrorType::Frontend);
        self.history()
            .record(session, &captured.message, captured.timestamp);

        self.spawn(FixJob {
            session,
            error_type: ErrorType::Frontend,
            message: captured.message.clone(),
            context: context.text,
            component: context.component,
            detail: None,
        })
        .then_some(session)
    }

    /// Escalates a failed backend call.
    pub fn report_backend_failure(self: &Arc<Self>, failure: HttpFailure) -> Option<u64> {
        if failure.is_error_log_call() {
            return None;
        }
        warn!("Backend error: {}", failure.summary());

        let message = failure.summary();
        let session = self.open_session(ErrorType::Backend);
        self.history().record(session, &message, chrono::Utc::now());

        self.spawn(FixJob {
            session,
            error_type: ErrorType::Backend,
            context: failure.context(),
            component: failure.url.clone(),
            detail: Some(format!("Status: {}", failure.status)),
            message,
        })
        .then_some(session)
    }

    fn spawn(self: &Arc<Self>, job: FixJob) -> bool {
        let runtime = match self.runtime.clone().or_else(|| Handle::try_current().ok()) {
            Some(runtime) => runtime,
            None => {
                warn!("No async runtime available, skipping fix request");
                return false;
            }
        };

        let pipeline = Arc::clone(self);
        let task = runtime.spawn(async move {
            let session = job.session;
            if let Err(panic) = AssertUnwindSafe(pipeline.run(job)).catch_unwind().await {
                let detail = if let Some(s) = panic.downcast_ref::<&str>() {
                    s.to_string()
                } else if let Some(s) = panic.downcast_ref::<String>() {
                    s.clone()
                } else {
                    "unknown panic payload".to_string()
                };
                warn!("Error handler failed for session {}: {}", session, detail);
            }
        });
        let mut pending = lock(&self.pending);
        pending.retain(|t| !t.is_finished());
        pending.push(task);
        true
    }

    async fn run(&self, job: FixJob) {
        let started = Instant::now();
        let reply = self.fixer.request_fix(&job.message, &job.context).await;

        let elapsed = started.elapsed();
        if elapsed < self.min_processing {
            tokio::time::sleep(self.min_processing - elapsed).await;
        }

        let fix = reply.normalized();
        let answered = reply.success();

        if self.is_current(job.error_type, job.session) {
            self.present(&job, &reply);
            if answered {
                self.history().mark_fixed(job.session);
            }
        } else {
            debug!("Dropping stale fix for session {}", job.session);
        }

        let logged_solution = match (answered, job.error_type) {
            (true, _) => Some(fix.solution.as_str()),
            (false, ErrorType::Frontend) => None,
            (false, ErrorType::Backend) => Some(AI_UNAVAILABLE),
        };
        self.log(&job, logged_solution).await;
    }

    fn present(&self, job: &FixJob, reply: &FixReply) {
        let fix = reply.normalized();
        let (kind, payload) = match (job.error_type, reply) {
            (ErrorType::Frontend, FixReply::Answered(_)) => (
                NotificationKind::FixFound,
                NotificationPayload {
                    error: job.message.clone(),
                    solution: fix.solution,
                    code: fix.code,
                    status: FixStatus::Solved,
                    detail: None,
                },
            ),
            (ErrorType::Frontend, FixReply::Fallback(_)) => (
                NotificationKind::FixFound,
                NotificationPayload {
                    error: job.message.clone(),
                    solution: fix.solution,
                    code: String::new(),
                    status: FixStatus::Fallback,
                    detail: None,
                },
            ),
            (ErrorType::Backend, FixReply::Answered(_)) => (
                NotificationKind::BackendError,
                NotificationPayload {
                    error: job.message.clone(),
                    solution: fix.solution,
                    code: fix.code,
                    status: FixStatus::Solved,
                    detail: job.detail.clone(),
                },
            ),
            (ErrorType::Backend, FixReply::Fallback(tip)) => (
                NotificationKind::FixFailed,
                NotificationPayload {
                    error: job.message.clone(),
                    solution: FAILED_MESSAGE.to_string(),
                    code: String::new(),
                    status: FixStatus::Failed,
                    detail: Some(format!("Hint: {}", tip)),
                },
            ),
        };
        self.notifications.present(kind, payload);
    }

    async fn log(&self, job: &FixJob, solution: Option<&str>) {
        let Some(logger) = &self.logger else {
            return;
        };

        let entry = LogEntry::new(
            job.error_type,
            &job.message,
            &job.context,
            solution,
            &job.component,
            &self.logging,
        );
        match logger.log_error(&entry).await {
            Ok(result) => info!("Error logged to database: {}", result),
            Err(e) => warn!("Failed to log error to database: {}", e),
        }
    }

    /// Waits for every in-flight request to finish.
    pub async fn settle(&self) {
        loop {
            let tasks: Vec<JoinHandle<()>> = lock(&self.pending).drain(..).collect();
            if tasks.is_empty() {
                return;
            }
            for task in tasks {
                if let Err(e) = task.await {
                    warn!("Error handler failed: {}", e);
                }
            }
        }
    }
}

/// Channel observer that feeds reports into a [`Pipeline`].
pub(crate) struct PipelineObserver(pub(crate) Arc<Pipeline>);

impl ErrorObserver for PipelineObserver {
    fn on_report(&self, captured: &CapturedError) {
        self.0.handle(captured);
    }
}
