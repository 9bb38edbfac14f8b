pub mod ai;
pub mod app;
pub mod capture;
pub mod config;
pub mod history;
pub mod interceptor;
pub mod notify;
pub mod telemetry;

#[cfg(test)]
mod tests;

// Re-export commonly used types
pub use ai::{FixClient, FixReply, FixResponse, HttpFixClient};
pub use app::Fixit;
pub use capture::{ErrorChannel, ReportArg, Subscription};
pub use config::Config;
pub use interceptor::{HttpFailure, Interceptor, Pipeline};
pub use notify::{Notification, NotificationCenter, NotificationKind};
