use super::{ErrorChannel, ReportArg};
use std::fmt;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer};

/// Bridges `tracing` into an [`ErrorChannel`]: every ERROR event outside the
/// `fixit` targets is dispatched to the channel's observers.
#[derive(Clone)]
pub struct CaptureLayer {
    channel: ErrorChannel,
}

impl CaptureLayer {
    pub fn new(channel: ErrorChannel) -> Self {
        Self { channel }
    }
}

#[derive(Default)]
struct EventFields {
    message: Option<String>,
    error: Option<String>,
    stack: Option<String>,
}

impl Visit for EventFields {
    fn record_str(&mut self, field: &Field, value: &str) {
        match field.name() {
            "message" => self.message = Some(value.to_string()),
            "error" => self.error = Some(value.to_string()),
            "stack" | "backtrace" => self.stack = Some(value.to_string()),
            _ => {}
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        match field.name() {
            "message" => self.message = Some(format!("{:?}", value)),
            "error" => self.error = Some(format!("{:?}", value)),
            "stack" | "backtrace" => self.stack = Some(format!("{:?}", value)),
            _ => {}
        }
    }
}

impl EventFields {
    fn into_args(self, target: &str) -> Vec<ReportArg> {
        match (self.message, self.error, self.stack) {
            (Some(message), Some(error), stack) => vec![
                ReportArg::Text(message),
                ReportArg::error(target, error, stack),
            ],
            (None, Some(error), stack) => vec![ReportArg::error(target, error, stack)],
            // A bare stack belongs to the event message itself.
            (Some(message), None, Some(stack)) => {
                vec![ReportArg::error(target, message, Some(stack))]
            }
            (Some(message), None, None) => vec![ReportArg::Text(message)],
            (None, None, _) => Vec::new(),
        }
    }
}

impl<S: Subscriber> Layer<S> for CaptureLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        if *metadata.level() != Level::ERROR || metadata.target().starts_with("fixit") {
            return;
        }

        let mut fields = EventFields::default();
        event.record(&mut fields);
        let args = fields.into_args(metadata.target());
        if !args.is_empty() {
            self.channel.dispatch(args);
        }
    }
}
