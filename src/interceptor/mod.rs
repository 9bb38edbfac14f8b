mod pipeline;

pub use pipeline::{HttpFailure, Pipeline, AI_UNAVAILABLE, FAILED_MESSAGE};

use crate::capture::{ErrorChannel, Subscription};
use pipeline::PipelineObserver;
use std::sync::{Arc, Mutex};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterceptorState {
    Uninitialized,
    Active,
}

struct Attachment {
    channel: ErrorChannel,
    subscription: Subscription,
}

/// Routes every report on one [`ErrorChannel`] through a [`Pipeline`].
pub struct Interceptor {
    pipeline: Arc<Pipeline>,
    attachment: Mutex<Option<Attachment>>,
}

impl Interceptor {
    pub fn new(pipeline: Arc<Pipeline>) -> Self {
        Self {
            pipeline,
            attachment: Mutex::new(None),
        }
    }

    /// Subscribes to `channel`. Only the first call while active has any
    /// effect; returns whether this call activated the interceptor.
    pub fn activate(&self, channel: &ErrorChannel) -> bool {
        let mut attachment = match self.attachment.lock() {
            Ok(attachment) => attachment,
            Err(poisoned) => poisoned.into_inner(),
        };
        if attachment.is_some() {
            return false;
        }

        let observer = Arc::new(PipelineObserver(Arc::clone(&self.pipeline)));
        *attachment = Some(Attachment {
            channel: channel.clone(),
            subscription: channel.subscribe(observer),
        });
        info!("AI error interceptor started");
        true
    }

    /// Unsubscribes from the attached channel. Returns whether it was active.
    pub fn deactivate(&self) -> bool {
        let detached = match self.attachment.lock() {
            Ok(mut attachment) => attachment.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        match detached {
            Some(Attachment { subscription, .. }) => {
                subscription.unsubscribe();
                info!("AI error interceptor stopped");
                true
            }
            None => false,
        }
    }

    pub fn state(&self) -> InterceptorState {
        let active = self
            .attachment
            .lock()
            .map(|attachment| attachment.is_some())
            .unwrap_or(false);
        if active {
            InterceptorState::Active
        } else {
            InterceptorState::Uninitialized
        }
    }

    pub fn is_active(&self) -> bool {
        self.state() == InterceptorState::Active
    }

    /// Channel captured by the first successful activation.
    pub fn channel(&self) -> Option<ErrorChannel> {
        self.attachment
            .lock()
            .ok()
            .and_then(|attachment| attachment.as_ref().map(|a| a.channel.clone()))
    }

    pub fn pipeline(&self) -> &Arc<Pipeline> {
        &self.pipeline
    }

    pub fn report_backend_failure(&self, failure: HttpFailure) -> Option<u64> {
        self.pipeline.report_backend_failure(failure)
    }
}
