use super::{CapturedError, ReportArg};
use std::cell::RefCell;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, Weak};
use tracing::warn;

/// Receives every report passed through an [`ErrorChannel`].
pub trait ErrorObserver: Send + Sync {
    fn on_report(&self, captured: &CapturedError);
}

impl<F> ErrorObserver for F
where
    F: Fn(&CapturedError) + Send + Sync,
{
    fn on_report(&self, captured: &CapturedError) {
        self(captured)
    }
}

/// Where a report ends up after all observers have seen it.
pub trait ReportSink: Send + Sync {
    fn forward(&self, captured: &CapturedError);
}

/// Emits the report as an ERROR event under the `fixit::report` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl ReportSink for TracingSink {
    fn forward(&self, captured: &CapturedError) {
        tracing::error!(target: "fixit::report", "{}", captured.message);
    }
}

thread_local! {
    /// Channels whose observers are running on this thread.
    static NOTIFYING: RefCell<Vec<usize>> = RefCell::new(Vec::new());
}

struct Registry {
    next_id: u64,
    observers: Vec<(u64, Arc<dyn ErrorObserver>)>,
}

struct ChannelInner {
    sink: Arc<dyn ReportSink>,
    registry: Mutex<Registry>,
}

impl ChannelInner {
    fn remove(&self, id: u64) {
        if let Ok(mut registry) = self.registry.lock() {
            registry.observers.retain(|(observer_id, _)| *observer_id != id);
        }
    }
}

/// Explicit error-reporting channel: observers subscribe, reporters call
/// [`ErrorChannel::report`], and the configured sink still receives everything.
#[derive(Clone)]
pub struct ErrorChannel {
    inner: Arc<ChannelInner>,
}

impl Default for ErrorChannel {
    fn default() -> Self {
        Self::new(Arc::new(TracingSink))
    }
}

impl ErrorChannel {
    pub fn new(sink: Arc<dyn ReportSink>) -> Self {
        Self {
            inner: Arc::new(ChannelInner {
                sink,
                registry: Mutex::new(Registry {
                    next_id: 0,
                    observers: Vec::new(),
                }),
            }),
        }
    }

    pub fn same_channel(&self, other: &ErrorChannel) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn subscribe(&self, observer: Arc<dyn ErrorObserver>) -> Subscription {
        let mut registry = match self.inner.registry.lock() {
            Ok(registry) => registry,
            Err(poisoned) => poisoned.into_inner(),
        };
        let id = registry.next_id;
        registry.next_id += 1;
        registry.observers.push((id, observer));

        Subscription {
            id,
            channel: Some(Arc::downgrade(&self.inner)),
        }
    }

    pub fn observer_count(&self) -> usize {
        self.inner
            .registry
            .lock()
            .map(|registry| registry.observers.len())
            .unwrap_or(0)
    }

    /// Notifies observers, then forwards to the sink.
    ///
    /// A report raised on this channel while its observers are already
    /// running on this thread goes straight to the sink.
    pub fn report(&self, args: Vec<ReportArg>) {
        let captured = CapturedError::new(args);
        self.notify_once(&captured);
        self.inner.sink.forward(&captured);
    }

    /// Notifies observers without forwarding to the sink, for sources whose
    /// event has already reached its destination.
    pub fn dispatch(&self, args: Vec<ReportArg>) {
        self.notify_once(&CapturedError::new(args));
    }

    fn key(&self) -> usize {
        Arc::as_ptr(&self.inner) as usize
    }

    fn notify_once(&self, captured: &CapturedError) {
        let key = self.key();
        let entered = NOTIFYING.with(|active| {
            let mut active = active.borrow_mut();
            if active.contains(&key) {
                false
            } else {
                active.push(key);
                true
            }
        });
        if !entered {
            return;
        }

        self.notify(captured);
        NOTIFYING.with(|active| active.borrow_mut().retain(|k| *k != key));
    }

    fn notify(&self, captured: &CapturedError) {
        let observers: Vec<Arc<dyn ErrorObserver>> = match self.inner.registry.lock() {
            Ok(registry) => registry.observers.iter().map(|(_, o)| Arc::clone(o)).collect(),
            Err(_) => return,
        };

        for observer in observers {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| observer.on_report(captured)));
            if outcome.is_err() {
                warn!("Error observer panicked while handling: {}", captured.message);
            }
        }
    }
}

/// Disposer returned by [`ErrorChannel::subscribe`]; unsubscribes on drop.
pub struct Subscription {
    id: u64,
    channel: Option<Weak<ChannelInner>>,
}

impl Subscription {
    pub fn unsubscribe(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(inner) = self.channel.take().and_then(|weak| weak.upgrade()) {
            inner.remove(self.id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingSink {
        forwarded: Mutex<Vec<String>>,
    }

    impl ReportSink for CountingSink {
        fn forward(&self, captured: &CapturedError) {
            self.forwarded.lock().unwrap().push(captured.message.clone());
        }
    }

    #[test]
    fn test_observers_then_sink() {
        let sink = Arc::new(CountingSink::default());
        let channel = ErrorChannel::new(sink.clone());
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = seen.clone();
        let _sub = channel.subscribe(Arc::new(move |_: &CapturedError| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        channel.report(vec!["TypeError: boom".into()]);

        assert_eq!(seen.load(Ordering::SeqCst), 1);
        assert_eq!(*sink.forwarded.lock().unwrap(), vec!["TypeError: boom".to_string()]);
    }

    #[test]
    fn test_drop_unsubscribes() {
        let channel = ErrorChannel::new(Arc::new(CountingSink::default()));
        let sub = channel.subscribe(Arc::new(|_: &CapturedError| {}));
        let other = channel.subscribe(Arc::new(|_: &CapturedError| {}));
        assert_eq!(channel.observer_count(), 2);

        drop(sub);
        assert_eq!(channel.observer_count(), 1);
        other.unsubscribe();
        assert_eq!(channel.observer_count(), 0);
    }

    #[test]
    fn test_panicking_observer_contained() {
        let sink = Arc::new(CountingSink::default());
        let channel = ErrorChannel::new(sink.clone());
        let _sub = channel.subscribe(Arc::new(|_: &CapturedError| panic!("handler bug")));

        channel.report(vec!["ReferenceError: x".into()]);
        channel.report(vec!["ReferenceError: y".into()]);

        assert_eq!(sink.forwarded.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_nested_report_skips_observers() {
        let sink = Arc::new(CountingSink::default());
        let channel = ErrorChannel::new(sink.clone());
        let calls = Arc::new(AtomicUsize::new(0));
        let inner_channel = channel.clone();
        let counter = calls.clone();
        let _sub = channel.subscribe(Arc::new(move |_: &CapturedError| {
            counter.fetch_add(1, Ordering::SeqCst);
            inner_channel.report(vec!["nested".into()]);
        }));

        channel.report(vec!["outer".into()]);

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(sink.forwarded.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_report_on_other_channel_reaches_its_observers() {
        let first = ErrorChannel::new(Arc::new(CountingSink::default()));
        let second = ErrorChannel::new(Arc::new(CountingSink::default()));
        let seen_on_second = Arc::new(AtomicUsize::new(0));

        let relay = second.clone();
        let _relay_sub = first.subscribe(Arc::new(move |captured: &CapturedError| {
            relay.report(vec![captured.message.clone().into()]);
        }));
        let counter = seen_on_second.clone();
        let back = first.clone();
        let _second_sub = second.subscribe(Arc::new(move |captured: &CapturedError| {
            counter.fetch_add(1, Ordering::SeqCst);
            back.report(vec![captured.message.clone().into()]);
        }));

        first.report(vec!["TypeError: relayed".into()]);

        assert_eq!(seen_on_second.load(Ordering::SeqCst), 1);
    }
}
