//! Data-only notification queue.
//!
//! Notifications are plain values with an expiry; whatever renders them polls
//! [`NotificationCenter::active`] or waits on [`NotificationCenter::subscribe`]
//! for changes. At most one live notification exists per
//! [`NotificationKind`]: presenting a new one evicts its predecessor.

mod render;

pub use render::{render, NotificationTheme};

use crate::config::NotificationConfig;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationKind {
    FixFound,
    BackendError,
    FixFailed,
}

impl NotificationKind {
    /// Stable element id, one per kind.
    pub fn id(&self) -> &'static str {
        match self {
            Self::FixFound => "ai-fix-notification",
            Self::BackendError => "backend-error-notification",
            Self::FixFailed => "ai-fix-failed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixStatus {
    /// The remote endpoint produced the solution.
    Solved,
    /// Locally computed tip, endpoint unavailable.
    Fallback,
    Failed,
}

impl FixStatus {
    pub fn confidence(&self) -> u8 {
        match self {
            Self::Solved => 95,
            Self::Fallback => 40,
            Self::Failed => 0,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Solved)
    }
}

#[derive(Debug, Clone)]
pub struct NotificationPayload {
    pub error: String,
    pub solution: String,
    pub code: String,
    pub status: FixStatus,
    /// Extra line shown under the error, e.g. an HTTP status.
    pub detail: Option<String>,
}

/// Identifies one presented notification; stale handles are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotificationHandle {
    pub kind: NotificationKind,
    serial: u64,
}

#[derive(Debug, Clone)]
pub struct Notification {
    pub handle: NotificationHandle,
    pub kind: NotificationKind,
    pub title: String,
    pub error_preview: String,
    pub detail: Option<String>,
    pub solution_preview: String,
    pub full_text: String,
    pub code: String,
    pub status: FixStatus,
    pub confidence: u8,
    pub created_at: Instant,
    pub expires_at: Instant,
}

impl Notification {
    pub fn id(&self) -> &'static str {
        self.kind.id()
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }

    /// What the copy action puts on the clipboard.
    pub fn clipboard_text(&self) -> &str {
        if self.code.is_empty() {
            &self.full_text
        } else {
            &self.code
        }
    }
}

fn title_for(kind: NotificationKind, status: FixStatus) -> &'static str {
    match (kind, status) {
        (NotificationKind::BackendError, _) => "Backend Error",
        (NotificationKind::FixFailed, _) | (_, FixStatus::Failed) => "AI Fix Unavailable",
        (NotificationKind::FixFound, FixStatus::Fallback) => "Suggested Fix",
        (NotificationKind::FixFound, FixStatus::Solved) => "AI Fix Found",
    }
}

pub fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        let cut: String = text.chars().take(max_chars).collect();
        format!("{}...", cut)
    } else {
        text.to_string()
    }
}

struct Slots {
    next_serial: u64,
    live: Vec<Notification>,
}

pub struct NotificationCenter {
    slots: Mutex<Slots>,
    display_timeout: Duration,
    max_solution_chars: usize,
    max_error_chars: usize,
    revision: watch::Sender<u64>,
}

impl NotificationCenter {
    pub fn new(config: &NotificationConfig) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            slots: Mutex::new(Slots {
                next_serial: 0,
                live: Vec::new(),
            }),
            display_timeout: config.display_timeout(),
            max_solution_chars: config.max_solution_chars,
            max_error_chars: config.max_error_chars,
            revision,
        }
    }

    pub fn display_timeout(&self) -> Duration {
        self.display_timeout
    }

    /// Receives a new revision number after every change to the queue.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    fn bump(&self) {
        self.revision.send_modify(|rev| *rev += 1);
    }

    fn with_slots<R>(&self, f: impl FnOnce(&mut Slots) -> R) -> R {
        let mut slots = match self.slots.lock() {
            Ok(slots) => slots,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut slots)
    }

    pub fn present(&self, kind: NotificationKind, payload: NotificationPayload) -> NotificationHandle {
        let now = Instant::now();
        let handle = self.with_slots(|slots| {
            slots.live.retain(|n| n.kind != kind);

            let handle = NotificationHandle {
                kind,
                serial: slots.next_serial,
            };
            slots.next_serial += 1;

            slots.live.push(Notification {
                handle,
                kind,
                title: title_for(kind, payload.status).to_string(),
                error_preview: truncate(&payload.error, self.max_error_chars),
                detail: payload.detail,
                solution_preview: truncate(&payload.solution, self.max_solution_chars),
                full_text: payload.solution,
                code: payload.code,
                status: payload.status,
                confidence: payload.status.confidence(),
                created_at: now,
                expires_at: now + self.display_timeout,
            });
            handle
        });
        self.bump();
        handle
    }

    pub fn dismiss(&self, handle: NotificationHandle) -> bool {
        let removed = self.with_slots(|slots| {
            let before = slots.live.len();
            slots.live.retain(|n| n.handle != handle);
            before != slots.live.len()
        });
        if removed {
            self.bump();
        }
        removed
    }

    pub fn copy_text(&self, handle: NotificationHandle) -> Option<String> {
        self.with_slots(|slots| {
            slots
                .live
                .iter()
                .find(|n| n.handle == handle)
                .map(|n| n.clipboard_text().to_string())
        })
    }

    /// Drops every notification whose expiry is at or before `now`.
    pub fn purge_expired(&self, now: Instant) -> usize {
        let purged = self.with_slots(|slots| {
            let before = slots.live.len();
            slots.live.retain(|n| !n.is_expired(now));
            before - slots.live.len()
        });
        if purged > 0 {
            self.bump();
        }
        purged
    }

    pub fn active(&self) -> Vec<Notification> {
        self.purge_expired(Instant::now());
        self.with_slots(|slots| slots.live.clone())
    }

    pub fn get(&self, kind: NotificationKind) -> Option<Notification> {
        self.active().into_iter().find(|n| n.kind == kind)
    }

    pub fn next_expiry(&self) -> Option<Instant> {
        self.with_slots(|slots| slots.live.iter().map(|n| n.expires_at).min())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn center(timeout_secs: u64) -> NotificationCenter {
        NotificationCenter::new(&NotificationConfig {
            display_timeout_secs: timeout_secs,
            ..NotificationConfig::default()
        })
    }

    fn payload(solution: &str, status: FixStatus) -> NotificationPayload {
        NotificationPayload {
            error: "TypeError: boom".to_string(),
            solution: solution.to_string(),
            code: String::new(),
            status,
            detail: None,
        }
    }

    #[test]
    fn test_same_kind_replaces_previous() {
        let center = center(15);
        let first = center.present(NotificationKind::FixFound, payload("first", FixStatus::Solved));
        let second = center.present(NotificationKind::FixFound, payload("second", FixStatus::Solved));
        center.present(NotificationKind::BackendError, payload("other", FixStatus::Solved));

        let active = center.active();
        assert_eq!(active.len(), 2);
        assert_eq!(center.get(NotificationKind::FixFound).unwrap().full_text, "second");

        assert!(!center.dismiss(first));
        assert!(center.dismiss(second));
        assert!(center.get(NotificationKind::FixFound).is_none());
    }

    #[test]
    fn test_previews_truncated_but_copy_is_full() {
        let center = center(15);
        let long = "x".repeat(400);
        let handle = center.present(NotificationKind::FixFound, payload(&long, FixStatus::Solved));

        let shown = center.get(NotificationKind::FixFound).unwrap();
        assert_eq!(shown.solution_preview.chars().count(), 153);
        assert!(shown.solution_preview.ends_with("..."));
        assert_eq!(center.copy_text(handle).unwrap(), long);
    }

    #[test]
    fn test_copy_prefers_code() {
        let center = center(15);
        let mut with_code = payload("Use optional chaining", FixStatus::Solved);
        with_code.code = "user?.name".to_string();
        let handle = center.present(NotificationKind::FixFound, with_code);
        assert_eq!(center.copy_text(handle).as_deref(), Some("user?.name"));
    }

    #[test]
    fn test_expiry() {
        let center = center(15);
        center.present(NotificationKind::FixFound, payload("a", FixStatus::Fallback));
        let expiry = center.next_expiry().unwrap();

        assert_eq!(center.purge_expired(expiry - Duration::from_millis(1)), 0);
        assert_eq!(center.purge_expired(expiry), 1);
        assert!(center.next_expiry().is_none());
    }

    #[test]
    fn test_titles_and_confidence() {
        let center = center(15);
        center.present(NotificationKind::FixFound, payload("tip", FixStatus::Fallback));
        let shown = center.get(NotificationKind::FixFound).unwrap();
        assert_eq!(shown.title, "Suggested Fix");
        assert_eq!(shown.confidence, 40);
        assert_eq!(shown.id(), "ai-fix-notification");
        assert_eq!(FixStatus::Failed.confidence(), 0);
    }

    #[test]
    fn test_revision_advances() {
        let center = center(15);
        let rx = center.subscribe();
        center.present(NotificationKind::FixFailed, payload("x", FixStatus::Failed));
        assert_eq!(*rx.borrow(), 1);
    }
}
