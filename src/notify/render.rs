use super::{FixStatus, Notification, NotificationKind};
use colored::{Color, Colorize};

#[derive(Debug, Clone)]
pub struct NotificationTheme {
    pub fix_found: Color,
    pub fallback: Color,
    pub backend_error: Color,
    pub failed: Color,
}

impl Default for NotificationTheme {
    fn default() -> Self {
        Self {
            fix_found: Color::Green,
            fallback: Color::Yellow,
            backend_error: Color::Red,
            failed: Color::BrightBlack,
        }
    }
}

impl NotificationTheme {
    fn accent(&self, notification: &Notification) -> Color {
        match (notification.kind, notification.status) {
            (NotificationKind::BackendError, _) => self.backend_error,
            (_, FixStatus::Failed) | (NotificationKind::FixFailed, _) => self.failed,
            (_, FixStatus::Fallback) => self.fallback,
            (_, FixStatus::Solved) => self.fix_found,
        }
    }
}

/// Terminal rendition of a notification card.
pub fn render(notification: &Notification, theme: &NotificationTheme) -> String {
    let accent = theme.accent(notification);
    let mut out = String::new();

    out.push_str(&format!(
        "{} {}\n",
        format!("[{}]", notification.title).color(accent).bold(),
        format!("confidence {}%", notification.confidence).dimmed()
    ));
    out.push_str(&format!("  {}\n", notification.error_preview.dimmed()));
    if let Some(detail) = &notification.detail {
        out.push_str(&format!("  {}\n", detail.dimmed()));
    }
    out.push_str(&format!("  {}\n", notification.solution_preview));
    if !notification.code.is_empty() {
        for line in notification.code.lines() {
            out.push_str(&format!("    {}\n", line.cyan()));
        }
    }
    out.push_str(&format!(
        "  {}",
        format!("({}) copy · dismiss", notification.id()).dimmed()
    ));

    out
}
