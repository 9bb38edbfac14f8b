use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoryEntry {
    pub session: u64,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub fixed: bool,
}

/// Bounded display history of captured errors, newest first.
#[derive(Debug, Serialize, Deserialize)]
pub struct FixHistory {
    pub entries: VecDeque<HistoryEntry>,
    pub max_entries: usize,
    total_errors: u64,
    ai_fixes: u64,
}

impl FixHistory {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            max_entries: max_entries.max(1),
            total_errors: 0,
            ai_fixes: 0,
        }
    }

    pub fn record(&mut self, session: u64, message: &str, timestamp: DateTime<Utc>) {
        self.entries.push_front(HistoryEntry {
            session,
            message: message.to_string(),
            timestamp,
            fixed: false,
        });
        self.entries.truncate(self.max_entries);
        self.total_errors += 1;
    }

    /// Marks a session as fixed; counts each session at most once.
    pub fn mark_fixed(&mut self, session: u64) -> bool {
        match self.entries.iter_mut().find(|e| e.session == session) {
            Some(entry) if !entry.fixed => {
                entry.fixed = true;
                self.ai_fixes += 1;
                true
            }
            _ => false,
        }
    }

    pub fn total_errors(&self) -> u64 {
        self.total_errors
    }

    pub fn ai_fixes(&self) -> u64 {
        self.ai_fixes
    }

    /// Percentage of captured errors that received a fix, rounded.
    pub fn success_rate(&self) -> u32 {
        if self.total_errors == 0 {
            return 0;
        }
        ((self.ai_fixes as f64 / self.total_errors as f64) * 100.0).round() as u32
    }
}
