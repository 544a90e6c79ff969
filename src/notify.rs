/*!
 * User-facing notices
 *
 * Every facade operation reports its outcome as a `Notice` through a
 * `NoticeSink`. The default sink forwards to tracing; embedders and tests
 * can collect notices with `MemorySink`.
 */

use crate::error::ForgeError;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{error, info, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub category: &'static str,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Info,
    Warning,
    Error,
}

impl Notice {
    pub fn success(category: &'static str, message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            category,
            message: message.into(),
        }
    }

    pub fn info(category: &'static str, message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            category,
            message: message.into(),
        }
    }

    pub fn warning(category: &'static str, message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            category,
            message: message.into(),
        }
    }

    /// Error notice; unreachable-backend errors carry their guidance hint
    pub fn from_error(err: &ForgeError) -> Self {
        let message = match err.guidance() {
            Some(guidance) => format!("{err}. Hint: {}", guidance.hint()),
            None => err.to_string(),
        };
        Self {
            level: NoticeLevel::Error,
            category: err.category().as_str(),
            message,
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let icon = match self.level {
            NoticeLevel::Success => "✓",
            NoticeLevel::Info => "ℹ",
            NoticeLevel::Warning => "⚠",
            NoticeLevel::Error => "✗",
        };
        write!(f, "{} {}: {}", icon, self.category, self.message)
    }
}

/// Destination for notices
pub trait NoticeSink: Send + Sync {
    fn notify(&self, notice: Notice);
}

/// Writes notices to the tracing subscriber
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl NoticeSink for TracingSink {
    fn notify(&self, notice: Notice) {
        match notice.level {
            NoticeLevel::Success | NoticeLevel::Info => {
                info!(category = notice.category, "{}", notice.message)
            }
            NoticeLevel::Warning => warn!(category = notice.category, "{}", notice.message),
            NoticeLevel::Error => error!(category = notice.category, "{}", notice.message),
        }
    }
}

/// Keeps every notice in memory
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    notices: Arc<Mutex<Vec<Notice>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.notices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Drain collected notices
    pub fn take(&self) -> Vec<Notice> {
        std::mem::take(&mut *self.notices.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl NoticeSink for MemorySink {
    fn notify(&self, notice: Notice) {
        self.notices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(notice);
    }
}
