//! Transient user-facing notifications ("toasts").
//!
//! Operations never surface errors by crashing the view; they push a
//! [`Notice`] and the front end shows it for [`Notice::ttl`].

use std::time::Duration;

use serde::Serialize;
use tokio::sync::mpsc;

use studyhub_shared::constants::NOTICE_TTL_MS;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NoticeKind {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub kind: NoticeKind,
    pub text: String,
    #[serde(skip)]
    pub ttl: Duration,
}

/// Cloneable sending side of the notification stream.
#[derive(Debug, Clone)]
pub struct Notifier {
    tx: Option<mpsc::UnboundedSender<Notice>>,
}

impl Notifier {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Notice>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    /// Drops every notice (still logged).
    pub fn silent() -> Self {
        Self { tx: None }
    }

    pub fn success(&self, text: impl Into<String>) {
        self.emit(NoticeKind::Success, text.into());
    }

    pub fn error(&self, text: impl Into<String>) {
        self.emit(NoticeKind::Error, text.into());
    }

    fn emit(&self, kind: NoticeKind, text: String) {
        match kind {
            NoticeKind::Success => tracing::info!(notice = %text, "notify"),
            NoticeKind::Error => tracing::warn!(notice = %text, "notify"),
        }

        let Some(tx) = &self.tx else {
            return;
        };
        let notice = Notice {
            kind,
            text,
            ttl: Duration::from_millis(NOTICE_TTL_MS),
        };
        if let Err(e) = tx.send(notice) {
            tracing::error!(error = %e, "Failed to emit notice");
        }
    }
}
