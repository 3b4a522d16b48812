use std::time::{Duration, Instant};

/// How long a notice stays visible before `tick` clears it.
pub const NOTICE_TTL: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Failure,
    Info,
}

/// A transient message with a scheduled expiry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub text: String,
    expires_at: Instant,
}

impl Notice {
    pub fn new(kind: NoticeKind, text: impl Into<String>, now: Instant) -> Self {
        Self {
            kind,
            text: text.into(),
            expires_at: now + NOTICE_TTL,
        }
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}
