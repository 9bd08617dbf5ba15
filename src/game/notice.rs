//! Status Notices
//!
//! Short messages shown over the arena. Expiry is stored as data and
//! pruned on each display frame; nothing schedules a callback.

/// What produced a notice (presentation picks styling from this).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NoticeKind {
    /// Plain status text.
    Info,
    /// Achievement broadcast to everyone.
    Achievement,
    /// Achievement earned by the local player.
    PersonalAchievement,
}

/// One notice.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notice {
    /// Text to show.
    pub text: String,
    /// Styling hint.
    pub kind: NoticeKind,
    /// Removal time (ms); `None` means it stays until cleared.
    pub expires_at: Option<u64>,
}

impl Notice {
    /// Still visible at `now`.
    #[inline]
    pub fn is_live(&self, now: u64) -> bool {
        self.expires_at.map_or(true, |t| now < t)
    }
}

/// Ordered set of visible notices.
#[derive(Clone, Debug, Default)]
pub struct NoticeBoard {
    notices: Vec<Notice>,
}

impl NoticeBoard {
    /// Empty board.
    pub fn new() -> Self {
        Self::default()
    }

    /// Post a notice that expires `duration_ms` after `now`.
    ///
    /// A zero duration posts a persistent notice and replaces everything
    /// currently shown.
    pub fn post(&mut self, text: impl Into<String>, duration_ms: u64, now: u64) {
        self.post_kind(text, NoticeKind::Info, duration_ms, now);
    }

    /// Post with an explicit kind.
    pub fn post_kind(&mut self, text: impl Into<String>, kind: NoticeKind, duration_ms: u64, now: u64) {
        let expires_at = if duration_ms == 0 {
            self.notices.clear();
            None
        } else {
            Some(now.saturating_add(duration_ms))
        };
        self.notices.push(Notice {
            text: text.into(),
            kind,
            expires_at,
        });
    }

    /// Remove everything.
    pub fn clear(&mut self) {
        self.notices.clear();
    }

    /// Drop expired notices; returns how many were removed.
    pub fn prune(&mut self, now: u64) -> usize {
        let before = self.notices.len();
        self.notices.retain(|n| n.is_live(now));
        before - self.notices.len()
    }

    /// Currently visible notices, oldest first.
    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    /// Nothing to show.
    pub fn is_empty(&self) -> bool {
        self.notices.is_empty()
    }
}
