use std::time::{Duration, Instant};

/// Success and info notices disappear on their own after this long.
pub const AUTO_DISMISS_AFTER: Duration = Duration::from_secs(5);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Info,
    Warning,
    Danger,
}

impl NoticeLevel {
    fn auto_dismisses(self) -> bool {
        matches!(self, NoticeLevel::Success | NoticeLevel::Info)
    }
}

#[derive(Clone, Debug)]
pub struct Notice {
    pub id: u64,
    pub level: NoticeLevel,
    pub message: String,
    pub shown_at: Instant,
}

/// Transient, dismissible messages stacked in the corner of the window.
#[derive(Debug, Default)]
pub struct Notices {
    items: Vec<Notice>,
    next_id: u64,
}

impl Notices {
    pub fn push(&mut self, level: NoticeLevel, message: impl Into<String>, now: Instant) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.items.push(Notice {
            id,
            level,
            message: message.into(),
            shown_at: now,
        });
        id
    }

    pub fn dismiss(&mut self, id: u64) {
        self.items.retain(|n| n.id != id);
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Drop auto-dismissing notices that have been up long enough.
    pub fn sweep(&mut self, now: Instant) {
        self.items.retain(|n| {
            !(n.level.auto_dismisses() && now.duration_since(n.shown_at) >= AUTO_DISMISS_AFTER)
        });
    }

    pub fn iter(&self) -> impl Iterator<Item = &Notice> {
        self.items.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
