use serde::{Deserialize, Serialize};

/// Countdown shown between sets.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RestTimer {
    pub duration_secs: u32,
    pub started_at: i64,
    /// Remaining milliseconds captured when paused.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paused_remaining_ms: Option<i64>,
}

impl RestTimer {
    pub fn start(duration_secs: u32, now_ms: i64) -> Self {
        Self {
            duration_secs,
            started_at: now_ms,
            paused_remaining_ms: None,
        }
    }

    fn remaining_ms(&self, now_ms: i64) -> i64 {
        if let Some(remaining) = self.paused_remaining_ms {
            return remaining;
        }
        let end = self.started_at + i64::from(self.duration_secs) * 1000;
        (end - now_ms).max(0)
    }

    /// Whole seconds left, rounded up so the display reads 1 until the very end.
    pub fn remaining_secs(&self, now_ms: i64) -> u32 {
        let ms = self.remaining_ms(now_ms);
        ((ms + 999) / 1000) as u32
    }

    pub fn is_done(&self, now_ms: i64) -> bool {
        self.remaining_ms(now_ms) == 0
    }

    pub fn add_secs(&mut self, secs: u32) {
        match self.paused_remaining_ms.as_mut() {
            Some(remaining) => *remaining += i64::from(secs) * 1000,
            None => self.duration_secs = self.duration_secs.saturating_add(secs),
        }
    }

    pub fn pause(&mut self, now_ms: i64) {
        if self.paused_remaining_ms.is_none() {
            self.paused_remaining_ms = Some(self.remaining_ms(now_ms));
        }
    }

    pub fn resume(&mut self, now_ms: i64) {
        if let Some(remaining) = self.paused_remaining_ms.take() {
            // Re-anchor so that `started_at + duration` lands `remaining` from now.
            self.started_at = now_ms + remaining - i64::from(self.duration_secs) * 1000;
        }
    }
}
