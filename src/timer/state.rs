use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ClockStatus {
    Running,
    Paused,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("session is already paused")]
    AlreadyPaused,
    #[error("session is not paused")]
    NotPaused,
    #[error("no active session")]
    NoActiveSession,
    #[error("a workout is in progress; finish or discard it first")]
    SessionActive,
    #[error("exercise index {0} is out of range")]
    ExerciseOutOfRange(usize),
    #[error("set index {0} is out of range")]
    SetOutOfRange(usize),
}

/// Wall-clock model of an active session.
///
/// `last_paused_time` is the only running/paused discriminator. `duration_seconds` is a
/// projection refreshed by [`SessionClock::tick`] and frozen while paused.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SessionClock {
    pub start_time: i64,
    #[serde(default)]
    pub duration_seconds: u64,
    #[serde(default)]
    pub total_paused_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_paused_time: Option<i64>,
}

impl SessionClock {
    pub fn started_at(now_ms: i64) -> Self {
        Self {
            start_time: now_ms,
            duration_seconds: 0,
            total_paused_ms: 0,
            last_paused_time: None,
        }
    }

    pub fn status(&self) -> ClockStatus {
        if self.last_paused_time.is_some() {
            ClockStatus::Paused
        } else {
            ClockStatus::Running
        }
    }

    pub fn is_paused(&self) -> bool {
        self.last_paused_time.is_some()
    }

    pub fn total_paused_seconds(&self) -> f64 {
        self.total_paused_ms as f64 / 1000.0
    }

    /// `floor((now - start - paused) / 1000)`, clamped at zero.
    pub fn active_seconds_at(&self, now_ms: i64) -> u64 {
        let paused_ms = i64::try_from(self.total_paused_ms).unwrap_or(i64::MAX);
        let active_ms = now_ms
            .saturating_sub(self.start_time)
            .saturating_sub(paused_ms);
        if active_ms <= 0 {
            0
        } else {
            (active_ms / 1000) as u64
        }
    }

    /// Recomputes `duration_seconds`. Refuses to advance while paused.
    pub fn tick(&mut self, now_ms: i64) -> Option<u64> {
        if self.is_paused() {
            return None;
        }
        self.duration_seconds = self.active_seconds_at(now_ms);
        Some(self.duration_seconds)
    }

    pub fn pause(&mut self, now_ms: i64) -> Result<(), SessionError> {
        if self.is_paused() {
            return Err(SessionError::AlreadyPaused);
        }
        // Freeze the display at the moment of pausing.
        self.duration_seconds = self.active_seconds_at(now_ms);
        self.last_paused_time = Some(now_ms);
        Ok(())
    }

    /// Folds the open pause interval into `total_paused_ms` and returns its length.
    pub fn resume(&mut self, now_ms: i64) -> Result<u64, SessionError> {
        let paused_at = self.last_paused_time.take().ok_or(SessionError::NotPaused)?;
        let delta = now_ms.saturating_sub(paused_at).max(0) as u64;
        self.total_paused_ms = self.total_paused_ms.saturating_add(delta);
        self.duration_seconds = self.active_seconds_at(now_ms);
        Ok(delta)
    }

    /// Returns the new status.
    pub fn toggle(&mut self, now_ms: i64) -> ClockStatus {
        if self.is_paused() {
            let _ = self.resume(now_ms);
        } else {
            let _ = self.pause(now_ms);
        }
        self.status()
    }

    /// Closes the clock for good. An open pause is folded in so the stored totals are complete;
    /// the duration stays at the value frozen when the pause began.
    pub fn finish(&mut self, now_ms: i64) -> u64 {
        if self.is_paused() {
            let _ = self.resume(now_ms);
        } else {
            self.tick(now_ms);
        }
        self.duration_seconds
    }
}
