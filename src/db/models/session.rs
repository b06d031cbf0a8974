//! Completed session records as stored by the backend.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{LoggedExercise, WorkoutSession};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub id: String,
    pub user_id: String,
    pub routine_id: Option<String>,
    pub name: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub duration_seconds: u64,
    pub total_paused_ms: u64,
    pub total_volume: f64,
    /// Stored as an embedded JSON blob, not normalized rows.
    pub exercises: Vec<LoggedExercise>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl SessionRecord {
    /// Builds the durable record from a finished session.
    pub fn from_session(session: &WorkoutSession, user_id: &str, ended_at: DateTime<Utc>) -> Self {
        Self {
            id: session.id.clone(),
            user_id: user_id.to_string(),
            routine_id: session.routine_id.clone(),
            name: session.routine_name.clone(),
            started_at: session.started_at(),
            ended_at,
            duration_seconds: session.clock.duration_seconds,
            total_paused_ms: session.clock.total_paused_ms,
            total_volume: session.total_volume(),
            exercises: session.exercises.clone(),
            notes: session.notes.clone(),
        }
    }

    /// Re-opens a completed record as an editable session.
    pub fn to_session(&self) -> WorkoutSession {
        let mut session = WorkoutSession::empty(self.name.clone(), self.started_at.timestamp_millis());
        session.id = self.id.clone();
        session.routine_id = self.routine_id.clone();
        session.clock.duration_seconds = self.duration_seconds;
        session.clock.total_paused_ms = self.total_paused_ms;
        session.end_time = Some(self.ended_at.timestamp_millis());
        session.exercises = self.exercises.clone();
        session.notes = self.notes.clone();
        session.historical = true;
        session
    }

    pub fn exercise_named(&self, name: &str) -> Option<&LoggedExercise> {
        self.exercises
            .iter()
            .find(|exercise| exercise.name.eq_ignore_ascii_case(name))
    }
}
