use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::models::{Routine, RoutineExercise};
use crate::timer::SessionClock;

/// Input schema for the sets of an exercise.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum TrackingType {
    #[default]
    WeightReps,
    RepsOnly,
    Duration,
    DistanceDuration,
}

impl TrackingType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrackingType::WeightReps => "weightReps",
            TrackingType::RepsOnly => "repsOnly",
            TrackingType::Duration => "duration",
            TrackingType::DistanceDuration => "distanceDuration",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "weightReps" => Some(TrackingType::WeightReps),
            "repsOnly" => Some(TrackingType::RepsOnly),
            "duration" => Some(TrackingType::Duration),
            "distanceDuration" => Some(TrackingType::DistanceDuration),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct SetEntry {
    pub weight: f64,
    pub reps: u32,
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rpe: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<u64>,
}

impl SetEntry {
    pub fn new(weight: f64, reps: u32) -> Self {
        Self {
            weight,
            reps,
            ..Self::default()
        }
    }

    pub fn volume(&self) -> f64 {
        self.weight * f64::from(self.reps)
    }
}

/// Partial update applied to a single set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetPatch {
    pub weight: Option<f64>,
    pub reps: Option<u32>,
    pub completed: Option<bool>,
    pub rpe: Option<f32>,
    pub distance: Option<f64>,
    pub duration_secs: Option<u64>,
}

impl SetPatch {
    pub fn apply(&self, set: &mut SetEntry) {
        if let Some(weight) = self.weight {
            set.weight = weight;
        }
        if let Some(reps) = self.reps {
            set.reps = reps;
        }
        if let Some(completed) = self.completed {
            set.completed = completed;
        }
        if self.rpe.is_some() {
            set.rpe = self.rpe;
        }
        if self.distance.is_some() {
            set.distance = self.distance;
        }
        if self.duration_secs.is_some() {
            set.duration_secs = self.duration_secs;
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LoggedExercise {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub tracking_type: TrackingType,
    #[serde(default)]
    pub rest_seconds: Option<u32>,
    pub sets: Vec<SetEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl LoggedExercise {
    pub fn new(name: impl Into<String>, tracking_type: TrackingType) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            tracking_type,
            rest_seconds: None,
            sets: Vec::new(),
            notes: None,
        }
    }

    /// Seeds a logged exercise from a routine template, one pending set per target set.
    pub fn from_template(template: &RoutineExercise) -> Self {
        let weight = template.target_weight.unwrap_or(0.0);
        let sets = (0..template.target_sets.max(1))
            .map(|_| SetEntry::new(weight, template.target_reps))
            .collect();
        Self {
            id: Uuid::new_v4().to_string(),
            name: template.name.clone(),
            tracking_type: template.tracking_type,
            rest_seconds: template.rest_seconds,
            sets,
            notes: None,
        }
    }

    pub fn completed_sets(&self) -> impl Iterator<Item = &SetEntry> {
        self.sets.iter().filter(|set| set.completed)
    }

    pub fn has_completed_sets(&self) -> bool {
        self.sets.iter().any(|set| set.completed)
    }

    /// Heaviest weight among completed sets, zero when nothing is completed.
    pub fn max_weight(&self) -> f64 {
        self.completed_sets()
            .map(|set| set.weight)
            .fold(0.0, f64::max)
    }

    /// Σ weight × reps over completed sets.
    pub fn volume(&self) -> f64 {
        self.completed_sets().map(SetEntry::volume).sum()
    }
}

/// One concrete, timestamped performance of a routine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutSession {
    pub id: String,
    pub routine_id: Option<String>,
    pub routine_name: String,
    #[serde(flatten)]
    pub clock: SessionClock,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<i64>,
    pub exercises: Vec<LoggedExercise>,
    #[serde(default)]
    pub active_exercise_index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Set when this session re-opens an already completed record for editing.
    #[serde(default)]
    pub historical: bool,
}

impl WorkoutSession {
    pub fn start(routine: &Routine, now_ms: i64) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            routine_id: Some(routine.id.clone()),
            routine_name: routine.name.clone(),
            clock: SessionClock::started_at(now_ms),
            end_time: None,
            exercises: routine
                .exercises
                .iter()
                .map(LoggedExercise::from_template)
                .collect(),
            active_exercise_index: 0,
            notes: None,
            historical: false,
        }
    }

    /// An ad-hoc session with no routine behind it.
    pub fn empty(name: impl Into<String>, now_ms: i64) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            routine_id: None,
            routine_name: name.into(),
            clock: SessionClock::started_at(now_ms),
            end_time: None,
            exercises: Vec::new(),
            active_exercise_index: 0,
            notes: None,
            historical: false,
        }
    }

    pub fn is_for_routine(&self, routine_id: &str) -> bool {
        self.routine_id.as_deref() == Some(routine_id)
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.clock.start_time).unwrap_or_default()
    }

    pub fn total_volume(&self) -> f64 {
        self.exercises.iter().map(LoggedExercise::volume).sum()
    }

    pub fn completed_set_count(&self) -> usize {
        self.exercises
            .iter()
            .map(|exercise| exercise.completed_sets().count())
            .sum()
    }

    pub fn active_exercise(&self) -> Option<&LoggedExercise> {
        self.exercises.get(self.active_exercise_index)
    }
}
