//! Routine templates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::TrackingType;

/// One exercise slot of a routine with its default targets.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RoutineExercise {
    pub name: String,
    #[serde(default)]
    pub tracking_type: TrackingType,
    pub target_sets: u32,
    pub target_reps: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_weight: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rest_seconds: Option<u32>,
}

/// A named, reusable template of exercises.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Routine {
    pub id: String,
    pub user_id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub exercises: Vec<RoutineExercise>,
    /// Trainer who assigned the routine, if any.
    #[serde(default)]
    pub assigned_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
