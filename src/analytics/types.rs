use chrono::NaiveDate;
use serde::Serialize;

use crate::db::models::Macros;

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WeeklySummary {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub workouts: usize,
    pub total_volume: f64,
    pub active_minutes: u64,
}

/// One session's numbers for a single exercise.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseHistoryPoint {
    pub date: NaiveDate,
    pub session_id: String,
    pub max_weight: f64,
    pub volume: f64,
    pub estimated_one_rep_max: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PersonalRecord {
    pub exercise: String,
    pub max_weight: f64,
    pub max_volume: f64,
    pub estimated_one_rep_max: f64,
    pub achieved_on: NaiveDate,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NutritionTotals {
    pub date: NaiveDate,
    pub consumed: Macros,
    pub calorie_goal: u32,
    pub protein_goal: u32,
    /// Negative once the goal is exceeded.
    pub calories_remaining: f64,
    pub protein_remaining: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WaterProgress {
    pub total_ml: u32,
    pub goal_ml: u32,
    pub percent: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WeightTrend {
    pub latest_kg: f64,
    pub change_kg: f64,
    /// Trailing average over up to the last seven entries, oldest first.
    pub moving_average: Vec<(NaiveDate, f64)>,
}
