//! Read-side numbers for the dashboard, history and nutrition screens.
//!
//! Everything here is a pure function over rows already fetched from the backend.

mod types;

pub use types::{
    ExerciseHistoryPoint, NutritionTotals, PersonalRecord, WaterProgress, WeeklySummary,
    WeightTrend,
};

use std::collections::{BTreeMap, BTreeSet};

use chrono::{Duration, Local, NaiveDate};

use crate::{
    db::models::{BodyWeightEntry, FoodLog, Macros, SessionRecord, UserProfile, WaterLog},
    models::LoggedExercise,
};

const MOVING_AVERAGE_WINDOW: usize = 7;

/// Epley estimate: `w * (1 + reps / 30)`.
pub fn epley_one_rep_max(weight: f64, reps: u32) -> f64 {
    if reps == 0 || weight <= 0.0 {
        return 0.0;
    }
    weight * (1.0 + reps as f64 / 30.0)
}

/// Best estimated 1RM over the completed sets of an exercise.
pub fn best_one_rep_max(exercise: &LoggedExercise) -> f64 {
    exercise
        .completed_sets()
        .map(|set| epley_one_rep_max(set.weight, set.reps))
        .fold(0.0, f64::max)
}

/// Calendar day in local time, matching the same-day check used when resuming drafts.
fn session_date(record: &SessionRecord) -> NaiveDate {
    record.started_at.with_timezone(&Local).date_naive()
}

/// Sessions that started within `[from, to]`, inclusive.
pub fn weekly_summary(records: &[SessionRecord], from: NaiveDate, to: NaiveDate) -> WeeklySummary {
    let in_range: Vec<&SessionRecord> = records
        .iter()
        .filter(|record| {
            let day = session_date(record);
            day >= from && day <= to
        })
        .collect();

    WeeklySummary {
        from,
        to,
        workouts: in_range.len(),
        total_volume: in_range.iter().map(|record| record.total_volume).sum(),
        active_minutes: in_range.iter().map(|record| record.duration_seconds).sum::<u64>() / 60,
    }
}

/// Oldest first. Sessions where the exercise has no completed sets are skipped.
pub fn exercise_history(records: &[SessionRecord], name: &str) -> Vec<ExerciseHistoryPoint> {
    let mut points: Vec<ExerciseHistoryPoint> = records
        .iter()
        .filter_map(|record| {
            let exercise = record.exercise_named(name)?;
            if !exercise.has_completed_sets() {
                return None;
            }
            Some(ExerciseHistoryPoint {
                date: session_date(record),
                session_id: record.id.clone(),
                max_weight: exercise.max_weight(),
                volume: exercise.volume(),
                estimated_one_rep_max: best_one_rep_max(exercise),
            })
        })
        .collect();
    points.sort_by(|a, b| a.date.cmp(&b.date));
    points
}

/// Best numbers per exercise, keyed case-insensitively and sorted by name.
pub fn personal_records(records: &[SessionRecord]) -> Vec<PersonalRecord> {
    let mut best: BTreeMap<String, PersonalRecord> = BTreeMap::new();

    for record in records {
        let day = session_date(record);
        for exercise in record.exercises.iter().filter(|e| e.has_completed_sets()) {
            let key = exercise.name.to_lowercase();
            let max_weight = exercise.max_weight();
            let volume = exercise.volume();
            let one_rm = best_one_rep_max(exercise);

            let entry = best.entry(key).or_insert_with(|| PersonalRecord {
                exercise: exercise.name.clone(),
                max_weight,
                max_volume: volume,
                estimated_one_rep_max: one_rm,
                achieved_on: day,
            });
            if max_weight > entry.max_weight {
                entry.max_weight = max_weight;
                entry.achieved_on = day;
            }
            entry.max_volume = entry.max_volume.max(volume);
            entry.estimated_one_rep_max = entry.estimated_one_rep_max.max(one_rm);
        }
    }

    best.into_values().collect()
}

pub fn nutrition_totals(logs: &[FoodLog], date: NaiveDate, profile: &UserProfile) -> NutritionTotals {
    let mut consumed = Macros::default();
    for log in logs.iter().filter(|log| log.logged_on == date) {
        consumed += log.macros;
    }
    NutritionTotals {
        date,
        consumed,
        calorie_goal: profile.calorie_goal,
        protein_goal: profile.protein_goal,
        calories_remaining: profile.calorie_goal as f64 - consumed.calories,
        protein_remaining: profile.protein_goal as f64 - consumed.protein,
    }
}

pub fn water_progress(logs: &[WaterLog], date: NaiveDate, goal_ml: u32) -> WaterProgress {
    let total_ml: u32 = logs
        .iter()
        .filter(|log| log.logged_on == date)
        .map(|log| log.amount_ml)
        .sum();
    let percent = if goal_ml == 0 {
        0.0
    } else {
        (total_ml as f64 / goal_ml as f64 * 100.0).min(100.0)
    };
    WaterProgress {
        total_ml,
        goal_ml,
        percent,
    }
}

/// `None` without any entries.
pub fn weight_trend(entries: &[BodyWeightEntry]) -> Option<WeightTrend> {
    let mut sorted: Vec<&BodyWeightEntry> = entries.iter().collect();
    sorted.sort_by(|a, b| {
        a.measured_on
            .cmp(&b.measured_on)
            .then(a.created_at.cmp(&b.created_at))
    });

    let first = sorted.first()?;
    let latest = sorted.last()?;

    let moving_average = sorted
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            let start = (i + 1).saturating_sub(MOVING_AVERAGE_WINDOW);
            let window = &sorted[start..=i];
            let avg = window.iter().map(|e| e.weight_kg).sum::<f64>() / window.len() as f64;
            (entry.measured_on, avg)
        })
        .collect();

    Some(WeightTrend {
        latest_kg: latest.weight_kg,
        change_kg: latest.weight_kg - first.weight_kg,
        moving_average,
    })
}

/// Consecutive training days ending today, or yesterday when today has no session yet.
pub fn workout_streak(records: &[SessionRecord], today: NaiveDate) -> u32 {
    let days: BTreeSet<NaiveDate> = records.iter().map(session_date).collect();

    let mut cursor = if days.contains(&today) {
        today
    } else {
        today - Duration::days(1)
    };

    let mut streak = 0;
    while days.contains(&cursor) {
        streak += 1;
        cursor -= Duration::days(1);
    }
    streak
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::db::models::{FoodSource, Meal};
    use crate::models::{SetEntry, TrackingType};

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn record(id: &str, d: u32, sets: &[(f64, u32)]) -> SessionRecord {
        let mut bench = LoggedExercise::new("Bench Press", TrackingType::WeightReps);
        bench.sets = sets
            .iter()
            .map(|&(w, r)| SetEntry {
                completed: true,
                ..SetEntry::new(w, r)
            })
            .collect();
        let started = Local
            .with_ymd_and_hms(2024, 3, d, 18, 0, 0)
            .unwrap()
            .with_timezone(&Utc);
        SessionRecord {
            id: id.into(),
            user_id: "u".into(),
            routine_id: None,
            name: "Push".into(),
            started_at: started,
            ended_at: started + Duration::minutes(45),
            duration_seconds: 45 * 60,
            total_paused_ms: 0,
            total_volume: bench.volume(),
            exercises: vec![bench],
            notes: None,
        }
    }

    #[test]
    fn late_evening_sessions_count_on_the_local_day() {
        let mut late = record("late", 9, &[(60.0, 5)]);
        late.started_at = Local
            .with_ymd_and_hms(2024, 3, 9, 23, 30, 0)
            .unwrap()
            .with_timezone(&Utc);
        let summary = weekly_summary(&[late.clone()], day(9), day(9));
        assert_eq!(summary.workouts, 1);
        assert_eq!(exercise_history(&[late], "bench press")[0].date, day(9));
    }

    #[test]
    fn epley_matches_formula() {
        assert!((epley_one_rep_max(100.0, 5) - 116.666).abs() < 0.01);
        assert_eq!(epley_one_rep_max(100.0, 0), 0.0);
    }

    #[test]
    fn weekly_summary_counts_only_range() {
        let records = vec![record("a", 1, &[(50.0, 10)]), record("b", 4, &[(60.0, 10)])];
        let summary = weekly_summary(&records, day(2), day(8));
        assert_eq!(summary.workouts, 1);
        assert_eq!(summary.total_volume, 600.0);
        assert_eq!(summary.active_minutes, 45);
    }

    #[test]
    fn personal_records_keep_best_day() {
        let records = vec![
            record("a", 1, &[(80.0, 8)]),
            record("b", 3, &[(90.0, 3)]),
            record("c", 5, &[(85.0, 10)]),
        ];
        let prs = personal_records(&records);
        assert_eq!(prs.len(), 1);
        assert_eq!(prs[0].max_weight, 90.0);
        assert_eq!(prs[0].achieved_on, day(3));
        assert_eq!(prs[0].max_volume, 850.0);
    }

    #[test]
    fn exercise_history_is_oldest_first() {
        let records = vec![record("b", 5, &[(90.0, 3)]), record("a", 1, &[(80.0, 8)])];
        let history = exercise_history(&records, "bench press");
        assert_eq!(history.iter().map(|p| p.session_id.as_str()).collect::<Vec<_>>(), ["a", "b"]);
    }

    #[test]
    fn streak_allows_missing_today() {
        let records = vec![record("a", 3, &[]), record("b", 4, &[]), record("c", 1, &[])];
        assert_eq!(workout_streak(&records, day(5)), 2);
        assert_eq!(workout_streak(&records, day(4)), 2);
        assert_eq!(workout_streak(&records, day(7)), 0);
    }

    #[test]
    fn nutrition_remaining_goes_negative() {
        let profile = UserProfile::new("u", "U");
        let log = FoodLog {
            id: "f".into(),
            user_id: "u".into(),
            logged_on: day(1),
            meal: Meal::Dinner,
            name: "Pizza".into(),
            macros: Macros {
                calories: 2500.0,
                protein: 90.0,
                carbs: 300.0,
                fats: 100.0,
            },
            quantity: 1.0,
            unit: "whole".into(),
            source: FoodSource::Manual,
            created_at: Utc::now(),
        };
        let totals = nutrition_totals(&[log], day(1), &profile);
        assert_eq!(totals.calories_remaining, -300.0);
        assert_eq!(totals.protein_remaining, 60.0);
    }

    #[test]
    fn water_percent_caps_at_full() {
        let log = |ml| WaterLog {
            id: "w".into(),
            user_id: "u".into(),
            logged_on: day(1),
            amount_ml: ml,
            created_at: Utc::now(),
        };
        let progress = water_progress(&[log(1500), log(1500)], day(1), 2500);
        assert_eq!(progress.total_ml, 3000);
        assert_eq!(progress.percent, 100.0);
        assert_eq!(water_progress(&[], day(1), 0).percent, 0.0);
    }

    #[test]
    fn weight_trend_averages_last_seven() {
        let entries: Vec<BodyWeightEntry> = (1..=8)
            .map(|d| BodyWeightEntry {
                id: d.to_string(),
                user_id: "u".into(),
                weight_kg: 80.0 + d as f64,
                measured_on: day(d),
                note: None,
                created_at: Utc::now(),
            })
            .collect();
        let trend = weight_trend(&entries).unwrap();
        assert_eq!(trend.latest_kg, 88.0);
        assert_eq!(trend.change_kg, 7.0);
        // days 2..=8 -> 82..=88
        assert_eq!(trend.moving_average.last().unwrap().1, 85.0);
        assert!(weight_trend(&[]).is_none());
    }
}
