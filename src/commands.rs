//! Commands outside the live session: routines, history, body weight, nutrition, AI and
//! navigation. Session commands live in [`crate::timer::commands`].

use std::path::Path;

use chrono::{Duration, NaiveDate, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    ai::{AiError, AiService, ChatTurn, FoodAnalysis},
    analytics::{self, NutritionTotals, PersonalRecord, WaterProgress, WeeklySummary, WeightTrend},
    db::models::{
        BodyWeightEntry, CustomFood, FoodLog, FoodSource, Macros, Meal, Routine, RoutineExercise,
        SessionRecord, UserProfile, UserRole, WaterLog,
    },
    log_error, log_info, log_warn,
    optimistic::optimistic_remove,
    routes::Route,
    settings::{UserSettings, WeightUnit},
    AppState,
};

const ENABLE_LOGS: bool = true;

/// Sessions pulled for stats and the history list.
const HISTORY_PAGE: usize = 200;

fn ai_service(state: &AppState) -> Result<&dyn AiService, String> {
    state
        .ai
        .as_deref()
        .ok_or_else(|| AiError::MissingApiKey.user_message())
}

// ----------------------------------------------------------------------
// Routines
// ----------------------------------------------------------------------

pub async fn list_routines(state: &AppState) -> Result<Vec<Routine>, String> {
    let routines = state
        .backend
        .list_routines(state.user_id())
        .await
        .map_err(|e| e.to_string())?;
    *state.routines.lock().await = routines.clone();
    Ok(routines)
}

pub async fn get_routine(state: &AppState, routine_id: &str) -> Result<Routine, String> {
    state
        .backend
        .get_routine(routine_id)
        .await
        .map_err(|e| e.to_string())?
        .ok_or_else(|| format!("routine {routine_id} not found"))
}

pub async fn create_routine(
    state: &AppState,
    name: &str,
    exercises: Vec<RoutineExercise>,
) -> Result<Routine, String> {
    if name.trim().is_empty() {
        return Err("routine name is required".to_string());
    }
    let now = Utc::now();
    let routine = Routine {
        id: Uuid::new_v4().to_string(),
        user_id: state.user_id().to_string(),
        name: name.trim().to_string(),
        description: None,
        exercises,
        assigned_by: None,
        created_at: now,
        updated_at: now,
    };
    let saved = state
        .backend
        .save_routine(&routine)
        .await
        .map_err(|e| e.to_string())?;
    state.routines.lock().await.push(saved.clone());
    Ok(saved)
}

/// Drops the routine from the cached list right away; the list is restored if the backend
/// refuses.
pub async fn delete_routine(state: &AppState, routine_id: &str) -> Result<Vec<Routine>, String> {
    let mut routines = state.routines.lock().await;
    let backend = state.backend.clone();
    optimistic_remove(&mut routines, routine_id, |r| r.id.as_str(), async move {
        backend.delete_routine(routine_id).await
    })
    .await
    .map_err(|rollback| format!("Could not delete routine: {:#}", rollback.error))?;
    Ok(routines.clone())
}

// ----------------------------------------------------------------------
// History
// ----------------------------------------------------------------------

pub async fn list_history(state: &AppState) -> Result<Vec<SessionRecord>, String> {
    let history = state
        .backend
        .list_sessions(state.user_id(), HISTORY_PAGE)
        .await
        .map_err(|e| e.to_string())?;
    *state.history.lock().await = history.clone();
    Ok(history)
}

pub async fn delete_session(
    state: &AppState,
    session_id: &str,
) -> Result<Vec<SessionRecord>, String> {
    let mut history = state.history.lock().await;
    let backend = state.backend.clone();
    optimistic_remove(&mut history, session_id, |s| s.id.as_str(), async move {
        backend.delete_session(session_id).await
    })
    .await
    .map_err(|rollback| format!("Could not delete session: {:#}", rollback.error))?;
    Ok(history.clone())
}

// ----------------------------------------------------------------------
// Body weight
// ----------------------------------------------------------------------

/// `value` is in the user's display unit.
pub async fn log_weight(
    state: &AppState,
    value: f64,
    note: Option<String>,
) -> Result<BodyWeightEntry, String> {
    if !value.is_finite() || value <= 0.0 {
        return Err("weight must be positive".to_string());
    }
    let unit = state.store.settings().weight_unit;
    let entry = BodyWeightEntry {
        id: Uuid::new_v4().to_string(),
        user_id: state.user_id().to_string(),
        weight_kg: unit.to_kg(value),
        measured_on: state.today(),
        note,
        created_at: Utc::now(),
    };
    state
        .backend
        .add_body_weight(&entry)
        .await
        .map_err(|e| e.to_string())?;
    Ok(entry)
}

/// Entries from the last `days` days, oldest first.
pub async fn list_weights(state: &AppState, days: i64) -> Result<Vec<BodyWeightEntry>, String> {
    let since = state.today() - Duration::days(days.max(1));
    let entries = state
        .backend
        .list_body_weights(state.user_id(), Some(since))
        .await
        .map_err(|e| e.to_string())?;
    *state.body_weights.lock().await = entries.clone();
    Ok(entries)
}

pub async fn weight_trend(state: &AppState, days: i64) -> Result<Option<WeightTrend>, String> {
    let entries = list_weights(state, days).await?;
    Ok(analytics::weight_trend(&entries))
}

pub async fn delete_weight(
    state: &AppState,
    entry_id: &str,
) -> Result<Vec<BodyWeightEntry>, String> {
    let mut entries = state.body_weights.lock().await;
    let backend = state.backend.clone();
    optimistic_remove(&mut entries, entry_id, |e| e.id.as_str(), async move {
        backend.delete_body_weight(entry_id).await
    })
    .await
    .map_err(|rollback| format!("Could not delete weight entry: {:#}", rollback.error))?;
    Ok(entries.clone())
}

// ----------------------------------------------------------------------
// Nutrition
// ----------------------------------------------------------------------

async fn ensure_profile(state: &AppState) -> Result<UserProfile, String> {
    let existing = state
        .backend
        .get_profile(state.user_id())
        .await
        .map_err(|e| e.to_string())?;
    match existing {
        Some(profile) => Ok(profile),
        None => state
            .backend
            .save_profile(&UserProfile::new(state.user_id(), state.user_id()))
            .await
            .map_err(|e| e.to_string()),
    }
}

pub async fn log_water(state: &AppState, amount_ml: u32) -> Result<WaterProgress, String> {
    if amount_ml == 0 {
        return Err("amount must be positive".to_string());
    }
    let today = state.today();
    let log = WaterLog {
        id: Uuid::new_v4().to_string(),
        user_id: state.user_id().to_string(),
        logged_on: today,
        amount_ml,
        created_at: Utc::now(),
    };
    state
        .backend
        .add_water_log(&log)
        .await
        .map_err(|e| e.to_string())?;
    water_progress(state, today).await
}

pub async fn water_progress(state: &AppState, day: NaiveDate) -> Result<WaterProgress, String> {
    let profile = ensure_profile(state).await?;
    let logs = state
        .backend
        .list_water_logs(state.user_id(), day)
        .await
        .map_err(|e| e.to_string())?;
    Ok(analytics::water_progress(&logs, day, profile.water_goal_ml))
}

pub struct NewFood<'a> {
    pub meal: Meal,
    pub name: &'a str,
    pub macros: Macros,
    pub quantity: f64,
    pub unit: &'a str,
    pub source: FoodSource,
}

pub async fn log_food(state: &AppState, food: NewFood<'_>) -> Result<FoodLog, String> {
    if food.name.trim().is_empty() {
        return Err("food name is required".to_string());
    }
    let log = FoodLog {
        id: Uuid::new_v4().to_string(),
        user_id: state.user_id().to_string(),
        logged_on: state.today(),
        meal: food.meal,
        name: food.name.trim().to_string(),
        macros: food.macros,
        quantity: food.quantity,
        unit: food.unit.to_string(),
        source: food.source,
        created_at: Utc::now(),
    };
    state
        .backend
        .add_food_log(&log)
        .await
        .map_err(|e| e.to_string())?;
    Ok(log)
}

pub async fn save_custom_food(
    state: &AppState,
    name: &str,
    macros: Macros,
    serving_quantity: f64,
    serving_unit: &str,
) -> Result<CustomFood, String> {
    let food = CustomFood {
        id: Uuid::new_v4().to_string(),
        user_id: state.user_id().to_string(),
        name: name.to_string(),
        macros,
        serving_quantity,
        serving_unit: serving_unit.to_string(),
    };
    state
        .backend
        .save_custom_food(&food)
        .await
        .map_err(|e| e.to_string())?;
    Ok(food)
}

/// Logs `quantity` of a saved custom food, matched by name.
pub async fn log_custom_food(
    state: &AppState,
    meal: Meal,
    name: &str,
    quantity: f64,
) -> Result<FoodLog, String> {
    let foods = state
        .backend
        .list_custom_foods(state.user_id())
        .await
        .map_err(|e| e.to_string())?;
    let food = foods
        .iter()
        .find(|food| food.name.eq_ignore_ascii_case(name))
        .ok_or_else(|| format!("no custom food named {name}"))?;
    log_food(
        state,
        NewFood {
            meal,
            name: &food.name,
            macros: food.macros_for(quantity),
            quantity,
            unit: &food.serving_unit,
            source: FoodSource::Custom,
        },
    )
    .await
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoLogResult {
    pub analysis: FoodAnalysis,
    pub logged: Vec<FoodLog>,
}

/// Sends a food photo for analysis and logs every recognised item under `meal`.
pub async fn log_food_photo(
    state: &AppState,
    path: &Path,
    meal: Meal,
) -> Result<PhotoLogResult, String> {
    let ai = ai_service(state)?;
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| format!("Could not read {}: {e}", path.display()))?;

    let analysis = ai.analyze_food_image(&bytes).await.map_err(|err| {
        log_warn!("Food photo analysis failed: {err}");
        err.user_message()
    })?;

    let mut logged = Vec::with_capacity(analysis.items.len());
    for item in &analysis.items {
        let log = log_food(
            state,
            NewFood {
                meal,
                name: &item.name,
                macros: Macros {
                    calories: item.calories,
                    protein: item.protein,
                    carbs: item.carbs,
                    fats: item.fats,
                },
                quantity: item.quantity,
                unit: &item.unit,
                source: FoodSource::Photo,
            },
        )
        .await?;
        logged.push(log);
    }
    log_info!("Logged {} item(s) from food photo", logged.len());

    Ok(PhotoLogResult { analysis, logged })
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NutritionDay {
    pub totals: NutritionTotals,
    pub water: WaterProgress,
    pub logs: Vec<FoodLog>,
    pub water_logs: Vec<WaterLog>,
}

pub async fn nutrition_day(state: &AppState, day: NaiveDate) -> Result<NutritionDay, String> {
    let profile = ensure_profile(state).await?;
    let logs = state
        .backend
        .list_food_logs(state.user_id(), day)
        .await
        .map_err(|e| e.to_string())?;
    let water_logs = state
        .backend
        .list_water_logs(state.user_id(), day)
        .await
        .map_err(|e| e.to_string())?;
    *state.food_logs.lock().await = logs.clone();
    *state.water_logs.lock().await = water_logs.clone();
    Ok(NutritionDay {
        totals: analytics::nutrition_totals(&logs, day, &profile),
        water: analytics::water_progress(&water_logs, day, profile.water_goal_ml),
        logs,
        water_logs,
    })
}

pub async fn delete_food_log(state: &AppState, log_id: &str) -> Result<Vec<FoodLog>, String> {
    let mut logs = state.food_logs.lock().await;
    let backend = state.backend.clone();
    optimistic_remove(&mut logs, log_id, |l| l.id.as_str(), async move {
        backend.delete_food_log(log_id).await
    })
    .await
    .map_err(|rollback| format!("Could not delete food entry: {:#}", rollback.error))?;
    Ok(logs.clone())
}

pub async fn delete_water_log(state: &AppState, log_id: &str) -> Result<Vec<WaterLog>, String> {
    let mut logs = state.water_logs.lock().await;
    let backend = state.backend.clone();
    optimistic_remove(&mut logs, log_id, |l| l.id.as_str(), async move {
        backend.delete_water_log(log_id).await
    })
    .await
    .map_err(|rollback| format!("Could not delete water entry: {:#}", rollback.error))?;
    Ok(logs.clone())
}

// ----------------------------------------------------------------------
// AI
// ----------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatReply {
    pub text: String,
    /// The text is a substituted error message, not a coach answer.
    pub failed: bool,
}

/// Failures come back as a substituted reply and leave the conversation untouched.
pub async fn chat(state: &AppState, message: &str) -> Result<ChatReply, String> {
    let message = message.trim();
    if message.is_empty() {
        return Err("message is empty".to_string());
    }
    let Some(ai) = state.ai.as_deref() else {
        return Ok(ChatReply {
            text: AiError::MissingApiKey.user_message(),
            failed: true,
        });
    };

    let history = state.chat_history.lock().await.clone();
    match ai.chat(message, &history).await {
        Ok(text) => {
            let mut history = state.chat_history.lock().await;
            history.push(ChatTurn::user(message));
            history.push(ChatTurn::model(text.clone()));
            Ok(ChatReply {
                text,
                failed: false,
            })
        }
        Err(err) => {
            log_warn!("Chat request failed: {err}");
            Ok(ChatReply {
                text: err.user_message(),
                failed: true,
            })
        }
    }
}

/// Asks the model for routines and saves every valid one. Nothing is saved when the answer
/// can't be parsed.
pub async fn generate_routines(state: &AppState, prompt: &str) -> Result<Vec<Routine>, String> {
    let ai = ai_service(state)?;
    let generated = ai.generate_routines(prompt).await.map_err(|err| {
        log_warn!("Routine generation failed: {err}");
        err.user_message()
    })?;

    let mut saved = Vec::with_capacity(generated.len());
    for routine in generated {
        let routine = routine.into_routine(state.user_id());
        let routine = state.backend.save_routine(&routine).await.map_err(|e| {
            log_error!("Could not save generated routine {}: {e:#}", routine.name);
            e.to_string()
        })?;
        saved.push(routine);
    }
    state.routines.lock().await.extend(saved.iter().cloned());
    Ok(saved)
}

// ----------------------------------------------------------------------
// Navigation, stats, settings, trainer
// ----------------------------------------------------------------------

pub async fn navigate(state: &AppState, hash: &str) -> Result<Route, String> {
    let route = Route::parse(hash);
    *state.route.lock().await = route.clone();
    Ok(route)
}

pub async fn current_route(state: &AppState) -> Route {
    state.route.lock().await.clone()
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub week: WeeklySummary,
    pub streak_days: u32,
    pub personal_records: Vec<PersonalRecord>,
}

pub async fn dashboard_stats(state: &AppState) -> Result<DashboardStats, String> {
    let records = list_history(state).await?;
    let today = state.today();
    Ok(DashboardStats {
        week: analytics::weekly_summary(&records, today - Duration::days(6), today),
        streak_days: analytics::workout_streak(&records, today),
        personal_records: analytics::personal_records(&records),
    })
}

pub async fn exercise_history(
    state: &AppState,
    name: &str,
) -> Result<Vec<analytics::ExerciseHistoryPoint>, String> {
    let records = list_history(state).await?;
    Ok(analytics::exercise_history(&records, name))
}

pub fn get_settings(state: &AppState) -> UserSettings {
    state.store.settings()
}

pub fn update_settings(
    state: &AppState,
    weight_unit: Option<WeightUnit>,
    default_rest_seconds: Option<u32>,
    discard_abandoned_on_decline: Option<bool>,
) -> Result<UserSettings, String> {
    let mut settings = state.store.settings();
    if let Some(unit) = weight_unit {
        settings.weight_unit = unit;
    }
    if let Some(secs) = default_rest_seconds {
        settings.default_rest_seconds = secs;
    }
    if let Some(discard) = discard_abandoned_on_decline {
        settings.discard_abandoned_on_decline = discard;
    }
    state
        .store
        .update_settings(settings.clone())
        .map_err(|e| e.to_string())?;
    Ok(settings)
}

pub async fn get_profile(state: &AppState) -> Result<UserProfile, String> {
    ensure_profile(state).await
}

pub async fn update_goals(
    state: &AppState,
    calorie_goal: Option<u32>,
    protein_goal: Option<u32>,
    water_goal_ml: Option<u32>,
) -> Result<UserProfile, String> {
    let mut profile = ensure_profile(state).await?;
    if let Some(goal) = calorie_goal {
        profile.calorie_goal = goal;
    }
    if let Some(goal) = protein_goal {
        profile.protein_goal = goal;
    }
    if let Some(goal) = water_goal_ml {
        profile.water_goal_ml = goal;
    }
    state
        .backend
        .save_profile(&profile)
        .await
        .map_err(|e| e.to_string())
}

pub async fn become_trainer(state: &AppState) -> Result<UserProfile, String> {
    let mut profile = ensure_profile(state).await?;
    profile.role = UserRole::Trainer;
    state
        .backend
        .save_profile(&profile)
        .await
        .map_err(|e| e.to_string())
}

pub async fn link_trainer(state: &AppState, trainer_id: &str) -> Result<UserProfile, String> {
    ensure_profile(state).await?;
    state
        .backend
        .link_trainer(state.user_id(), trainer_id)
        .await
        .map_err(|e| e.to_string())?;
    ensure_profile(state).await
}

pub async fn list_trainees(state: &AppState) -> Result<Vec<UserProfile>, String> {
    state
        .backend
        .list_trainees(state.user_id())
        .await
        .map_err(|e| e.to_string())
}

pub async fn assign_routine(
    state: &AppState,
    trainee_id: &str,
    routine_id: &str,
) -> Result<Routine, String> {
    let routine = get_routine(state, routine_id).await?;
    state
        .backend
        .assign_routine(state.user_id(), trainee_id, &routine)
        .await
        .map_err(|e| e.to_string())
}
