//! Session commands: the thin layer between the shell and [`SessionController`].
//!
//! Each command maps internal errors to a display string, so nothing here is fatal.

use crate::{
    db::models::{Routine, SessionRecord},
    models::{LoggedExercise, SetEntry, SetPatch, TrackingType, WorkoutSession},
    routes::Route,
    timer::{controller::ExerciseAdvance, ClockStatus, SessionController, SessionSnapshot},
    workout::StartDecision,
    AppState,
};

fn controller_from_state(state: &AppState) -> SessionController {
    state.controller.clone()
}

async fn load_routine(state: &AppState, routine_id: &str) -> Result<Routine, String> {
    state
        .backend
        .get_routine(routine_id)
        .await
        .map_err(|e| e.to_string())?
        .ok_or_else(|| format!("routine {routine_id} not found"))
}

async fn show_workout(state: &AppState, session: Option<&WorkoutSession>) {
    let route = match session.and_then(|s| s.routine_id.clone()) {
        Some(routine_id) => Route::Workout(routine_id),
        None => Route::Dashboard,
    };
    *state.route.lock().await = route;
}

pub async fn get_session_state(state: &AppState) -> Result<SessionSnapshot, String> {
    Ok(controller_from_state(state).snapshot().await)
}

/// Start (or navigate to) a routine's workout. A `PromptResume` answer leaves everything as it
/// was until [`resume_draft`] or [`decline_draft`] is called.
pub async fn start_routine(state: &AppState, routine_id: &str) -> Result<StartDecision, String> {
    let routine = load_routine(state, routine_id).await?;
    let controller = controller_from_state(state);
    let decision = controller
        .request_start(&routine)
        .await
        .map_err(|e| e.to_string())?;

    if !matches!(decision, StartDecision::PromptResume { .. }) {
        *state.route.lock().await = Route::Workout(routine.id.clone());
    }
    Ok(decision)
}

pub async fn start_empty_session(state: &AppState, name: &str) -> Result<WorkoutSession, String> {
    let session = controller_from_state(state)
        .start_empty(name)
        .await
        .map_err(|e| e.to_string())?;
    show_workout(state, Some(&session)).await;
    Ok(session)
}

pub async fn resume_draft(state: &AppState) -> Result<WorkoutSession, String> {
    let session = controller_from_state(state)
        .resume_abandoned()
        .await
        .map_err(|e| e.to_string())?;
    show_workout(state, Some(&session)).await;
    Ok(session)
}

pub async fn decline_draft(state: &AppState, routine_id: &str) -> Result<WorkoutSession, String> {
    let routine = load_routine(state, routine_id).await?;
    let session = controller_from_state(state)
        .decline_abandoned(&routine)
        .await
        .map_err(|e| e.to_string())?;
    show_workout(state, Some(&session)).await;
    Ok(session)
}

/// Re-opens a finished session for corrections.
pub async fn edit_session(state: &AppState, session_id: &str) -> Result<WorkoutSession, String> {
    let record = state
        .backend
        .get_session(session_id)
        .await
        .map_err(|e| e.to_string())?
        .ok_or_else(|| format!("session {session_id} not found"))?;
    let session = controller_from_state(state)
        .edit_history(&record)
        .await
        .map_err(|e| e.to_string())?;
    *state.route.lock().await = Route::SessionDetail(record.id);
    Ok(session)
}

pub async fn pause_session(state: &AppState) -> Result<WorkoutSession, String> {
    controller_from_state(state)
        .pause()
        .await
        .map_err(|e| e.to_string())
}

pub async fn resume_session(state: &AppState) -> Result<WorkoutSession, String> {
    controller_from_state(state)
        .resume()
        .await
        .map_err(|e| e.to_string())
}

pub async fn toggle_pause(state: &AppState) -> Result<ClockStatus, String> {
    controller_from_state(state)
        .toggle_pause()
        .await
        .map_err(|e| e.to_string())
}

pub async fn add_exercise(
    state: &AppState,
    name: &str,
    tracking_type: Option<&str>,
) -> Result<usize, String> {
    let tracking_type = match tracking_type {
        Some(raw) => {
            TrackingType::parse(raw).ok_or_else(|| format!("unknown tracking type {raw}"))?
        }
        None => TrackingType::default(),
    };
    controller_from_state(state)
        .add_exercise(LoggedExercise::new(name, tracking_type))
        .await
        .map_err(|e| e.to_string())
}

pub async fn remove_exercise(state: &AppState, index: usize) -> Result<LoggedExercise, String> {
    controller_from_state(state)
        .remove_exercise(index)
        .await
        .map_err(|e| e.to_string())
}

pub async fn move_exercise(state: &AppState, from: usize, to: usize) -> Result<(), String> {
    controller_from_state(state)
        .move_exercise(from, to)
        .await
        .map_err(|e| e.to_string())
}

pub async fn select_exercise(state: &AppState, index: usize) -> Result<(), String> {
    controller_from_state(state)
        .select_exercise(index)
        .await
        .map_err(|e| e.to_string())
}

pub async fn add_set(state: &AppState, exercise_index: usize) -> Result<usize, String> {
    controller_from_state(state)
        .add_set(exercise_index)
        .await
        .map_err(|e| e.to_string())
}

/// `weight` is in the user's display unit.
pub async fn update_set(
    state: &AppState,
    exercise_index: usize,
    set_index: usize,
    weight: Option<f64>,
    reps: Option<u32>,
) -> Result<(), String> {
    let unit = state.store.settings().weight_unit;
    let patch = SetPatch {
        weight: weight.map(|w| unit.to_kg(w)),
        reps,
        ..SetPatch::default()
    };
    controller_from_state(state)
        .update_set(exercise_index, set_index, patch)
        .await
        .map_err(|e| e.to_string())
}

pub async fn remove_set(
    state: &AppState,
    exercise_index: usize,
    set_index: usize,
) -> Result<SetEntry, String> {
    controller_from_state(state)
        .remove_set(exercise_index, set_index)
        .await
        .map_err(|e| e.to_string())
}

pub async fn toggle_set(
    state: &AppState,
    exercise_index: usize,
    set_index: usize,
) -> Result<bool, String> {
    controller_from_state(state)
        .toggle_set(exercise_index, set_index)
        .await
        .map_err(|e| e.to_string())
}

/// Blank text clears the notes.
pub async fn set_notes(state: &AppState, notes: &str) -> Result<(), String> {
    let notes = Some(notes.trim().to_string()).filter(|n| !n.is_empty());
    controller_from_state(state)
        .set_notes(notes)
        .await
        .map_err(|e| e.to_string())
}

pub async fn finish_exercise(state: &AppState) -> Result<ExerciseAdvance, String> {
    let advance = controller_from_state(state)
        .finish_exercise()
        .await
        .map_err(|e| e.to_string())?;
    if let Some(record) = &advance.finished {
        *state.route.lock().await = Route::SessionDetail(record.id.clone());
    }
    Ok(advance)
}

pub async fn finish_session(state: &AppState) -> Result<SessionRecord, String> {
    let record = controller_from_state(state)
        .finish()
        .await
        .map_err(|e| format!("{e:#}"))?;
    *state.route.lock().await = Route::SessionDetail(record.id.clone());
    Ok(record)
}

pub async fn discard_session(state: &AppState) -> Result<(), String> {
    controller_from_state(state)
        .discard()
        .await
        .map_err(|e| e.to_string())?;
    *state.route.lock().await = Route::Dashboard;
    Ok(())
}

pub async fn add_rest(state: &AppState, secs: u32) -> Result<u32, String> {
    controller_from_state(state)
        .add_rest(secs)
        .await
        .map_err(|e| e.to_string())
}

pub async fn skip_rest(state: &AppState) -> Result<(), String> {
    controller_from_state(state).skip_rest().await;
    Ok(())
}
