//! Moving through the exercises of a session and comparing each one against history.

use serde::{Deserialize, Serialize};

use crate::db::models::SessionRecord;
use crate::models::{LoggedExercise, SetEntry, SetPatch, WorkoutSession};
use crate::timer::SessionError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseStats {
    pub max_weight: f64,
    pub volume: f64,
}

impl ExerciseStats {
    pub fn of(exercise: &LoggedExercise) -> Self {
        Self {
            max_weight: exercise.max_weight(),
            volume: exercise.volume(),
        }
    }
}

/// Percentage changes against the previous completion.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StatsDiff {
    pub max_weight: f64,
    pub volume: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseSummary {
    pub name: String,
    pub current: ExerciseStats,
    pub previous: Option<ExerciseStats>,
    pub diff: Option<StatsDiff>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", tag = "kind", content = "index")]
pub enum NextStep {
    Exercise(usize),
    FinishSession,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FinishExerciseOutcome {
    /// `None` when the exercise had no completed sets; nothing is shown then.
    pub summary: Option<ExerciseSummary>,
    pub next: NextStep,
}

/// Zero previous value yields zero rather than a division by zero.
pub fn percent_change(previous: f64, current: f64) -> f64 {
    if previous == 0.0 {
        0.0
    } else {
        (current - previous) / previous * 100.0
    }
}

pub fn diff(previous: ExerciseStats, current: ExerciseStats) -> StatsDiff {
    StatsDiff {
        max_weight: percent_change(previous.max_weight, current.max_weight),
        volume: percent_change(previous.volume, current.volume),
    }
}

/// Stats of the most recent prior completion of `name`. `history` is newest first; the
/// session being logged is skipped so an edited record never compares against itself.
pub fn previous_stats(
    history: &[SessionRecord],
    name: &str,
    current_session_id: &str,
) -> Option<ExerciseStats> {
    history
        .iter()
        .filter(|record| record.id != current_session_id)
        .filter_map(|record| record.exercise_named(name))
        .find(|exercise| exercise.has_completed_sets())
        .map(ExerciseStats::of)
}

pub fn summarize(exercise: &LoggedExercise, previous: Option<ExerciseStats>) -> ExerciseSummary {
    let current = ExerciseStats::of(exercise);
    ExerciseSummary {
        name: exercise.name.clone(),
        current,
        previous,
        diff: previous.map(|previous| diff(previous, current)),
    }
}

fn next_step(session: &WorkoutSession, index: usize) -> NextStep {
    if index + 1 >= session.exercises.len() {
        NextStep::FinishSession
    } else {
        NextStep::Exercise(index + 1)
    }
}

/// Finishes the active exercise and moves the cursor. Advancing past the last exercise is
/// reported as [`NextStep::FinishSession`]; the caller then finishes the session.
pub fn finish_exercise(
    session: &mut WorkoutSession,
    history: &[SessionRecord],
) -> Result<FinishExerciseOutcome, SessionError> {
    let index = session.active_exercise_index;
    let exercise = session
        .exercises
        .get(index)
        .ok_or(SessionError::ExerciseOutOfRange(index))?;

    let summary = if exercise.has_completed_sets() {
        let previous = previous_stats(history, &exercise.name, &session.id);
        Some(summarize(exercise, previous))
    } else {
        None
    };

    let next = next_step(session, index);
    if let NextStep::Exercise(next_index) = next {
        session.active_exercise_index = next_index;
    }

    Ok(FinishExerciseOutcome { summary, next })
}

pub fn add_exercise(session: &mut WorkoutSession, exercise: LoggedExercise) -> usize {
    session.exercises.push(exercise);
    session.exercises.len() - 1
}

/// Removes an exercise and keeps the active index pointing at the same exercise when possible,
/// clamped into bounds.
pub fn remove_exercise(
    session: &mut WorkoutSession,
    index: usize,
) -> Result<LoggedExercise, SessionError> {
    if index >= session.exercises.len() {
        return Err(SessionError::ExerciseOutOfRange(index));
    }
    let removed = session.exercises.remove(index);

    if index < session.active_exercise_index {
        session.active_exercise_index -= 1;
    }
    let last = session.exercises.len().saturating_sub(1);
    session.active_exercise_index = session.active_exercise_index.min(last);
    Ok(removed)
}

pub fn move_exercise(session: &mut WorkoutSession, from: usize, to: usize) -> Result<(), SessionError> {
    let len = session.exercises.len();
    if from >= len {
        return Err(SessionError::ExerciseOutOfRange(from));
    }
    if to >= len {
        return Err(SessionError::ExerciseOutOfRange(to));
    }
    let active_id = session.active_exercise().map(|exercise| exercise.id.clone());
    let exercise = session.exercises.remove(from);
    session.exercises.insert(to, exercise);
    if let Some(active_id) = active_id {
        if let Some(position) = session.exercises.iter().position(|e| e.id == active_id) {
            session.active_exercise_index = position;
        }
    }
    Ok(())
}

pub fn select_exercise(session: &mut WorkoutSession, index: usize) -> Result<(), SessionError> {
    if index >= session.exercises.len() {
        return Err(SessionError::ExerciseOutOfRange(index));
    }
    session.active_exercise_index = index;
    Ok(())
}

fn exercise_mut(
    session: &mut WorkoutSession,
    index: usize,
) -> Result<&mut LoggedExercise, SessionError> {
    session
        .exercises
        .get_mut(index)
        .ok_or(SessionError::ExerciseOutOfRange(index))
}

/// Appends a set pre-filled from the previous one. Returns the new set index.
pub fn add_set(session: &mut WorkoutSession, exercise_index: usize) -> Result<usize, SessionError> {
    let exercise = exercise_mut(session, exercise_index)?;
    let template = exercise
        .sets
        .last()
        .map(|last| SetEntry {
            completed: false,
            ..last.clone()
        })
        .unwrap_or_default();
    exercise.sets.push(template);
    Ok(exercise.sets.len() - 1)
}

pub fn remove_set(
    session: &mut WorkoutSession,
    exercise_index: usize,
    set_index: usize,
) -> Result<SetEntry, SessionError> {
    let exercise = exercise_mut(session, exercise_index)?;
    if set_index >= exercise.sets.len() {
        return Err(SessionError::SetOutOfRange(set_index));
    }
    Ok(exercise.sets.remove(set_index))
}

pub fn update_set(
    session: &mut WorkoutSession,
    exercise_index: usize,
    set_index: usize,
    patch: &SetPatch,
) -> Result<(), SessionError> {
    let exercise = exercise_mut(session, exercise_index)?;
    let set = exercise
        .sets
        .get_mut(set_index)
        .ok_or(SessionError::SetOutOfRange(set_index))?;
    patch.apply(set);
    Ok(())
}

/// Returns the new completion flag.
pub fn toggle_set(
    session: &mut WorkoutSession,
    exercise_index: usize,
    set_index: usize,
) -> Result<bool, SessionError> {
    let exercise = exercise_mut(session, exercise_index)?;
    let set = exercise
        .sets
        .get_mut(set_index)
        .ok_or(SessionError::SetOutOfRange(set_index))?;
    set.completed = !set.completed;
    Ok(set.completed)
}
