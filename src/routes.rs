//! Hash-route navigation surface (`#/workout/<routine>` and friends).

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Route {
    #[default]
    Dashboard,
    Routines,
    NewRoutine,
    Routine(String),
    Workout(String),
    History,
    SessionDetail(String),
    Nutrition,
    Weight,
    Chat,
    Profile,
    Trainer,
    Trainee(String),
    Settings,
}

impl Route {
    /// Parses a location hash. Anything unrecognised lands on the dashboard.
    pub fn parse(hash: &str) -> Self {
        let path = hash.trim().trim_start_matches('#').trim_start_matches('/');
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        match segments.as_slice() {
            [] => Route::Dashboard,
            ["routines"] => Route::Routines,
            ["routines", "new"] => Route::NewRoutine,
            ["routines", id] => Route::Routine(id.to_string()),
            ["workout", routine_id] => Route::Workout(routine_id.to_string()),
            ["history"] => Route::History,
            ["history", id] => Route::SessionDetail(id.to_string()),
            ["nutrition"] => Route::Nutrition,
            ["weight"] => Route::Weight,
            ["chat"] => Route::Chat,
            ["profile"] => Route::Profile,
            ["trainer"] => Route::Trainer,
            ["trainer", trainee_id] => Route::Trainee(trainee_id.to_string()),
            ["settings"] => Route::Settings,
            _ => Route::Dashboard,
        }
    }

    /// Screens that hold an active session open.
    pub fn is_workout(&self) -> bool {
        matches!(self, Route::Workout(_))
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Route::Dashboard => write!(f, "#/"),
            Route::Routines => write!(f, "#/routines"),
            Route::NewRoutine => write!(f, "#/routines/new"),
            Route::Routine(id) => write!(f, "#/routines/{id}"),
            Route::Workout(id) => write!(f, "#/workout/{id}"),
            Route::History => write!(f, "#/history"),
            Route::SessionDetail(id) => write!(f, "#/history/{id}"),
            Route::Nutrition => write!(f, "#/nutrition"),
            Route::Weight => write!(f, "#/weight"),
            Route::Chat => write!(f, "#/chat"),
            Route::Profile => write!(f, "#/profile"),
            Route::Trainer => write!(f, "#/trainer"),
            Route::Trainee(id) => write!(f, "#/trainer/{id}"),
            Route::Settings => write!(f, "#/settings"),
        }
    }
}
