#![allow(dead_code)]

use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc,
};

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use tempfile::TempDir;

use fitlog_lib::{
    ai::{self, AiError, AiService, ChatTurn, FoodAnalysis, GeneratedRoutine},
    backend::Backend,
    config::AppConfig,
    db::{
        models::{
            BodyWeightEntry, CustomFood, FoodLog, Routine, RoutineExercise, SessionRecord,
            UserProfile, WaterLog,
        },
        Database,
    },
    models::TrackingType,
    settings::LocalStore,
    timer::{Clock, ManualClock, SessionController},
    AppState,
};

pub const USER: &str = "athlete";

/// SQLite backend whose writes can be switched off to simulate an unreachable server.
pub struct FlakyBackend {
    pub db: Database,
    fail_writes: AtomicBool,
}

impl FlakyBackend {
    pub fn new(db: Database) -> Self {
        Self {
            db,
            fail_writes: AtomicBool::new(false),
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.fail_writes.store(failing, Ordering::SeqCst);
    }

    fn check_write(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            bail!("backend unavailable");
        }
        Ok(())
    }
}

#[async_trait]
impl Backend for FlakyBackend {
    async fn list_routines(&self, user_id: &str) -> Result<Vec<Routine>> {
        Backend::list_routines(&self.db, user_id).await
    }
    async fn get_routine(&self, routine_id: &str) -> Result<Option<Routine>> {
        Backend::get_routine(&self.db, routine_id).await
    }
    async fn save_routine(&self, routine: &Routine) -> Result<Routine> {
        self.check_write()?;
        Backend::save_routine(&self.db, routine).await
    }
    async fn delete_routine(&self, routine_id: &str) -> Result<()> {
        self.check_write()?;
        Backend::delete_routine(&self.db, routine_id).await
    }
    async fn save_session(&self, record: &SessionRecord) -> Result<()> {
        self.check_write()?;
        Backend::save_session(&self.db, record).await
    }
    async fn get_session(&self, session_id: &str) -> Result<Option<SessionRecord>> {
        Backend::get_session(&self.db, session_id).await
    }
    async fn list_sessions(&self, user_id: &str, limit: usize) -> Result<Vec<SessionRecord>> {
        Backend::list_sessions(&self.db, user_id, limit).await
    }
    async fn delete_session(&self, session_id: &str) -> Result<()> {
        self.check_write()?;
        Backend::delete_session(&self.db, session_id).await
    }
    async fn add_body_weight(&self, entry: &BodyWeightEntry) -> Result<()> {
        self.check_write()?;
        Backend::add_body_weight(&self.db, entry).await
    }
    async fn list_body_weights(
        &self,
        user_id: &str,
        since: Option<NaiveDate>,
    ) -> Result<Vec<BodyWeightEntry>> {
        Backend::list_body_weights(&self.db, user_id, since).await
    }
    async fn delete_body_weight(&self, entry_id: &str) -> Result<()> {
        self.check_write()?;
        Backend::delete_body_weight(&self.db, entry_id).await
    }
    async fn add_food_log(&self, log: &FoodLog) -> Result<()> {
        self.check_write()?;
        Backend::add_food_log(&self.db, log).await
    }
    async fn list_food_logs(&self, user_id: &str, day: NaiveDate) -> Result<Vec<FoodLog>> {
        Backend::list_food_logs(&self.db, user_id, day).await
    }
    async fn delete_food_log(&self, log_id: &str) -> Result<()> {
        self.check_write()?;
        Backend::delete_food_log(&self.db, log_id).await
    }
    async fn add_water_log(&self, log: &WaterLog) -> Result<()> {
        self.check_write()?;
        Backend::add_water_log(&self.db, log).await
    }
    async fn list_water_logs(&self, user_id: &str, day: NaiveDate) -> Result<Vec<WaterLog>> {
        Backend::list_water_logs(&self.db, user_id, day).await
    }
    async fn delete_water_log(&self, log_id: &str) -> Result<()> {
        self.check_write()?;
        Backend::delete_water_log(&self.db, log_id).await
    }
    async fn save_custom_food(&self, food: &CustomFood) -> Result<()> {
        self.check_write()?;
        Backend::save_custom_food(&self.db, food).await
    }
    async fn list_custom_foods(&self, user_id: &str) -> Result<Vec<CustomFood>> {
        Backend::list_custom_foods(&self.db, user_id).await
    }
    async fn delete_custom_food(&self, food_id: &str) -> Result<()> {
        self.check_write()?;
        Backend::delete_custom_food(&self.db, food_id).await
    }
    async fn get_profile(&self, user_id: &str) -> Result<Option<UserProfile>> {
        Backend::get_profile(&self.db, user_id).await
    }
    async fn save_profile(&self, profile: &UserProfile) -> Result<UserProfile> {
        self.check_write()?;
        Backend::save_profile(&self.db, profile).await
    }
    async fn link_trainer(&self, trainee_id: &str, trainer_id: &str) -> Result<()> {
        self.check_write()?;
        Backend::link_trainer(&self.db, trainee_id, trainer_id).await
    }
    async fn unlink_trainer(&self, trainee_id: &str) -> Result<()> {
        self.check_write()?;
        Backend::unlink_trainer(&self.db, trainee_id).await
    }
    async fn list_trainees(&self, trainer_id: &str) -> Result<Vec<UserProfile>> {
        Backend::list_trainees(&self.db, trainer_id).await
    }
    async fn assign_routine(
        &self,
        trainer_id: &str,
        trainee_id: &str,
        routine: &Routine,
    ) -> Result<Routine> {
        self.check_write()?;
        Backend::assign_routine(&self.db, trainer_id, trainee_id, routine).await
    }
}

/// Canned model answers, run through the real parser.
pub struct FakeAi {
    pub routines_text: String,
    pub food_text: String,
    pub rate_limited: AtomicBool,
    pub chat_calls: AtomicUsize,
}

impl FakeAi {
    pub fn new(routines_text: &str, food_text: &str) -> Self {
        Self {
            routines_text: routines_text.to_string(),
            food_text: food_text.to_string(),
            rate_limited: AtomicBool::new(false),
            chat_calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl AiService for FakeAi {
    async fn generate_routines(&self, _prompt: &str) -> Result<Vec<GeneratedRoutine>, AiError> {
        Ok(ai::parse::parse_routines(&self.routines_text)?)
    }

    async fn chat(&self, message: &str, history: &[ChatTurn]) -> Result<String, AiError> {
        self.chat_calls.fetch_add(1, Ordering::SeqCst);
        if self.rate_limited.load(Ordering::SeqCst) {
            return Err(AiError::RateLimited("Slow down, try again in 5 seconds.".into()));
        }
        Ok(format!("{message} ({} earlier turns)", history.len()))
    }

    async fn analyze_food_image(&self, _image: &[u8]) -> Result<FoodAnalysis, AiError> {
        Ok(ai::parse::parse_food_analysis(&self.food_text)?)
    }
}

pub struct Harness {
    pub dir: TempDir,
    pub backend: Arc<FlakyBackend>,
    pub store: Arc<LocalStore>,
    pub clock: Arc<ManualClock>,
}

impl Harness {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(dir.path().join("fitlog.sqlite3")).unwrap();
        let store = LocalStore::new(dir.path().join("local")).unwrap();
        Self {
            backend: Arc::new(FlakyBackend::new(db)),
            store: Arc::new(store),
            clock: Arc::new(ManualClock::new(Utc::now().timestamp_millis())),
            dir,
        }
    }

    pub fn controller(&self) -> SessionController {
        SessionController::new(
            self.backend.clone(),
            self.store.clone(),
            self.clock.clone() as Arc<dyn Clock>,
            USER,
            true,
        )
    }

    pub fn config(&self) -> AppConfig {
        AppConfig {
            data_dir: self.dir.path().to_path_buf(),
            user_id: USER.to_string(),
            gemini_api_key: None,
            ai_model: "fake".to_string(),
            debug: true,
        }
    }

    pub fn app_state(&self, ai: Option<Arc<dyn AiService>>) -> AppState {
        AppState::new(
            self.config(),
            self.backend.clone(),
            self.store.clone(),
            self.clock.clone(),
            ai,
        )
    }

    pub fn advance_secs(&self, secs: i64) {
        self.clock.advance_ms(secs * 1000);
    }
}

pub fn exercise(name: &str, sets: u32, reps: u32, weight: f64) -> RoutineExercise {
    RoutineExercise {
        name: name.to_string(),
        tracking_type: TrackingType::WeightReps,
        target_sets: sets,
        target_reps: reps,
        target_weight: Some(weight),
        rest_seconds: Some(60),
    }
}

pub fn routine(id: &str, name: &str, exercises: Vec<RoutineExercise>) -> Routine {
    let now = Utc::now();
    Routine {
        id: id.to_string(),
        user_id: USER.to_string(),
        name: name.to_string(),
        description: None,
        exercises,
        assigned_by: None,
        created_at: now,
        updated_at: now,
    }
}

pub fn push_day() -> Routine {
    routine(
        "push",
        "Push Day",
        vec![
            exercise("Bench Press", 2, 5, 80.0),
            exercise("Overhead Press", 3, 8, 40.0),
            exercise("Dips", 3, 10, 0.0),
        ],
    )
}

pub fn pull_day() -> Routine {
    routine("pull", "Pull Day", vec![exercise("Row", 3, 10, 50.0)])
}
