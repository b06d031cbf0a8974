pub mod ai;
pub mod analytics;
pub mod backend;
pub mod commands;
pub mod config;
pub mod db;
pub mod models;
pub mod optimistic;
pub mod routes;
pub mod settings;
pub mod shell;
pub mod timer;
mod utils;
pub mod workout;

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Local, NaiveDate, Utc};
use log::{debug, info, warn};
use tokio::sync::Mutex;

use ai::{AiService, ChatTurn, GeminiService};
use backend::Backend;
use config::AppConfig;
use db::{
    models::{BodyWeightEntry, FoodLog, Routine, SessionRecord, WaterLog},
    Database,
};
use routes::Route;
use settings::LocalStore;
use timer::{Clock, SessionController, SessionEvent, SystemClock};

/// Everything a command needs. Built once at startup and passed by reference.
pub struct AppState {
    pub config: AppConfig,
    pub backend: Arc<dyn Backend>,
    pub store: Arc<LocalStore>,
    pub controller: SessionController,
    pub clock: Arc<dyn Clock>,
    pub ai: Option<Arc<dyn AiService>>,
    pub route: Mutex<Route>,
    /// Last fetched lists; optimistic deletes edit these first.
    pub routines: Mutex<Vec<Routine>>,
    pub history: Mutex<Vec<SessionRecord>>,
    pub body_weights: Mutex<Vec<BodyWeightEntry>>,
    pub food_logs: Mutex<Vec<FoodLog>>,
    pub water_logs: Mutex<Vec<WaterLog>>,
    pub chat_history: Mutex<Vec<ChatTurn>>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        backend: Arc<dyn Backend>,
        store: Arc<LocalStore>,
        clock: Arc<dyn Clock>,
        ai: Option<Arc<dyn AiService>>,
    ) -> Self {
        let controller = SessionController::new(
            backend.clone(),
            store.clone(),
            clock.clone(),
            config.user_id.clone(),
            config.debug,
        );
        Self {
            config,
            backend,
            store,
            controller,
            clock,
            ai,
            route: Mutex::new(Route::Dashboard),
            routines: Mutex::new(Vec::new()),
            history: Mutex::new(Vec::new()),
            body_weights: Mutex::new(Vec::new()),
            food_logs: Mutex::new(Vec::new()),
            water_logs: Mutex::new(Vec::new()),
            chat_history: Mutex::new(Vec::new()),
        }
    }

    /// Wires the bundled SQLite backend, the local store and Gemini (when a key is set).
    pub fn open(config: AppConfig) -> Result<Self> {
        std::fs::create_dir_all(&config.data_dir).with_context(|| {
            format!("failed to create data directory {}", config.data_dir.display())
        })?;

        let database = Database::new(config.db_path())?;
        let store = LocalStore::new(config.local_store_dir())?;

        let ai: Option<Arc<dyn AiService>> = match &config.gemini_api_key {
            Some(key) => Some(Arc::new(GeminiService::new(key.clone(), config.ai_model.clone()))),
            None => {
                warn!("GEMINI_API_KEY not set; AI commands are disabled");
                None
            }
        };

        Ok(Self::new(
            config,
            Arc::new(database),
            Arc::new(store),
            Arc::new(SystemClock),
            ai,
        ))
    }

    pub fn user_id(&self) -> &str {
        &self.config.user_id
    }

    pub fn now_local(&self) -> DateTime<Local> {
        DateTime::<Utc>::from_timestamp_millis(self.clock.now_ms())
            .unwrap_or_default()
            .with_timezone(&Local)
    }

    pub fn today(&self) -> NaiveDate {
        self.now_local().date_naive()
    }
}

fn spawn_event_logger(controller: &SessionController) {
    let mut events = controller.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(SessionEvent::Tick { duration_seconds, .. }) => {
                    debug!("Session at {duration_seconds}s");
                }
                Ok(SessionEvent::RestFinished) => info!("Rest is over"),
                Ok(SessionEvent::SessionFinished { record }) => {
                    info!("Saved session {} ({})", record.name, record.id);
                }
                Ok(_) => {}
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!("Event logger skipped {skipped} events");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });
}

pub fn run() -> Result<()> {
    // Reads RUST_LOG on top of an Info default.
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    info!("fitlog starting up...");

    let config = AppConfig::from_env()?;
    let runtime = tokio::runtime::Runtime::new().context("failed to start tokio runtime")?;

    runtime.block_on(async move {
        let state = AppState::open(config)?;
        spawn_event_logger(&state.controller);

        match state.controller.restore_from_storage().await {
            Ok(Some(session)) => {
                if let Some(routine_id) = session.routine_id.clone() {
                    *state.route.lock().await = Route::Workout(routine_id);
                }
            }
            Ok(None) => {}
            Err(err) => warn!("Could not restore draft session: {err:#}"),
        }

        shell::run_stdio(&state).await
    })
}
