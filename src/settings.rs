use anyhow::{Context, Result};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use crate::models::WorkoutSession;

const SETTINGS_KEY: &str = "settings";
const DRAFT_KEY: &str = "active_session";
const ABANDONED_KEY: &str = "abandoned_session";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum WeightUnit {
    #[default]
    Kg,
    Lbs,
}

impl WeightUnit {
    const LBS_PER_KG: f64 = 2.204_622_621_8;

    pub fn from_kg(&self, kg: f64) -> f64 {
        match self {
            WeightUnit::Kg => kg,
            WeightUnit::Lbs => kg * Self::LBS_PER_KG,
        }
    }

    pub fn to_kg(&self, value: f64) -> f64 {
        match self {
            WeightUnit::Kg => value,
            WeightUnit::Lbs => value / Self::LBS_PER_KG,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct UserSettings {
    pub weight_unit: WeightUnit,
    pub default_rest_seconds: u32,
    pub auto_start_rest_timer: bool,
    /// Whether declining the resume prompt throws the abandoned draft away.
    pub discard_abandoned_on_decline: bool,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            weight_unit: WeightUnit::Kg,
            default_rest_seconds: 90,
            auto_start_rest_timer: true,
            discard_abandoned_on_decline: true,
        }
    }
}

/// Everything the device keeps between launches.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocalState {
    pub settings: UserSettings,
    pub draft: Option<WorkoutSession>,
    pub abandoned: Option<WorkoutSession>,
}

fn key_path(dir: &Path, key: &str) -> PathBuf {
    dir.join(format!("{key}.json"))
}

/// Reads one key. A missing or unreadable value reads as `None`.
pub fn read_key<T: DeserializeOwned>(dir: &Path, key: &str) -> Result<Option<T>> {
    let path = key_path(dir, key);
    if !path.exists() {
        return Ok(None);
    }
    let contents = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    match serde_json::from_str(&contents) {
        Ok(value) => Ok(Some(value)),
        Err(err) => {
            log::warn!("Ignoring corrupt local value {}: {err}", path.display());
            Ok(None)
        }
    }
}

/// Writes one key; `None` removes it.
pub fn write_key<T: Serialize>(dir: &Path, key: &str, value: Option<&T>) -> Result<()> {
    let path = key_path(dir, key);
    match value {
        Some(value) => {
            let serialized = serde_json::to_string_pretty(value)?;
            fs::write(&path, serialized)
                .with_context(|| format!("Failed to write {}", path.display()))
        }
        None => match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => {
                Err(err).with_context(|| format!("Failed to remove {}", path.display()))
            }
        },
    }
}

pub fn load_state(dir: &Path) -> Result<LocalState> {
    Ok(LocalState {
        settings: read_key(dir, SETTINGS_KEY)?.unwrap_or_default(),
        draft: read_key(dir, DRAFT_KEY)?,
        abandoned: read_key(dir, ABANDONED_KEY)?,
    })
}

pub fn save_state(dir: &Path, state: &LocalState) -> Result<()> {
    write_key(dir, SETTINGS_KEY, Some(&state.settings))?;
    write_key(dir, DRAFT_KEY, state.draft.as_ref())?;
    write_key(dir, ABANDONED_KEY, state.abandoned.as_ref())
}

/// File-backed key-value store for settings and session drafts.
pub struct LocalStore {
    dir: PathBuf,
    data: RwLock<LocalState>,
}

impl LocalStore {
    pub fn new(dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create local store {}", dir.display()))?;
        let data = load_state(&dir)?;
        Ok(Self {
            dir,
            data: RwLock::new(data),
        })
    }

    fn read(&self) -> RwLockReadGuard<'_, LocalState> {
        self.data.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, LocalState> {
        self.data.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn snapshot(&self) -> LocalState {
        self.read().clone()
    }

    pub fn settings(&self) -> UserSettings {
        self.read().settings.clone()
    }

    pub fn update_settings(&self, settings: UserSettings) -> Result<()> {
        let mut guard = self.write();
        guard.settings = settings;
        write_key(&self.dir, SETTINGS_KEY, Some(&guard.settings))
    }

    pub fn draft(&self) -> Option<WorkoutSession> {
        self.read().draft.clone()
    }

    pub fn save_draft(&self, session: Option<&WorkoutSession>) -> Result<()> {
        let mut guard = self.write();
        guard.draft = session.cloned();
        write_key(&self.dir, DRAFT_KEY, guard.draft.as_ref())
    }

    pub fn abandoned(&self) -> Option<WorkoutSession> {
        self.read().abandoned.clone()
    }

    /// Replaces the single abandoned slot.
    pub fn save_abandoned(&self, session: Option<&WorkoutSession>) -> Result<()> {
        let mut guard = self.write();
        guard.abandoned = session.cloned();
        write_key(&self.dir, ABANDONED_KEY, guard.abandoned.as_ref())
    }

    #[allow(dead_code)]
    pub fn reload(&self) -> Result<()> {
        let data = load_state(&self.dir)?;
        *self.write() = data;
        Ok(())
    }
}
