use std::{env, path::PathBuf};

use anyhow::{anyhow, Result};
use directories::ProjectDirs;

pub const DEFAULT_AI_MODEL: &str = "gemini-2.5-flash";

/// Process-level configuration, read from the environment once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub user_id: String,
    pub gemini_api_key: Option<String>,
    pub ai_model: String,
    pub debug: bool,
}

fn flag(value: &str) -> bool {
    value == "1" || value.eq_ignore_ascii_case("true")
}

fn default_data_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "fitlog").map(|dirs| dirs.data_local_dir().to_path_buf())
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let data_dir = match lookup("FITLOG_DATA_DIR") {
            Some(dir) if !dir.trim().is_empty() => PathBuf::from(dir),
            _ => default_data_dir()
                .ok_or_else(|| anyhow!("no data directory; set FITLOG_DATA_DIR"))?,
        };

        Ok(Self {
            data_dir,
            user_id: lookup("FITLOG_USER_ID")
                .filter(|id| !id.trim().is_empty())
                .unwrap_or_else(|| "local".to_string()),
            gemini_api_key: lookup("GEMINI_API_KEY").filter(|key| !key.trim().is_empty()),
            ai_model: lookup("FITLOG_AI_MODEL").unwrap_or_else(|| DEFAULT_AI_MODEL.to_string()),
            debug: lookup("FITLOG_DEBUG").map(|v| flag(&v)).unwrap_or(false),
        })
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("fitlog.sqlite3")
    }

    pub fn local_store_dir(&self) -> PathBuf {
        self.data_dir.join("local")
    }
}
