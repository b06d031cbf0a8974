use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    #[default]
    Trainee,
    Trainer,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Trainee => "trainee",
            UserRole::Trainer => "trainer",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "trainee" => Some(UserRole::Trainee),
            "trainer" => Some(UserRole::Trainer),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub display_name: String,
    #[serde(default)]
    pub role: UserRole,
    #[serde(default)]
    pub trainer_id: Option<String>,
    #[serde(default)]
    pub height_cm: Option<f64>,
    pub calorie_goal: u32,
    pub protein_goal: u32,
    pub water_goal_ml: u32,
    pub updated_at: DateTime<Utc>,
}

impl UserProfile {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            role: UserRole::Trainee,
            trainer_id: None,
            height_cm: None,
            calorie_goal: 2200,
            protein_goal: 150,
            water_goal_ml: 2500,
            updated_at: Utc::now(),
        }
    }
}
