//! Boundary towards the generative-AI service: routine generation, coaching chat and
//! food photo analysis.

pub mod gemini;
pub mod image;
pub mod parse;
pub mod prompts;

pub use gemini::GeminiService;
pub use parse::ParseError;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::{
    db::models::{Routine, RoutineExercise},
    models::TrackingType,
};

#[derive(Debug, Error)]
pub enum AiError {
    #[error("AI service rate limited: {0}")]
    RateLimited(String),
    #[error("AI request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("AI service error ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("unusable AI response: {0}")]
    Parse(#[from] ParseError),
    #[error("could not prepare image: {0}")]
    Image(String),
    #[error("no AI API key configured")]
    MissingApiKey,
}

impl AiError {
    /// Text shown in place of a result. Never empty.
    pub fn user_message(&self) -> String {
        match self {
            AiError::RateLimited(message) => message.clone(),
            AiError::Http(_) => {
                "Couldn't reach the AI service. Check your connection and try again.".to_string()
            }
            AiError::Api { .. } => "The AI service had a problem. Please try again.".to_string(),
            AiError::Parse(_) => {
                "The AI answer couldn't be understood. Please try again.".to_string()
            }
            AiError::Image(_) => "That photo couldn't be read. Try another one.".to_string(),
            AiError::MissingApiKey => {
                "AI features are off. Set GEMINI_API_KEY to enable them.".to_string()
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Model,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub text: String,
}

impl ChatTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            text: text.into(),
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Model,
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct GeneratedExercise {
    pub name: String,
    pub sets: u32,
    pub reps: u32,
    #[serde(default)]
    pub weight: Option<f64>,
    #[serde(default)]
    pub rest_seconds: Option<u32>,
    #[serde(default)]
    pub tracking_type: Option<TrackingType>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct GeneratedRoutine {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub exercises: Vec<GeneratedExercise>,
}

impl GeneratedRoutine {
    /// Materializes the suggestion as a routine owned by `user_id`.
    pub fn into_routine(self, user_id: &str) -> Routine {
        let now = Utc::now();
        Routine {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            name: self.name,
            description: self.description,
            exercises: self
                .exercises
                .into_iter()
                .map(|exercise| RoutineExercise {
                    name: exercise.name,
                    tracking_type: exercise.tracking_type.unwrap_or_default(),
                    target_sets: exercise.sets,
                    target_reps: exercise.reps,
                    target_weight: exercise.weight,
                    rest_seconds: exercise.rest_seconds,
                })
                .collect(),
            assigned_by: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct FoodItem {
    pub name: String,
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fats: f64,
    pub quantity: f64,
    pub unit: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct FoodAnalysis {
    pub items: Vec<FoodItem>,
    #[serde(default)]
    pub notes: String,
}

#[async_trait]
pub trait AiService: Send + Sync {
    async fn generate_routines(&self, prompt: &str) -> Result<Vec<GeneratedRoutine>, AiError>;

    /// `history` is oldest first and does not include `message`.
    async fn chat(&self, message: &str, history: &[ChatTurn]) -> Result<String, AiError>;

    async fn analyze_food_image(&self, image: &[u8]) -> Result<FoodAnalysis, AiError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_error_has_a_message() {
        let errors = [
            AiError::RateLimited("Slow down".into()),
            AiError::Api {
                status: 500,
                message: "boom".into(),
            },
            AiError::Parse(ParseError::NoJson),
            AiError::Image("bad".into()),
            AiError::MissingApiKey,
        ];
        for error in errors {
            assert!(!error.user_message().is_empty());
        }
        assert_eq!(AiError::RateLimited("Slow down".into()).user_message(), "Slow down");
    }

    #[test]
    fn generated_routine_becomes_owned_routine() {
        let generated = GeneratedRoutine {
            name: "Upper".into(),
            description: None,
            exercises: vec![GeneratedExercise {
                name: "Row".into(),
                sets: 3,
                reps: 10,
                weight: Some(40.0),
                rest_seconds: None,
                tracking_type: None,
            }],
        };
        let routine = generated.into_routine("u1");
        assert_eq!(routine.user_id, "u1");
        assert_eq!(routine.exercises[0].target_sets, 3);
        assert_eq!(routine.exercises[0].tracking_type, TrackingType::WeightReps);
        assert!(routine.assigned_by.is_none());
    }
}
