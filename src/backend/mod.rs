//! Data boundary towards the hosted backend.
//!
//! Every record is keyed by an opaque id and, except profiles, by the owning user id.
//! [`crate::db::Database`] is the bundled implementation.

mod sqlite;

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;

use crate::db::models::{
    BodyWeightEntry, CustomFood, FoodLog, Routine, SessionRecord, UserProfile, WaterLog,
};

#[async_trait]
pub trait Backend: Send + Sync {
    async fn list_routines(&self, user_id: &str) -> Result<Vec<Routine>>;
    async fn get_routine(&self, routine_id: &str) -> Result<Option<Routine>>;
    async fn save_routine(&self, routine: &Routine) -> Result<Routine>;
    async fn delete_routine(&self, routine_id: &str) -> Result<()>;

    async fn save_session(&self, record: &SessionRecord) -> Result<()>;
    async fn get_session(&self, session_id: &str) -> Result<Option<SessionRecord>>;
    /// Newest first.
    async fn list_sessions(&self, user_id: &str, limit: usize) -> Result<Vec<SessionRecord>>;
    async fn delete_session(&self, session_id: &str) -> Result<()>;

    async fn add_body_weight(&self, entry: &BodyWeightEntry) -> Result<()>;
    async fn list_body_weights(
        &self,
        user_id: &str,
        since: Option<NaiveDate>,
    ) -> Result<Vec<BodyWeightEntry>>;
    async fn delete_body_weight(&self, entry_id: &str) -> Result<()>;

    async fn add_food_log(&self, log: &FoodLog) -> Result<()>;
    async fn list_food_logs(&self, user_id: &str, day: NaiveDate) -> Result<Vec<FoodLog>>;
    async fn delete_food_log(&self, log_id: &str) -> Result<()>;

    async fn add_water_log(&self, log: &WaterLog) -> Result<()>;
    async fn list_water_logs(&self, user_id: &str, day: NaiveDate) -> Result<Vec<WaterLog>>;
    async fn delete_water_log(&self, log_id: &str) -> Result<()>;

    async fn save_custom_food(&self, food: &CustomFood) -> Result<()>;
    async fn list_custom_foods(&self, user_id: &str) -> Result<Vec<CustomFood>>;
    async fn delete_custom_food(&self, food_id: &str) -> Result<()>;

    async fn get_profile(&self, user_id: &str) -> Result<Option<UserProfile>>;
    async fn save_profile(&self, profile: &UserProfile) -> Result<UserProfile>;

    async fn link_trainer(&self, trainee_id: &str, trainer_id: &str) -> Result<()>;
    async fn unlink_trainer(&self, trainee_id: &str) -> Result<()>;
    async fn list_trainees(&self, trainer_id: &str) -> Result<Vec<UserProfile>>;
    async fn assign_routine(
        &self,
        trainer_id: &str,
        trainee_id: &str,
        routine: &Routine,
    ) -> Result<Routine>;
}
