use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;

use super::Backend;
use crate::db::{
    models::{BodyWeightEntry, CustomFood, FoodLog, Routine, SessionRecord, UserProfile, WaterLog},
    Database,
};

#[async_trait]
impl Backend for Database {
    async fn list_routines(&self, user_id: &str) -> Result<Vec<Routine>> {
        Database::list_routines(self, user_id).await
    }

    async fn get_routine(&self, routine_id: &str) -> Result<Option<Routine>> {
        Database::get_routine(self, routine_id).await
    }

    async fn save_routine(&self, routine: &Routine) -> Result<Routine> {
        self.upsert_routine(routine).await
    }

    async fn delete_routine(&self, routine_id: &str) -> Result<()> {
        Database::delete_routine(self, routine_id).await
    }

    async fn save_session(&self, record: &SessionRecord) -> Result<()> {
        self.save_session_record(record).await
    }

    async fn get_session(&self, session_id: &str) -> Result<Option<SessionRecord>> {
        self.get_session_record(session_id).await
    }

    async fn list_sessions(&self, user_id: &str, limit: usize) -> Result<Vec<SessionRecord>> {
        self.list_session_records(user_id, limit, 0).await
    }

    async fn delete_session(&self, session_id: &str) -> Result<()> {
        self.delete_session_record(session_id).await
    }

    async fn add_body_weight(&self, entry: &BodyWeightEntry) -> Result<()> {
        self.insert_body_weight(entry).await
    }

    async fn list_body_weights(
        &self,
        user_id: &str,
        since: Option<NaiveDate>,
    ) -> Result<Vec<BodyWeightEntry>> {
        Database::list_body_weights(self, user_id, since).await
    }

    async fn delete_body_weight(&self, entry_id: &str) -> Result<()> {
        Database::delete_body_weight(self, entry_id).await
    }

    async fn add_food_log(&self, log: &FoodLog) -> Result<()> {
        self.insert_food_log(log).await
    }

    async fn list_food_logs(&self, user_id: &str, day: NaiveDate) -> Result<Vec<FoodLog>> {
        Database::list_food_logs(self, user_id, day).await
    }

    async fn delete_food_log(&self, log_id: &str) -> Result<()> {
        Database::delete_food_log(self, log_id).await
    }

    async fn add_water_log(&self, log: &WaterLog) -> Result<()> {
        self.insert_water_log(log).await
    }

    async fn list_water_logs(&self, user_id: &str, day: NaiveDate) -> Result<Vec<WaterLog>> {
        Database::list_water_logs(self, user_id, day).await
    }

    async fn delete_water_log(&self, log_id: &str) -> Result<()> {
        Database::delete_water_log(self, log_id).await
    }

    async fn save_custom_food(&self, food: &CustomFood) -> Result<()> {
        self.upsert_custom_food(food).await
    }

    async fn list_custom_foods(&self, user_id: &str) -> Result<Vec<CustomFood>> {
        Database::list_custom_foods(self, user_id).await
    }

    async fn delete_custom_food(&self, food_id: &str) -> Result<()> {
        Database::delete_custom_food(self, food_id).await
    }

    async fn get_profile(&self, user_id: &str) -> Result<Option<UserProfile>> {
        Database::get_profile(self, user_id).await
    }

    async fn save_profile(&self, profile: &UserProfile) -> Result<UserProfile> {
        self.upsert_profile(profile).await
    }

    async fn link_trainer(&self, trainee_id: &str, trainer_id: &str) -> Result<()> {
        Database::link_trainer(self, trainee_id, trainer_id).await
    }

    async fn unlink_trainer(&self, trainee_id: &str) -> Result<()> {
        Database::unlink_trainer(self, trainee_id).await
    }

    async fn list_trainees(&self, trainer_id: &str) -> Result<Vec<UserProfile>> {
        Database::list_trainees(self, trainer_id).await
    }

    async fn assign_routine(
        &self,
        trainer_id: &str,
        trainee_id: &str,
        routine: &Routine,
    ) -> Result<Routine> {
        Database::assign_routine(self, trainer_id, trainee_id, routine).await
    }
}
