use anyhow::{anyhow, bail, Result};
use chrono::Utc;
use rusqlite::{params, OptionalExtension, Row};

use crate::db::{
    connection::Database,
    helpers::parse_datetime,
    models::{Routine, UserProfile, UserRole},
};

const PROFILE_COLUMNS: &str = "id, display_name, role, trainer_id, height_cm, calorie_goal, protein_goal, water_goal_ml, updated_at";

fn row_to_profile(row: &Row) -> Result<UserProfile> {
    let role: String = row.get("role")?;
    let updated_at: String = row.get("updated_at")?;

    Ok(UserProfile {
        id: row.get("id")?,
        display_name: row.get("display_name")?,
        role: UserRole::parse(&role).ok_or_else(|| anyhow!("unknown role {role}"))?,
        trainer_id: row.get("trainer_id")?,
        height_cm: row.get("height_cm")?,
        calorie_goal: row.get("calorie_goal")?,
        protein_goal: row.get("protein_goal")?,
        water_goal_ml: row.get("water_goal_ml")?,
        updated_at: parse_datetime(&updated_at, "updated_at")?,
    })
}

impl Database {
    pub async fn upsert_profile(&self, profile: &UserProfile) -> Result<UserProfile> {
        let mut record = profile.clone();
        record.updated_at = Utc::now();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO profiles (id, display_name, role, trainer_id, height_cm, calorie_goal, protein_goal, water_goal_ml, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                 ON CONFLICT(id) DO UPDATE SET
                     display_name = excluded.display_name,
                     role = excluded.role,
                     trainer_id = excluded.trainer_id,
                     height_cm = excluded.height_cm,
                     calorie_goal = excluded.calorie_goal,
                     protein_goal = excluded.protein_goal,
                     water_goal_ml = excluded.water_goal_ml,
                     updated_at = excluded.updated_at",
                params![
                    record.id,
                    record.display_name,
                    record.role.as_str(),
                    record.trainer_id,
                    record.height_cm,
                    record.calorie_goal,
                    record.protein_goal,
                    record.water_goal_ml,
                    record.updated_at.to_rfc3339(),
                ],
            )?;
            Ok(record)
        })
        .await
    }

    pub async fn get_profile(&self, user_id: &str) -> Result<Option<UserProfile>> {
        let user_id = user_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {PROFILE_COLUMNS} FROM profiles WHERE id = ?1"
            ))?;
            let mut rows = stmt.query(params![user_id])?;
            let profile = match rows.next()? {
                Some(row) => Some(row_to_profile(row)?),
                None => None,
            };
            Ok(profile)
        })
        .await
    }

    /// Links a trainee to a trainer. The trainer profile must exist and carry the trainer role.
    pub async fn link_trainer(&self, trainee_id: &str, trainer_id: &str) -> Result<()> {
        let trainee_id = trainee_id.to_string();
        let trainer_id = trainer_id.to_string();
        self.execute(move |conn| {
            if trainee_id == trainer_id {
                bail!("A user cannot train themselves");
            }
            let role: Option<String> = conn
                .query_row(
                    "SELECT role FROM profiles WHERE id = ?1",
                    params![trainer_id],
                    |row| row.get(0),
                )
                .optional()?;
            match role.as_deref() {
                Some("trainer") => {}
                Some(_) => bail!("Profile {trainer_id} is not a trainer"),
                None => bail!("Trainer not found"),
            }

            let rows_affected = conn.execute(
                "UPDATE profiles SET trainer_id = ?1, updated_at = ?2 WHERE id = ?3",
                params![trainer_id, Utc::now().to_rfc3339(), trainee_id],
            )?;
            if rows_affected == 0 {
                bail!("Trainee not found");
            }
            Ok(())
        })
        .await
    }

    pub async fn unlink_trainer(&self, trainee_id: &str) -> Result<()> {
        let trainee_id = trainee_id.to_string();
        self.execute(move |conn| {
            conn.execute(
                "UPDATE profiles SET trainer_id = NULL, updated_at = ?1 WHERE id = ?2",
                params![Utc::now().to_rfc3339(), trainee_id],
            )?;
            Ok(())
        })
        .await
    }

    pub async fn list_trainees(&self, trainer_id: &str) -> Result<Vec<UserProfile>> {
        let trainer_id = trainer_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {PROFILE_COLUMNS} FROM profiles
                 WHERE trainer_id = ?1
                 ORDER BY display_name COLLATE NOCASE ASC"
            ))?;
            let mut rows = stmt.query(params![trainer_id])?;
            let mut profiles = Vec::new();
            while let Some(row) = rows.next()? {
                profiles.push(row_to_profile(row)?);
            }
            Ok(profiles)
        })
        .await
    }

    /// Copies a routine into the trainee's library, stamped with the assigning trainer.
    pub async fn assign_routine(
        &self,
        trainer_id: &str,
        trainee_id: &str,
        routine: &Routine,
    ) -> Result<Routine> {
        let trainee = self
            .get_profile(trainee_id)
            .await?
            .ok_or_else(|| anyhow!("Trainee not found"))?;
        if trainee.trainer_id.as_deref() != Some(trainer_id) {
            bail!("Trainee is not linked to this trainer");
        }

        let now = Utc::now();
        let assigned = Routine {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: trainee.id,
            assigned_by: Some(trainer_id.to_string()),
            created_at: now,
            updated_at: now,
            ..routine.clone()
        };
        self.upsert_routine(&assigned).await
    }
}
