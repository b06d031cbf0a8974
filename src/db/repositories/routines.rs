use anyhow::{anyhow, Result};
use chrono::Utc;
use rusqlite::{params, Row};

use crate::db::{
    connection::Database,
    helpers::{from_json_column, parse_datetime, to_json_column},
    models::Routine,
};

const ROUTINE_COLUMNS: &str =
    "id, user_id, name, description, exercises, assigned_by, created_at, updated_at";

fn row_to_routine(row: &Row) -> Result<Routine> {
    let exercises: String = row.get("exercises")?;
    let created_at: String = row.get("created_at")?;
    let updated_at: String = row.get("updated_at")?;

    Ok(Routine {
        id: row.get("id")?,
        user_id: row.get("user_id")?,
        name: row.get("name")?,
        description: row.get("description")?,
        exercises: from_json_column(&exercises, "exercises")?,
        assigned_by: row.get("assigned_by")?,
        created_at: parse_datetime(&created_at, "created_at")?,
        updated_at: parse_datetime(&updated_at, "updated_at")?,
    })
}

impl Database {
    /// Inserts or replaces a routine; `updated_at` is stamped here.
    pub async fn upsert_routine(&self, routine: &Routine) -> Result<Routine> {
        let mut record = routine.clone();
        record.updated_at = Utc::now();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO routines (id, user_id, name, description, exercises, assigned_by, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                 ON CONFLICT(id) DO UPDATE SET
                     name = excluded.name,
                     description = excluded.description,
                     exercises = excluded.exercises,
                     assigned_by = excluded.assigned_by,
                     updated_at = excluded.updated_at",
                params![
                    record.id,
                    record.user_id,
                    record.name,
                    record.description,
                    to_json_column(&record.exercises, "exercises")?,
                    record.assigned_by,
                    record.created_at.to_rfc3339(),
                    record.updated_at.to_rfc3339(),
                ],
            )?;
            Ok(record)
        })
        .await
    }

    pub async fn get_routine(&self, routine_id: &str) -> Result<Option<Routine>> {
        let routine_id = routine_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {ROUTINE_COLUMNS} FROM routines WHERE id = ?1"
            ))?;
            let mut rows = stmt.query(params![routine_id])?;
            let routine = match rows.next()? {
                Some(row) => Some(row_to_routine(row)?),
                None => None,
            };
            Ok(routine)
        })
        .await
    }

    pub async fn list_routines(&self, user_id: &str) -> Result<Vec<Routine>> {
        let user_id = user_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {ROUTINE_COLUMNS} FROM routines
                 WHERE user_id = ?1
                 ORDER BY name COLLATE NOCASE ASC"
            ))?;
            let mut rows = stmt.query(params![user_id])?;
            let mut routines = Vec::new();
            while let Some(row) = rows.next()? {
                routines.push(row_to_routine(row)?);
            }
            Ok(routines)
        })
        .await
    }

    pub async fn delete_routine(&self, routine_id: &str) -> Result<()> {
        let routine_id = routine_id.to_string();
        self.execute(move |conn| {
            let rows_affected =
                conn.execute("DELETE FROM routines WHERE id = ?1", params![routine_id])?;
            if rows_affected == 0 {
                return Err(anyhow!("Routine not found"));
            }
            Ok(())
        })
        .await
    }
}
