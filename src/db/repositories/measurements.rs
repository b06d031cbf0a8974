use anyhow::{anyhow, Result};
use chrono::NaiveDate;
use rusqlite::{params, Row};

use crate::db::{
    connection::Database,
    helpers::{format_date, parse_date, parse_datetime},
    models::BodyWeightEntry,
};

fn row_to_entry(row: &Row) -> Result<BodyWeightEntry> {
    let measured_on: String = row.get("measured_on")?;
    let created_at: String = row.get("created_at")?;

    Ok(BodyWeightEntry {
        id: row.get("id")?,
        user_id: row.get("user_id")?,
        weight_kg: row.get("weight_kg")?,
        measured_on: parse_date(&measured_on, "measured_on")?,
        note: row.get("note")?,
        created_at: parse_datetime(&created_at, "created_at")?,
    })
}

impl Database {
    pub async fn insert_body_weight(&self, entry: &BodyWeightEntry) -> Result<()> {
        let record = entry.clone();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO body_weights (id, user_id, weight_kg, measured_on, note, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    record.id,
                    record.user_id,
                    record.weight_kg,
                    format_date(record.measured_on),
                    record.note,
                    record.created_at.to_rfc3339(),
                ],
            )?;
            Ok(())
        })
        .await
    }

    /// Oldest first, optionally bounded below by `since`.
    pub async fn list_body_weights(
        &self,
        user_id: &str,
        since: Option<NaiveDate>,
    ) -> Result<Vec<BodyWeightEntry>> {
        let user_id = user_id.to_string();
        let since = since.map(format_date).unwrap_or_default();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, weight_kg, measured_on, note, created_at
                 FROM body_weights
                 WHERE user_id = ?1 AND measured_on >= ?2
                 ORDER BY measured_on ASC, created_at ASC",
            )?;
            let mut rows = stmt.query(params![user_id, since])?;
            let mut entries = Vec::new();
            while let Some(row) = rows.next()? {
                entries.push(row_to_entry(row)?);
            }
            Ok(entries)
        })
        .await
    }

    pub async fn delete_body_weight(&self, entry_id: &str) -> Result<()> {
        let entry_id = entry_id.to_string();
        self.execute(move |conn| {
            let rows_affected =
                conn.execute("DELETE FROM body_weights WHERE id = ?1", params![entry_id])?;
            if rows_affected == 0 {
                return Err(anyhow!("Measurement not found"));
            }
            Ok(())
        })
        .await
    }
}
