use anyhow::{anyhow, Result};
use rusqlite::{params, Row};

use crate::db::{
    connection::Database,
    helpers::{from_json_column, parse_datetime, to_i64, to_json_column, to_u64},
    models::SessionRecord,
};

const SESSION_COLUMNS: &str = "id, user_id, routine_id, name, started_at, ended_at, duration_seconds, total_paused_ms, total_volume, exercises, notes";

fn row_to_session(row: &Row) -> Result<SessionRecord> {
    let started_at: String = row.get("started_at")?;
    let ended_at: String = row.get("ended_at")?;
    let duration_seconds: i64 = row.get("duration_seconds")?;
    let total_paused_ms: i64 = row.get("total_paused_ms")?;
    let exercises: String = row.get("exercises")?;

    Ok(SessionRecord {
        id: row.get("id")?,
        user_id: row.get("user_id")?,
        routine_id: row.get("routine_id")?,
        name: row.get("name")?,
        started_at: parse_datetime(&started_at, "started_at")?,
        ended_at: parse_datetime(&ended_at, "ended_at")?,
        duration_seconds: to_u64(duration_seconds, "duration_seconds")?,
        total_paused_ms: to_u64(total_paused_ms, "total_paused_ms")?,
        total_volume: row.get("total_volume")?,
        exercises: from_json_column(&exercises, "exercises")?,
        notes: row.get("notes")?,
    })
}

impl Database {
    /// Writes a completed session. Re-saving an edited record replaces the stored row.
    pub async fn save_session_record(&self, session: &SessionRecord) -> Result<()> {
        let record = session.clone();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO sessions (id, user_id, routine_id, name, started_at, ended_at, duration_seconds, total_paused_ms, total_volume, exercises, notes)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
                 ON CONFLICT(id) DO UPDATE SET
                     name = excluded.name,
                     ended_at = excluded.ended_at,
                     duration_seconds = excluded.duration_seconds,
                     total_paused_ms = excluded.total_paused_ms,
                     total_volume = excluded.total_volume,
                     exercises = excluded.exercises,
                     notes = excluded.notes",
                params![
                    record.id,
                    record.user_id,
                    record.routine_id,
                    record.name,
                    record.started_at.to_rfc3339(),
                    record.ended_at.to_rfc3339(),
                    to_i64(record.duration_seconds)?,
                    to_i64(record.total_paused_ms)?,
                    record.total_volume,
                    to_json_column(&record.exercises, "exercises")?,
                    record.notes,
                ],
            )?;
            Ok(())
        })
        .await
    }

    pub async fn get_session_record(&self, session_id: &str) -> Result<Option<SessionRecord>> {
        let session_id = session_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SESSION_COLUMNS} FROM sessions WHERE id = ?1"
            ))?;
            let mut rows = stmt.query(params![session_id])?;
            let session = match rows.next()? {
                Some(row) => Some(row_to_session(row)?),
                None => None,
            };
            Ok(session)
        })
        .await
    }

    /// Newest first.
    pub async fn list_session_records(
        &self,
        user_id: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<SessionRecord>> {
        let user_id = user_id.to_string();
        let limit = limit as i64;
        let offset = offset as i64;
        self.execute(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SESSION_COLUMNS} FROM sessions
                 WHERE user_id = ?1
                 ORDER BY started_at DESC
                 LIMIT ?2 OFFSET ?3"
            ))?;

            let mut rows = stmt.query(params![user_id, limit, offset])?;
            let mut sessions = Vec::new();
            while let Some(row) = rows.next()? {
                sessions.push(row_to_session(row)?);
            }

            Ok(sessions)
        })
        .await
    }

    pub async fn delete_session_record(&self, session_id: &str) -> Result<()> {
        let session_id = session_id.to_string();
        self.execute(move |conn| {
            let rows_affected =
                conn.execute("DELETE FROM sessions WHERE id = ?1", params![session_id])?;
            if rows_affected == 0 {
                return Err(anyhow!("Session not found"));
            }
            Ok(())
        })
        .await
    }
}
