use anyhow::{anyhow, Result};
use chrono::NaiveDate;
use rusqlite::{params, Row};

use crate::db::{
    connection::Database,
    helpers::{format_date, parse_date, parse_datetime},
    models::{CustomFood, FoodLog, FoodSource, Macros, Meal, WaterLog},
};

fn row_to_macros(row: &Row) -> Result<Macros> {
    Ok(Macros {
        calories: row.get("calories")?,
        protein: row.get("protein")?,
        carbs: row.get("carbs")?,
        fats: row.get("fats")?,
    })
}

fn row_to_food_log(row: &Row) -> Result<FoodLog> {
    let logged_on: String = row.get("logged_on")?;
    let meal: String = row.get("meal")?;
    let source: String = row.get("source")?;
    let created_at: String = row.get("created_at")?;

    Ok(FoodLog {
        id: row.get("id")?,
        user_id: row.get("user_id")?,
        logged_on: parse_date(&logged_on, "logged_on")?,
        meal: Meal::parse(&meal).ok_or_else(|| anyhow!("unknown meal {meal}"))?,
        name: row.get("name")?,
        macros: row_to_macros(row)?,
        quantity: row.get("quantity")?,
        unit: row.get("unit")?,
        source: FoodSource::parse(&source).ok_or_else(|| anyhow!("unknown food source {source}"))?,
        created_at: parse_datetime(&created_at, "created_at")?,
    })
}

fn row_to_water_log(row: &Row) -> Result<WaterLog> {
    let logged_on: String = row.get("logged_on")?;
    let created_at: String = row.get("created_at")?;

    Ok(WaterLog {
        id: row.get("id")?,
        user_id: row.get("user_id")?,
        logged_on: parse_date(&logged_on, "logged_on")?,
        amount_ml: row.get("amount_ml")?,
        created_at: parse_datetime(&created_at, "created_at")?,
    })
}

fn row_to_custom_food(row: &Row) -> Result<CustomFood> {
    Ok(CustomFood {
        id: row.get("id")?,
        user_id: row.get("user_id")?,
        name: row.get("name")?,
        macros: row_to_macros(row)?,
        serving_quantity: row.get("serving_quantity")?,
        serving_unit: row.get("serving_unit")?,
    })
}

impl Database {
    pub async fn insert_food_log(&self, log: &FoodLog) -> Result<()> {
        let record = log.clone();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO food_logs (id, user_id, logged_on, meal, name, calories, protein, carbs, fats, quantity, unit, source, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
                params![
                    record.id,
                    record.user_id,
                    format_date(record.logged_on),
                    record.meal.as_str(),
                    record.name,
                    record.macros.calories,
                    record.macros.protein,
                    record.macros.carbs,
                    record.macros.fats,
                    record.quantity,
                    record.unit,
                    record.source.as_str(),
                    record.created_at.to_rfc3339(),
                ],
            )?;
            Ok(())
        })
        .await
    }

    pub async fn list_food_logs(&self, user_id: &str, day: NaiveDate) -> Result<Vec<FoodLog>> {
        let user_id = user_id.to_string();
        let day = format_date(day);
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, logged_on, meal, name, calories, protein, carbs, fats, quantity, unit, source, created_at
                 FROM food_logs
                 WHERE user_id = ?1 AND logged_on = ?2
                 ORDER BY created_at ASC",
            )?;
            let mut rows = stmt.query(params![user_id, day])?;
            let mut logs = Vec::new();
            while let Some(row) = rows.next()? {
                logs.push(row_to_food_log(row)?);
            }
            Ok(logs)
        })
        .await
    }

    pub async fn delete_food_log(&self, log_id: &str) -> Result<()> {
        let log_id = log_id.to_string();
        self.execute(move |conn| {
            let rows_affected = conn.execute("DELETE FROM food_logs WHERE id = ?1", params![log_id])?;
            if rows_affected == 0 {
                return Err(anyhow!("Food log not found"));
            }
            Ok(())
        })
        .await
    }

    pub async fn insert_water_log(&self, log: &WaterLog) -> Result<()> {
        let record = log.clone();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO water_logs (id, user_id, logged_on, amount_ml, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    record.id,
                    record.user_id,
                    format_date(record.logged_on),
                    record.amount_ml,
                    record.created_at.to_rfc3339(),
                ],
            )?;
            Ok(())
        })
        .await
    }

    pub async fn list_water_logs(&self, user_id: &str, day: NaiveDate) -> Result<Vec<WaterLog>> {
        let user_id = user_id.to_string();
        let day = format_date(day);
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, logged_on, amount_ml, created_at
                 FROM water_logs
                 WHERE user_id = ?1 AND logged_on = ?2
                 ORDER BY created_at ASC",
            )?;
            let mut rows = stmt.query(params![user_id, day])?;
            let mut logs = Vec::new();
            while let Some(row) = rows.next()? {
                logs.push(row_to_water_log(row)?);
            }
            Ok(logs)
        })
        .await
    }

    pub async fn delete_water_log(&self, log_id: &str) -> Result<()> {
        let log_id = log_id.to_string();
        self.execute(move |conn| {
            let rows_affected =
                conn.execute("DELETE FROM water_logs WHERE id = ?1", params![log_id])?;
            if rows_affected == 0 {
                return Err(anyhow!("Water log not found"));
            }
            Ok(())
        })
        .await
    }

    pub async fn upsert_custom_food(&self, food: &CustomFood) -> Result<()> {
        let record = food.clone();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO custom_foods (id, user_id, name, calories, protein, carbs, fats, serving_quantity, serving_unit)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                 ON CONFLICT(id) DO UPDATE SET
                     name = excluded.name,
                     calories = excluded.calories,
                     protein = excluded.protein,
                     carbs = excluded.carbs,
                     fats = excluded.fats,
                     serving_quantity = excluded.serving_quantity,
                     serving_unit = excluded.serving_unit",
                params![
                    record.id,
                    record.user_id,
                    record.name,
                    record.macros.calories,
                    record.macros.protein,
                    record.macros.carbs,
                    record.macros.fats,
                    record.serving_quantity,
                    record.serving_unit,
                ],
            )?;
            Ok(())
        })
        .await
    }

    pub async fn list_custom_foods(&self, user_id: &str) -> Result<Vec<CustomFood>> {
        let user_id = user_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, name, calories, protein, carbs, fats, serving_quantity, serving_unit
                 FROM custom_foods
                 WHERE user_id = ?1
                 ORDER BY name COLLATE NOCASE ASC",
            )?;
            let mut rows = stmt.query(params![user_id])?;
            let mut foods = Vec::new();
            while let Some(row) = rows.next()? {
                foods.push(row_to_custom_food(row)?);
            }
            Ok(foods)
        })
        .await
    }

    pub async fn delete_custom_food(&self, food_id: &str) -> Result<()> {
        let food_id = food_id.to_string();
        self.execute(move |conn| {
            let rows_affected =
                conn.execute("DELETE FROM custom_foods WHERE id = ?1", params![food_id])?;
            if rows_affected == 0 {
                return Err(anyhow!("Custom food not found"));
            }
            Ok(())
        })
        .await
    }
}
