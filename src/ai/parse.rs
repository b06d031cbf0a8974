//! Turns free-form model output into typed values.
//!
//! Models wrap JSON in prose or code fences. The payload is cut out between the outermost
//! braces and then decoded strictly; anything that does not match is a [`ParseError`].

use serde::{de::DeserializeOwned, Deserialize};
use thiserror::Error;

use super::{FoodAnalysis, GeneratedRoutine};

#[derive(Debug, Error, PartialEq)]
pub enum ParseError {
    #[error("no JSON object in response")]
    NoJson,
    #[error("invalid JSON: {0}")]
    InvalidJson(String),
    #[error("response does not match the expected shape: {0}")]
    SchemaMismatch(String),
    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the language tag line ("```json").
    let body = rest.split_once('\n').map_or("", |(_, body)| body);
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// The slice from the first `{` to the last `}`.
pub fn extract_json(text: &str) -> Result<&str, ParseError> {
    let text = strip_code_fences(text);
    let start = text.find('{').ok_or(ParseError::NoJson)?;
    let end = text.rfind('}').ok_or(ParseError::NoJson)?;
    if end < start {
        return Err(ParseError::NoJson);
    }
    Ok(&text[start..=end])
}

fn decode<T: DeserializeOwned>(text: &str) -> Result<T, ParseError> {
    let json = extract_json(text)?;
    let value: serde_json::Value =
        serde_json::from_str(json).map_err(|e| ParseError::InvalidJson(e.to_string()))?;
    serde_json::from_value(value).map_err(|e| ParseError::SchemaMismatch(e.to_string()))
}

fn invalid(field: impl Into<String>, reason: &str) -> ParseError {
    ParseError::InvalidValue {
        field: field.into(),
        reason: reason.to_string(),
    }
}

fn check_amount(field: String, value: f64) -> Result<(), ParseError> {
    if !value.is_finite() || value < 0.0 {
        return Err(invalid(field, "must be a non-negative number"));
    }
    Ok(())
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RoutinesEnvelope {
    routines: Vec<GeneratedRoutine>,
}

pub fn parse_routines(text: &str) -> Result<Vec<GeneratedRoutine>, ParseError> {
    let envelope: RoutinesEnvelope = decode(text)?;
    if envelope.routines.is_empty() {
        return Err(invalid("routines", "must not be empty"));
    }

    for (i, routine) in envelope.routines.iter().enumerate() {
        if routine.name.trim().is_empty() {
            return Err(invalid(format!("routines[{i}].name"), "must not be blank"));
        }
        if routine.exercises.is_empty() {
            return Err(invalid(format!("routines[{i}].exercises"), "must not be empty"));
        }
        for (j, exercise) in routine.exercises.iter().enumerate() {
            let field = format!("routines[{i}].exercises[{j}]");
            if exercise.name.trim().is_empty() {
                return Err(invalid(format!("{field}.name"), "must not be blank"));
            }
            if exercise.sets == 0 {
                return Err(invalid(format!("{field}.sets"), "must be at least 1"));
            }
            if let Some(weight) = exercise.weight {
                check_amount(format!("{field}.weight"), weight)?;
            }
        }
    }

    Ok(envelope.routines)
}

pub fn parse_food_analysis(text: &str) -> Result<FoodAnalysis, ParseError> {
    let analysis: FoodAnalysis = decode(text)?;
    for (i, item) in analysis.items.iter().enumerate() {
        if item.name.trim().is_empty() {
            return Err(invalid(format!("items[{i}].name"), "must not be blank"));
        }
        check_amount(format!("items[{i}].calories"), item.calories)?;
        check_amount(format!("items[{i}].protein"), item.protein)?;
        check_amount(format!("items[{i}].carbs"), item.carbs)?;
        check_amount(format!("items[{i}].fats"), item.fats)?;
        check_amount(format!("items[{i}].quantity"), item.quantity)?;
    }
    Ok(analysis)
}
