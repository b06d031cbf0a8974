use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BodyWeightEntry {
    pub id: String,
    pub user_id: String,
    pub weight_kg: f64,
    pub measured_on: NaiveDate,
    #[serde(default)]
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}
