use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct HealthEntry {
    pub id: i64,
    pub user_id: i64,
    pub date: String,
    pub weight: Option<f64>,
    pub sleep_hours: Option<f64>,
    pub mood: Option<String>,
    pub energy_level: Option<i64>,
    pub created_at: String,
}

/// Upsert body. Numeric fields stay optional and unvalidated; the intended
/// 0-10 energy range is a client concern.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthEntryRequest {
    pub date: Option<String>,
    pub weight: Option<f64>,
    pub sleep_hours: Option<f64>,
    pub mood: Option<String>,
    pub energy_level: Option<i64>,
}
