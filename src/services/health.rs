use std::sync::Arc;

use chrono::Local;
use serde_json::{Value, json};
use sqlx::SqlitePool;
use tracing::warn;

use crate::advisor::AdvisorClient;
use crate::db::repository;
use crate::error::AppError;
use crate::models::{HealthEntry, HealthEntryRequest};

/// Number of historical entries forwarded to the analyzer.
const HISTORY_LIMIT: i64 = 30;

pub fn today_string() -> String {
    Local::now().format("%Y-%m-%d").to_string()
}

/// Upsert the day's entry, then ask the analyzer for a wellness report over
/// the recent history. The analyzer call is best-effort: on failure the
/// analysis degrades to an inline error payload and the write stands.
pub async fn record_entry(
    db: &SqlitePool,
    advisor: &Arc<dyn AdvisorClient>,
    user_id: i64,
    req: HealthEntryRequest,
) -> Result<(HealthEntry, Value), AppError> {
    let date = req.date.clone().unwrap_or_else(today_string);

    let entry = repository::upsert_health_entry(db, user_id, &date, &req).await?;
    let history = repository::fetch_recent_health_entries(db, user_id, HISTORY_LIMIT).await?;

    let analysis = match advisor.analyze(&entry, &history).await {
        Ok(report) => serde_json::to_value(report)
            .unwrap_or_else(|_| json!({ "error": "Malformed analysis report" })),
        Err(err) => {
            warn!("health analysis failed: {}", err);
            json!({ "error": format!("AI analysis failed: {}", err) })
        }
    };

    Ok((entry, analysis))
}
