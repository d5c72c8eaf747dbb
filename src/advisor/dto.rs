use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::models::HealthEntry;

/// Wire format of the analyzer service (snake_case keys).
#[derive(Debug, Serialize)]
pub struct AnalyzeRequest {
    pub data: EntryPayload,
    pub historical_data: Vec<HistoryPoint>,
}

#[derive(Debug, Serialize)]
pub struct EntryPayload {
    pub user_id: String,
    pub date: String,
    pub weight: Option<f64>,
    pub sleep_hours: Option<f64>,
    pub mood: Option<String>,
    pub energy_level: Option<i64>,
}

impl From<&HealthEntry> for EntryPayload {
    fn from(entry: &HealthEntry) -> Self {
        Self {
            user_id: entry.user_id.to_string(),
            date: entry.date.clone(),
            weight: entry.weight,
            sleep_hours: entry.sleep_hours,
            mood: entry.mood.clone(),
            energy_level: entry.energy_level,
        }
    }
}

/// The trimmed historical list forwarded alongside the current entry.
#[derive(Debug, Serialize)]
pub struct HistoryPoint {
    pub weight: Option<f64>,
    pub sleep_hours: Option<f64>,
    pub energy_level: Option<i64>,
}

impl From<&HealthEntry> for HistoryPoint {
    fn from(entry: &HealthEntry) -> Self {
        Self {
            weight: entry.weight,
            sleep_hours: entry.sleep_hours,
            energy_level: entry.energy_level,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub status: String,
    #[serde(default)]
    pub trends: HashMap<String, f64>,
    #[serde(default)]
    pub suggestions: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub temperature: f32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct ChatCompletionResponse {
    pub choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
pub struct ChatChoice {
    pub message: ChatMessage,
}
