use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Broadcast message; shared read-only across all users.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct DailyMessage {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub message_date: String,
    pub created_by: String,
    pub priority: String,
    pub category: String,
    pub is_active: bool,
    pub created_at: String,
}

/// Per-(user, message) annotation over the shared messages.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct MessageReadMark {
    pub user_id: i64,
    pub message_id: i64,
    pub read_at: String,
    pub is_favorited: bool,
}

/// A message annotated with the caller's read state.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageView {
    #[serde(flatten)]
    pub message: DailyMessage,
    pub is_read: bool,
    pub is_favorited: bool,
    pub read_at: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMessageRequest {
    pub title: String,
    pub content: String,
    pub message_date: String,
    pub created_by: String,
    pub priority: String,
    pub category: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageActionRequest {
    pub message_id: i64,
    pub action: String,
}
