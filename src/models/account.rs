use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Full account row, password hash included. Never serialized directly;
/// responses go through `Profile`.
#[derive(Debug, Clone, FromRow)]
pub struct Account {
    pub id: i64,
    pub user_name: String,
    pub password: String,
    pub full_name: String,
    pub email: String,
    pub phone_number: String,
    pub avatar: Option<String>,
    pub role: String,
    pub status: bool,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub user_id: i64,
    pub user_name: String,
    pub full_name: String,
    pub email: String,
    pub phone_number: String,
    pub avatar: Option<String>,
    pub status: bool,
}

impl From<Account> for Profile {
    fn from(account: Account) -> Self {
        Self {
            user_id: account.id,
            user_name: account.user_name,
            full_name: account.full_name,
            email: account.email,
            phone_number: account.phone_number,
            avatar: account.avatar,
            status: account.status,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub user_name: String,
    pub password: String,
    pub email: String,
    pub phone_number: String,
    pub full_name: String,
    pub avatar: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub user_name: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub full_name: Option<String>,
    pub phone_number: Option<String>,
    pub avatar: Option<String>,
    /// Base64-encoded image; when present it wins over `avatar` and the
    /// stored file's public path is substituted.
    pub avatar_file: Option<String>,
    pub avatar_file_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}
