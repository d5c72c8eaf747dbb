use std::sync::Arc;

use sqlx::SqlitePool;

use crate::advisor::AdvisorClient;
use crate::auth::AuthConfig;

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub advisor: Arc<dyn AdvisorClient>,
    pub auth: AuthConfig,
    pub upload_dir: String,
}
