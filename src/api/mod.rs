use axum::extract::Query;
use axum::routing::post;
use axum::{Extension, Json, Router, extract::State, http::StatusCode, middleware, routing::get};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{Duration, Local, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::auth::{self, Claims};
use crate::db::repository;
use crate::error::AppError;
use crate::models::*;
use crate::services;
use crate::services::health::today_string;
use crate::state::AppState;

const MIN_PASSWORD_LEN: usize = 8;
const BCRYPT_COST: u32 = 10;
const DEFAULT_MESSAGE_LIMIT: i64 = 10;
const MESSAGE_WINDOW_DAYS: i64 = 7;

pub fn router(state: AppState) -> Router {
    let public = Router::new()
        .route("/health", get(health))
        .route("/api/register", post(register))
        .route("/api/login", post(login));

    let protected = Router::new()
        .route(
            "/api/profile",
            get(get_profile).put(update_profile).patch(change_password),
        )
        .route(
            "/api/schedule",
            get(list_todos).post(create_todo).put(update_todo),
        )
        .route(
            "/api/health",
            get(get_today_entry).post(record_entry).put(record_entry),
        )
        .route(
            "/api/daily-messages",
            get(list_messages).post(message_action),
        )
        .route("/api/advice", post(get_advice))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_auth,
        ));

    public.merge(protected).with_state(state)
}

async fn health(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    sqlx::query("select 1").execute(&state.db).await?;
    Ok(StatusCode::OK)
}

// ---------------------------------------------------------------------------
// account

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RegisterResponse {
    user_name: String,
}

async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), AppError> {
    if req.user_name.is_empty() || req.password.is_empty() {
        return Err(AppError::BadRequest(
            "userName and password are required".to_string(),
        ));
    }

    if repository::find_account_by_username(&state.db, &req.user_name)
        .await?
        .is_some()
    {
        return Err(AppError::Conflict("Username already taken".to_string()));
    }

    let password_hash =
        bcrypt::hash(&req.password, BCRYPT_COST).map_err(|_| AppError::InternalServerError)?;
    repository::insert_account(&state.db, &req, &password_hash).await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            user_name: req.user_name,
        }),
    ))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LoginUser {
    user_id: i64,
    user_name: String,
    full_name: String,
    role: String,
    avatar: Option<String>,
}

#[derive(Serialize)]
struct LoginResponse {
    token: String,
    user: LoginUser,
}

async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    if req.user_name.is_empty() || req.password.is_empty() {
        return Err(AppError::BadRequest(
            "userName and password are required".to_string(),
        ));
    }

    // Unknown username, wrong password and inactive account all collapse to
    // the same 401 so usernames cannot be probed.
    let account = repository::find_account_by_username(&state.db, &req.user_name)
        .await?
        .ok_or(AppError::Unauthorized)?;

    let matches =
        bcrypt::verify(&req.password, &account.password).map_err(|_| AppError::Unauthorized)?;
    if !matches || !account.status {
        return Err(AppError::Unauthorized);
    }

    let token = auth::sign_token(&state.auth, &account)?;

    Ok(Json(LoginResponse {
        token,
        user: LoginUser {
            user_id: account.id,
            user_name: account.user_name,
            full_name: account.full_name,
            role: account.role,
            avatar: account.avatar,
        },
    }))
}

// ---------------------------------------------------------------------------
// profile

async fn get_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Profile>, AppError> {
    let account = repository::find_account_by_username(&state.db, &claims.user_name)
        .await?
        .ok_or(AppError::NotFound)?;

    Ok(Json(account.into()))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdateProfileResponse {
    #[serde(flatten)]
    profile: Profile,
    token: String,
}

async fn update_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<Json<UpdateProfileResponse>, AppError> {
    let account = repository::find_account_by_id(&state.db, claims.sub)
        .await?
        .ok_or(AppError::NotFound)?;

    let avatar = match &req.avatar_file {
        Some(encoded) => Some(store_avatar(&state.upload_dir, encoded, req.avatar_file_name.as_deref()).await?),
        None => req.avatar.or(account.avatar),
    };

    let full_name = req.full_name.unwrap_or(account.full_name);
    let phone_number = req.phone_number.unwrap_or(account.phone_number);

    let updated = repository::update_profile(
        &state.db,
        claims.sub,
        &full_name,
        &phone_number,
        avatar.as_deref(),
    )
    .await?;
    if !updated {
        return Err(AppError::NotFound);
    }

    // Re-read the row and reissue a token so the client-held claims stay
    // consistent with the new identity fields.
    let account = repository::find_account_by_id(&state.db, claims.sub)
        .await?
        .ok_or(AppError::NotFound)?;
    let token = auth::sign_token(&state.auth, &account)?;

    Ok(Json(UpdateProfileResponse {
        profile: account.into(),
        token,
    }))
}

/// Decode a base64 avatar upload and park it under the upload dir, returning
/// the public path stored as the avatar reference.
async fn store_avatar(
    upload_dir: &str,
    encoded: &str,
    file_name: Option<&str>,
) -> Result<String, AppError> {
    // Tolerate data-URL prefixes from browser FileReader output.
    let raw = encoded.rsplit_once(',').map(|(_, b)| b).unwrap_or(encoded);
    let bytes = BASE64
        .decode(raw)
        .map_err(|_| AppError::BadRequest("avatarFile is not valid base64".to_string()))?;

    let extension = file_name
        .and_then(|name| name.rsplit_once('.').map(|(_, ext)| ext.to_string()))
        .unwrap_or_else(|| "png".to_string());
    let stored_name = format!("{}.{}", Uuid::new_v4(), extension);

    tokio::fs::create_dir_all(upload_dir)
        .await
        .map_err(|_| AppError::InternalServerError)?;
    tokio::fs::write(format!("{}/{}", upload_dir, stored_name), bytes)
        .await
        .map_err(|_| AppError::InternalServerError)?;

    Ok(format!("/uploads/{}", stored_name))
}

#[derive(Serialize)]
struct MessageResponse {
    message: String,
}

async fn change_password(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<ChangePasswordRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    if req.new_password.len() < MIN_PASSWORD_LEN {
        return Err(AppError::BadRequest(format!(
            "New password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    if req.new_password == req.old_password {
        return Err(AppError::BadRequest(
            "New password must differ from the old one".to_string(),
        ));
    }

    let account = repository::find_account_by_id(&state.db, claims.sub)
        .await?
        .ok_or(AppError::NotFound)?;

    let matches = bcrypt::verify(&req.old_password, &account.password)
        .map_err(|_| AppError::InternalServerError)?;
    if !matches {
        return Err(AppError::BadRequest("Old password is incorrect".to_string()));
    }

    let password_hash =
        bcrypt::hash(&req.new_password, BCRYPT_COST).map_err(|_| AppError::InternalServerError)?;
    let updated = repository::update_password(&state.db, claims.sub, &password_hash).await?;
    if !updated {
        return Err(AppError::NotFound);
    }

    Ok(Json(MessageResponse {
        message: "Password updated".to_string(),
    }))
}

// ---------------------------------------------------------------------------
// schedule

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CurrentUser {
    user_id: i64,
    user_name: String,
    full_name: String,
}

impl From<&Claims> for CurrentUser {
    fn from(claims: &Claims) -> Self {
        Self {
            user_id: claims.sub,
            user_name: claims.user_name.clone(),
            full_name: claims.full_name.clone(),
        }
    }
}

#[derive(Deserialize)]
struct ScheduleQueryParams {
    date: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ScheduleResponse {
    todos: Vec<Todo>,
    current_user: CurrentUser,
}

async fn list_todos(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<ScheduleQueryParams>,
) -> Result<Json<ScheduleResponse>, AppError> {
    let date = params.date.unwrap_or_else(today_string);
    let todos = repository::fetch_todos_for_day(&state.db, claims.sub, &date).await?;

    Ok(Json(ScheduleResponse {
        todos,
        current_user: (&claims).into(),
    }))
}

async fn create_todo(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<NewTodoRequest>,
) -> Result<(StatusCode, Json<Todo>), AppError> {
    if req.title.is_empty() {
        return Err(AppError::BadRequest("title is required".to_string()));
    }

    let todo = repository::insert_todo(&state.db, claims.sub, req).await?;
    Ok((StatusCode::CREATED, Json(todo)))
}

async fn update_todo(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdateTodoRequest>,
) -> Result<Json<Todo>, AppError> {
    if let Some(postpone) = req.postpone_data {
        validate_postpone_target(&postpone)?;

        let todo = repository::postpone_todo(
            &state.db,
            claims.sub,
            req.todo_id,
            &postpone.new_date,
            &postpone.new_start_time,
            &postpone.new_end_time,
        )
        .await?
        .ok_or(AppError::NotFound)?;
        return Ok(Json(todo));
    }

    if let Some(is_completed) = req.is_completed {
        let todo = repository::set_todo_completion(&state.db, claims.sub, req.todo_id, is_completed)
            .await?
            .ok_or(AppError::NotFound)?;
        return Ok(Json(todo));
    }

    Err(AppError::BadRequest(
        "Either isCompleted or postponeData is required".to_string(),
    ))
}

/// The postponed date+start must be strictly after current wall-clock time.
fn validate_postpone_target(postpone: &PostponeData) -> Result<(), AppError> {
    let date = NaiveDate::parse_from_str(&postpone.new_date, "%Y-%m-%d")
        .map_err(|_| AppError::BadRequest("newDate must be YYYY-MM-DD".to_string()))?;
    let start = NaiveTime::parse_from_str(&postpone.new_start_time, "%H:%M")
        .map_err(|_| AppError::BadRequest("newStartTime must be HH:MM".to_string()))?;
    NaiveTime::parse_from_str(&postpone.new_end_time, "%H:%M")
        .map_err(|_| AppError::BadRequest("newEndTime must be HH:MM".to_string()))?;

    if date.and_time(start) <= Local::now().naive_local() {
        return Err(AppError::BadRequest(
            "Postponed time must be in the future".to_string(),
        ));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// health log

async fn get_today_entry(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<HealthEntry>, AppError> {
    let entry = repository::fetch_health_entry(&state.db, claims.sub, &today_string())
        .await?
        .ok_or(AppError::NotFound)?;

    Ok(Json(entry))
}

#[derive(Serialize)]
struct HealthEntryResponse {
    message: String,
    analysis: Value,
}

async fn record_entry(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<HealthEntryRequest>,
) -> Result<Json<HealthEntryResponse>, AppError> {
    let (_, analysis) =
        services::record_entry(&state.db, &state.advisor, claims.sub, req).await?;

    Ok(Json(HealthEntryResponse {
        message: "Health entry saved".to_string(),
        analysis,
    }))
}

// ---------------------------------------------------------------------------
// daily messages

#[derive(Deserialize)]
struct MessagesQueryParams {
    date: Option<String>,
    limit: Option<i64>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MessagesResponse {
    messages: Vec<MessageView>,
    current_user: CurrentUser,
}

async fn list_messages(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<MessagesQueryParams>,
) -> Result<Json<MessagesResponse>, AppError> {
    let limit = params.limit.unwrap_or(DEFAULT_MESSAGE_LIMIT);

    let messages = match &params.date {
        Some(date) => repository::fetch_messages_for_date(&state.db, date, limit).await?,
        None => {
            let since = (Local::now() - Duration::days(MESSAGE_WINDOW_DAYS))
                .format("%Y-%m-%d")
                .to_string();
            repository::fetch_messages_since(&state.db, &since, limit).await?
        }
    };

    let ids: Vec<i64> = messages.iter().map(|m| m.id).collect();
    let marks = repository::fetch_read_marks(&state.db, claims.sub, &ids).await?;

    Ok(Json(MessagesResponse {
        messages: services::merge_read_marks(messages, &marks),
        current_user: (&claims).into(),
    }))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MessageActionResponse {
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    is_favorited: Option<bool>,
}

async fn message_action(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<MessageActionRequest>,
) -> Result<Json<MessageActionResponse>, AppError> {
    match req.action.as_str() {
        "mark_read" => {
            repository::mark_message_read(&state.db, claims.sub, req.message_id).await?;
            Ok(Json(MessageActionResponse {
                message: "Marked as read".to_string(),
                is_favorited: None,
            }))
        }
        "toggle_favorite" => {
            let is_favorited =
                repository::toggle_message_favorite(&state.db, claims.sub, req.message_id).await?;
            Ok(Json(MessageActionResponse {
                message: if is_favorited {
                    "Added to favorites".to_string()
                } else {
                    "Removed from favorites".to_string()
                },
                is_favorited: Some(is_favorited),
            }))
        }
        _ => Err(AppError::BadRequest("Invalid action".to_string())),
    }
}

// ---------------------------------------------------------------------------
// advice

#[derive(Deserialize)]
struct AdviceRequest {
    symptoms: String,
    history: Option<String>,
}

#[derive(Serialize)]
struct AdviceResponse {
    advice: String,
}

async fn get_advice(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<AdviceRequest>,
) -> Result<Json<AdviceResponse>, AppError> {
    if req.symptoms.is_empty() {
        return Err(AppError::BadRequest("Symptoms are required".to_string()));
    }

    // Unlike the health-log analysis, a provider failure here is fatal.
    let advice = state
        .advisor
        .advise(&claims.user_name, &req.symptoms, req.history.as_deref())
        .await?;

    Ok(Json(AdviceResponse { advice }))
}
