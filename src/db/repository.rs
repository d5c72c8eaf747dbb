use chrono::Utc;
use sqlx::SqlitePool;

use crate::models::{
    Account, DailyMessage, HealthEntry, HealthEntryRequest, MessageReadMark, NewMessageRequest,
    NewTodoRequest, RegisterRequest, Todo,
};

const ACCOUNT_COLUMNS: &str =
    "id, user_name, password, full_name, email, phone_number, avatar, role, status, created_at";

const TODO_COLUMNS: &str =
    "id, user_id, title, description, date, start_time, end_time, is_completed, created_at";

const HEALTH_COLUMNS: &str =
    "id, user_id, date, weight, sleep_hours, mood, energy_level, created_at";

const MESSAGE_COLUMNS: &str =
    "id, title, content, message_date, created_by, priority, category, is_active, created_at";

// ---------------------------------------------------------------------------
// accounts

pub async fn insert_account(
    db: &SqlitePool,
    req: &RegisterRequest,
    password_hash: &str,
) -> Result<i64, sqlx::Error> {
    let now = Utc::now().to_rfc3339();

    let result = sqlx::query(
        "INSERT INTO accounts (user_name, password, full_name, email, phone_number, avatar, role, status, created_at) \
         VALUES (?, ?, ?, ?, ?, ?, 'user', 1, ?)",
    )
    .bind(&req.user_name)
    .bind(password_hash)
    .bind(&req.full_name)
    .bind(&req.email)
    .bind(&req.phone_number)
    .bind(&req.avatar)
    .bind(&now)
    .execute(db)
    .await?;

    Ok(result.last_insert_rowid())
}

pub async fn find_account_by_username(
    db: &SqlitePool,
    user_name: &str,
) -> Result<Option<Account>, sqlx::Error> {
    sqlx::query_as::<_, Account>(&format!(
        "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE user_name = ?"
    ))
    .bind(user_name)
    .fetch_optional(db)
    .await
}

pub async fn find_account_by_id(db: &SqlitePool, id: i64) -> Result<Option<Account>, sqlx::Error> {
    sqlx::query_as::<_, Account>(&format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = ?"))
        .bind(id)
        .fetch_optional(db)
        .await
}

pub async fn update_profile(
    db: &SqlitePool,
    id: i64,
    full_name: &str,
    phone_number: &str,
    avatar: Option<&str>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE accounts SET full_name = ?, phone_number = ?, avatar = ? WHERE id = ?",
    )
    .bind(full_name)
    .bind(phone_number)
    .bind(avatar)
    .bind(id)
    .execute(db)
    .await?
    .rows_affected();

    Ok(result > 0)
}

pub async fn update_password(
    db: &SqlitePool,
    id: i64,
    password_hash: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE accounts SET password = ? WHERE id = ?")
        .bind(password_hash)
        .bind(id)
        .execute(db)
        .await?
        .rows_affected();

    Ok(result > 0)
}

// ---------------------------------------------------------------------------
// todos

pub async fn insert_todo(
    db: &SqlitePool,
    user_id: i64,
    req: NewTodoRequest,
) -> Result<Todo, sqlx::Error> {
    let now = Utc::now().to_rfc3339();

    let result = sqlx::query(
        "INSERT INTO todos (user_id, title, description, date, start_time, end_time, is_completed, created_at) \
         VALUES (?, ?, ?, ?, ?, ?, 0, ?)",
    )
    .bind(user_id)
    .bind(&req.title)
    .bind(&req.description)
    .bind(&req.date)
    .bind(&req.start_time)
    .bind(&req.end_time)
    .bind(&now)
    .execute(db)
    .await?;

    Ok(Todo {
        id: result.last_insert_rowid(),
        user_id,
        title: req.title,
        description: req.description,
        date: req.date,
        start_time: req.start_time,
        end_time: req.end_time,
        is_completed: false,
        created_at: now,
    })
}

pub async fn fetch_todos_for_day(
    db: &SqlitePool,
    user_id: i64,
    date: &str,
) -> Result<Vec<Todo>, sqlx::Error> {
    sqlx::query_as::<_, Todo>(&format!(
        "SELECT {TODO_COLUMNS} FROM todos WHERE user_id = ? AND date = ? ORDER BY start_time ASC"
    ))
    .bind(user_id)
    .bind(date)
    .fetch_all(db)
    .await
}

pub async fn find_todo(
    db: &SqlitePool,
    user_id: i64,
    todo_id: i64,
) -> Result<Option<Todo>, sqlx::Error> {
    sqlx::query_as::<_, Todo>(&format!(
        "SELECT {TODO_COLUMNS} FROM todos WHERE id = ? AND user_id = ?"
    ))
    .bind(todo_id)
    .bind(user_id)
    .fetch_optional(db)
    .await
}

pub async fn set_todo_completion(
    db: &SqlitePool,
    user_id: i64,
    todo_id: i64,
    is_completed: bool,
) -> Result<Option<Todo>, sqlx::Error> {
    sqlx::query("UPDATE todos SET is_completed = ? WHERE id = ? AND user_id = ?")
        .bind(is_completed)
        .bind(todo_id)
        .bind(user_id)
        .execute(db)
        .await?;

    find_todo(db, user_id, todo_id).await
}

/// Overwrites date/start/end in place; postponement history is not retained.
pub async fn postpone_todo(
    db: &SqlitePool,
    user_id: i64,
    todo_id: i64,
    new_date: &str,
    new_start_time: &str,
    new_end_time: &str,
) -> Result<Option<Todo>, sqlx::Error> {
    sqlx::query(
        "UPDATE todos SET date = ?, start_time = ?, end_time = ? WHERE id = ? AND user_id = ?",
    )
    .bind(new_date)
    .bind(new_start_time)
    .bind(new_end_time)
    .bind(todo_id)
    .bind(user_id)
    .execute(db)
    .await?;

    find_todo(db, user_id, todo_id).await
}

// ---------------------------------------------------------------------------
// health_data

pub async fn fetch_health_entry(
    db: &SqlitePool,
    user_id: i64,
    date: &str,
) -> Result<Option<HealthEntry>, sqlx::Error> {
    sqlx::query_as::<_, HealthEntry>(&format!(
        "SELECT {HEALTH_COLUMNS} FROM health_data WHERE user_id = ? AND date = ?"
    ))
    .bind(user_id)
    .bind(date)
    .fetch_optional(db)
    .await
}

/// Insert-or-update keyed on UNIQUE(user_id, date): at most one logical
/// entry per user per day, the second write wins.
pub async fn upsert_health_entry(
    db: &SqlitePool,
    user_id: i64,
    date: &str,
    req: &HealthEntryRequest,
) -> Result<HealthEntry, sqlx::Error> {
    let now = Utc::now().to_rfc3339();

    sqlx::query_as::<_, HealthEntry>(&format!(
        "INSERT INTO health_data (user_id, date, weight, sleep_hours, mood, energy_level, created_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?) \
         ON CONFLICT (user_id, date) DO UPDATE SET \
             weight = excluded.weight, \
             sleep_hours = excluded.sleep_hours, \
             mood = excluded.mood, \
             energy_level = excluded.energy_level \
         RETURNING {HEALTH_COLUMNS}"
    ))
    .bind(user_id)
    .bind(date)
    .bind(req.weight)
    .bind(req.sleep_hours)
    .bind(&req.mood)
    .bind(req.energy_level)
    .bind(&now)
    .fetch_one(db)
    .await
}

pub async fn fetch_recent_health_entries(
    db: &SqlitePool,
    user_id: i64,
    limit: i64,
) -> Result<Vec<HealthEntry>, sqlx::Error> {
    sqlx::query_as::<_, HealthEntry>(&format!(
        "SELECT {HEALTH_COLUMNS} FROM health_data WHERE user_id = ? ORDER BY date DESC LIMIT ?"
    ))
    .bind(user_id)
    .bind(limit)
    .fetch_all(db)
    .await
}

// ---------------------------------------------------------------------------
// daily_messages / message_reads

pub async fn insert_message(
    db: &SqlitePool,
    req: &NewMessageRequest,
) -> Result<DailyMessage, sqlx::Error> {
    let now = Utc::now().to_rfc3339();

    sqlx::query_as::<_, DailyMessage>(&format!(
        "INSERT INTO daily_messages (title, content, message_date, created_by, priority, category, is_active, created_at) \
         VALUES (?, ?, ?, ?, ?, ?, 1, ?) \
         RETURNING {MESSAGE_COLUMNS}"
    ))
    .bind(&req.title)
    .bind(&req.content)
    .bind(&req.message_date)
    .bind(&req.created_by)
    .bind(&req.priority)
    .bind(&req.category)
    .bind(&now)
    .fetch_one(db)
    .await
}

pub async fn fetch_messages_for_date(
    db: &SqlitePool,
    date: &str,
    limit: i64,
) -> Result<Vec<DailyMessage>, sqlx::Error> {
    sqlx::query_as::<_, DailyMessage>(&format!(
        "SELECT {MESSAGE_COLUMNS} FROM daily_messages \
         WHERE is_active = 1 AND message_date = ? \
         ORDER BY message_date DESC, created_at DESC LIMIT ?"
    ))
    .bind(date)
    .bind(limit)
    .fetch_all(db)
    .await
}

pub async fn fetch_messages_since(
    db: &SqlitePool,
    since_date: &str,
    limit: i64,
) -> Result<Vec<DailyMessage>, sqlx::Error> {
    sqlx::query_as::<_, DailyMessage>(&format!(
        "SELECT {MESSAGE_COLUMNS} FROM daily_messages \
         WHERE is_active = 1 AND message_date >= ? \
         ORDER BY message_date DESC, created_at DESC LIMIT ?"
    ))
    .bind(since_date)
    .bind(limit)
    .fetch_all(db)
    .await
}

pub async fn fetch_read_marks(
    db: &SqlitePool,
    user_id: i64,
    message_ids: &[i64],
) -> Result<Vec<MessageReadMark>, sqlx::Error> {
    if message_ids.is_empty() {
        return Ok(Vec::new());
    }

    let mut builder = sqlx::QueryBuilder::<sqlx::Sqlite>::new(
        "SELECT user_id, message_id, read_at, is_favorited FROM message_reads WHERE user_id = ",
    );
    builder.push_bind(user_id);
    builder.push(" AND message_id IN (");
    let mut separated = builder.separated(", ");
    for id in message_ids {
        separated.push_bind(*id);
    }
    builder.push(")");

    builder
        .build_query_as::<MessageReadMark>()
        .fetch_all(db)
        .await
}

/// Idempotent: repeated marks only refresh `read_at`.
pub async fn mark_message_read(
    db: &SqlitePool,
    user_id: i64,
    message_id: i64,
) -> Result<(), sqlx::Error> {
    let now = Utc::now().to_rfc3339();

    sqlx::query(
        "INSERT INTO message_reads (user_id, message_id, read_at, is_favorited) \
         VALUES (?, ?, ?, 0) \
         ON CONFLICT (user_id, message_id) DO UPDATE SET read_at = excluded.read_at",
    )
    .bind(user_id)
    .bind(message_id)
    .bind(&now)
    .execute(db)
    .await?;

    Ok(())
}

/// Flips the flag in a single statement so concurrent toggles by the same
/// user cannot lose an update. Returns the new favorite state.
pub async fn toggle_message_favorite(
    db: &SqlitePool,
    user_id: i64,
    message_id: i64,
) -> Result<bool, sqlx::Error> {
    let now = Utc::now().to_rfc3339();

    sqlx::query_scalar::<_, bool>(
        "INSERT INTO message_reads (user_id, message_id, read_at, is_favorited) \
         VALUES (?, ?, ?, 1) \
         ON CONFLICT (user_id, message_id) DO UPDATE SET \
             is_favorited = NOT message_reads.is_favorited, \
             read_at = excluded.read_at \
         RETURNING is_favorited",
    )
    .bind(user_id)
    .bind(message_id)
    .bind(&now)
    .fetch_one(db)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn setup_test_db() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("Failed to create test db");

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("Failed to run migrations");

        pool
    }

    async fn setup_account(pool: &SqlitePool, user_name: &str) -> i64 {
        let req = RegisterRequest {
            user_name: user_name.to_string(),
            password: "secret123".to_string(),
            email: format!("{}@example.com", user_name),
            phone_number: "0123456789".to_string(),
            full_name: "Test User".to_string(),
            avatar: None,
        };
        insert_account(pool, &req, "$2b$10$fakehash")
            .await
            .expect("Failed to insert account")
    }

    #[tokio::test]
    async fn test_insert_and_find_account() {
        let pool = setup_test_db().await;

        let id = setup_account(&pool, "dum").await;

        let account = find_account_by_username(&pool, "dum")
            .await
            .expect("Failed to query")
            .expect("Account not found");
        assert_eq!(account.id, id);
        assert_eq!(account.role, "user");
        assert!(account.status);
    }

    #[tokio::test]
    async fn test_duplicate_username_rejected() {
        let pool = setup_test_db().await;

        setup_account(&pool, "dum").await;

        let req = RegisterRequest {
            user_name: "dum".to_string(),
            password: "other".to_string(),
            email: "other@example.com".to_string(),
            phone_number: "0987654321".to_string(),
            full_name: "Other".to_string(),
            avatar: None,
        };
        let result = insert_account(&pool, &req, "$2b$10$fakehash").await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_todos_ordered_by_start_time() {
        let pool = setup_test_db().await;
        let user_id = setup_account(&pool, "dum").await;

        for (title, start) in [("lunch", "12:00"), ("breakfast", "07:30"), ("gym", "18:00")] {
            insert_todo(
                &pool,
                user_id,
                NewTodoRequest {
                    title: title.to_string(),
                    description: None,
                    date: "2026-09-01".to_string(),
                    start_time: start.to_string(),
                    end_time: "23:00".to_string(),
                },
            )
            .await
            .expect("Failed to insert todo");
        }

        let todos = fetch_todos_for_day(&pool, user_id, "2026-09-01")
            .await
            .expect("Failed to fetch todos");
        let titles: Vec<&str> = todos.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["breakfast", "lunch", "gym"]);
    }

    #[tokio::test]
    async fn test_todo_scoped_to_owner() {
        let pool = setup_test_db().await;
        let owner = setup_account(&pool, "dum").await;
        let other = setup_account(&pool, "meo").await;

        let todo = insert_todo(
            &pool,
            owner,
            NewTodoRequest {
                title: "water the plants".to_string(),
                description: None,
                date: "2026-09-01".to_string(),
                start_time: "08:00".to_string(),
                end_time: "08:30".to_string(),
            },
        )
        .await
        .expect("Failed to insert todo");

        assert!(find_todo(&pool, other, todo.id).await.unwrap().is_none());
        assert!(find_todo(&pool, owner, todo.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_postpone_rewrites_schedule_only() {
        let pool = setup_test_db().await;
        let user_id = setup_account(&pool, "dum").await;

        let todo = insert_todo(
            &pool,
            user_id,
            NewTodoRequest {
                title: "study".to_string(),
                description: Some("chapter 3".to_string()),
                date: "2026-09-01".to_string(),
                start_time: "09:00".to_string(),
                end_time: "10:00".to_string(),
            },
        )
        .await
        .expect("Failed to insert todo");

        let updated = postpone_todo(&pool, user_id, todo.id, "2026-09-02", "14:00", "15:00")
            .await
            .expect("Failed to postpone")
            .expect("Todo not found");

        assert_eq!(updated.date, "2026-09-02");
        assert_eq!(updated.start_time, "14:00");
        assert_eq!(updated.end_time, "15:00");
        assert_eq!(updated.title, "study");
        assert_eq!(updated.description.as_deref(), Some("chapter 3"));
    }

    #[tokio::test]
    async fn test_health_upsert_second_write_wins() {
        let pool = setup_test_db().await;
        let user_id = setup_account(&pool, "dum").await;

        let first = HealthEntryRequest {
            date: None,
            weight: Some(52.0),
            sleep_hours: Some(7.5),
            mood: Some("good".to_string()),
            energy_level: Some(8),
        };
        upsert_health_entry(&pool, user_id, "2026-09-01", &first)
            .await
            .expect("Failed to upsert");

        let second = HealthEntryRequest {
            date: None,
            weight: Some(51.5),
            sleep_hours: None,
            mood: Some("normal".to_string()),
            energy_level: Some(6),
        };
        upsert_health_entry(&pool, user_id, "2026-09-01", &second)
            .await
            .expect("Failed to upsert again");

        let entries = fetch_recent_health_entries(&pool, user_id, 30)
            .await
            .expect("Failed to fetch history");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].weight, Some(51.5));
        assert_eq!(entries[0].sleep_hours, None);
        assert_eq!(entries[0].mood.as_deref(), Some("normal"));
    }

    #[tokio::test]
    async fn test_toggle_favorite_twice_returns_to_original() {
        let pool = setup_test_db().await;
        let user_id = setup_account(&pool, "dum").await;

        let message = insert_message(
            &pool,
            &NewMessageRequest {
                title: "Good morning".to_string(),
                content: "Have a nice day!".to_string(),
                message_date: "2026-09-01".to_string(),
                created_by: "Minh".to_string(),
                priority: "normal".to_string(),
                category: "general".to_string(),
            },
        )
        .await
        .expect("Failed to insert message");

        let on = toggle_message_favorite(&pool, user_id, message.id)
            .await
            .expect("Failed to toggle");
        assert!(on);

        let off = toggle_message_favorite(&pool, user_id, message.id)
            .await
            .expect("Failed to toggle back");
        assert!(!off);
    }

    #[tokio::test]
    async fn test_mark_read_is_idempotent() {
        let pool = setup_test_db().await;
        let user_id = setup_account(&pool, "dum").await;

        let message = insert_message(
            &pool,
            &NewMessageRequest {
                title: "Reminder".to_string(),
                content: "Drink water".to_string(),
                message_date: "2026-09-01".to_string(),
                created_by: "Minh".to_string(),
                priority: "high".to_string(),
                category: "health".to_string(),
            },
        )
        .await
        .expect("Failed to insert message");

        mark_message_read(&pool, user_id, message.id)
            .await
            .expect("Failed to mark read");
        mark_message_read(&pool, user_id, message.id)
            .await
            .expect("Failed to mark read again");

        let marks = fetch_read_marks(&pool, user_id, &[message.id])
            .await
            .expect("Failed to fetch marks");
        assert_eq!(marks.len(), 1);
        assert!(!marks[0].is_favorited);
    }

    #[tokio::test]
    async fn test_read_marks_scoped_to_user() {
        let pool = setup_test_db().await;
        let reader = setup_account(&pool, "dum").await;
        let other = setup_account(&pool, "meo").await;

        let message = insert_message(
            &pool,
            &NewMessageRequest {
                title: "Hello".to_string(),
                content: "A shared message".to_string(),
                message_date: "2026-09-01".to_string(),
                created_by: "Minh".to_string(),
                priority: "low".to_string(),
                category: "general".to_string(),
            },
        )
        .await
        .expect("Failed to insert message");

        mark_message_read(&pool, reader, message.id)
            .await
            .expect("Failed to mark read");

        let reader_marks = fetch_read_marks(&pool, reader, &[message.id]).await.unwrap();
        let other_marks = fetch_read_marks(&pool, other, &[message.id]).await.unwrap();
        assert_eq!(reader_marks.len(), 1);
        assert!(other_marks.is_empty());
    }
}
