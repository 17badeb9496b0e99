use sqlx::SqlitePool;

use crate::error::AppError;
use crate::models::user::{Identity, User};

pub async fn get_user(pool: &SqlitePool, user_id: i64) -> Result<User, AppError> {
    let row = sqlx::query_as::<_, (i64, String)>("SELECT id, email FROM users WHERE id = ?")
        .bind(user_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound("unknown_user".to_string()))?;

    Ok(User {
        id: row.0,
        email: row.1,
    })
}

pub async fn email_exists(pool: &SqlitePool, email: &str) -> Result<bool, AppError> {
    let existing = sqlx::query_scalar::<_, i64>("SELECT id FROM users WHERE email = ?")
        .bind(email)
        .fetch_optional(pool)
        .await?;

    Ok(existing.is_some())
}

pub async fn create_user(
    pool: &SqlitePool,
    email: &str,
    password_hash: &str,
) -> Result<User, AppError> {
    let id = sqlx::query("INSERT INTO users (email, password_hash) VALUES (?, ?)")
        .bind(email)
        .bind(password_hash)
        .execute(pool)
        .await?
        .last_insert_rowid();

    get_user(pool, id).await
}

/// Returns `(id, password_hash)` for the account registered under `email`.
pub async fn get_credentials(
    pool: &SqlitePool,
    email: &str,
) -> Result<Option<(i64, String)>, AppError> {
    let row = sqlx::query_as::<_, (i64, String)>(
        "SELECT id, password_hash FROM users WHERE email = ?",
    )
    .bind(email)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Looks up the user whose id AND email both match the token claims.
pub async fn find_identity(
    pool: &SqlitePool,
    user_id: i64,
    email: &str,
) -> Result<Option<Identity>, sqlx::Error> {
    let row = sqlx::query_as::<_, (i64, String)>(
        "SELECT id, email FROM users WHERE id = ? AND email = ?",
    )
    .bind(user_id)
    .bind(email)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|(user_id, email)| Identity { user_id, email }))
}
