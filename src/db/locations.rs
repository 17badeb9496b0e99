use sqlx::{Row, SqlitePool};

use crate::error::AppError;
use crate::models::location::LocationUpdate;

pub async fn insert_location(
    pool: &SqlitePool,
    user_id: i64,
    latitude: f64,
    longitude: f64,
    timestamp: &str,
) -> Result<i64, AppError> {
    let id = sqlx::query(
        "INSERT INTO locations (user_id, latitude, longitude, timestamp) VALUES (?, ?, ?, ?)",
    )
    .bind(user_id)
    .bind(latitude)
    .bind(longitude)
    .bind(timestamp)
    .execute(pool)
    .await?
    .last_insert_rowid();

    Ok(id)
}

/// All stored updates for `user_id`, newest timestamp first.
pub async fn list_locations(
    pool: &SqlitePool,
    user_id: i64,
) -> Result<Vec<LocationUpdate>, AppError> {
    let rows = sqlx::query(
        "SELECT user_id, latitude, longitude, timestamp FROM locations WHERE user_id = ? ORDER BY timestamp DESC, id DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| LocationUpdate {
            user_id: row.get("user_id"),
            latitude: row.get("latitude"),
            longitude: row.get("longitude"),
            timestamp: row.get("timestamp"),
        })
        .collect())
}

/// Number of stored updates for one user. Used by the test harnesses to
/// check what reached storage.
pub async fn count_for_user(pool: &SqlitePool, user_id: i64) -> Result<i64, AppError> {
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM locations WHERE user_id = ?")
        .bind(user_id)
        .fetch_one(pool)
        .await?;

    Ok(count)
}
