use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

use crate::db;
use crate::error::AppError;
use crate::models::location::LocationUpdate;
use crate::models::user::Identity;
use crate::state::AppState;

/// Request/response fallback for clients that cannot hold a stream open.
/// Stored only; live sessions are not notified.
pub async fn create_location(
    State(state): State<AppState>,
    identity: Identity,
    Json(update): Json<LocationUpdate>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    if update.user_id != identity.user_id {
        return Err(AppError::Forbidden(
            "Unauthorized: user_id mismatch in payload".to_string(),
        ));
    }
    if let Some(field) = update.out_of_range_field() {
        return Err(AppError::BadRequest(format!("{field} out of range")));
    }

    db::locations::insert_location(
        &state.db,
        identity.user_id,
        update.latitude,
        update.longitude,
        &update.timestamp,
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "message": "Location saved successfully" })),
    ))
}

pub async fn list_locations(
    State(state): State<AppState>,
    identity: Identity,
) -> Result<Json<Vec<LocationUpdate>>, AppError> {
    let locations = db::locations::list_locations(&state.db, identity.user_id).await?;
    Ok(Json(locations))
}
