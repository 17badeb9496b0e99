use std::sync::Arc;

use crate::db;
use crate::models::location::LocationUpdate;
use crate::models::user::Identity;
use crate::state::AppState;

/// Recoverable per-message failures. The display text is the `error` field
/// of the ack returned to the sender; none of these close the stream.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MessageError {
    #[error("Invalid JSON format received")]
    InvalidJson,
    #[error("Invalid location payload: {0}")]
    InvalidPayload(String),
    #[error("Invalid location payload: {0} out of range")]
    OutOfRange(&'static str),
    #[error("Unauthorized: user_id mismatch in payload")]
    UserMismatch,
    #[error("Failed to store location")]
    Persistence,
}

/// Parses and validates a raw inbound message for `identity`.
pub fn decode_update(identity: &Identity, raw: &str) -> Result<LocationUpdate, MessageError> {
    let value: serde_json::Value =
        serde_json::from_str(raw).map_err(|_| MessageError::InvalidJson)?;
    let update: LocationUpdate = serde_json::from_value(value)
        .map_err(|e| MessageError::InvalidPayload(e.to_string()))?;

    if update.user_id != identity.user_id {
        return Err(MessageError::UserMismatch);
    }
    if let Some(field) = update.out_of_range_field() {
        return Err(MessageError::OutOfRange(field));
    }
    Ok(update)
}

/// Validate, persist, then fan the untouched payload out to every session of
/// the identity. Nothing is broadcast unless the write succeeded.
pub async fn process_location(
    state: &AppState,
    identity: &Identity,
    raw: &str,
) -> Result<usize, MessageError> {
    let update = match decode_update(identity, raw) {
        Ok(update) => update,
        Err(e) => {
            tracing::debug!("user {}: rejected location message: {}", identity.user_id, e);
            return Err(e);
        }
    };

    if let Err(e) = db::locations::insert_location(
        &state.db,
        identity.user_id,
        update.latitude,
        update.longitude,
        &update.timestamp,
    )
    .await
    {
        tracing::error!("user {}: failed to store location: {}", identity.user_id, e);
        return Err(MessageError::Persistence);
    }

    let delivered = state.registry.broadcast(identity.user_id, Arc::from(raw));
    tracing::debug!(
        "user {}: location relayed to {} session(s)",
        identity.user_id,
        delivered
    );
    Ok(delivered)
}
