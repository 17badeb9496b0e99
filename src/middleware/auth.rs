use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::db;
use crate::error::AppError;
use crate::jwt::TokenError;
use crate::models::user::Identity;
use crate::state::AppState;

/// Reasons a credential does not yield an identity. Display text doubles as
/// the WebSocket close reason.
#[derive(Debug, thiserror::Error)]
pub enum AuthFailure {
    #[error("Missing token")]
    MissingCredential,
    #[error(transparent)]
    InvalidCredential(#[from] TokenError),
    #[error("User not found for token")]
    UnknownIdentity,
    #[error("Token verification failed")]
    Lookup(#[source] sqlx::Error),
    #[error("Authentication timed out")]
    TimedOut,
}

/// Verifies the token signature and expiry, then confirms that a user with
/// exactly the embedded id and email still exists.
pub async fn authenticate(state: &AppState, credential: &str) -> Result<Identity, AuthFailure> {
    let credential = credential.trim();
    if credential.is_empty() {
        return Err(AuthFailure::MissingCredential);
    }

    let claims = state.tokens.verify(credential)?;

    db::users::find_identity(&state.db, claims.user_id, &claims.sub)
        .await
        .map_err(AuthFailure::Lookup)?
        .ok_or(AuthFailure::UnknownIdentity)
}

/// Extracts the raw token from an `Authorization: Bearer <token>` value.
pub fn bearer_token(header: &str) -> Option<&str> {
    header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

impl FromRequestParts<AppState> for Identity {
    type Rejection = AppError;

    fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        let state = state.clone();
        let token = parts
            .headers
            .get("Authorization")
            .and_then(|v| v.to_str().ok())
            .and_then(bearer_token)
            .map(|s| s.to_string());

        async move {
            let token = token.ok_or(AuthFailure::MissingCredential).map_err(reject)?;
            authenticate(&state, &token).await.map_err(reject)
        }
    }
}

fn reject(failure: AuthFailure) -> AppError {
    match failure {
        AuthFailure::Lookup(e) => AppError::Database(e),
        other => AppError::Unauthorized(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_state;

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token("Bearer abc.def"), Some("abc.def"));
        assert_eq!(bearer_token("bearer abc"), Some("abc"));
        assert_eq!(bearer_token("Bearer   "), None);
        assert_eq!(bearer_token("Basic abc"), None);
    }

    #[tokio::test]
    async fn test_authenticate_valid_token() {
        let state = test_state().await;
        let user = db::users::create_user(&state.db, "a@example.com", "hash")
            .await
            .unwrap();
        let token = state.tokens.issue(user.id, &user.email).unwrap();

        let identity = authenticate(&state, &token).await.unwrap();
        assert_eq!(identity.user_id, user.id);
        assert_eq!(identity.email, "a@example.com");
    }

    #[tokio::test]
    async fn test_authenticate_empty_credential() {
        let state = test_state().await;
        let err = authenticate(&state, "  ").await.unwrap_err();
        assert!(matches!(err, AuthFailure::MissingCredential));
        assert_eq!(err.to_string(), "Missing token");
    }

    #[tokio::test]
    async fn test_authenticate_expired_token() {
        let state = test_state().await;
        let user = db::users::create_user(&state.db, "a@example.com", "hash")
            .await
            .unwrap();
        let token = state
            .tokens
            .issue_with_expiry(
                user.id,
                &user.email,
                chrono::Utc::now() - chrono::Duration::hours(2),
            )
            .unwrap();

        let err = authenticate(&state, &token).await.unwrap_err();
        assert!(matches!(
            err,
            AuthFailure::InvalidCredential(TokenError::Expired)
        ));
        assert_eq!(err.to_string(), "Token has expired");
    }

    #[tokio::test]
    async fn test_authenticate_signed_token_for_missing_user() {
        let state = test_state().await;
        let token = state.tokens.issue(12345, "ghost@example.com").unwrap();

        let err = authenticate(&state, &token).await.unwrap_err();
        assert!(matches!(err, AuthFailure::UnknownIdentity));
    }

    #[tokio::test]
    async fn test_authenticate_email_mismatch_is_unknown() {
        let state = test_state().await;
        let user = db::users::create_user(&state.db, "a@example.com", "hash")
            .await
            .unwrap();
        let token = state.tokens.issue(user.id, "someone-else@example.com").unwrap();

        let err = authenticate(&state, &token).await.unwrap_err();
        assert!(matches!(err, AuthFailure::UnknownIdentity));
    }
}
