use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

use crate::db;
use crate::error::AppError;
use crate::models::user::{LoginRequest, RegisterRequest, TokenResponse, User};
use crate::state::AppState;

fn looks_like_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.chars().any(char::is_whitespace)
}

pub async fn register(
    State(state): State<AppState>,
    Json(input): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<User>), AppError> {
    let email = input.email.trim().to_lowercase();
    if email.len() > 254 || !looks_like_email(&email) {
        return Err(AppError::BadRequest("invalid email address".to_string()));
    }

    if input.password.len() < 8 || input.password.len() > 128 {
        return Err(AppError::BadRequest(
            "password must be between 8 and 128 characters".to_string(),
        ));
    }

    if db::users::email_exists(&state.db, &email).await? {
        return Err(AppError::BadRequest("Email already registered".to_string()));
    }

    // Argon2id with a random salt
    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(input.password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(format!("password hashing failed: {e}")))?
        .to_string();

    let user = db::users::create_user(&state.db, &email, &password_hash).await?;
    tracing::info!("registered user {}", user.id);

    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn login(
    State(state): State<AppState>,
    Json(input): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    let email = input.email.trim().to_lowercase();

    let (user_id, stored_hash) = match db::users::get_credentials(&state.db, &email).await? {
        Some(row) => row,
        None => {
            return Err(AppError::Unauthorized("Invalid credentials".to_string()));
        }
    };

    let parsed_hash = PasswordHash::new(&stored_hash)
        .map_err(|e| AppError::Internal(format!("stored hash parse failed: {e}")))?;

    if Argon2::default()
        .verify_password(input.password.as_bytes(), &parsed_hash)
        .is_err()
    {
        return Err(AppError::Unauthorized("Invalid credentials".to_string()));
    }

    let access_token = state
        .tokens
        .issue(user_id, &email)
        .map_err(|e| AppError::Internal(format!("token signing failed: {e}")))?;

    Ok(Json(TokenResponse {
        access_token,
        token_type: "bearer".to_string(),
    }))
}
