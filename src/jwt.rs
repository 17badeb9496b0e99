use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Access token claims. `sub` carries the account email.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub user_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
    pub exp: i64,
}

/// Claims as they arrive on the wire. Some issuers encode `user_id` as a
/// numeric string.
#[derive(Deserialize)]
struct RawClaims {
    sub: String,
    user_id: UserIdClaim,
    #[serde(default)]
    iat: Option<i64>,
    exp: i64,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum UserIdClaim {
    Number(i64),
    Text(String),
}

impl UserIdClaim {
    fn into_id(self) -> Result<i64, TokenError> {
        match self {
            UserIdClaim::Number(id) => Ok(id),
            UserIdClaim::Text(text) => text
                .trim()
                .parse()
                .map_err(|_| TokenError::NonIntegerUserId),
        }
    }
}

/// Why a presented token was refused. The display text is sent to clients
/// as the close reason.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("Token has expired")]
    Expired,
    #[error("Invalid token: missing email or user_id")]
    MissingClaims,
    #[error("Invalid token: user_id is not an integer")]
    NonIntegerUserId,
    #[error("Invalid token")]
    Invalid,
}

/// Signs and verifies HS256 access tokens.
#[derive(Clone)]
pub struct TokenService {
    encoding_key: Arc<EncodingKey>,
    decoding_key: Arc<DecodingKey>,
    ttl: Duration,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl TokenService {
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        Self {
            encoding_key: Arc::new(EncodingKey::from_secret(secret)),
            decoding_key: Arc::new(DecodingKey::from_secret(secret)),
            ttl,
        }
    }

    pub fn issue(&self, user_id: i64, email: &str) -> Result<String, jsonwebtoken::errors::Error> {
        self.issue_with_expiry(user_id, email, Utc::now() + self.ttl)
    }

    pub fn issue_with_expiry(
        &self,
        user_id: i64,
        email: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        let claims = Claims {
            sub: email.to_string(),
            user_id,
            iat: Some(Utc::now().timestamp()),
            exp: expires_at.timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
    }

    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 30;

        let data = decode::<RawClaims>(token, &self.decoding_key, &validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                ErrorKind::Json(_) | ErrorKind::MissingRequiredClaim(_) => {
                    TokenError::MissingClaims
                }
                _ => TokenError::Invalid,
            }
        })?;

        let raw = data.claims;
        if raw.sub.is_empty() {
            return Err(TokenError::MissingClaims);
        }

        Ok(Claims {
            sub: raw.sub,
            user_id: raw.user_id.into_id()?,
            iat: raw.iat,
            exp: raw.exp,
        })
    }
}
