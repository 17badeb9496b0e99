use std::time::Duration;

pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub jwt_secret: String,
    pub token_ttl_minutes: i64,
    pub auth_timeout_secs: u64,
    pub session_queue: usize,
}

impl Config {
    pub fn from_env() -> Self {
        let jwt_secret = std::env::var("LIVETRACK_JWT_SECRET")
            .ok()
            .filter(|s| !s.is_empty())
            .expect("LIVETRACK_JWT_SECRET is required");

        Self {
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8000),
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite:locations.db?mode=rwc".to_string()),
            jwt_secret,
            token_ttl_minutes: std::env::var("LIVETRACK_TOKEN_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|v: &i64| *v > 0)
                .unwrap_or(700),
            auth_timeout_secs: std::env::var("LIVETRACK_AUTH_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|v: &u64| *v > 0)
                .unwrap_or(10),
            session_queue: std::env::var("LIVETRACK_SESSION_QUEUE")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|v: &usize| *v > 0)
                .unwrap_or(64),
        }
    }

    pub fn token_ttl(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.token_ttl_minutes)
    }

    pub fn auth_timeout(&self) -> Duration {
        Duration::from_secs(self.auth_timeout_secs)
    }
}
