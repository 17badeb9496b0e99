use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::gateway::registry::SessionRegistry;
use crate::jwt::TokenService;

/// Tunables for the location stream.
#[derive(Debug, Clone)]
pub struct GatewaySettings {
    /// Upper bound on the stream-open authentication step.
    pub auth_timeout: Duration,
    /// Capacity of each session's outbound queue.
    pub session_queue: usize,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            auth_timeout: Duration::from_secs(10),
            session_queue: 64,
        }
    }
}

impl From<&Config> for GatewaySettings {
    fn from(config: &Config) -> Self {
        Self {
            auth_timeout: config.auth_timeout(),
            session_queue: config.session_queue,
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub registry: Arc<SessionRegistry>,
    pub tokens: TokenService,
    pub gateway: GatewaySettings,
}

impl AppState {
    pub fn new(db: SqlitePool, tokens: TokenService, gateway: GatewaySettings) -> Self {
        Self {
            db,
            registry: Arc::new(SessionRegistry::new()),
            tokens,
            gateway,
        }
    }
}

#[cfg(test)]
pub(crate) async fn test_state() -> AppState {
    let pool = crate::db::create_pool("sqlite::memory:")
        .await
        .expect("failed to create test pool");
    AppState::new(
        pool,
        TokenService::new(b"unit-test-secret", chrono::Duration::minutes(30)),
        GatewaySettings::default(),
    )
}
