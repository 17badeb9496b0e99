#![allow(dead_code)]

use axum::body::Body;
use http::{Method, Request};
use livetrack::db;
use livetrack::jwt::TokenService;
use livetrack::models::user::Identity;
use livetrack::routes;
use livetrack::state::{AppState, GatewaySettings};
use sqlx::SqlitePool;
use std::time::Duration;

pub const TEST_SECRET: &[u8] = b"integration-test-secret";

/// A registered user together with a valid access token.
pub struct TestUser {
    pub identity: Identity,
    pub token: String,
}

impl TestUser {
    pub fn user_id(&self) -> i64 {
        self.identity.user_id
    }

    pub fn auth_header(&self) -> String {
        format!("Bearer {}", self.token)
    }
}

/// Test server that owns an in-memory SQLite pool and its own session
/// registry. Each instance is isolated, so tests can run in parallel.
pub struct TestServer {
    pub state: AppState,
}

impl TestServer {
    pub async fn new() -> Self {
        Self::with_settings(GatewaySettings::default()).await
    }

    pub async fn with_settings(settings: GatewaySettings) -> Self {
        let pool = db::create_pool("sqlite::memory:")
            .await
            .expect("failed to create test pool");
        let tokens = TokenService::new(TEST_SECRET, chrono::Duration::minutes(30));

        Self {
            state: AppState::new(pool, tokens, settings),
        }
    }

    /// Router wired to this server's state for `oneshot()` calls.
    pub fn router(&self) -> axum::Router {
        routes::router(self.state.clone())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.state.db
    }

    /// Binds port 0, spawns the server, returns `host:port`.
    pub async fn spawn(&self) -> String {
        let app = self.router();
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("127.0.0.1:{}", addr.port())
    }

    /// Inserts a user row directly and mints a token for it.
    pub async fn create_user_with_token(&self, email: &str) -> TestUser {
        let user = db::users::create_user(self.pool(), email, "not-a-real-hash")
            .await
            .expect("failed to create test user");
        let token = self
            .state
            .tokens
            .issue(user.id, &user.email)
            .expect("failed to sign test token");

        TestUser {
            identity: Identity {
                user_id: user.id,
                email: user.email,
            },
            token,
        }
    }

    pub fn expired_token_for(&self, user: &TestUser) -> String {
        self.state
            .tokens
            .issue_with_expiry(
                user.user_id(),
                &user.identity.email,
                chrono::Utc::now() - chrono::Duration::hours(1),
            )
            .expect("failed to sign expired token")
    }

    pub async fn stored_count(&self, user_id: i64) -> i64 {
        db::locations::count_for_user(self.pool(), user_id)
            .await
            .expect("failed to count locations")
    }

    /// Makes every location insert fail until `restore_writes` is called.
    pub async fn break_writes(&self) {
        sqlx::query(
            "CREATE TRIGGER fail_location_writes BEFORE INSERT ON locations BEGIN SELECT RAISE(ABORT, 'storage unavailable'); END",
        )
        .execute(self.pool())
        .await
        .expect("failed to install failing trigger");
    }

    pub async fn restore_writes(&self) {
        sqlx::query("DROP TRIGGER IF EXISTS fail_location_writes")
            .execute(self.pool())
            .await
            .expect("failed to drop failing trigger");
    }

    /// Polls the registry until `user_id` has exactly `count` live sessions.
    pub async fn wait_for_sessions(&self, user_id: i64, count: usize) {
        for _ in 0..400 {
            if self.state.registry.session_count(user_id) == count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!(
            "expected {count} session(s) for user {user_id}, found {}",
            self.state.registry.session_count(user_id)
        );
    }
}

/// A location payload in the wire format.
pub fn location_payload(user_id: i64, latitude: f64, longitude: f64, timestamp: &str) -> String {
    serde_json::json!({
        "user_id": user_id,
        "latitude": latitude,
        "longitude": longitude,
        "timestamp": timestamp,
    })
    .to_string()
}

// ---------------------------------------------------------------------------
// Request builder helpers
// ---------------------------------------------------------------------------

pub fn authenticated_request(method: Method, uri: &str, auth_header: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("Authorization", auth_header)
        .body(Body::empty())
        .unwrap()
}

pub fn authenticated_json_request(
    method: Method,
    uri: &str,
    auth_header: &str,
    body: &serde_json::Value,
) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("Authorization", auth_header)
        .header("Content-Type", "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap()
}

pub fn json_request(method: Method, uri: &str, body: &serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("Content-Type", "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap()
}

pub async fn parse_body(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
