use axum::extract::ws::{close_code, CloseFrame, Message};
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

use super::events::{Ack, Outbound};
use super::heartbeat::{PING_INTERVAL, WRITER_DRAIN_TIMEOUT};
use super::ingest::{self, MessageError};
use super::registry::{SessionHandle, SessionId, SessionRegistry};
use crate::middleware::auth::{authenticate, AuthFailure};
use crate::models::user::Identity;
use crate::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    Open,
    Closing,
    Closed,
}

/// What the read loop does after handling a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Disconnect,
}

/// Registry membership of one session. Dropping it unregisters, so every
/// exit path out of an open session releases its entry.
#[derive(Debug)]
pub struct Registration {
    registry: Arc<SessionRegistry>,
    user_id: i64,
    session_id: SessionId,
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.registry.unregister(self.user_id, self.session_id);
    }
}

/// One authenticated location stream.
#[derive(Debug)]
pub struct StreamSession {
    id: SessionId,
    identity: Identity,
    state: SessionState,
    tx: Option<mpsc::Sender<Outbound>>,
    registration: Option<Registration>,
}

impl StreamSession {
    /// Runs the auth gate for a new connection, bounded by the configured
    /// handshake timeout. On success the session is still `Connecting`.
    pub async fn connect(app: &AppState, credential: Option<&str>) -> Result<Self, AuthFailure> {
        let credential = credential.ok_or(AuthFailure::MissingCredential)?;
        let identity = tokio::time::timeout(app.gateway.auth_timeout, authenticate(app, credential))
            .await
            .map_err(|_| AuthFailure::TimedOut)??;

        Ok(Self {
            id: Uuid::new_v4(),
            identity,
            state: SessionState::Connecting,
            tx: None,
            registration: None,
        })
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    fn transition(&mut self, next: SessionState) {
        tracing::trace!("session {}: {:?} -> {:?}", self.id, self.state, next);
        self.state = next;
    }

    /// Registers the session and returns the receiving end of its outbound
    /// queue.
    pub fn open(&mut self, app: &AppState) -> mpsc::Receiver<Outbound> {
        debug_assert_eq!(self.state, SessionState::Connecting);
        let (tx, rx) = mpsc::channel(app.gateway.session_queue);
        let user_id = self.identity.user_id;

        app.registry.register(
            user_id,
            SessionHandle {
                id: self.id,
                tx: tx.clone(),
            },
        );
        self.registration = Some(Registration {
            registry: Arc::clone(&app.registry),
            user_id,
            session_id: self.id,
        });
        self.tx = Some(tx);
        self.transition(SessionState::Open);

        tracing::info!(
            "user {} connected via WebSocket, {} session(s) live",
            user_id,
            app.registry.session_count(user_id)
        );
        rx
    }

    pub async fn handle_frame(&mut self, app: &AppState, frame: Message) -> Flow {
        if self.state != SessionState::Open {
            return Flow::Disconnect;
        }

        match frame {
            Message::Text(text) => self.ingest(app, text.as_str()).await,
            Message::Binary(bytes) => match std::str::from_utf8(&bytes) {
                Ok(text) => self.ingest(app, text).await,
                Err(_) => {
                    self.reply(Ack::Rejected(MessageError::InvalidJson.to_string()))
                        .await
                }
            },
            Message::Close(_) => Flow::Disconnect,
            Message::Ping(_) | Message::Pong(_) => Flow::Continue,
        }
    }

    async fn ingest(&self, app: &AppState, raw: &str) -> Flow {
        let ack = match ingest::process_location(app, &self.identity, raw).await {
            Ok(_) => Ack::Received,
            Err(e) => Ack::Rejected(e.to_string()),
        };
        self.reply(ack).await
    }

    /// Queues an ack behind any relays already waiting for this session.
    async fn reply(&self, ack: Ack) -> Flow {
        let Some(tx) = &self.tx else {
            return Flow::Disconnect;
        };
        match tx.send(Outbound::Ack(ack)).await {
            Ok(()) => Flow::Continue,
            Err(_) => Flow::Disconnect,
        }
    }

    /// Leaves the registry and releases the outbound queue. Safe to call more
    /// than once.
    pub fn close(&mut self) {
        if self.state == SessionState::Closed {
            return;
        }
        self.transition(SessionState::Closing);
        self.registration.take();
        self.tx.take();
        self.transition(SessionState::Closed);
        tracing::info!(
            "user {} disconnected from WebSocket (session {})",
            self.identity.user_id,
            self.id
        );
    }
}

/// Drives one connection from handshake to teardown.
pub async fn serve_connection<R, W, E>(
    app: AppState,
    credential: Option<String>,
    mut inbound: R,
    mut outbound: W,
) where
    R: Stream<Item = Result<Message, E>> + Unpin,
    W: Sink<Message> + Unpin + Send + 'static,
    E: std::fmt::Display + Send,
{
    let mut session = match StreamSession::connect(&app, credential.as_deref()).await {
        Ok(session) => session,
        Err(failure) => {
            reject(&mut outbound, &failure).await;
            return;
        }
    };

    let rx = session.open(&app);
    let mut writer = tokio::spawn(write_loop(outbound, rx));
    let mut writer_done = false;

    loop {
        tokio::select! {
            _ = &mut writer => {
                writer_done = true;
                break;
            }
            frame = inbound.next() => {
                let flow = match frame {
                    Some(Ok(frame)) => session.handle_frame(&app, frame).await,
                    Some(Err(e)) => {
                        tracing::debug!("session {}: read error: {}", session.id(), e);
                        Flow::Disconnect
                    }
                    None => Flow::Disconnect,
                };
                if flow == Flow::Disconnect {
                    break;
                }
            }
        }
    }

    session.close();

    if !writer_done && tokio::time::timeout(WRITER_DRAIN_TIMEOUT, &mut writer).await.is_err() {
        tracing::warn!("session {}: writer did not drain, aborting", session.id());
        writer.abort();
    }
}

/// Closes an unauthenticated connection with a policy-violation frame.
async fn reject<W>(outbound: &mut W, failure: &AuthFailure)
where
    W: Sink<Message> + Unpin,
{
    match failure {
        AuthFailure::Lookup(e) => tracing::error!("stream auth lookup failed: {e}"),
        other => tracing::info!("rejecting stream: {other}"),
    }
    let frame = CloseFrame {
        code: close_code::POLICY,
        reason: failure.to_string().into(),
    };
    let _ = outbound.send(Message::Close(Some(frame))).await;
    let _ = outbound.close().await;
}

/// Owns the socket sink: drains the session queue and sends keepalive pings
/// until every sender is gone or the transport fails.
async fn write_loop<W>(mut outbound: W, mut rx: mpsc::Receiver<Outbound>)
where
    W: Sink<Message> + Unpin,
{
    let mut ping = tokio::time::interval(PING_INTERVAL);
    ping.tick().await;

    loop {
        tokio::select! {
            next = rx.recv() => match next {
                Some(msg) => {
                    if outbound.send(msg.into_message()).await.is_err() {
                        return;
                    }
                }
                None => break,
            },
            _ = ping.tick() => {
                if outbound.send(Message::Ping(Default::default())).await.is_err() {
                    return;
                }
            }
        }
    }

    let _ = outbound.close().await;
}
