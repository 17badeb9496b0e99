use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use uuid::Uuid;

use super::events::Outbound;

pub type SessionId = Uuid;

/// The registry's view of a live session: only its outbound queue, never the
/// socket itself.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    pub id: SessionId,
    pub tx: mpsc::Sender<Outbound>,
}

/// Live streaming sessions grouped by user.
///
/// Each user bucket lives behind its DashMap shard lock, so register,
/// unregister and broadcast on one user are linearizable while unrelated
/// users mostly land on other shards. A bucket exists only while it holds at
/// least one session.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    buckets: DashMap<i64, HashMap<SessionId, mpsc::Sender<Outbound>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, user_id: i64, session: SessionHandle) {
        let mut bucket = self.buckets.entry(user_id).or_default();
        bucket.insert(session.id, session.tx);
        tracing::debug!(
            "registered session {} for user {} ({} live)",
            session.id,
            user_id,
            bucket.len()
        );
    }

    /// Removes a session, pruning the user's bucket when it empties. Returns
    /// whether the session was present.
    pub fn unregister(&self, user_id: i64, session_id: SessionId) -> bool {
        match self.buckets.entry(user_id) {
            Entry::Occupied(mut bucket) => {
                let removed = bucket.get_mut().remove(&session_id).is_some();
                if bucket.get().is_empty() {
                    bucket.remove();
                }
                if removed {
                    tracing::debug!("unregistered session {} for user {}", session_id, user_id);
                }
                removed
            }
            Entry::Vacant(_) => false,
        }
    }

    /// Queues `payload` for every session of `user_id`, the sender included.
    ///
    /// Never blocks on a recipient: a full queue loses this one relay and a
    /// closed queue is skipped. Returns how many sessions accepted the payload.
    pub fn broadcast(&self, user_id: i64, payload: Arc<str>) -> usize {
        let Some(bucket) = self.buckets.get(&user_id) else {
            return 0;
        };

        let mut delivered = 0;
        for (session_id, tx) in bucket.iter() {
            match tx.try_send(Outbound::Relay(Arc::clone(&payload))) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    tracing::warn!(
                        "outbound queue full for session {} of user {}, dropping relay",
                        session_id,
                        user_id
                    );
                }
                Err(TrySendError::Closed(_)) => {
                    tracing::debug!("session {} of user {} is closing", session_id, user_id);
                }
            }
        }
        delivered
    }

    pub fn session_count(&self, user_id: i64) -> usize {
        self.buckets.get(&user_id).map(|b| b.len()).unwrap_or(0)
    }

    pub fn contains(&self, user_id: i64) -> bool {
        self.buckets.contains_key(&user_id)
    }

    pub fn contains_session(&self, user_id: i64, session_id: SessionId) -> bool {
        self.buckets
            .get(&user_id)
            .map(|b| b.contains_key(&session_id))
            .unwrap_or(false)
    }

    /// Number of users with at least one live session.
    pub fn user_count(&self) -> usize {
        self.buckets.len()
    }
}
