use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::models::{SessionError, SharedState};
use super::session::{ExpiryPolicy, Session};
use super::token::issue_token;

pub type SharedSession = Arc<Mutex<Session>>;

/// Counters reported by the diagnostics endpoint.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StoreStats {
    pub sessions: usize,
    pub connections: usize,
    pub participants: usize,
}

/// Process-wide table of live sessions.
///
/// Lock order is always the map first, then a single session.
pub struct SessionStore {
    sessions: RwLock<HashMap<String, SharedSession>>,
    policy: ExpiryPolicy,
}

impl SessionStore {
    pub fn new(policy: ExpiryPolicy) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            policy,
        }
    }

    pub fn expiry_policy(&self) -> &ExpiryPolicy {
        &self.policy
    }

    /// Create a session seeded with `initial`. Returns `(session_id, host_token)`.
    pub async fn create(&self, initial: SharedState) -> (String, String) {
        let session_id = issue_token();
        let host_token = issue_token();
        let session = Session::new(session_id.clone(), host_token.clone(), initial, Utc::now());
        self.sessions
            .write()
            .await
            .insert(session_id.clone(), Arc::new(Mutex::new(session)));
        info!(session_id = %session_id, "session created");
        (session_id, host_token)
    }

    /// Look up a live session, evicting it on the spot if it has expired.
    pub async fn get(&self, session_id: &str) -> Result<SharedSession, SessionError> {
        let session = self
            .sessions
            .read()
            .await
            .get(session_id)
            .cloned()
            .ok_or(SessionError::NotFound)?;

        let expired = session.lock().await.is_expired(Utc::now(), &self.policy);
        if expired {
            self.evict(session_id).await;
            return Err(SessionError::NotFound);
        }
        Ok(session)
    }

    /// Mint a participant token. Returns the token and a copy of the shared state.
    pub async fn join(&self, session_id: &str) -> Result<(String, SharedState), SessionError> {
        let session = self.get(session_id).await?;
        let mut session = session.lock().await;
        let token = issue_token();
        session.add_participant(token.clone());
        session.touch(Utc::now());
        info!(session_id = %session_id, participants = session.participants.len(), "participant joined");
        Ok((token, session.state.shared.clone()))
    }

    /// Remove `token` from the participants. Idempotent.
    ///
    /// The session is deleted right away once nobody is left in it.
    pub async fn leave(&self, session_id: &str, token: &str) -> Result<(), SessionError> {
        let session = self.get(session_id).await?;
        let mut sessions = self.sessions.write().await;
        let vacant = {
            let mut session = session.lock().await;
            session.remove_participant(token);
            session.touch(Utc::now());
            let vacant = session.is_vacant();
            if vacant {
                session.close_all();
            }
            vacant
        };
        if vacant {
            sessions.remove(session_id);
            info!(session_id = %session_id, "session closed after last participant left");
        } else {
            debug!(session_id = %session_id, "participant left");
        }
        Ok(())
    }

    /// Check that `token` may open a connection to the session.
    pub async fn authorize(&self, session_id: &str, token: &str) -> Result<SharedSession, SessionError> {
        let session = self.get(session_id).await?;
        if !session.lock().await.is_authorized(token) {
            return Err(SessionError::Unauthorized);
        }
        Ok(session)
    }

    /// Evict every expired session. Returns how many were removed.
    pub async fn reap(&self) -> usize {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        let mut expired = Vec::new();
        for (id, session) in sessions.iter() {
            if session.lock().await.is_expired(now, &self.policy) {
                expired.push(id.clone());
            }
        }
        for id in &expired {
            if let Some(session) = sessions.remove(id) {
                session.lock().await.close_all();
                info!(session_id = %id, "session expired");
            }
        }
        expired.len()
    }

    pub async fn stats(&self) -> StoreStats {
        let sessions = self.sessions.read().await;
        let mut stats = StoreStats {
            sessions: sessions.len(),
            ..Default::default()
        };
        for session in sessions.values() {
            let s = session.lock().await;
            stats.connections += s.connections.len();
            stats.participants += s.participants.len();
        }
        stats
    }

    async fn evict(&self, session_id: &str) {
        let removed = self.sessions.write().await.remove(session_id);
        if let Some(session) = removed {
            session.lock().await.close_all();
            info!(session_id = %session_id, "expired session evicted on lookup");
        }
    }
}

/// Run `reap` every `interval` until the task is aborted.
pub fn spawn_reaper(store: Arc<SessionStore>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            let removed = store.reap().await;
            if removed > 0 {
                info!(removed, "reaper evicted expired sessions");
            } else {
                debug!("reaper found nothing to evict");
            }
        }
    })
}
