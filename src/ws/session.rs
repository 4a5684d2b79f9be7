use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use tracing::{debug, error, warn};

use crate::models::{QuestionIndex, SendMessage, SessionError, SharedState, StateMessage};
use super::connection::ConnectionHandle;

/// Close code sent to a connection displaced by a newer one for the same token.
pub const CLOSE_SUPERSEDED: u16 = 1000;
/// Close code sent to every connection of an evicted session.
pub const CLOSE_EXPIRED: u16 = 1001;

/// Age and idle limits after which a session is evicted.
#[derive(Clone, Copy, Debug)]
pub struct ExpiryPolicy {
    pub max_age: Duration,
    pub idle_timeout: Duration,
}

impl Default for ExpiryPolicy {
    fn default() -> Self {
        Self {
            max_age: Duration::hours(2),
            idle_timeout: Duration::minutes(5),
        }
    }
}

/// Everything the mutation engine reads and writes for one session.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub shared: SharedState,
    pub highlights: Vec<Value>,
    pub search: String,
    pub question_index: QuestionIndex,
}

impl SessionState {
    pub fn new(shared: SharedState) -> Self {
        Self {
            shared,
            ..Default::default()
        }
    }

    /// Highlights and the search term only make sense for the current view.
    pub fn clear_annotations(&mut self) {
        self.highlights.clear();
        self.search.clear();
    }

    pub fn snapshot(&self) -> SendMessage<'_> {
        SendMessage::State(StateMessage {
            state: &self.shared,
            highlights: &self.highlights,
            search: &self.search,
            view: self.shared.view_mode,
            question_index: self.question_index,
        })
    }
}

#[derive(Debug)]
pub struct Session {
    pub id: String,
    pub host_token: String,
    pub participants: HashSet<String>,
    pub connections: HashMap<String, ConnectionHandle>,
    pub state: SessionState,
    pub created_at: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
    /// Set once the session has been removed from the store.
    pub closed: bool,
}

impl Session {
    pub fn new(id: String, host_token: String, shared: SharedState, now: DateTime<Utc>) -> Self {
        Self {
            id,
            host_token,
            participants: HashSet::new(),
            connections: HashMap::new(),
            state: SessionState::new(shared),
            created_at: now,
            last_active: now,
            closed: false,
        }
    }

    /// Age expiry is unconditional; idle expiry needs zero live connections.
    pub fn is_expired(&self, now: DateTime<Utc>, policy: &ExpiryPolicy) -> bool {
        if now - self.created_at > policy.max_age {
            return true;
        }
        self.connections.is_empty() && now - self.last_active > policy.idle_timeout
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_active = now;
    }

    pub fn is_authorized(&self, token: &str) -> bool {
        token == self.host_token || self.participants.contains(token)
    }

    pub fn add_participant(&mut self, token: String) {
        if token != self.host_token {
            self.participants.insert(token);
        }
    }

    pub fn remove_participant(&mut self, token: &str) {
        self.participants.remove(token);
    }

    /// No participants and no live connections left.
    pub fn is_vacant(&self) -> bool {
        self.participants.is_empty() && self.connections.is_empty()
    }

    /// Store a connection for `token`, returning the one it displaced.
    pub fn register(&mut self, token: String, connection: ConnectionHandle, now: DateTime<Utc>) -> Option<ConnectionHandle> {
        self.touch(now);
        self.connections.insert(token, connection)
    }

    /// Queue the state snapshot on `connection` and register it for `token`.
    ///
    /// Refused with `NotFound` when the session was removed or has expired
    /// since the caller looked it up. Returns the connection it displaced.
    pub fn attach(
        &mut self,
        token: String,
        connection: ConnectionHandle,
        now: DateTime<Utc>,
        policy: &ExpiryPolicy,
    ) -> Result<Option<ConnectionHandle>, SessionError> {
        if self.closed || self.is_expired(now, policy) {
            return Err(SessionError::NotFound);
        }
        let snapshot = serde_json::to_string(&self.state.snapshot()).map_err(|e| {
            error!(session_id = %self.id, error = %e, "failed to serialize session snapshot");
            SessionError::Internal(e.to_string())
        })?;
        // Queued before registering so it precedes any broadcast.
        connection
            .send_text(snapshot)
            .map_err(|e| SessionError::Internal(e.to_string()))?;
        Ok(self.register(token, connection, now))
    }

    /// Drop the registry slot for `token` if it still holds `connection_id`,
    /// and forget the participant unless another connection holds the token.
    ///
    /// Returns true when the slot was released.
    pub fn unregister(&mut self, token: &str, connection_id: u64, now: DateTime<Utc>) -> bool {
        let owned = self
            .connections
            .get(token)
            .map_or(false, |c| c.id() == connection_id);
        if owned {
            self.connections.remove(token);
        }
        if !self.connections.contains_key(token) {
            self.participants.remove(token);
        }
        if self.connections.is_empty() {
            self.touch(now);
        }
        owned
    }

    /// Deliver `message` to every registered connection.
    ///
    /// A connection that cannot take the message is dropped from the registry;
    /// delivery to the rest carries on. Returns the number of deliveries.
    pub fn broadcast(&mut self, message: &Value, now: DateTime<Utc>) -> usize {
        self.touch(now);
        let text = message.to_string();
        let mut failed = Vec::new();
        for (token, connection) in self.connections.iter() {
            if let Err(e) = connection.send_text(text.clone()) {
                warn!(session_id = %self.id, error = %e, "dropping connection after failed delivery");
                failed.push(token.clone());
            }
        }
        for token in &failed {
            self.connections.remove(token);
        }
        self.connections.len()
    }

    /// Mark the session removed and best-effort close every connection.
    pub fn close_all(&mut self) {
        self.closed = true;
        for (_, connection) in self.connections.drain() {
            if let Err(e) = connection.close(CLOSE_EXPIRED, "session expired") {
                debug!(session_id = %self.id, error = %e, "connection already gone at eviction");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn session_at(now: DateTime<Utc>) -> Session {
        Session::new("s1".to_string(), "host".to_string(), SharedState::default(), now)
    }

    #[test]
    fn fresh_session_is_not_expired() {
        let now = Utc::now();
        let session = session_at(now);
        assert!(!session.is_expired(now, &ExpiryPolicy::default()));
    }

    #[test]
    fn age_expiry_ignores_connections() {
        let now = Utc::now();
        let mut session = session_at(now - Duration::hours(3));
        let (handle, _rx) = ConnectionHandle::new();
        session.register("host".to_string(), handle, now);
        assert!(session.is_expired(now, &ExpiryPolicy::default()));
    }

    #[test]
    fn idle_expiry_needs_zero_connections() {
        let now = Utc::now();
        let mut session = session_at(now - Duration::minutes(30));
        session.last_active = now - Duration::minutes(10);
        assert!(session.is_expired(now, &ExpiryPolicy::default()));

        let (handle, _rx) = ConnectionHandle::new();
        session.connections.insert("host".to_string(), handle);
        assert!(!session.is_expired(now, &ExpiryPolicy::default()));
    }

    #[test]
    fn host_token_never_becomes_participant() {
        let mut session = session_at(Utc::now());
        session.add_participant("host".to_string());
        assert!(session.participants.is_empty());
        assert!(session.is_authorized("host"));
        assert!(!session.is_authorized("someone"));
    }

    #[test]
    fn broadcast_survives_a_dead_connection() {
        let now = Utc::now();
        let mut session = session_at(now);
        let (alive, mut alive_rx) = ConnectionHandle::new();
        let (dead, dead_rx) = ConnectionHandle::new();
        session.register("host".to_string(), alive, now);
        session.register("p1".to_string(), dead, now);
        session.add_participant("p1".to_string());
        drop(dead_rx);

        let delivered = session.broadcast(&json!({"type": "search", "term": "x"}), now);
        assert_eq!(delivered, 1);
        assert!(session.connections.contains_key("host"));
        assert!(!session.connections.contains_key("p1"));
        // Membership is a separate lifecycle from the connection.
        assert!(session.participants.contains("p1"));

        match alive_rx.try_recv().unwrap() {
            axum::extract::ws::Message::Text(text) => {
                let value: Value = serde_json::from_str(&text).unwrap();
                assert_eq!(value, json!({"type": "search", "term": "x"}));
            }
            other => panic!("unexpected message {other:?}"),
        }
    }

    #[test]
    fn broadcast_drops_a_stalled_connection() {
        let now = Utc::now();
        let mut session = session_at(now);
        let (reader, mut reader_rx) = ConnectionHandle::new();
        let (stalled, _stalled_rx) = ConnectionHandle::with_capacity(1);
        session.register("host".to_string(), reader, now);
        session.register("p1".to_string(), stalled, now);

        assert_eq!(session.broadcast(&json!({"type": "search", "term": "a"}), now), 2);
        assert_eq!(session.broadcast(&json!({"type": "search", "term": "b"}), now), 1);
        assert!(!session.connections.contains_key("p1"));
        assert!(reader_rx.try_recv().is_ok());
        assert!(reader_rx.try_recv().is_ok());
    }

    #[test]
    fn attach_queues_snapshot_before_broadcasts() {
        let now = Utc::now();
        let mut session = session_at(now);
        session.state.search = "seed".to_string();
        let (handle, mut rx) = ConnectionHandle::new();
        let displaced = session.attach("host".to_string(), handle, now, &ExpiryPolicy::default()).unwrap();
        assert!(displaced.is_none());
        session.broadcast(&json!({"type": "search", "term": "next"}), now);

        let first: Value = match rx.try_recv().unwrap() {
            axum::extract::ws::Message::Text(text) => serde_json::from_str(&text).unwrap(),
            other => panic!("unexpected message {other:?}"),
        };
        assert_eq!(first["type"], "state");
        assert_eq!(first["search"], "seed");
        assert!(rx.try_recv().is_ok());
    }

    #[test]
    fn attach_refuses_removed_or_expired_session() {
        let now = Utc::now();
        let policy = ExpiryPolicy::default();

        let mut removed = session_at(now);
        removed.close_all();
        let (handle, mut rx) = ConnectionHandle::new();
        assert_eq!(
            removed.attach("host".to_string(), handle, now, &policy).unwrap_err(),
            SessionError::NotFound
        );
        assert!(removed.connections.is_empty());
        assert!(rx.try_recv().is_err());

        let mut stale = session_at(now - Duration::hours(3));
        let (handle, _rx) = ConnectionHandle::new();
        assert_eq!(
            stale.attach("host".to_string(), handle, now, &policy).unwrap_err(),
            SessionError::NotFound
        );
        assert!(stale.connections.is_empty());
    }

    #[test]
    fn replaced_connection_cannot_unregister_successor() {
        let now = Utc::now();
        let mut session = session_at(now);
        session.add_participant("p1".to_string());
        let (first, _rx1) = ConnectionHandle::new();
        let (second, _rx2) = ConnectionHandle::new();
        let first_id = first.id();
        let second_id = second.id();

        assert!(session.register("p1".to_string(), first, now).is_none());
        let displaced = session.register("p1".to_string(), second, now).unwrap();
        assert_eq!(displaced.id(), first_id);

        assert!(!session.unregister("p1", first_id, now));
        assert!(session.connections.contains_key("p1"));
        assert!(session.participants.contains("p1"));

        assert!(session.unregister("p1", second_id, now));
        assert!(session.connections.is_empty());
        assert!(!session.participants.contains("p1"));
    }

    #[test]
    fn last_disconnect_restarts_idle_clock() {
        let start = Utc::now() - Duration::minutes(10);
        let now = Utc::now();
        let mut session = session_at(start);
        let (handle, _rx) = ConnectionHandle::new();
        let id = handle.id();
        session.register("host".to_string(), handle, start);
        session.unregister("host", id, now);
        assert_eq!(session.last_active, now);
        assert!(!session.is_expired(now, &ExpiryPolicy::default()));
    }

    #[test]
    fn snapshot_carries_full_state() {
        let mut session = session_at(Utc::now());
        session.state.highlights.push(json!({"id": 1}));
        session.state.search = "term".to_string();
        session.state.question_index = QuestionIndex { section: 1, question: 2 };
        let value = serde_json::to_value(session.state.snapshot()).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "state",
                "state": {"tests": {}, "activeTestId": null, "viewMode": "home"},
                "highlights": [{"id": 1}],
                "search": "term",
                "view": "home",
                "question_index": {"section": 1, "question": 2}
            })
        );
    }
}
