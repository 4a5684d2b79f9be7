//! Streaming endpoint: authenticate, snapshot, then pump messages through the
//! mutation engine and back out to every member of the session.

use axum::{
    extract::{
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade},
        Path, Query, State,
    },
    response::Response,
};
use chrono::Utc;
use futures_util::{stream::SplitSink, SinkExt, StreamExt};
use tracing::{debug, error, info, warn};

use crate::models::{ErrorMessage, SendMessage, TokenQuery};
use crate::AppState;
use super::connection::ConnectionHandle;
use super::mutation::{self, Dispatch};
use super::session::CLOSE_SUPERSEDED;
use super::store::SharedSession;

/// WebSocket handler for `/ws/:session_id?token=...`
pub async fn websocket_handler(
    Path(session_id): Path<String>,
    Query(query): Query<TokenQuery>,
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> Response {
    debug!(session_id = %session_id, "websocket connection attempt");
    ws.on_upgrade(move |socket| handle_socket(socket, session_id, query.token.unwrap_or_default(), state))
}

async fn handle_socket(socket: WebSocket, session_id: String, token: String, state: AppState) {
    let (mut sender, mut receiver) = socket.split();

    let session = match state.store.authorize(&session_id, &token).await {
        Ok(session) => session,
        Err(e) => {
            warn!(session_id = %session_id, error = %e, "websocket connection refused");
            let _ = send_close(&mut sender, e.close_code(), e.to_string()).await;
            return;
        }
    };

    let (handle, mut outbound) = ConnectionHandle::new();
    let connection_id = handle.id();
    let attached = {
        let mut s = session.lock().await;
        s.attach(token.clone(), handle.clone(), Utc::now(), state.store.expiry_policy())
            .map(|previous| {
                if let Some(previous) = previous {
                    info!(session_id = %session_id, connection_id = previous.id(), "closing superseded connection");
                    let _ = previous.close(CLOSE_SUPERSEDED, "superseded");
                }
                info!(
                    session_id = %session_id,
                    connection_id,
                    connections = s.connections.len(),
                    "websocket connection established"
                );
            })
    };
    if let Err(e) = attached {
        warn!(session_id = %session_id, error = %e, "websocket connection could not attach");
        let _ = send_close(&mut sender, e.close_code(), e.to_string()).await;
        return;
    }

    // Writer: drain this connection's queue into the socket.
    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = outbound.recv().await {
            let closing = matches!(msg, Message::Close(_));
            if sender.send(msg).await.is_err() || closing {
                break;
            }
        }
    });

    // Reader: apply each inbound message and fan out the result.
    let reader_session = session.clone();
    let reader_session_id = session_id.clone();
    let policy = state.policy;
    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    handle_text(&reader_session, &reader_session_id, &handle, &text, policy).await;
                }
                Ok(Message::Close(_)) => break,
                Ok(_) => continue,
                Err(e) => {
                    warn!(session_id = %reader_session_id, connection_id, error = %e, "websocket receive error");
                    break;
                }
            }
        }
    });

    tokio::select! {
        _ = (&mut send_task) => recv_task.abort(),
        _ = (&mut recv_task) => send_task.abort(),
    };

    let mut s = session.lock().await;
    s.unregister(&token, connection_id, Utc::now());
    info!(
        session_id = %session_id,
        connection_id,
        connections = s.connections.len(),
        "websocket connection closed"
    );
}

async fn handle_text(
    session: &SharedSession,
    session_id: &str,
    handle: &ConnectionHandle,
    text: &str,
    policy: mutation::MessagePolicy,
) {
    let mut s = session.lock().await;
    let now = Utc::now();
    s.touch(now);
    match mutation::process(&mut s.state, text, policy) {
        Dispatch::Broadcast(message) => {
            let delivered = s.broadcast(&message, now);
            debug!(session_id = %session_id, delivered, "message relayed");
        }
        Dispatch::Reply(e) => {
            let reply = SendMessage::Error(ErrorMessage { message: e.to_string() });
            match serde_json::to_string(&reply) {
                Ok(text) => {
                    if handle.send_text(text).is_err() {
                        debug!(session_id = %session_id, connection_id = handle.id(), "sender gone before error reply");
                    }
                }
                Err(e) => error!(session_id = %session_id, error = %e, "failed to serialize error reply"),
            }
        }
    }
}

/// Send a WebSocket close frame with a code and reason.
async fn send_close(
    sender: &mut SplitSink<WebSocket, Message>,
    code: u16,
    reason: String,
) -> Result<(), axum::Error> {
    sender
        .send(Message::Close(Some(CloseFrame {
            code,
            reason: reason.into(),
        })))
        .await
}
