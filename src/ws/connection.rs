use axum::extract::ws::{CloseFrame, Message};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::Notify;

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Frames a connection may have waiting for its writer before it counts as stalled.
pub const OUTBOUND_QUEUE_CAPACITY: usize = 256;
/// Close code sent to a connection whose peer stopped reading.
pub const CLOSE_LAGGING: u16 = 1008;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("connection {0} is closed")]
    Closed(u64),
    #[error("connection {0} is not draining its queue")]
    Lagging(u64),
}

/// Sending half of one client connection.
///
/// Messages are queued and written to the socket by the connection's own
/// writer task, so a send never waits on the peer. A full queue marks the
/// connection as lagging and its writer closes it.
#[derive(Clone, Debug)]
pub struct ConnectionHandle {
    id: u64,
    tx: mpsc::Sender<Message>,
    lagged: Arc<Notify>,
}

/// Receiving half, owned by the connection's writer task.
#[derive(Debug)]
pub struct Outbound {
    rx: mpsc::Receiver<Message>,
    lagged: Arc<Notify>,
}

impl ConnectionHandle {
    pub fn new() -> (Self, Outbound) {
        Self::with_capacity(OUTBOUND_QUEUE_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> (Self, Outbound) {
        let (tx, rx) = mpsc::channel(capacity);
        let lagged = Arc::new(Notify::new());
        let id = NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed);
        (
            Self {
                id,
                tx,
                lagged: lagged.clone(),
            },
            Outbound { rx, lagged },
        )
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn send_text(&self, text: String) -> Result<(), TransportError> {
        self.enqueue(Message::Text(text))
    }

    /// Queue a close frame. The writer task stops after flushing it.
    pub fn close(&self, code: u16, reason: &'static str) -> Result<(), TransportError> {
        self.enqueue(Message::Close(Some(CloseFrame {
            code,
            reason: reason.into(),
        })))
    }

    fn enqueue(&self, msg: Message) -> Result<(), TransportError> {
        self.tx.try_send(msg).map_err(|e| match e {
            TrySendError::Full(_) => {
                self.lagged.notify_one();
                TransportError::Lagging(self.id)
            }
            TrySendError::Closed(_) => TransportError::Closed(self.id),
        })
    }
}

impl Outbound {
    /// Next frame to write. A lagging connection gets a close frame ahead of
    /// whatever is still queued.
    pub async fn recv(&mut self) -> Option<Message> {
        tokio::select! {
            biased;
            _ = self.lagged.notified() => Some(Message::Close(Some(CloseFrame {
                code: CLOSE_LAGGING,
                reason: "outbound queue full".into(),
            }))),
            msg = self.rx.recv() => msg,
        }
    }

    pub fn try_recv(&mut self) -> Result<Message, mpsc::error::TryRecvError> {
        self.rx.try_recv()
    }
}
