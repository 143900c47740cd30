use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use uuid::Uuid;

use super::protocol::OutboundEvent;
use crate::error::{QuizzyError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Items consumed by a connection's writer task, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    Event(OutboundEvent),
    /// Flush what is queued, then close the socket
    Close,
}

/// Transport-independent handle to one party's duplex connection.
///
/// Sending only enqueues onto a bounded outbox and never waits, so it is safe to
/// call while a room is locked. The transport binding drains the outbox and owns
/// the actual socket writes.
#[derive(Clone)]
pub struct Connection {
    id: ConnectionId,
    outbox: mpsc::Sender<Outbound>,
    shutdown: Arc<watch::Sender<bool>>,
}

impl Connection {
    /// Create a handle plus the receiving end of its outbox
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Outbound>) {
        let (outbox, rx) = mpsc::channel(capacity.max(1));
        let (shutdown, _) = watch::channel(false);
        let connection = Self {
            id: ConnectionId::new(),
            outbox,
            shutdown: Arc::new(shutdown),
        };
        (connection, rx)
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn send(&self, event: OutboundEvent) -> Result<()> {
        if self.is_closed() {
            return Err(QuizzyError::TransportClosed(self.id));
        }

        self.outbox.try_send(Outbound::Event(event)).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => {
                QuizzyError::send_failed(self.id, "outbound queue is full")
            }
            mpsc::error::TrySendError::Closed(_) => QuizzyError::TransportClosed(self.id),
        })
    }

    /// Ask the writer to flush queued events and close. Falls back to an
    /// immediate abort when the outbox cannot take the close marker.
    pub fn close(&self) {
        if self.outbox.try_send(Outbound::Close).is_err() {
            self.abort();
        }
    }

    /// Stop both loops of this connection without flushing
    pub fn abort(&self) {
        self.shutdown.send_replace(true);
    }

    pub fn is_closed(&self) -> bool {
        *self.shutdown.borrow() || self.outbox.is_closed()
    }

    /// Resolves once `abort` has been called
    pub fn shutdown_signal(&self) -> watch::Receiver<bool> {
        self.shutdown.subscribe()
    }
}

impl PartialEq for Connection {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Connection {}

impl Hash for Connection {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("closed", &self.is_closed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::protocol::StatusLabel;

    fn status(participants: usize) -> OutboundEvent {
        OutboundEvent::Status {
            status: StatusLabel::Waiting,
            participants,
        }
    }

    #[tokio::test]
    async fn test_send_preserves_order() {
        let (conn, mut rx) = Connection::channel(8);
        conn.send(status(1)).unwrap();
        conn.send(status(2)).unwrap();
        conn.close();

        assert_eq!(rx.recv().await, Some(Outbound::Event(status(1))));
        assert_eq!(rx.recv().await, Some(Outbound::Event(status(2))));
        assert_eq!(rx.recv().await, Some(Outbound::Close));
    }

    #[tokio::test]
    async fn test_full_outbox_is_send_error() {
        let (conn, _rx) = Connection::channel(1);
        conn.send(status(1)).unwrap();

        let result = conn.send(status(2));
        assert!(matches!(result, Err(QuizzyError::SendFailed { .. })));
    }

    #[tokio::test]
    async fn test_dropped_receiver_is_transport_closed() {
        let (conn, rx) = Connection::channel(4);
        drop(rx);

        assert!(conn.is_closed());
        assert!(matches!(conn.send(status(1)), Err(QuizzyError::TransportClosed(_))));
    }

    #[tokio::test]
    async fn test_close_on_full_outbox_aborts() {
        let (conn, _rx) = Connection::channel(1);
        let mut signal = conn.shutdown_signal();
        conn.send(status(1)).unwrap();

        conn.close();
        signal.changed().await.unwrap();
        assert!(*signal.borrow());
        assert!(conn.is_closed());
    }

    #[test]
    fn test_identity_is_by_id() {
        let (a, _rx_a) = Connection::channel(1);
        let (b, _rx_b) = Connection::channel(1);
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
    }
}
