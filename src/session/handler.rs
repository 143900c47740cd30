use std::sync::Arc;

use super::connection::Connection;
use super::engine::{Binding, SessionEngine};
use super::protocol::{InboundEvent, OutboundEvent};
use crate::error::{QuizzyError, Result};

/// Per-connection protocol state: routes inbound events to the engine and
/// remembers which room this connection belongs to.
pub struct SessionHandler {
    engine: Arc<SessionEngine>,
    connection: Connection,
    binding: Option<Binding>,
}

impl SessionHandler {
    pub fn new(engine: Arc<SessionEngine>, connection: Connection) -> Self {
        Self {
            engine,
            connection,
            binding: None,
        }
    }

    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    pub fn binding(&self) -> Option<&Binding> {
        self.binding.as_ref()
    }

    /// Handle one text frame. Protocol errors are reported to this connection
    /// and never end the read loop.
    pub async fn handle_text(&mut self, text: &str) {
        tracing::debug!(connection_id = %self.connection.id(), raw_message = %text, "Received frame");

        match InboundEvent::parse(text) {
            Ok(Some(event)) => self.handle_event(event).await,
            Ok(None) => {
                tracing::debug!(connection_id = %self.connection.id(), "Ignoring unknown event");
            }
            Err(e) => {
                tracing::warn!(
                    connection_id = %self.connection.id(),
                    error = %e,
                    raw_message = %text,
                    "Dropping malformed event"
                );
                self.report(&e);
            }
        }
    }

    pub async fn handle_event(&mut self, event: InboundEvent) {
        let name = event.name();
        if let Err(e) = self.apply(event).await {
            tracing::warn!(
                connection_id = %self.connection.id(),
                event = name,
                error = %e,
                "Event rejected"
            );
            self.report(&e);
        }
    }

    async fn apply(&mut self, event: InboundEvent) -> Result<()> {
        match event {
            InboundEvent::Host { execution_id } => {
                self.ensure_unbound()?;
                let binding = self.engine.host(&self.connection, &execution_id).await?;
                self.binding = Some(binding);
            }
            InboundEvent::Join { execution_id } => {
                self.ensure_unbound()?;
                let binding = self.engine.join(&self.connection, &execution_id).await?;
                self.binding = Some(binding);
            }
            InboundEvent::NextQuestion { execution_id } => {
                self.engine
                    .next_question(&self.connection, &execution_id)
                    .await?;
            }
        }
        Ok(())
    }

    fn ensure_unbound(&self) -> Result<()> {
        match self.binding {
            Some(_) => Err(QuizzyError::AlreadyInSession),
            None => Ok(()),
        }
    }

    fn report(&self, err: &QuizzyError) {
        if let Err(e) = self.connection.send(OutboundEvent::error(err)) {
            tracing::debug!(connection_id = %self.connection.id(), error = %e, "Could not report error");
        }
    }

    /// Release room membership once the connection is gone
    pub async fn cleanup(&mut self) {
        if let Some(binding) = self.binding.take() {
            self.engine.disconnect(self.connection.id(), &binding).await;
        }
        self.connection.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quiz::{CodeResolver, InMemoryCodeResolver, InMemoryQuizStore, Quiz, QuizStore};
    use crate::session::connection::Outbound;
    use crate::session::room::RoomRegistry;
    use tokio::sync::mpsc;

    async fn engine() -> Arc<SessionEngine> {
        let store = Arc::new(InMemoryQuizStore::new());
        let resolver = Arc::new(InMemoryCodeResolver::new());
        let quiz = Quiz {
            id: "geo".to_string(),
            title: "Geography".to_string(),
            code: "ABC123".to_string(),
            questions: Vec::new(),
        };
        resolver.bind_code("owner", &quiz).await.unwrap();
        store.upsert("owner", quiz).await.unwrap();
        SessionEngine::new(RoomRegistry::new(), resolver, store)
    }

    fn next_event(rx: &mut mpsc::Receiver<Outbound>) -> OutboundEvent {
        match rx.try_recv() {
            Ok(Outbound::Event(event)) => event,
            other => panic!("expected an event, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_malformed_frame_is_reported_not_fatal() {
        let (conn, mut rx) = Connection::channel(8);
        let mut handler = SessionHandler::new(engine().await, conn);

        handler.handle_text(r#"{"name":"join","data":{}}"#).await;
        match next_event(&mut rx) {
            OutboundEvent::Error { kind, .. } => assert_eq!(kind, "malformed"),
            other => panic!("unexpected {:?}", other),
        }

        handler.handle_text(r#"{"name":"host","data":{"executionId":"ABC123"}}"#).await;
        assert!(matches!(next_event(&mut rx), OutboundEvent::HostDetails { .. }));
    }

    #[tokio::test]
    async fn test_unknown_event_is_silent() {
        let (conn, mut rx) = Connection::channel(8);
        let mut handler = SessionHandler::new(engine().await, conn);

        handler.handle_text(r#"{"name":"wave","data":{}}"#).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_connection_binds_once() {
        let (conn, mut rx) = Connection::channel(8);
        let mut handler = SessionHandler::new(engine().await, conn);

        handler.handle_text(r#"{"name":"host","data":{"executionId":"ABC123"}}"#).await;
        let _ = next_event(&mut rx);
        let _ = next_event(&mut rx);

        handler.handle_text(r#"{"name":"join","data":{"executionId":"ABC123"}}"#).await;
        match next_event(&mut rx) {
            OutboundEvent::Error { kind, .. } => assert_eq!(kind, "alreadyInSession"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_cleanup_of_host_removes_room() {
        let engine = engine().await;
        let (conn, _rx) = Connection::channel(8);
        let mut handler = SessionHandler::new(engine.clone(), conn);

        handler.handle_text(r#"{"name":"host","data":{"executionId":"ABC123"}}"#).await;
        assert!(engine.registry().room_exists("ABC123").await);

        handler.cleanup().await;
        assert!(!engine.registry().room_exists("ABC123").await);
        assert!(handler.binding().is_none());
    }
}
