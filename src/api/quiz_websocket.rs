use std::sync::Arc;
use std::time::Duration;

use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use tokio::sync::{mpsc, watch};
use tokio::time::timeout;
use warp::ws::{Message, WebSocket};

use crate::config::SessionConfig;
use crate::session::{Connection, Outbound, SessionEngine, SessionHandler};

pub async fn handle_quiz_websocket(
    websocket: WebSocket,
    engine: Arc<SessionEngine>,
    settings: SessionConfig,
) {
    let (connection, outbox) = Connection::channel(settings.outbox_capacity);
    let connection_id = connection.id();
    tracing::info!(connection_id = %connection_id, "New quiz WebSocket connection established");

    let (ws_sender, mut ws_receiver) = websocket.split();
    let mut shutdown = connection.shutdown_signal();
    let writer_shutdown = connection.shutdown_signal();

    let mut handler = SessionHandler::new(engine, connection.clone());

    // Spawn task to send messages to client
    let sender_task = tokio::spawn(write_loop(
        ws_sender,
        outbox,
        connection,
        writer_shutdown,
        settings.send_timeout,
    ));

    loop {
        tokio::select! {
            frame = ws_receiver.next() => match frame {
                Some(Ok(message)) => {
                    if message.is_close() {
                        break;
                    }
                    if let Ok(text) = message.to_str() {
                        handler.handle_text(text).await;
                    }
                }
                Some(Err(e)) => {
                    tracing::error!(connection_id = %connection_id, error = %e, "WebSocket error");
                    break;
                }
                None => break,
            },
            _ = shutdown.changed() => break,
        }
    }

    handler.cleanup().await;
    if let Err(e) = sender_task.await {
        tracing::error!(connection_id = %connection_id, error = %e, "Writer task failed");
    }
    tracing::info!(connection_id = %connection_id, "Quiz WebSocket connection closed");
}

async fn write_loop(
    mut ws_sender: SplitSink<WebSocket, Message>,
    mut outbox: mpsc::Receiver<Outbound>,
    connection: Connection,
    mut shutdown: watch::Receiver<bool>,
    send_timeout: Duration,
) {
    loop {
        let item = tokio::select! {
            item = outbox.recv() => item,
            _ = shutdown.changed() => None,
        };

        match item {
            Some(Outbound::Event(event)) => {
                let text = match event.to_json() {
                    Ok(text) => text,
                    Err(e) => {
                        tracing::error!(error = %e, event = event.name(), "Failed to serialize event");
                        continue;
                    }
                };

                match timeout(send_timeout, ws_sender.send(Message::text(text))).await {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => {
                        tracing::error!(connection_id = %connection.id(), error = %e, "Failed to send WebSocket message");
                        break;
                    }
                    Err(_) => {
                        tracing::warn!(
                            connection_id = %connection.id(),
                            timeout_ms = send_timeout.as_millis() as u64,
                            "WebSocket send timed out, dropping connection"
                        );
                        break;
                    }
                }
            }
            Some(Outbound::Close) => {
                let _ = timeout(send_timeout, ws_sender.send(Message::close())).await;
                break;
            }
            None => break,
        }
    }

    // Stop the read loop too
    connection.abort();
}
