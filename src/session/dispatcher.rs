use std::sync::Arc;

use super::connection::{Connection, ConnectionId};
use super::protocol::{OutboundEvent, HOST_LEFT};
use super::room::{ClosedRoom, RoomRegistry};
use crate::error::{QuizzyError, Result};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DeliveryReport {
    pub delivered: usize,
    pub failed: Vec<ConnectionId>,
}

/// Deliver one event to every connection of a membership snapshot.
///
/// A failing connection never stops delivery to the rest. Connections whose
/// outbox is full are aborted so a stalled client cannot hold the room back.
pub fn deliver(snapshot: &[Connection], event: &OutboundEvent) -> DeliveryReport {
    let mut report = DeliveryReport::default();

    for conn in snapshot {
        match conn.send(event.clone()) {
            Ok(()) => report.delivered += 1,
            Err(e) => {
                tracing::warn!(
                    connection_id = %conn.id(),
                    event = event.name(),
                    error = %e,
                    "Failed to deliver event"
                );
                if matches!(e, QuizzyError::SendFailed { .. }) {
                    conn.abort();
                }
                report.failed.push(conn.id());
            }
        }
    }

    report
}

pub struct Broadcaster {
    registry: Arc<RoomRegistry>,
}

impl Broadcaster {
    pub fn new(registry: Arc<RoomRegistry>) -> Self {
        Self { registry }
    }

    /// Deliver to the host and all participants of a live room
    pub async fn broadcast(&self, code: &str, event: OutboundEvent) -> Result<DeliveryReport> {
        let room = self.registry.get(code).await?;
        let room = room.lock().await;
        if room.is_closed() {
            return Err(QuizzyError::RoomNotFound(code.to_string()));
        }

        // Enqueue under the room lock: sends never block, and recipients see
        // broadcasts in the order the room produced them.
        Ok(deliver(&room.membership(), &event))
    }

    /// Tell every participant the session is over, then close all connections
    pub fn end_session(&self, closed: ClosedRoom) -> DeliveryReport {
        let notice = OutboundEvent::SessionEnded {
            reason: HOST_LEFT.to_string(),
        };
        let report = deliver(&closed.participants, &notice);

        for conn in &closed.participants {
            conn.close();
        }
        if let Some(host) = &closed.host {
            host.close();
        }

        tracing::info!(
            code = %closed.code,
            notified = report.delivered,
            failed = report.failed.len(),
            "Session ended"
        );
        report
    }
}
