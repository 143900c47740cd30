use std::sync::Arc;

use super::connection::{Connection, ConnectionId};
use super::dispatcher::{deliver, Broadcaster};
use super::protocol::{OutboundEvent, QuizSummary, StatusLabel};
use super::room::{Room, RoomRegistry};
use crate::error::{QuizzyError, Result};
use crate::quiz::{CodeResolver, Question, QuizStore};

/// Which side of a room a connection is on
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Role {
    Host,
    Participant,
}

/// Room membership acquired by a connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub code: String,
    pub role: Role,
}

/// Result of a `nextQuestion` transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// Question at this index was dispatched
    Dispatched(usize),
    /// The quiz was already exhausted
    Exhausted,
}

/// Applies the session state machine to rooms and fans out the resulting events.
pub struct SessionEngine {
    registry: Arc<RoomRegistry>,
    broadcaster: Broadcaster,
    resolver: Arc<dyn CodeResolver>,
    store: Arc<dyn QuizStore>,
}

impl SessionEngine {
    pub fn new(
        registry: Arc<RoomRegistry>,
        resolver: Arc<dyn CodeResolver>,
        store: Arc<dyn QuizStore>,
    ) -> Arc<Self> {
        Arc::new(Self {
            broadcaster: Broadcaster::new(registry.clone()),
            registry,
            resolver,
            store,
        })
    }

    pub fn registry(&self) -> &Arc<RoomRegistry> {
        &self.registry
    }

    pub fn broadcaster(&self) -> &Broadcaster {
        &self.broadcaster
    }

    /// Open a room for `code` with `conn` as its host
    pub async fn host(&self, conn: &Connection, code: &str) -> Result<Binding> {
        let quiz_ref = self.resolver.get_quiz(code).await?;
        let quiz = self.store.get_unique(&quiz_ref.owner_id, &quiz_ref.quiz_id).await?;

        let mut room = self.registry.open_room(code, quiz, conn.clone()).await?;
        room.reset_participant_count();

        let details = OutboundEvent::HostDetails {
            quiz: QuizSummary {
                title: room.quiz().title.clone(),
            },
        };
        if let Err(e) = conn.send(details) {
            drop(room);
            if let Some(closed) = self.registry.clear_host(code).await {
                self.broadcaster.end_session(closed);
            }
            return Err(e);
        }
        deliver(&room.membership(), &status_event(&room));

        tracing::info!(
            code = %code,
            connection_id = %conn.id(),
            owner_id = %quiz_ref.owner_id,
            quiz_id = %quiz_ref.quiz_id,
            questions = room.quiz().questions.len(),
            "Host opened session"
        );
        Ok(Binding {
            code: code.to_string(),
            role: Role::Host,
        })
    }

    /// Add `conn` to the participants of a live room
    pub async fn join(&self, conn: &Connection, code: &str) -> Result<Binding> {
        let room = self.registry.get(code).await?;
        let mut room = room.lock().await;
        let participants = room.add_participant(conn.clone())?;

        if let Err(e) = conn.send(OutboundEvent::JoinDetails {
            quiz_title: room.quiz().title.clone(),
        }) {
            room.remove_participant(conn.id());
            return Err(e);
        }
        deliver(&room.membership(), &status_event(&room));

        // Late joiners catch up on the question currently on screen
        if let Some(question) = room.current_question() {
            deliver(std::slice::from_ref(conn), &question_event(question));
        }

        tracing::info!(
            code = %code,
            connection_id = %conn.id(),
            participants = participants,
            "Participant joined"
        );
        Ok(Binding {
            code: code.to_string(),
            role: Role::Participant,
        })
    }

    /// Advance the room to its next question
    pub async fn next_question(&self, conn: &Connection, code: &str) -> Result<Progress> {
        let room = self.registry.get(code).await?;
        let mut room = room.lock().await;
        if room.is_closed() {
            return Err(QuizzyError::RoomNotFound(code.to_string()));
        }

        let (index, done) = room.advance_question();
        let snapshot = room.membership();
        deliver(
            &snapshot,
            &OutboundEvent::Status {
                status: StatusLabel::Started,
                participants: room.participant_count(),
            },
        );

        if done {
            tracing::debug!(code = %code, connection_id = %conn.id(), "Quiz already exhausted");
            return Ok(Progress::Exhausted);
        }

        if let Some(question) = room.question(index) {
            deliver(&snapshot, &question_event(question));
        }

        tracing::info!(
            code = %code,
            connection_id = %conn.id(),
            index = index,
            total = room.quiz().questions.len(),
            "Question dispatched"
        );
        Ok(Progress::Dispatched(index))
    }

    /// Tear down what `id` held: a host takes its room with it, a participant
    /// just leaves.
    pub async fn disconnect(&self, id: ConnectionId, binding: &Binding) {
        match binding.role {
            Role::Host => {
                let is_host = match self.registry.get(&binding.code).await {
                    Ok(room) => room.lock().await.is_host(id),
                    Err(_) => false,
                };
                if !is_host {
                    return;
                }

                if let Some(closed) = self.registry.clear_host(&binding.code).await {
                    tracing::info!(
                        code = %binding.code,
                        connection_id = %id,
                        "Host disconnected, closing session"
                    );
                    self.broadcaster.end_session(closed);
                }
            }
            Role::Participant => {
                let Ok(room) = self.registry.get(&binding.code).await else {
                    return;
                };
                let mut room = room.lock().await;
                if let Some(participants) = room.remove_participant(id) {
                    deliver(&room.membership(), &status_event(&room));
                    tracing::info!(
                        code = %binding.code,
                        connection_id = %id,
                        participants = participants,
                        "Participant left"
                    );
                }
            }
        }
    }
}

fn status_event(room: &Room) -> OutboundEvent {
    OutboundEvent::Status {
        status: room.status().label(),
        participants: room.participant_count(),
    }
}

fn question_event(question: &Question) -> OutboundEvent {
    OutboundEvent::NewQuestion {
        question: question.title.clone(),
        answers: question.answer_titles(),
    }
}
