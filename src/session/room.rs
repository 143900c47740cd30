use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

use super::connection::{Connection, ConnectionId};
use super::protocol::StatusLabel;
use crate::error::{QuizzyError, Result};
use crate::quiz::{Question, Quiz};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomStatus {
    Waiting,
    InProgress,
    Finished,
}

impl RoomStatus {
    pub fn label(self) -> StatusLabel {
        match self {
            RoomStatus::Waiting => StatusLabel::Waiting,
            RoomStatus::InProgress | RoomStatus::Finished => StatusLabel::Started,
        }
    }
}

/// Live state of one quiz session
#[derive(Debug)]
pub struct Room {
    code: String,
    quiz: Arc<Quiz>,
    host: Option<Connection>,
    host_assigned: bool,
    participants: HashMap<ConnectionId, Connection>,
    participant_count: usize,
    current_question_index: usize,
    status: RoomStatus,
    closed: bool,
}

/// What is left of a room after it has been removed from the registry
#[derive(Debug)]
pub struct ClosedRoom {
    pub code: String,
    pub host: Option<Connection>,
    pub participants: Vec<Connection>,
}

impl Room {
    fn new(code: String, quiz: Quiz) -> Self {
        Self {
            code,
            quiz: Arc::new(quiz),
            host: None,
            host_assigned: false,
            participants: HashMap::new(),
            participant_count: 0,
            current_question_index: 0,
            status: RoomStatus::Waiting,
            closed: false,
        }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn quiz(&self) -> &Quiz {
        &self.quiz
    }

    pub fn host(&self) -> Option<&Connection> {
        self.host.as_ref()
    }

    pub fn status(&self) -> RoomStatus {
        self.status
    }

    pub fn current_question_index(&self) -> usize {
        self.current_question_index
    }

    pub fn participant_count(&self) -> usize {
        self.participant_count
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn is_host(&self, id: ConnectionId) -> bool {
        self.host.as_ref().map(|h| h.id() == id).unwrap_or(false)
    }

    pub fn has_participant(&self, id: ConnectionId) -> bool {
        self.participants.contains_key(&id)
    }

    /// A host may be assigned once per room lifetime
    pub fn set_host(&mut self, conn: Connection) -> Result<()> {
        if self.closed {
            return Err(QuizzyError::RoomNotFound(self.code.clone()));
        }
        if self.host_assigned {
            return Err(QuizzyError::RoomAlreadyExists(self.code.clone()));
        }
        if self.participants.contains_key(&conn.id()) {
            return Err(QuizzyError::AlreadyInSession);
        }

        self.host = Some(conn);
        self.host_assigned = true;
        Ok(())
    }

    /// Returns the new participant count. Adding a present connection is a no-op.
    pub fn add_participant(&mut self, conn: Connection) -> Result<usize> {
        if self.closed {
            return Err(QuizzyError::RoomNotFound(self.code.clone()));
        }
        if self.is_host(conn.id()) {
            return Err(QuizzyError::AlreadyInSession);
        }

        if self.participants.insert(conn.id(), conn).is_none() {
            self.increment_participant_count();
        }
        Ok(self.participant_count)
    }

    /// Returns the new count if the connection was a participant
    pub fn remove_participant(&mut self, id: ConnectionId) -> Option<usize> {
        self.participants.remove(&id).map(|_| {
            self.decrement_participant_count();
            self.participant_count
        })
    }

    fn increment_participant_count(&mut self) {
        self.participant_count += 1;
    }

    fn decrement_participant_count(&mut self) {
        self.participant_count = self.participant_count.saturating_sub(1);
    }

    /// Resynchronize the counter with membership; zero for a fresh room
    pub fn reset_participant_count(&mut self) {
        self.participant_count = self.participants.len();
    }

    /// Read then increment the question index.
    ///
    /// Returns the pre-increment index and `done = true` when the quiz was already
    /// exhausted, in which case the index does not move.
    pub fn advance_question(&mut self) -> (usize, bool) {
        let index = self.current_question_index;
        let total = self.quiz.questions.len();

        if index >= total {
            self.status = RoomStatus::Finished;
            return (index, true);
        }

        self.current_question_index = index + 1;
        self.status = if self.current_question_index == total {
            RoomStatus::Finished
        } else {
            RoomStatus::InProgress
        };
        (index, false)
    }

    pub fn question(&self, index: usize) -> Option<&Question> {
        self.quiz.questions.get(index)
    }

    /// The most recently dispatched question, which stays on screen after the
    /// last one has gone out
    pub fn current_question(&self) -> Option<&Question> {
        match self.status {
            RoomStatus::Waiting => None,
            RoomStatus::InProgress | RoomStatus::Finished => self
                .current_question_index
                .checked_sub(1)
                .and_then(|i| self.question(i)),
        }
    }

    /// Snapshot of everyone to deliver to: host first, then participants
    pub fn membership(&self) -> Vec<Connection> {
        self.host
            .iter()
            .cloned()
            .chain(self.participants.values().cloned())
            .collect()
    }

    pub fn participants(&self) -> Vec<Connection> {
        self.participants.values().cloned().collect()
    }

    fn close(&mut self) -> ClosedRoom {
        self.closed = true;
        self.participant_count = 0;
        ClosedRoom {
            code: self.code.clone(),
            host: self.host.take(),
            participants: self.participants.drain().map(|(_, c)| c).collect(),
        }
    }
}

pub type SharedRoom = Arc<Mutex<Room>>;

/// In-memory registry of live rooms keyed by join code.
///
/// The map lock only guards lookup/insert/remove; each room carries its own lock
/// so traffic in one session never waits on another.
pub struct RoomRegistry {
    rooms: RwLock<HashMap<String, SharedRoom>>,
}

impl RoomRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            rooms: RwLock::new(HashMap::new()),
        })
    }

    pub async fn create_room(&self, code: &str, quiz: Quiz) -> Result<SharedRoom> {
        let mut rooms = self.rooms.write().await;
        if rooms.contains_key(code) {
            return Err(QuizzyError::RoomAlreadyExists(code.to_string()));
        }

        let room = Arc::new(Mutex::new(Room::new(code.to_string(), quiz)));
        rooms.insert(code.to_string(), room.clone());

        tracing::info!(code = %code, "Room created");
        Ok(room)
    }

    /// Create a room with its host already assigned.
    ///
    /// The room is published already locked, so whatever the host does with the
    /// returned guard happens before any other party can touch the room.
    pub async fn open_room(
        &self,
        code: &str,
        quiz: Quiz,
        host: Connection,
    ) -> Result<OwnedMutexGuard<Room>> {
        let mut rooms = self.rooms.write().await;
        if rooms.contains_key(code) {
            return Err(QuizzyError::RoomAlreadyExists(code.to_string()));
        }

        let mut room = Room::new(code.to_string(), quiz);
        room.set_host(host)?;
        let room = Arc::new(Mutex::new(room));
        let guard = room.clone().lock_owned().await;
        rooms.insert(code.to_string(), room);

        tracing::info!(code = %code, "Room opened by host");
        Ok(guard)
    }

    pub async fn get(&self, code: &str) -> Result<SharedRoom> {
        let rooms = self.rooms.read().await;
        rooms
            .get(code)
            .cloned()
            .ok_or_else(|| QuizzyError::RoomNotFound(code.to_string()))
    }

    pub async fn room_exists(&self, code: &str) -> bool {
        self.rooms.read().await.contains_key(code)
    }

    pub async fn room_count(&self) -> usize {
        self.rooms.read().await.len()
    }

    pub async fn add_participant(&self, code: &str, conn: Connection) -> Result<usize> {
        let room = self.get(code).await?;
        let mut room = room.lock().await;
        room.add_participant(conn)
    }

    /// Idempotent: an absent room or connection is a no-op
    pub async fn remove_participant(&self, code: &str, id: ConnectionId) -> Option<usize> {
        let room = self.get(code).await.ok()?;
        let mut room = room.lock().await;
        room.remove_participant(id)
    }

    pub async fn set_host(&self, code: &str, conn: Connection) -> Result<()> {
        let room = self.get(code).await?;
        let mut room = room.lock().await;
        room.set_host(conn)
    }

    /// Removing the host destroys the room. The caller is responsible for
    /// notifying and closing the returned connections.
    pub async fn clear_host(&self, code: &str) -> Option<ClosedRoom> {
        let room = {
            let mut rooms = self.rooms.write().await;
            rooms.remove(code)?
        };

        let mut room = room.lock().await;
        let closed = room.close();
        tracing::info!(
            code = %code,
            participants = closed.participants.len(),
            "Room destroyed"
        );
        Some(closed)
    }

    pub async fn get_participant_count(&self, code: &str) -> Result<usize> {
        let room = self.get(code).await?;
        let room = room.lock().await;
        Ok(room.participant_count())
    }

    /// Bump the counter without touching membership. Joins go through
    /// `add_participant`, which counts on its own; `reset_participant_count`
    /// brings a drifted counter back in line.
    pub async fn increment_participant_count(&self, code: &str) -> Result<usize> {
        let room = self.get(code).await?;
        let mut room = room.lock().await;
        if room.is_closed() {
            return Err(QuizzyError::RoomNotFound(code.to_string()));
        }
        room.increment_participant_count();
        Ok(room.participant_count())
    }

    pub async fn reset_participant_count(&self, code: &str) -> Result<()> {
        let room = self.get(code).await?;
        let mut room = room.lock().await;
        room.reset_participant_count();
        Ok(())
    }

    pub async fn advance_question(&self, code: &str) -> Result<(usize, bool)> {
        let room = self.get(code).await?;
        let mut room = room.lock().await;
        Ok(room.advance_question())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quiz::Answer;

    fn quiz_with_questions(count: usize) -> Quiz {
        Quiz {
            id: "quiz-1".to_string(),
            title: "Geography".to_string(),
            code: "ABC123".to_string(),
            questions: (0..count)
                .map(|i| Question {
                    id: None,
                    title: format!("Question {}", i),
                    answers: vec![Answer { id: None, title: "Yes".to_string() }],
                })
                .collect(),
        }
    }

    fn conn() -> Connection {
        Connection::channel(8).0
    }

    #[tokio::test]
    async fn test_create_room() {
        let registry = RoomRegistry::new();
        registry.create_room("ABC123", quiz_with_questions(2)).await.unwrap();

        assert!(registry.room_exists("ABC123").await);
        let room = registry.get("ABC123").await.unwrap();
        let room = room.lock().await;
        assert_eq!(room.status(), RoomStatus::Waiting);
        assert_eq!(room.current_question_index(), 0);
        assert!(room.host().is_none());
    }

    #[tokio::test]
    async fn test_create_duplicate_room() {
        let registry = RoomRegistry::new();
        registry.create_room("ABC123", quiz_with_questions(1)).await.unwrap();

        let result = registry.create_room("ABC123", quiz_with_questions(1)).await;
        assert!(matches!(result, Err(QuizzyError::RoomAlreadyExists(_))));
    }

    #[tokio::test]
    async fn test_get_missing_room() {
        let registry = RoomRegistry::new();
        assert!(matches!(registry.get("NOPE").await, Err(QuizzyError::RoomNotFound(_))));
        assert!(matches!(
            registry.add_participant("NOPE", conn()).await,
            Err(QuizzyError::RoomNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_host_is_set_once() {
        let registry = RoomRegistry::new();
        registry.create_room("ABC123", quiz_with_questions(1)).await.unwrap();

        registry.set_host("ABC123", conn()).await.unwrap();
        let result = registry.set_host("ABC123", conn()).await;
        assert!(matches!(result, Err(QuizzyError::RoomAlreadyExists(_))));
    }

    #[tokio::test]
    async fn test_participants_are_counted_by_identity() {
        let registry = RoomRegistry::new();
        drop(registry.open_room("ABC123", quiz_with_questions(1), conn()).await.unwrap());

        let alice = conn();
        assert_eq!(registry.add_participant("ABC123", alice.clone()).await.unwrap(), 1);
        assert_eq!(registry.add_participant("ABC123", alice.clone()).await.unwrap(), 1);
        assert_eq!(registry.add_participant("ABC123", conn()).await.unwrap(), 2);

        assert_eq!(registry.remove_participant("ABC123", alice.id()).await, Some(1));
        assert_eq!(registry.remove_participant("ABC123", alice.id()).await, None);
        assert_eq!(registry.get_participant_count("ABC123").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_host_is_not_a_participant() {
        let registry = RoomRegistry::new();
        let host = conn();
        drop(registry.open_room("ABC123", quiz_with_questions(1), host.clone()).await.unwrap());

        let result = registry.add_participant("ABC123", host).await;
        assert!(matches!(result, Err(QuizzyError::AlreadyInSession)));
        assert_eq!(registry.get_participant_count("ABC123").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_advance_question_stops_at_end() {
        let registry = RoomRegistry::new();
        registry.create_room("ABC123", quiz_with_questions(2)).await.unwrap();

        assert_eq!(registry.advance_question("ABC123").await.unwrap(), (0, false));
        {
            let room = registry.get("ABC123").await.unwrap();
            assert_eq!(room.lock().await.status(), RoomStatus::InProgress);
        }
        assert_eq!(registry.advance_question("ABC123").await.unwrap(), (1, false));
        assert_eq!(registry.advance_question("ABC123").await.unwrap(), (2, true));
        assert_eq!(registry.advance_question("ABC123").await.unwrap(), (2, true));

        let room = registry.get("ABC123").await.unwrap();
        let room = room.lock().await;
        assert_eq!(room.current_question_index(), 2);
        assert_eq!(room.status(), RoomStatus::Finished);
    }

    #[tokio::test]
    async fn test_opened_room_is_locked_until_host_releases_it() {
        let registry = RoomRegistry::new();
        let guard = registry.open_room("ABC123", quiz_with_questions(1), conn()).await.unwrap();
        assert!(registry.room_exists("ABC123").await);

        let joiner = {
            let registry = registry.clone();
            tokio::spawn(async move { registry.add_participant("ABC123", conn()).await })
        };
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert!(!joiner.is_finished());
        assert_eq!(guard.participant_count(), 0);

        drop(guard);
        assert_eq!(joiner.await.unwrap().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_current_question_survives_finish() {
        let registry = RoomRegistry::new();
        registry.create_room("ABC123", quiz_with_questions(2)).await.unwrap();
        let room = registry.get("ABC123").await.unwrap();

        assert!(room.lock().await.current_question().is_none());
        registry.advance_question("ABC123").await.unwrap();
        registry.advance_question("ABC123").await.unwrap();

        let room = room.lock().await;
        assert_eq!(room.status(), RoomStatus::Finished);
        assert_eq!(room.current_question().map(|q| q.title.as_str()), Some("Question 1"));
    }

    #[tokio::test]
    async fn test_clear_host_destroys_room() {
        let registry = RoomRegistry::new();
        let host = conn();
        drop(registry.open_room("ABC123", quiz_with_questions(1), host.clone()).await.unwrap());
        let room = registry.get("ABC123").await.unwrap();
        registry.add_participant("ABC123", conn()).await.unwrap();
        registry.add_participant("ABC123", conn()).await.unwrap();

        let closed = registry.clear_host("ABC123").await.unwrap();
        assert_eq!(closed.host, Some(host));
        assert_eq!(closed.participants.len(), 2);
        assert!(!registry.room_exists("ABC123").await);

        // Late arrivals holding the old handle must not resurrect it
        let result = room.lock().await.add_participant(conn());
        assert!(matches!(result, Err(QuizzyError::RoomNotFound(_))));
        assert!(registry.clear_host("ABC123").await.is_none());
    }

    #[tokio::test]
    async fn test_reset_participant_count() {
        let registry = RoomRegistry::new();
        drop(registry.open_room("ABC123", quiz_with_questions(1), conn()).await.unwrap());
        registry.reset_participant_count("ABC123").await.unwrap();
        assert_eq!(registry.get_participant_count("ABC123").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_reset_resyncs_incremented_count() {
        let registry = RoomRegistry::new();
        drop(registry.open_room("ABC123", quiz_with_questions(1), conn()).await.unwrap());
        registry.add_participant("ABC123", conn()).await.unwrap();

        assert_eq!(registry.increment_participant_count("ABC123").await.unwrap(), 2);
        registry.reset_participant_count("ABC123").await.unwrap();
        assert_eq!(registry.get_participant_count("ABC123").await.unwrap(), 1);
        assert!(matches!(
            registry.increment_participant_count("NOPE").await,
            Err(QuizzyError::RoomNotFound(_))
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_joins_do_not_lose_updates() {
        let registry = RoomRegistry::new();
        drop(registry.open_room("ABC123", quiz_with_questions(1), conn()).await.unwrap());

        let mut handles = Vec::new();
        for _ in 0..50 {
            let registry = registry.clone();
            handles.push(tokio::spawn(async move {
                registry.add_participant("ABC123", conn()).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(registry.get_participant_count("ABC123").await.unwrap(), 50);
        let room = registry.get("ABC123").await.unwrap();
        assert_eq!(room.lock().await.participants().len(), 50);
    }
}
