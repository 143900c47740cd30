use thiserror::Error;

use crate::session::ConnectionId;

/// Custom error types for the live quiz server
#[derive(Debug, Error)]
pub enum QuizzyError {
    /// Room and session errors
    #[error("Room {0} not found")]
    RoomNotFound(String),

    #[error("Room {0} already exists")]
    RoomAlreadyExists(String),

    #[error("Connection is already bound to a session")]
    AlreadyInSession,

    /// Collaborator errors
    #[error("Join code {0} is not bound to any quiz")]
    CodeNotFound(String),

    #[error("Join code {0} is already bound")]
    CodeAlreadyBound(String),

    #[error("Quiz {quiz_id} not found for owner {owner_id}")]
    QuizNotFound { owner_id: String, quiz_id: String },

    /// Protocol errors
    #[error("Malformed event: {0}")]
    Malformed(String),

    #[error("Failed to serialize message: {0}")]
    SerializationFailed(#[from] serde_json::Error),

    /// Transport errors
    #[error("Failed to send to connection {connection}: {reason}")]
    SendFailed {
        connection: ConnectionId,
        reason: String,
    },

    #[error("Connection {0} is closed")]
    TransportClosed(ConnectionId),

    /// Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Failed to parse configuration: {0}")]
    ConfigurationParseFailed(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for Results using QuizzyError
pub type Result<T> = std::result::Result<T, QuizzyError>;

impl QuizzyError {
    pub fn malformed(msg: impl Into<String>) -> Self {
        QuizzyError::Malformed(msg.into())
    }

    pub fn send_failed(connection: ConnectionId, reason: impl Into<String>) -> Self {
        QuizzyError::SendFailed {
            connection,
            reason: reason.into(),
        }
    }

    /// Stable identifier reported to clients in `error` events
    pub fn kind(&self) -> &'static str {
        match self {
            QuizzyError::RoomNotFound(_)
            | QuizzyError::CodeNotFound(_)
            | QuizzyError::QuizNotFound { .. } => "notFound",
            QuizzyError::RoomAlreadyExists(_) | QuizzyError::CodeAlreadyBound(_) => {
                "alreadyExists"
            }
            QuizzyError::AlreadyInSession => "alreadyInSession",
            QuizzyError::Malformed(_) | QuizzyError::SerializationFailed(_) => "malformed",
            QuizzyError::SendFailed { .. } => "sendError",
            QuizzyError::TransportClosed(_) => "transportClosed",
            QuizzyError::InvalidConfiguration(_)
            | QuizzyError::ConfigurationParseFailed(_)
            | QuizzyError::Io(_) => "internal",
        }
    }
}
