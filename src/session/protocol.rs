use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{QuizzyError, Result};

/// One wire message: `{"name": "<event>", "data": {...}}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub name: String,
    #[serde(default)]
    pub data: Value,
}

/// Events a client may send
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    Host { execution_id: String },
    Join { execution_id: String },
    NextQuestion { execution_id: String },
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExecutionPayload {
    execution_id: String,
}

impl InboundEvent {
    /// Parse a text frame. Unknown event names yield `Ok(None)`.
    pub fn parse(text: &str) -> Result<Option<Self>> {
        let envelope: EventEnvelope = serde_json::from_str(text)
            .map_err(|e| QuizzyError::malformed(format!("invalid envelope: {}", e)))?;
        Self::decode(envelope)
    }

    pub fn decode(envelope: EventEnvelope) -> Result<Option<Self>> {
        let build: fn(String) -> InboundEvent = match envelope.name.as_str() {
            "host" => |execution_id| InboundEvent::Host { execution_id },
            "join" => |execution_id| InboundEvent::Join { execution_id },
            "nextQuestion" => |execution_id| InboundEvent::NextQuestion { execution_id },
            _ => return Ok(None),
        };

        let payload: ExecutionPayload = serde_json::from_value(envelope.data).map_err(|e| {
            QuizzyError::malformed(format!("invalid data for {}: {}", envelope.name, e))
        })?;

        let execution_id = payload.execution_id.trim();
        if execution_id.is_empty() {
            return Err(QuizzyError::malformed(format!(
                "{} requires a non-empty executionId",
                envelope.name
            )));
        }

        Ok(Some(build(execution_id.to_string())))
    }

    pub fn name(&self) -> &'static str {
        match self {
            InboundEvent::Host { .. } => "host",
            InboundEvent::Join { .. } => "join",
            InboundEvent::NextQuestion { .. } => "nextQuestion",
        }
    }

    pub fn execution_id(&self) -> &str {
        match self {
            InboundEvent::Host { execution_id }
            | InboundEvent::Join { execution_id }
            | InboundEvent::NextQuestion { execution_id } => execution_id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusLabel {
    Waiting,
    Started,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizSummary {
    pub title: String,
}

/// Events the server emits, serialized in the same envelope shape as inbound ones
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "name", content = "data", rename_all = "camelCase")]
pub enum OutboundEvent {
    HostDetails {
        quiz: QuizSummary,
    },
    JoinDetails {
        #[serde(rename = "quizTitle")]
        quiz_title: String,
    },
    Status {
        status: StatusLabel,
        participants: usize,
    },
    NewQuestion {
        question: String,
        answers: Vec<String>,
    },
    /// Terminal notice sent to participants when the host leaves
    SessionEnded {
        reason: String,
    },
    Error {
        kind: String,
        message: String,
    },
}

pub const HOST_LEFT: &str = "hostLeft";

impl OutboundEvent {
    pub fn error(err: &QuizzyError) -> Self {
        OutboundEvent::Error {
            kind: err.kind().to_string(),
            message: err.to_string(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            OutboundEvent::HostDetails { .. } => "hostDetails",
            OutboundEvent::JoinDetails { .. } => "joinDetails",
            OutboundEvent::Status { .. } => "status",
            OutboundEvent::NewQuestion { .. } => "newQuestion",
            OutboundEvent::SessionEnded { .. } => "sessionEnded",
            OutboundEvent::Error { .. } => "error",
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
