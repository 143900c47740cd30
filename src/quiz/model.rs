use serde::{Deserialize, Serialize};

/// A quiz document as held by the content store.
///
/// The session engine treats it as an immutable snapshot for the lifetime of a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quiz {
    #[serde(default)]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub questions: Vec<Question>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub title: String,
    #[serde(default)]
    pub answers: Vec<Answer>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Answer {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub title: String,
}

/// Owner and quiz identity a join code resolves to
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QuizRef {
    pub owner_id: String,
    pub quiz_id: String,
}

impl Question {
    pub fn answer_titles(&self) -> Vec<String> {
        self.answers.iter().map(|a| a.title.clone()).collect()
    }
}
