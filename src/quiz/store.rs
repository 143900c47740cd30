use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::model::Quiz;
use crate::error::{QuizzyError, Result};

/// Read/write access to quiz content, keyed by owner and quiz id.
#[async_trait]
pub trait QuizStore: Send + Sync {
    async fn get_unique(&self, owner_id: &str, quiz_id: &str) -> Result<Quiz>;

    async fn get_quizzes(&self, owner_id: &str) -> Result<Vec<Quiz>>;

    async fn upsert(&self, owner_id: &str, quiz: Quiz) -> Result<()>;
}

pub struct InMemoryQuizStore {
    quizzes: RwLock<HashMap<String, HashMap<String, Quiz>>>,
}

impl InMemoryQuizStore {
    pub fn new() -> Self {
        Self {
            quizzes: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryQuizStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl QuizStore for InMemoryQuizStore {
    async fn get_unique(&self, owner_id: &str, quiz_id: &str) -> Result<Quiz> {
        let quizzes = self.quizzes.read().await;
        quizzes
            .get(owner_id)
            .and_then(|owned| owned.get(quiz_id))
            .cloned()
            .ok_or_else(|| QuizzyError::QuizNotFound {
                owner_id: owner_id.to_string(),
                quiz_id: quiz_id.to_string(),
            })
    }

    async fn get_quizzes(&self, owner_id: &str) -> Result<Vec<Quiz>> {
        let quizzes = self.quizzes.read().await;
        let mut owned: Vec<Quiz> = quizzes
            .get(owner_id)
            .map(|owned| owned.values().cloned().collect())
            .unwrap_or_default();
        owned.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(owned)
    }

    async fn upsert(&self, owner_id: &str, quiz: Quiz) -> Result<()> {
        if quiz.id.is_empty() {
            return Err(QuizzyError::malformed("quiz id must not be empty"));
        }

        let mut quizzes = self.quizzes.write().await;
        quizzes
            .entry(owner_id.to_string())
            .or_default()
            .insert(quiz.id.clone(), quiz);
        Ok(())
    }
}
