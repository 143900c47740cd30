use std::collections::HashMap;

use async_trait::async_trait;
use rand::Rng;
use tokio::sync::RwLock;

use super::model::{Quiz, QuizRef};
use crate::error::{QuizzyError, Result};

const CODE_CHARSET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
pub const CODE_LENGTH: usize = 6;

/// Maps a human-shareable join code to the owner and quiz it hosts.
#[async_trait]
pub trait CodeResolver: Send + Sync {
    /// Fails with `CodeAlreadyBound` if the quiz code is taken.
    async fn bind_code(&self, owner_id: &str, quiz: &Quiz) -> Result<()>;

    async fn unbind_code(&self, code: &str) -> Result<()>;

    async fn get_quiz(&self, code: &str) -> Result<QuizRef>;
}

/// Generate a random join code, avoiding look-alike characters
pub fn generate_code() -> String {
    let mut rng = rand::thread_rng();
    (0..CODE_LENGTH)
        .map(|_| CODE_CHARSET[rng.gen_range(0..CODE_CHARSET.len())] as char)
        .collect()
}

pub struct InMemoryCodeResolver {
    entries: RwLock<HashMap<String, QuizRef>>,
}

impl InMemoryCodeResolver {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryCodeResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CodeResolver for InMemoryCodeResolver {
    async fn bind_code(&self, owner_id: &str, quiz: &Quiz) -> Result<()> {
        if quiz.code.is_empty() {
            return Err(QuizzyError::malformed("quiz code must not be empty"));
        }

        let mut entries = self.entries.write().await;
        if entries.contains_key(&quiz.code) {
            return Err(QuizzyError::CodeAlreadyBound(quiz.code.clone()));
        }

        entries.insert(
            quiz.code.clone(),
            QuizRef {
                owner_id: owner_id.to_string(),
                quiz_id: quiz.id.clone(),
            },
        );
        tracing::debug!(code = %quiz.code, owner_id = %owner_id, quiz_id = %quiz.id, "Bound join code");
        Ok(())
    }

    async fn unbind_code(&self, code: &str) -> Result<()> {
        let mut entries = self.entries.write().await;
        entries.remove(code);
        Ok(())
    }

    async fn get_quiz(&self, code: &str) -> Result<QuizRef> {
        let entries = self.entries.read().await;
        entries
            .get(code)
            .cloned()
            .ok_or_else(|| QuizzyError::CodeNotFound(code.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quiz_with_code(id: &str, code: &str) -> Quiz {
        Quiz {
            id: id.to_string(),
            title: "Quiz".to_string(),
            code: code.to_string(),
            questions: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_bind_and_resolve() {
        let resolver = InMemoryCodeResolver::new();
        resolver.bind_code("owner", &quiz_with_code("q1", "ABC123")).await.unwrap();

        let quiz_ref = resolver.get_quiz("ABC123").await.unwrap();
        assert_eq!(quiz_ref.owner_id, "owner");
        assert_eq!(quiz_ref.quiz_id, "q1");
    }

    #[tokio::test]
    async fn test_duplicate_bind_is_rejected() {
        let resolver = InMemoryCodeResolver::new();
        resolver.bind_code("owner", &quiz_with_code("q1", "ABC123")).await.unwrap();

        let result = resolver.bind_code("other", &quiz_with_code("q2", "ABC123")).await;
        assert!(matches!(result, Err(QuizzyError::CodeAlreadyBound(_))));
    }

    #[tokio::test]
    async fn test_unbind_is_idempotent() {
        let resolver = InMemoryCodeResolver::new();
        resolver.bind_code("owner", &quiz_with_code("q1", "ABC123")).await.unwrap();

        resolver.unbind_code("ABC123").await.unwrap();
        resolver.unbind_code("ABC123").await.unwrap();
        assert!(matches!(
            resolver.get_quiz("ABC123").await,
            Err(QuizzyError::CodeNotFound(_))
        ));
    }

    #[test]
    fn test_generate_code_shape() {
        let code = generate_code();
        assert_eq!(code.len(), CODE_LENGTH);
        assert!(code.bytes().all(|b| CODE_CHARSET.contains(&b)));
    }
}
