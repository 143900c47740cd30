use std::path::Path;

use serde::Deserialize;

use super::model::Quiz;
use super::resolver::{generate_code, CodeResolver};
use super::store::QuizStore;
use crate::error::{QuizzyError, Result};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SeedEntry {
    owner_id: String,
    quiz: Quiz,
}

/// Load a JSON array of `{ownerId, quiz}` entries into the store and bind their codes.
///
/// Quizzes without a code get a generated one. Returns the number of quizzes loaded.
pub async fn load_seed<P: AsRef<Path>>(
    path: P,
    store: &dyn QuizStore,
    resolver: &dyn CodeResolver,
) -> Result<usize> {
    let path = path.as_ref();
    let content = tokio::fs::read_to_string(path).await?;
    load_seed_str(&content, store, resolver).await
}

pub async fn load_seed_str(
    content: &str,
    store: &dyn QuizStore,
    resolver: &dyn CodeResolver,
) -> Result<usize> {
    let entries: Vec<SeedEntry> = serde_json::from_str(content)?;
    if entries.is_empty() {
        tracing::warn!("Quiz seed contains no quizzes");
    }

    let mut loaded = 0;
    for SeedEntry { owner_id, mut quiz } in entries {
        if quiz.id.is_empty() {
            return Err(QuizzyError::malformed(format!(
                "seeded quiz {:?} has no id",
                quiz.title
            )));
        }
        if quiz.code.is_empty() {
            quiz.code = generate_code();
        }

        resolver.bind_code(&owner_id, &quiz).await?;
        tracing::info!(
            code = %quiz.code,
            owner_id = %owner_id,
            questions = quiz.questions.len(),
            "Loaded quiz"
        );
        store.upsert(&owner_id, quiz).await?;
        loaded += 1;
    }

    Ok(loaded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quiz::{InMemoryCodeResolver, InMemoryQuizStore};

    const SEED: &str = r#"[
        {
            "ownerId": "teacher-1",
            "quiz": {
                "id": "geo",
                "title": "Geography",
                "code": "ABC123",
                "questions": [
                    { "title": "Capital of France?", "answers": [{ "title": "Paris" }, { "title": "Rome" }] }
                ]
            }
        },
        { "ownerId": "teacher-1", "quiz": { "id": "empty", "title": "No code yet" } }
    ]"#;

    #[tokio::test]
    async fn test_load_seed_binds_codes() {
        let store = InMemoryQuizStore::new();
        let resolver = InMemoryCodeResolver::new();

        let loaded = load_seed_str(SEED, &store, &resolver).await.unwrap();
        assert_eq!(loaded, 2);

        let quiz_ref = resolver.get_quiz("ABC123").await.unwrap();
        let quiz = store.get_unique(&quiz_ref.owner_id, &quiz_ref.quiz_id).await.unwrap();
        assert_eq!(quiz.title, "Geography");
        assert_eq!(quiz.questions[0].answer_titles(), vec!["Paris", "Rome"]);

        let generated = store.get_unique("teacher-1", "empty").await.unwrap();
        assert_eq!(generated.code.len(), 6);
        assert!(resolver.get_quiz(&generated.code).await.is_ok());
    }

    #[tokio::test]
    async fn test_load_seed_rejects_bad_json() {
        let store = InMemoryQuizStore::new();
        let resolver = InMemoryCodeResolver::new();

        let result = load_seed_str("{not json", &store, &resolver).await;
        assert!(matches!(result, Err(QuizzyError::SerializationFailed(_))));
    }

    #[tokio::test]
    async fn test_load_seed_missing_file() {
        let store = InMemoryQuizStore::new();
        let resolver = InMemoryCodeResolver::new();

        let result = load_seed("/definitely/not/here.json", &store, &resolver).await;
        assert!(matches!(result, Err(QuizzyError::Io(_))));
    }
}
