//! Live quiz session server.
//!
//! Turns a stored quiz into a real-time session shared by one host and any
//! number of participants over WebSocket connections.

pub mod api;
pub mod config;
pub mod error;
pub mod quiz;
pub mod session;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use config::{Config, LogFormat};
use quiz::{InMemoryCodeResolver, InMemoryQuizStore};
use session::{RoomRegistry, SessionEngine};

pub use error::{QuizzyError, Result};

/// Install the global tracing subscriber. `RUST_LOG` overrides the default `info` level.
pub fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    let result = match format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Pretty => builder.try_init(),
    };
    if let Err(e) = result {
        eprintln!("tracing subscriber already installed: {}", e);
    }
}

/// Build the session engine with in-memory collaborators, seeding quizzes from
/// the configured file if there is one.
pub async fn bootstrap(config: &Config) -> Arc<SessionEngine> {
    let store = Arc::new(InMemoryQuizStore::new());
    let resolver = Arc::new(InMemoryCodeResolver::new());

    if let Some(path) = &config.session.quiz_file {
        match quiz::load_seed(path, store.as_ref(), resolver.as_ref()).await {
            Ok(count) => {
                tracing::info!(path = %path.display(), quizzes = count, "Quiz seed loaded");
            }
            Err(e) => {
                tracing::error!(
                    path = %path.display(),
                    error = %e,
                    "Failed to load quiz seed, starting with an empty catalog"
                );
            }
        }
    } else {
        tracing::warn!("QUIZZY_QUIZ_FILE not set, no quizzes can be hosted");
    }

    SessionEngine::new(RoomRegistry::new(), resolver, store)
}
