mod model;
mod resolver;
mod seed;
mod store;

pub use model::{Answer, Question, Quiz, QuizRef};
pub use resolver::{generate_code, CodeResolver, InMemoryCodeResolver};
pub use seed::{load_seed, load_seed_str};
pub use store::{InMemoryQuizStore, QuizStore};
