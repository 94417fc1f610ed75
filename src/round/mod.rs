//! Round content: the shared batch of flag tokens both players of a round see

pub mod generator;
pub mod vocabulary;

pub use generator::{has_duplicates, RoundContentGenerator, DEFAULT_MAX_ATTEMPTS, DEFAULT_TOKEN_COUNT};
pub use vocabulary::Vocabulary;
