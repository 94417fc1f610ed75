//! Round content generation
//!
//! A round is a fixed number of distinct tokens drawn from the vocabulary.
//! Each batch is drawn uniformly with replacement and thrown away whole if it
//! contains a repeat. The number of redrawn batches is capped; past the cap
//! the batch is sampled without replacement, which yields the same
//! distribution as a duplicate-free rejection draw. A vocabulary smaller than
//! the batch fails up front instead of looping forever.

use crate::error::{MatchmakingError, Result};
use crate::round::vocabulary::Vocabulary;
use crate::types::RoundContent;
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashSet;
use tracing::{debug, warn};

/// Default number of tokens per round
pub const DEFAULT_TOKEN_COUNT: usize = 20;

/// Default cap on redrawn batches
pub const DEFAULT_MAX_ATTEMPTS: u32 = 1000;

/// Produces the shared token batch for a round
#[derive(Debug, Clone)]
pub struct RoundContentGenerator {
    vocabulary: Vocabulary,
    token_count: usize,
    max_attempts: u32,
}

impl RoundContentGenerator {
    /// Create a generator, rejecting vocabularies that can never yield a full batch
    pub fn new(vocabulary: Vocabulary, token_count: usize, max_attempts: u32) -> Result<Self> {
        if token_count == 0 || max_attempts == 0 {
            return Err(MatchmakingError::ConfigurationError {
                message: "Token count and attempt cap must be greater than 0".to_string(),
            }
            .into());
        }

        if vocabulary.len() < token_count {
            return Err(MatchmakingError::ContentGenerationFailed {
                reason: format!(
                    "vocabulary has {} distinct tokens, {} required",
                    vocabulary.len(),
                    token_count
                ),
            }
            .into());
        }

        Ok(Self {
            vocabulary,
            token_count,
            max_attempts,
        })
    }

    /// Generator over the built-in vocabulary with default settings
    pub fn with_defaults() -> Result<Self> {
        Self::new(
            Vocabulary::default(),
            DEFAULT_TOKEN_COUNT,
            DEFAULT_MAX_ATTEMPTS,
        )
    }

    pub fn token_count(&self) -> usize {
        self.token_count
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    /// Generate a batch using the thread-local RNG
    pub fn generate(&self) -> Result<RoundContent> {
        self.generate_with_rng(&mut rand::thread_rng())
    }

    /// Generate a batch from the given RNG
    pub fn generate_with_rng<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<RoundContent> {
        let tokens = self.vocabulary.tokens();
        if tokens.len() < self.token_count {
            return Err(MatchmakingError::ContentGenerationFailed {
                reason: format!(
                    "vocabulary has {} distinct tokens, {} required",
                    tokens.len(),
                    self.token_count
                ),
            }
            .into());
        }

        for attempt in 1..=self.max_attempts {
            let batch: Vec<String> = (0..self.token_count)
                .filter_map(|_| tokens.choose(rng).cloned())
                .collect();

            if batch.len() == self.token_count && !has_duplicates(&batch) {
                debug!(
                    "Generated round content with {} tokens after {} attempt(s)",
                    batch.len(),
                    attempt
                );
                return Ok(RoundContent::new(batch));
            }
        }

        warn!(
            "No duplicate-free batch after {} attempts ({} tokens from a vocabulary of {}), sampling without replacement",
            self.max_attempts,
            self.token_count,
            tokens.len()
        );
        let mut batch: Vec<String> = tokens
            .choose_multiple(rng, self.token_count)
            .cloned()
            .collect();
        batch.shuffle(rng);

        Ok(RoundContent::new(batch))
    }
}

/// True if any token appears more than once
pub fn has_duplicates(tokens: &[String]) -> bool {
    let mut seen = HashSet::with_capacity(tokens.len());
    !tokens.iter().all(|token| seen.insert(token))
}
