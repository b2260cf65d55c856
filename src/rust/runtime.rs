use std::env;

use serde::{Deserialize, Serialize};

use crate::classifier::ClassifierError;

/// Tunables shared by training and classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Maximum number of distinct known tokens whose orderings are enumerated.
    /// The number of orderings grows factorially: 6 tokens give 720 matrices.
    pub max_phrase_tokens: usize,
    /// Number of neighbours kept in a phrase's similarity vector.
    pub similar_topn: usize,
    /// Run permutation and per-class distance work on the rayon pool.
    pub parallel: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_phrase_tokens: 6,
            similar_topn: 10,
            parallel: true,
        }
    }
}

impl RuntimeConfig {
    /// Default configuration with environment overrides applied:
    /// `WORDSPACE_MAX_PHRASE_TOKENS`, `WORDSPACE_SIMILAR_TOPN`, `WORDSPACE_PARALLEL`.
    /// Unparseable values are ignored with a warning.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(value) = read_var("WORDSPACE_MAX_PHRASE_TOKENS") {
            config.max_phrase_tokens = value;
        }
        if let Some(value) = read_var("WORDSPACE_SIMILAR_TOPN") {
            config.similar_topn = value;
        }
        if let Some(value) = read_var("WORDSPACE_PARALLEL") {
            config.parallel = value;
        }
        config
    }

    /// Checks that at least one token and one neighbour are allowed
    ///
    /// # Errors
    /// * `ValidationError` if `max_phrase_tokens` or `similar_topn` is 0
    pub fn validate(&self) -> Result<(), ClassifierError> {
        if self.max_phrase_tokens == 0 || self.similar_topn == 0 {
            return Err(ClassifierError::ValidationError(format!(
                "max_phrase_tokens ({}) and similar_topn ({}) must be at least 1",
                self.max_phrase_tokens, self.similar_topn
            )));
        }
        Ok(())
    }
}

fn read_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    let raw = env::var(name).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            log::warn!("Ignoring {}={:?}: not a valid value", name, raw);
            None
        }
    }
}
