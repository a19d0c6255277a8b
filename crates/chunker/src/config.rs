use crate::tokens::TokenEstimator;
use serde::{Deserialize, Serialize};

/// Fraction of a closed chunk's characters carried into the next chunk.
pub const DEFAULT_OVERLAP_RATIO: f32 = 0.1;

/// Configuration for document chunking behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Maximum chunk size in tokens (hard budget for accumulation)
    pub max_tokens_per_chunk: usize,

    /// Trailing fraction (0..1) of each chunk duplicated into the next
    pub overlap_ratio: f32,

    /// Snap the overlap seed to a sentence boundary
    pub sentence_boundary: bool,

    /// Split pages into paragraphs before accumulation
    pub paragraph_boundary: bool,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_tokens_per_chunk: 4_096,
            overlap_ratio: DEFAULT_OVERLAP_RATIO,
            sentence_boundary: true,
            paragraph_boundary: true,
        }
    }
}

impl ChunkingConfig {
    /// Derive a config from a model's input budget.
    ///
    /// The estimator decides how much of the budget a single chunk may
    /// consume; boundary preferences and overlap use the crate defaults.
    pub fn for_model_budget(max_input_tokens: usize, estimator: &impl TokenEstimator) -> Self {
        Self {
            max_tokens_per_chunk: estimator.optimal_chunk_size(max_input_tokens),
            ..Default::default()
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.max_tokens_per_chunk == 0 {
            return Err("max_tokens_per_chunk must be > 0".to_string());
        }

        if !(0.0..1.0).contains(&self.overlap_ratio) {
            return Err(format!(
                "overlap_ratio ({}) must be in [0, 1)",
                self.overlap_ratio
            ));
        }

        Ok(())
    }
}
