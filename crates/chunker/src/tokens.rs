/// Approximate token accounting for sizing chunks against a model budget.
///
/// Exact tokenization depends on the downstream model; chunk sizing only
/// needs a stable approximation, so callers can plug in anything that
/// implements this trait.
pub trait TokenEstimator {
    /// Estimate the token count of a text span.
    fn estimate(&self, text: &str) -> usize;

    /// Compute a chunk budget for a model with `max_input_tokens` of input,
    /// leaving headroom for the prompt scaffolding and the response.
    fn optimal_chunk_size(&self, max_input_tokens: usize) -> usize;
}

/// Character-count heuristic: roughly 4 characters per token for prose.
#[derive(Debug, Clone, Copy, Default)]
pub struct CharHeuristicEstimator;

/// Tokens reserved out of the model budget for instructions and response.
const RESPONSE_MARGIN_TOKENS: usize = 1_024;

/// Smallest budget worth chunking against; below this the margin math
/// degenerates.
const MIN_CHUNK_TOKENS: usize = 256;

impl TokenEstimator for CharHeuristicEstimator {
    fn estimate(&self, text: &str) -> usize {
        (text.len() / 4).max(1)
    }

    fn optimal_chunk_size(&self, max_input_tokens: usize) -> usize {
        max_input_tokens
            .saturating_sub(RESPONSE_MARGIN_TOKENS)
            .max(MIN_CHUNK_TOKENS)
    }
}
