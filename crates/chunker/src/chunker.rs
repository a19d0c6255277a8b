use crate::config::ChunkingConfig;
use crate::error::ChunkerError;
use crate::tokens::{CharHeuristicEstimator, TokenEstimator};
use crate::types::DocumentChunk;
use regex::Regex;
use std::sync::OnceLock;
use std::time::Duration;
use unicode_segmentation::UnicodeSegmentation;

/// Coarse per-chunk processing cost, for progress-reporting UX only.
const PER_CHUNK_PROCESSING_MS: u64 = 2_000;

/// Chunks emitted over this fraction of the budget fail `validate_chunks`.
const BUDGET_TOLERANCE_PERCENT: usize = 110;

fn page_marker() -> &'static Regex {
    static MARKER: OnceLock<Regex> = OnceLock::new();
    MARKER.get_or_init(|| {
        Regex::new(r"(?m)^--- Page (\d+) ---[ \t]*\r?\n?").expect("page marker regex is valid")
    })
}

/// Main chunker interface for splitting extracted document text
pub struct Chunker {
    config: ChunkingConfig,
    estimator: Box<dyn TokenEstimator + Send + Sync>,
}

impl Chunker {
    /// Create a new chunker with configuration.
    ///
    /// Panics on invalid configuration: a malformed config is a programming
    /// error, not a runtime condition to recover from.
    #[must_use]
    pub fn new(config: ChunkingConfig) -> Self {
        Self::with_estimator(config, Box::new(CharHeuristicEstimator))
    }

    /// Fallible constructor for callers assembling configs from user input
    pub fn try_new(config: ChunkingConfig) -> crate::Result<Self> {
        Self::try_with_estimator(config, Box::new(CharHeuristicEstimator))
    }

    /// Create a chunker with a caller-supplied token estimator
    #[must_use]
    pub fn with_estimator(
        config: ChunkingConfig,
        estimator: Box<dyn TokenEstimator + Send + Sync>,
    ) -> Self {
        Self::try_with_estimator(config, estimator)
            .expect("Invalid chunking configuration provided")
    }

    fn try_with_estimator(
        config: ChunkingConfig,
        estimator: Box<dyn TokenEstimator + Send + Sync>,
    ) -> crate::Result<Self> {
        config.validate().map_err(ChunkerError::invalid_config)?;
        Ok(Self { config, estimator })
    }

    /// Split extracted text into bounded, overlapping chunks.
    ///
    /// Pure and deterministic. Pages are recognized via embedded
    /// `--- Page N ---` markers; text before the first marker is attributed
    /// to page 1. A paragraph that alone exceeds the budget is emitted as an
    /// oversized chunk rather than split mid-unit.
    #[must_use]
    pub fn chunk(&self, text: &str) -> Vec<DocumentChunk> {
        let pages = parse_pages(text);

        let mut chunks: Vec<DocumentChunk> = Vec::new();
        let mut buffer = String::new();
        let mut buffer_tokens = 0usize;
        let mut buffer_start_page = 1u32;
        let mut buffer_end_page = 1u32;

        for (page, body) in &pages {
            let units = self.split_units(body);

            for unit in units {
                let unit_tokens = self.estimator.estimate(unit);

                if !buffer.is_empty()
                    && buffer_tokens + unit_tokens > self.config.max_tokens_per_chunk
                {
                    let closed = self.close_chunk(
                        std::mem::take(&mut buffer),
                        chunks.len(),
                        buffer_start_page,
                        buffer_end_page,
                    );

                    // Seed the next buffer with the trailing overlap so
                    // adjacent chunks share context across the boundary.
                    let seed = self.overlap_tail(&closed.content);
                    chunks.push(closed);

                    buffer = if seed.is_empty() {
                        unit.to_string()
                    } else {
                        format!("{seed}\n\n{unit}")
                    };
                    buffer_tokens = self.estimator.estimate(&buffer);
                    buffer_start_page = *page;
                    buffer_end_page = *page;
                } else {
                    if buffer.is_empty() {
                        buffer_start_page = *page;
                        buffer.push_str(unit);
                    } else {
                        buffer.push_str("\n\n");
                        buffer.push_str(unit);
                    }
                    buffer_tokens += unit_tokens;
                    buffer_end_page = *page;
                }
            }
        }

        if !buffer.is_empty() {
            let closed = self.close_chunk(buffer, chunks.len(), buffer_start_page, buffer_end_page);
            chunks.push(closed);
        }

        log::debug!(
            "Chunked {} chars across {} pages into {} chunks",
            text.len(),
            pages.len(),
            chunks.len()
        );
        chunks
    }

    /// Coarse linear estimate of downstream processing time
    #[must_use]
    pub fn estimate_processing_time(chunks: &[DocumentChunk]) -> Duration {
        Duration::from_millis(PER_CHUNK_PROCESSING_MS * chunks.len() as u64)
    }

    /// Post-hoc sanity check: every chunk within 10% tolerance of the budget.
    ///
    /// Not enforced during chunking; an unsplittable oversized paragraph can
    /// legitimately fail this.
    #[must_use]
    pub fn validate_chunks(&self, chunks: &[DocumentChunk]) -> bool {
        chunks.iter().all(|chunk| {
            chunk.token_count * 100 <= self.config.max_tokens_per_chunk * BUDGET_TOLERANCE_PERCENT
        })
    }

    /// Get configuration
    #[must_use]
    pub const fn config(&self) -> &ChunkingConfig {
        &self.config
    }

    /// Get statistics about chunking results
    #[must_use]
    pub fn get_stats(chunks: &[DocumentChunk]) -> ChunkingStats {
        ChunkingStats {
            total_chunks: chunks.len(),
            total_tokens: chunks.iter().map(|c| c.token_count).sum(),
            avg_tokens_per_chunk: if chunks.is_empty() {
                0
            } else {
                chunks.iter().map(|c| c.token_count).sum::<usize>() / chunks.len()
            },
            min_tokens: chunks.iter().map(|c| c.token_count).min().unwrap_or(0),
            max_tokens: chunks.iter().map(|c| c.token_count).max().unwrap_or(0),
        }
    }

    fn close_chunk(
        &self,
        content: String,
        index: usize,
        start_page: u32,
        end_page: u32,
    ) -> DocumentChunk {
        let token_count = self.estimator.estimate(&content);
        DocumentChunk::new(content, index, start_page, end_page, token_count)
    }

    /// Candidate units within a page: paragraphs when enabled, otherwise the
    /// whole page body.
    fn split_units<'a>(&self, body: &'a str) -> Vec<&'a str> {
        if self.config.paragraph_boundary {
            split_paragraphs(body)
        } else {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                Vec::new()
            } else {
                vec![trimmed]
            }
        }
    }

    /// Trailing `overlap_ratio` fraction (by bytes, snapped to a char
    /// boundary) of a closed chunk, optionally aligned to a sentence start.
    fn overlap_tail(&self, content: &str) -> String {
        if self.config.overlap_ratio <= 0.0 {
            return String::new();
        }

        #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
        let keep = (content.len() as f32 * self.config.overlap_ratio) as usize;
        if keep == 0 {
            return String::new();
        }

        let mut start = content.len() - keep;
        while !content.is_char_boundary(start) {
            start += 1;
        }

        if self.config.sentence_boundary {
            // Prefer starting the overlap at a sentence boundary so the
            // duplicated context reads whole.
            if let Some((idx, _)) = content
                .split_sentence_bound_indices()
                .find(|(idx, _)| *idx >= start)
            {
                start = idx;
            }
        }

        content[start..].trim_start().to_string()
    }
}

/// Parse `--- Page N ---` delimited text into (page number, body) pairs.
///
/// Blank bodies are dropped; text without any marker is a single page 1.
fn parse_pages(text: &str) -> Vec<(u32, String)> {
    let mut pages: Vec<(u32, String)> = Vec::new();
    let mut cursor = 0usize;
    let mut current_page = 1u32;

    for captures in page_marker().captures_iter(text) {
        let marker = captures.get(0).expect("capture 0 is the full match");
        let body = &text[cursor..marker.start()];
        if !body.trim().is_empty() {
            pages.push((current_page, body.to_string()));
        }

        current_page = captures[1].parse().unwrap_or(current_page + 1);
        cursor = marker.end();
    }

    let tail = &text[cursor..];
    if !tail.trim().is_empty() {
        pages.push((current_page, tail.to_string()));
    }

    pages
}

/// Split a page body into paragraphs: contiguous runs of non-blank lines.
fn split_paragraphs(body: &str) -> Vec<&str> {
    let mut paragraphs = Vec::new();
    let mut start: Option<usize> = None;
    let mut offset = 0usize;

    for line in body.split_inclusive('\n') {
        if line.trim().is_empty() {
            if let Some(begin) = start.take() {
                let para = body[begin..offset].trim();
                if !para.is_empty() {
                    paragraphs.push(para);
                }
            }
        } else if start.is_none() {
            start = Some(offset);
        }
        offset += line.len();
    }

    if let Some(begin) = start {
        let para = body[begin..].trim();
        if !para.is_empty() {
            paragraphs.push(para);
        }
    }

    paragraphs
}

/// Statistics about chunking results
#[derive(Debug, Clone)]
pub struct ChunkingStats {
    pub total_chunks: usize,
    pub total_tokens: usize,
    pub avg_tokens_per_chunk: usize,
    pub min_tokens: usize,
    pub max_tokens: usize,
}

impl std::fmt::Display for ChunkingStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Chunks: {} | Tokens: {} | Avg: {} | Range: {}-{}",
            self.total_chunks,
            self.total_tokens,
            self.avg_tokens_per_chunk,
            self.min_tokens,
            self.max_tokens
        )
    }
}
