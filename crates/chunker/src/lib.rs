//! # Doclens Chunker
//!
//! Boundary-aware chunking of extracted document text for token-budgeted
//! downstream processing (summarization, outline generation).
//!
//! ## Pipeline
//!
//! ```text
//! Extracted text ("--- Page N ---" delimited)
//!     │
//!     ├──> Page parsing → (page number, page text)
//!     │
//!     ├──> Paragraph splitting (blank-line separated runs)
//!     │
//!     └──> Budget-driven accumulation
//!          ├─> Close chunk when the next paragraph would overflow
//!          ├─> Seed the next chunk with trailing overlap
//!          └─> Emit DocumentChunk[] with page ranges
//! ```
//!
//! ## Example
//!
//! ```rust
//! use doclens_chunker::{CharHeuristicEstimator, Chunker, ChunkingConfig};
//!
//! let estimator = CharHeuristicEstimator::default();
//! let config = ChunkingConfig::for_model_budget(8_192, &estimator);
//! let chunker = Chunker::new(config);
//!
//! let text = "--- Page 1 ---\nHello world.\n\n--- Page 2 ---\nSecond page.";
//! let chunks = chunker.chunk(text);
//! assert_eq!(chunks.len(), 1);
//! assert_eq!((chunks[0].start_page, chunks[0].end_page), (1, 2));
//! ```

mod chunker;
mod config;
mod error;
mod tokens;
mod types;

pub use chunker::{Chunker, ChunkingStats};
pub use config::{ChunkingConfig, DEFAULT_OVERLAP_RATIO};
pub use error::{ChunkerError, Result};
pub use tokens::{CharHeuristicEstimator, TokenEstimator};
pub use types::DocumentChunk;
